use proptest::prelude::*;
use ts_core::step_count;

proptest! {
    #[test]
    fn whole_multiples_give_exact_count(n in 1u64..10_000, dt in 1e-3f64..10.0) {
        let duration = n as f64 * dt;
        prop_assert_eq!(step_count(duration, dt).unwrap(), n);
    }

    #[test]
    fn steps_cover_duration(duration in 1e-3f64..1e4, dt in 1e-3f64..10.0) {
        let steps = step_count(duration, dt).unwrap();
        prop_assert!(steps >= 1);
        prop_assert!(steps as f64 * dt >= duration * (1.0 - 1e-9));
        prop_assert!(((steps - 1) as f64) * dt < duration);
    }
}
