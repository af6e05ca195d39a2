//! Content fingerprint of a run's inputs.

use sha2::{Digest, Sha256};
use ts_attacks::{AttackRecord, AttackStatus};
use ts_model::ModelDefinition;

/// SHA-256 over the model, the attack plan and the seed.
///
/// Two runs with the same fingerprint produce identical telemetry. Attack
/// lifecycle status is not part of the input and is ignored.
pub fn compute_fingerprint(model: &ModelDefinition, attacks: &[AttackRecord], seed: u64) -> String {
    let mut hasher = Sha256::new();

    let model_json = serde_json::to_string(model).unwrap_or_default();
    hasher.update(model_json.as_bytes());

    for attack in attacks {
        let mut attack = attack.clone();
        attack.status = AttackStatus::Armed;
        let attack_json = serde_json::to_string(&attack).unwrap_or_default();
        hasher.update(attack_json.as_bytes());
    }

    hasher.update(seed.to_le_bytes());

    let result = hasher.finalize();
    format!("{:x}", result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ts_attacks::AttackKind;

    fn model() -> ModelDefinition {
        ModelDefinition::new("tank-1", "tank").with_parameter("area", 10.0)
    }

    #[test]
    fn hash_stability() {
        let attacks = vec![AttackRecord::new(
            "a",
            AttackKind::DenyOfService,
            "tank.level_sensor",
            1.0,
        )];
        let h1 = compute_fingerprint(&model(), &attacks, 3);
        let h2 = compute_fingerprint(&model(), &attacks, 3);
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
    }

    #[test]
    fn hash_differs_for_different_inputs() {
        let base = compute_fingerprint(&model(), &[], 0);
        assert_ne!(base, compute_fingerprint(&model(), &[], 1));
        assert_ne!(
            base,
            compute_fingerprint(&model().with_parameter("area", 11.0), &[], 0)
        );
    }

    #[test]
    fn status_does_not_change_fingerprint() {
        let armed = AttackRecord::new("a", AttackKind::DenyOfService, "tank.level_sensor", 1.0);
        let mut done = armed.clone();
        done.status = AttackStatus::Completed;
        assert_eq!(
            compute_fingerprint(&model(), &[armed], 0),
            compute_fingerprint(&model(), &[done], 0)
        );
    }
}
