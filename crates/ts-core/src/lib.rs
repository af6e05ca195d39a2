//! ts-core: stable foundation for the twinsec simulation engine.
//!
//! Contains:
//! - numeric (Real + step counting)
//! - values (named state/signal/control maps and signal naming)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod values;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use numeric::*;
pub use values::*;
