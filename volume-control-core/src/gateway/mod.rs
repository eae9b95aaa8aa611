//! Gateway implementations that live in the core crate.
//!
//! The Windows backend is in `volume-control-windows`.

pub mod bounded;
pub mod mock;

pub use bounded::BoundedGateway;
pub use mock::MockGateway;
