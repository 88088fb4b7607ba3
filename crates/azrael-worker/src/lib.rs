//! The worker contract (C7, §4.7): pulls work packages, integrates one
//! island per tick, and commits results back to the registry.

pub mod error;
pub mod integrator;
pub mod worker;

pub use error::WorkerError;
pub use integrator::{Integrator, IntegratorError, StubEulerIntegrator};
pub use worker::Worker;
