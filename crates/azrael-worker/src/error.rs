//! Errors surfaced by the worker pull loop (§7).

/// Errors surfaced by `azrael-worker` operations.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// The dispatch transport failed to deliver or accept a package id.
    #[error("transport error: {0}")]
    Transport(#[from] azrael_dispatch::DispatchError),

    /// The integrator failed for one or more objects in a package. Per
    /// §4.7, this is handled by committing the input state unchanged for
    /// the affected ids rather than propagated out of `run_once`; the
    /// variant exists so failures are still observable via logging.
    #[error("integrator error: {0}")]
    Integrator(String),
}
