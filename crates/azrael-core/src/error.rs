//! Error taxonomy shared by the object store, command queues, and force grid
//! (§7).

/// Errors surfaced by `azrael-core` operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    /// Id or name absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// Spawn collision with a state that differs from the existing one.
    #[error("duplicate object with divergent state: {0}")]
    Duplicate(String),

    /// Dimensional or range validation failure.
    #[error("bad params: {0}")]
    BadParams(String),
}
