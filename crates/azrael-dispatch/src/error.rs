//! Errors surfaced by the work-package registry and dispatch transport (§7).

/// Errors surfaced by `azrael-dispatch` operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DispatchError {
    /// No package exists with the given id, or it was never created.
    #[error("no such work package: {0}")]
    Unknown(String),

    /// `create` was called with an empty id list.
    #[error("bad params: {0}")]
    BadParams(String),

    /// The token echoed at commit does not match the one recorded at
    /// creation (§4.5, P4).
    #[error("stale or wrong token on commit for package {0}")]
    BadToken(String),

    /// A second commit raced a first and lost (§4.5, S6).
    #[error("work package {0} was already committed")]
    AlreadyCommitted(String),

    /// Send/receive on the dispatch transport failed (§7).
    #[error("dispatch transport error: {0}")]
    Transport(String),
}
