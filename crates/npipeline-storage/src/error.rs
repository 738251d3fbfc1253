//! The storage-provider error taxonomy (spec §4.7): a closed set a
//! connector node can match on regardless of which backend raised it.

/// Errors a [`crate::StorageProvider`] operation can fail with.
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    /// The addressed location does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller presented no credentials, or invalid ones.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The caller is authenticated but lacks permission for this operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The operation would violate a precondition the backend enforces
    /// (e.g. a conditional put against a location that already changed).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A transient failure (timeout, connection reset, throttling) a
    /// caller may retry, distinct from the other variants which are not
    /// expected to succeed on their own if retried unchanged.
    #[error("transient I/O failure: {0}")]
    TransientIO(String),

    /// Any backend-specific failure that does not map cleanly onto the
    /// other variants; `detail` carries the backend's own message.
    #[error("provider error: {0}")]
    ProviderError(String),
}

impl Error {
    /// True for [`Error::TransientIO`], the only variant this crate
    /// considers safe to retry without caller-side changes.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::TransientIO(_))
    }
}
