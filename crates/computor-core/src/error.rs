//! Unified error enumeration for the orchestrator, following the same
//! one-variant-per-failure-mode shape as a typical `thiserror` error
//! type: each variant carries its own message payload, and retryability
//! is a property of the *kind*, not re-derived ad hoc at each call
//! site.

use thiserror::Error;

/// The failure-mode taxonomy from the design's error handling section.
/// Each kind has a fixed retryability; `ComputorError::non_retryable`
/// is the single source of truth activities consult before deciding
/// whether to hand a failure back to the workflow engine's retry
/// policy or surface it immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    DependencyCycle,
    NoMatchingVersion,
    UnknownSlug,
    UnknownTag,
    ProviderTransient,
    ProviderAuth,
    Integrity,
    TimeoutExceeded,
    CancelRequested,
}

impl ErrorKind {
    /// Whether a failure of this kind should ever be retried by an
    /// activity's retry policy.
    pub const fn non_retryable(self) -> bool {
        !matches!(self, ErrorKind::ProviderTransient)
    }
}

#[derive(Error, Debug)]
pub enum ComputorError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("dependency cycle detected: {0}")]
    DependencyCycle(String),

    #[error("no version satisfies constraint: {0}")]
    NoMatchingVersion(String),

    #[error("unknown example slug: {0}")]
    UnknownSlug(String),

    #[error("unknown version tag: {0}")]
    UnknownTag(String),

    #[error("provider transient error: {0}")]
    ProviderTransient(String),

    #[error("provider authorization denied: {0}")]
    ProviderAuth(String),

    #[error("database integrity violation: {0}")]
    Integrity(String),

    #[error("activity timed out: {0}")]
    TimeoutExceeded(String),

    #[error("cancellation requested: {0}")]
    CancelRequested(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ComputorError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            ComputorError::Validation(_) => ErrorKind::Validation,
            ComputorError::NotFound(_) => ErrorKind::NotFound,
            ComputorError::Conflict(_) => ErrorKind::Conflict,
            ComputorError::DependencyCycle(_) => ErrorKind::DependencyCycle,
            ComputorError::NoMatchingVersion(_) => ErrorKind::NoMatchingVersion,
            ComputorError::UnknownSlug(_) => ErrorKind::UnknownSlug,
            ComputorError::UnknownTag(_) => ErrorKind::UnknownTag,
            ComputorError::ProviderTransient(_) => ErrorKind::ProviderTransient,
            ComputorError::ProviderAuth(_) => ErrorKind::ProviderAuth,
            ComputorError::Integrity(_) => ErrorKind::Integrity,
            ComputorError::TimeoutExceeded(_) => ErrorKind::TimeoutExceeded,
            ComputorError::CancelRequested(_) => ErrorKind::CancelRequested,
            // An IO error surfacing this far up is treated as a
            // transient provider/filesystem condition, retried like
            // any other transient failure.
            ComputorError::Io(_) => ErrorKind::ProviderTransient,
        }
    }

    pub fn non_retryable(&self) -> bool {
        self.kind().non_retryable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_transient_is_the_only_retryable_kind() {
        assert!(!ErrorKind::ProviderTransient.non_retryable());
        for kind in [
            ErrorKind::Validation,
            ErrorKind::NotFound,
            ErrorKind::Conflict,
            ErrorKind::DependencyCycle,
            ErrorKind::NoMatchingVersion,
            ErrorKind::UnknownSlug,
            ErrorKind::UnknownTag,
            ErrorKind::ProviderAuth,
            ErrorKind::Integrity,
            ErrorKind::TimeoutExceeded,
            ErrorKind::CancelRequested,
        ] {
            assert!(kind.non_retryable());
        }
    }
}
