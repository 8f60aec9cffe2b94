use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// No object exists at the key.
    #[error("object not found: {0}")]
    NotFound(String),

    /// Reserved for overwrite prevention. Writes currently always overwrite.
    #[error("object already exists in backing store: {0}")]
    AlreadyExists(String),

    /// Operation unsupported by this backend.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    /// Missing or invalid settings.
    #[error("configuration error: {0}")]
    Config(String),

    /// Key resolves outside the store root.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Filesystem or remote-service failure.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: BoxError,
    },
}

impl StoreError {
    pub fn io(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Io {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_keeps_context_and_source() {
        let err = StoreError::io(
            "failed to read: /tmp/x",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "failed to read: /tmp/x: denied");
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_not_found());
    }

    #[test]
    fn not_found_is_detected() {
        assert!(StoreError::NotFound("a/b".into()).is_not_found());
    }
}
