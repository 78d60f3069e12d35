use crate::view::ViewError;

/// The main error type for Vitrine
#[derive(Debug, thiserror::Error)]
pub enum VitrineError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("View error: {0}")]
    View(#[from] ViewError),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl VitrineError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, VitrineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(VitrineError::bad_request("x").to_string(), "Bad request: x");
        assert_eq!(
            VitrineError::service_unavailable("tenant store").to_string(),
            "Service unavailable: tenant store"
        );
        assert_eq!(VitrineError::internal("no source").to_string(), "Internal error: no source");
    }

    #[test]
    fn test_view_error_converts() {
        let err: VitrineError = ViewError::NodeNotFound(crate::view::NodeId(7)).into();
        assert!(matches!(err, VitrineError::View(_)));
        assert!(err.to_string().contains("#7"));
    }

    #[test]
    fn test_anyhow_is_transparent() {
        let err = VitrineError::from(anyhow::anyhow!("boom"));
        assert_eq!(err.to_string(), "boom");
    }
}
