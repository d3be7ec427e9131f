use thiserror::Error;

/// Main error type for the content graph store
#[derive(Error, Debug)]
pub enum ContentGraphError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors for stored columns and exports
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Canonical id parse errors
    #[error("Invalid canonical id: {0}")]
    InvalidId(String),

    /// Entity or predicate required by an operation is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Ordered entity-type pair has no relationship classification
    #[error("Unsupported relationship: {0}")]
    UnsupportedRelationship(String),

    /// Structural validation failures on create/update input
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Convenient Result type using ContentGraphError
pub type Result<T> = std::result::Result<T, ContentGraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ContentGraphError::Config("Test error".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_error_from_rusqlite() {
        let rusqlite_err = rusqlite::Error::InvalidQuery;
        let err: ContentGraphError = rusqlite_err.into();
        assert!(matches!(err, ContentGraphError::Database(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ContentGraphError = io_err.into();
        assert!(matches!(err, ContentGraphError::Io(_)));
    }

    #[test]
    fn test_unsupported_relationship_display() {
        let err = ContentGraphError::UnsupportedRelationship("topic -> concept".to_string());
        assert!(err.to_string().contains("Unsupported relationship"));
        assert!(err.to_string().contains("topic -> concept"));
    }
}
