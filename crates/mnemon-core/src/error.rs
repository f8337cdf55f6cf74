//! Core error types shared across the engine.

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Engine error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Caller input violates a limit or enumeration
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Referenced insight is missing or soft-deleted
    #[error("Insight not found: {0}")]
    NotFound(String),
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Initialization error
    #[error("Initialization error: {0}")]
    Init(String),
}

impl StoreError {
    /// Stable machine-readable kind for the command surface
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::InvalidInput(_) => "invalid_input",
            StoreError::NotFound(_) => "not_found",
            StoreError::Database(_) => "storage",
            StoreError::Io(_) => "storage",
            StoreError::Init(_) => "storage",
        }
    }
}

/// Engine result type
pub type Result<T> = std::result::Result<T, StoreError>;
