use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdrecError {
    #[error("{reason}")]
    InvalidRequest { reason: String },

    #[error("Identity invariant violated: {detail}")]
    InvariantViolation { detail: String },

    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Contact {id} is primary for {count} active contact(s)")]
    HasLinkedContacts { id: i64, count: usize },

    #[error("Invalid persisted data: {0}")]
    InvalidData(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Logging error: {0}")]
    Logging(String),

    #[error("Contact store lock poisoned")]
    LockPoisoned,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type IdrecResult<T> = Result<T, IdrecError>;
