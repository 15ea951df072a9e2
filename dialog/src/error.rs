use thiserror::Error;

#[derive(Debug, Error)]
pub enum DialogError {
    #[error("message {id} not found")]
    NotFound { id: String },

    #[error("message {id} has children; use recursive delete")]
    HasChildren { id: String },

    #[error("save_dialog verification failed: message {id} has parent {actual:?}, expected {expected:?}")]
    ParentChainMismatch {
        id: String,
        expected: Option<String>,
        actual: Option<String>,
    },

    #[error("exhausted 10 id-generation attempts without finding a free id")]
    IdExhausted,

    #[error("message {id} is orphaned: parent {parent_id} is missing")]
    OrphanedMessage { id: String, parent_id: String },

    #[error("corrupted data in message {id}: {reason}")]
    CorruptedData { id: String, reason: String },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}
