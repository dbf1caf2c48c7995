use carpool_core::{ConflictKind, CoreError};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("corrupt row: {0}")]
    CorruptRow(String),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        CoreError::Internal(err.to_string())
    }
}

/// Name of the unique constraint a failed write tripped over, if that is what happened.
pub(crate) fn unique_violation(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            Some(db.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    }
}

/// Maps a failed insert to a conflict when a known unique constraint fired.
pub(crate) fn map_insert_error(
    err: sqlx::Error,
    conflict: impl FnOnce(&str) -> Option<ConflictKind>,
) -> CoreError {
    if let Some(constraint) = unique_violation(&err) {
        if let Some(kind) = conflict(&constraint) {
            return CoreError::Conflict(kind);
        }
    }
    StoreError::from(err).into()
}
