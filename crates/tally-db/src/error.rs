//! Database-specific error types and conversions.

use tally_core::error::TallyError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Unique constraint violated on {entity}")]
    Conflict { entity: String },

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },
}

impl DbError {
    /// Classify an error reported by `Response::check`.
    ///
    /// Unique index violations carry the index name; those become
    /// [`DbError::Conflict`] so callers can answer with a conflict
    /// instead of a generic failure.
    pub(crate) fn from_statement(err: surrealdb::Error) -> Self {
        let message = err.to_string();
        if message.contains("already contains") {
            let entity = unique_index_entity(&message).unwrap_or("record").to_string();
            return Self::Conflict { entity };
        }
        Self::Query(message)
    }

    /// Pick the error that explains a cancelled transaction.
    ///
    /// Every statement of a failed transaction reports an error; only one
    /// of them is the cause, the others only say the batch was not run.
    pub(crate) fn from_batch(errors: Vec<surrealdb::Error>) -> Self {
        let mut classified: Vec<Self> = errors.into_iter().map(Self::from_statement).collect();
        if classified.is_empty() {
            return Self::Query("transaction failed".into());
        }
        let cause = classified
            .iter()
            .position(|e| matches!(e, Self::Conflict { .. }))
            .or_else(|| {
                classified
                    .iter()
                    .position(|e| !e.to_string().contains("failed transaction"))
            })
            .unwrap_or(0);
        classified.swap_remove(cause)
    }
}

fn unique_index_entity(message: &str) -> Option<&'static str> {
    [
        ("idx_user_email", "user"),
        ("idx_resource_key", "resource"),
        ("idx_role_name", "role"),
        ("idx_access_group_name", "group"),
        ("idx_member_of_pair", "role member"),
        ("idx_has_role_pair", "group role"),
        ("idx_grants_pair", "group resource"),
    ]
    .into_iter()
    .find(|(index, _)| message.contains(index))
    .map(|(_, entity)| entity)
}

impl From<DbError> for TallyError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => TallyError::NotFound { entity, id },
            DbError::Conflict { entity } => TallyError::AlreadyExists { entity },
            other => TallyError::Database(other.to_string()),
        }
    }
}
