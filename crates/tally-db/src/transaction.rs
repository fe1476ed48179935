//! Write batches applied as a single SurrealDB transaction.

use surrealdb::{Connection, Surreal};
use tracing::debug;

use crate::error::DbError;

/// Statements staged for one atomic commit.
///
/// Free-text values are bound as parameters through [`Transaction::bind`];
/// record ids are formatted from [`uuid::Uuid`] values only.
#[derive(Debug, Default)]
pub struct Transaction {
    statements: Vec<String>,
    params: Vec<(String, String)>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a string parameter and return its `$name` placeholder.
    pub fn bind(&mut self, value: impl Into<String>) -> String {
        let name = format!("p{}", self.params.len());
        let placeholder = format!("${name}");
        self.params.push((name, value.into()));
        placeholder
    }

    pub fn push(&mut self, statement: impl Into<String>) {
        self.statements.push(statement.into());
    }

    /// Number of staged write statements.
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    fn render(&self) -> String {
        let mut sql = String::from("BEGIN TRANSACTION;\n");
        for statement in &self.statements {
            sql.push_str(statement);
            sql.push_str(";\n");
        }
        sql.push_str("COMMIT TRANSACTION;");
        sql
    }

    /// Send every staged statement in one transaction.
    ///
    /// A failing statement cancels the whole batch. An empty batch never
    /// reaches the database.
    pub async fn commit<C: Connection>(self, db: &Surreal<C>) -> Result<usize, DbError> {
        if self.is_empty() {
            return Ok(0);
        }

        let writes = self.statements.len();
        let sql = self.render();
        debug!(writes, "committing transaction");

        let mut query = db.query(sql);
        for binding in self.params {
            query = query.bind(binding);
        }

        let mut response = query.await.map_err(DbError::from)?;
        let mut errors: Vec<_> = response.take_errors().into_iter().collect();
        if !errors.is_empty() {
            errors.sort_by_key(|(index, _)| *index);
            return Err(DbError::from_batch(
                errors.into_iter().map(|(_, e)| e).collect(),
            ));
        }

        Ok(writes)
    }
}
