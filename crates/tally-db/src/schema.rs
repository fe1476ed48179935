//! Schema definitions and migration runner for SurrealDB.
//!
//! All tables are SCHEMAFULL. Record ids are UUID strings; the
//! permission graph is stored as relation tables between them.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct AppliedVersion {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "permission_graph",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1: identities and the permission graph
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Identities
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD name ON TABLE user TYPE string;
DEFINE FIELD second_name ON TABLE user TYPE string;
DEFINE FIELD patronymic ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD last_login ON TABLE user TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;

-- =======================================================================
-- Resources (one per registered route)
-- =======================================================================
DEFINE TABLE resource SCHEMAFULL;
DEFINE FIELD resource_key ON TABLE resource TYPE string;
DEFINE FIELD created_at ON TABLE resource TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_resource_key ON TABLE resource \
    COLUMNS resource_key UNIQUE;

-- =======================================================================
-- Roles and groups
-- =======================================================================
DEFINE TABLE role SCHEMAFULL;
DEFINE FIELD name ON TABLE role TYPE string;
DEFINE FIELD created_at ON TABLE role TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_role_name ON TABLE role COLUMNS name UNIQUE;

DEFINE TABLE access_group SCHEMAFULL;
DEFINE FIELD name ON TABLE access_group TYPE string;
DEFINE FIELD created_at ON TABLE access_group TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_access_group_name ON TABLE access_group \
    COLUMNS name UNIQUE;

-- =======================================================================
-- Last applied admin role/group names
-- =======================================================================
DEFINE TABLE admin_binding SCHEMAFULL;
DEFINE FIELD role_name ON TABLE admin_binding TYPE string;
DEFINE FIELD group_name ON TABLE admin_binding TYPE string;
DEFINE FIELD version ON TABLE admin_binding TYPE int;

-- =======================================================================
-- Graph Edge Tables (relations)
-- =======================================================================

-- User -> Role membership
DEFINE TABLE member_of TYPE RELATION SCHEMAFULL;
DEFINE INDEX idx_member_of_pair ON TABLE member_of COLUMNS in, out UNIQUE;

-- Group -> Role association
DEFINE TABLE has_role TYPE RELATION SCHEMAFULL;
DEFINE INDEX idx_has_role_pair ON TABLE has_role COLUMNS in, out UNIQUE;

-- Group -> Resource grant
DEFINE TABLE grants TYPE RELATION SCHEMAFULL;
DEFINE INDEX idx_grants_pair ON TABLE grants COLUMNS in, out UNIQUE;
";

/// Apply every pending migration in version order.
///
/// Safe to call on every start: applied versions are recorded in
/// `_migration` and skipped.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<Vec<u32>, DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let applied: Vec<AppliedVersion> = result.take(0)?;
    let current_version = applied.first().map(|m| m.version).unwrap_or(0);

    let mut newly_applied = Vec::new();
    for migration in MIGRATIONS.iter().filter(|m| m.version > current_version) {
        info!(
            version = migration.version,
            name = migration.name,
            from = current_version,
            "Applying migration"
        );

        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "could not record v{}: {}",
                    migration.version, e,
                ))
            })?;

        newly_applied.push(migration.version);
    }

    if newly_applied.is_empty() {
        info!(version = current_version, "Schema is up to date");
    } else {
        info!(applied = ?newly_applied, "Migrations applied");
    }

    Ok(newly_applied)
}

/// Latest schema version known to this build.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}
