//! Keeps the persisted resource set equal to the routes the server serves.

use std::collections::{BTreeMap, BTreeSet};

use tally_core::diff::SetDiff;
use tally_core::error::TallyResult;
use tally_core::repository::PermissionStore;
use tracing::info;

/// What one reconciliation changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: Vec<String>,
    pub removed: Vec<String>,
    pub writes: usize,
}

pub struct ResourceRegistry<S> {
    store: S,
}

impl<S: PermissionStore> ResourceRegistry<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Create resources for new live keys and delete resources whose key is
    /// no longer served, in one transaction.
    ///
    /// Meant for the startup path only; concurrent calls are not
    /// coordinated.
    pub async fn reconcile(&self, live: &BTreeSet<String>) -> TallyResult<ReconcileReport> {
        let persisted: BTreeMap<String, uuid::Uuid> = self
            .store
            .list_resources()
            .await?
            .into_iter()
            .map(|r| (r.key, r.id))
            .collect();
        let current: BTreeSet<String> = persisted.keys().cloned().collect();

        let diff = SetDiff::between(&current, live);
        if diff.is_empty() {
            info!(resources = live.len(), "resource registry up to date");
            return Ok(ReconcileReport::default());
        }

        let stale: Vec<uuid::Uuid> = diff
            .to_remove
            .iter()
            .filter_map(|key| persisted.get(key).copied())
            .collect();

        let mut tx = self.store.begin();
        self.store.stage_create_resources(&mut tx, &diff.to_add);
        self.store.stage_delete_resources(&mut tx, &stale);
        let writes = self.store.commit(tx).await?;

        info!(
            created = diff.to_add.len(),
            removed = diff.to_remove.len(),
            writes,
            "resources reconciled"
        );
        Ok(ReconcileReport {
            created: diff.to_add,
            removed: diff.to_remove,
            writes,
        })
    }
}
