//! Deterministic set difference used by every reconciliation path.

use std::collections::BTreeSet;

/// What has to change to turn `current` into `desired`.
///
/// Both vectors come out in ascending order, so applying a diff is
/// reproducible run to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetDiff<T> {
    pub to_add: Vec<T>,
    pub to_remove: Vec<T>,
}

impl<T: Ord + Clone> SetDiff<T> {
    pub fn between(current: &BTreeSet<T>, desired: &BTreeSet<T>) -> Self {
        Self {
            to_add: desired.difference(current).cloned().collect(),
            to_remove: current.difference(desired).cloned().collect(),
        }
    }
}

impl<T> SetDiff<T> {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    pub fn len(&self) -> usize {
        self.to_add.len() + self.to_remove.len()
    }
}

impl<T> Default for SetDiff<T> {
    fn default() -> Self {
        Self {
            to_add: Vec::new(),
            to_remove: Vec::new(),
        }
    }
}
