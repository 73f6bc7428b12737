//! Milestone id to host key map for the current registration

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use shared::{MilestoneId, NamespacedKey};

/// Entries this system registered with the host
///
/// Replaced wholesale at the end of every registration pass.
#[derive(Debug, Default)]
pub struct RegistrationMap {
    inner: RwLock<HashMap<MilestoneId, NamespacedKey>>,
}

impl RegistrationMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<NamespacedKey> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Snapshot of every registration
    pub fn entries(&self) -> Vec<(MilestoneId, NamespacedKey)> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, key)| (id.clone(), key.clone()))
            .collect()
    }

    pub fn keys(&self) -> Vec<NamespacedKey> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    pub fn replace(&self, fresh: HashMap<MilestoneId, NamespacedKey>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = fresh;
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
