//! Loaded milestone set
//!
//! Shared read-mostly registry. Reads are concurrent; replacement happens on
//! reload.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::milestone::{Milestone, MilestoneId};

#[derive(Debug, Default)]
struct RegistryInner {
    by_id: HashMap<MilestoneId, Arc<Milestone>>,
    order: Vec<MilestoneId>,
}

/// Registry of loaded milestones, iterated in load order
#[derive(Debug, Default)]
pub struct MilestoneRegistry {
    inner: RwLock<RegistryInner>,
}

impl MilestoneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from an initial set
    pub fn from_milestones(milestones: impl IntoIterator<Item = Milestone>) -> Self {
        let registry = Self::new();
        registry.replace_all(milestones);
        registry
    }

    /// Register a milestone. Re-registering an id replaces it in place.
    pub fn register(&self, milestone: Milestone) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let id = milestone.id.clone();
        if inner.by_id.insert(id.clone(), Arc::new(milestone)).is_none() {
            inner.order.push(id);
        }
    }

    /// Swap the whole set
    pub fn replace_all(&self, milestones: impl IntoIterator<Item = Milestone>) {
        let mut fresh = RegistryInner::default();
        for milestone in milestones {
            let id = milestone.id.clone();
            if fresh.by_id.insert(id.clone(), Arc::new(milestone)).is_none() {
                fresh.order.push(id);
            }
        }
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = fresh;
    }

    pub fn get(&self, id: &str) -> Option<Arc<Milestone>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_id
            .get(id)
            .cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_id
            .contains_key(id)
    }

    /// All milestones in load order
    pub fn all(&self) -> Vec<Arc<Milestone>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .order
            .iter()
            .filter_map(|id| inner.by_id.get(id).cloned())
            .collect()
    }

    /// Display titles of every loaded milestone
    pub fn titles(&self) -> Vec<String> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .by_id
            .values()
            .map(|m| m.display.title.clone())
            .filter(|t| !t.is_empty())
            .collect()
    }

    pub fn clear(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = RegistryInner::default();
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .order
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::milestone::MilestoneKind;

    fn milestone(id: &str, title: &str) -> Milestone {
        Milestone::new(id, MilestoneKind::OneTime, title)
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = MilestoneRegistry::new();
        registry.register(milestone("first_login", "Welcome"));

        assert!(registry.contains("first_login"));
        assert_eq!(registry.get("first_login").map(|m| m.display.title.clone()), Some("Welcome".to_string()));
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_reregister_keeps_position() {
        let registry = MilestoneRegistry::new();
        registry.register(milestone("a", "A"));
        registry.register(milestone("b", "B"));
        registry.register(milestone("a", "A2"));

        let ids: Vec<_> = registry.all().iter().map(|m| m.id.to_string()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(registry.get("a").map(|m| m.display.title.clone()), Some("A2".to_string()));
    }

    #[test]
    fn test_replace_all_and_clear() {
        let registry = MilestoneRegistry::from_milestones(vec![milestone("a", "A")]);
        registry.replace_all(vec![milestone("x", "X"), milestone("y", "Y")]);
        assert_eq!(registry.len(), 2);
        assert!(!registry.contains("a"));

        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_titles_skip_empty() {
        let registry = MilestoneRegistry::from_milestones(vec![milestone("a", "Alpha"), milestone("b", "")]);
        assert_eq!(registry.titles(), vec!["Alpha".to_string()]);
    }
}
