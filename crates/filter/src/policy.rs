//! Filter policy - which advancement keys are hidden from clients

use std::collections::HashSet;

use shared::{AdvancementSettings, FilterMode, NamespacedKey, DEFAULT_NAMESPACE, VANILLA_NAMESPACE};

/// Immutable policy snapshot
///
/// Blocked ids containing `*`, `?` or `[` are glob patterns over the full
/// `namespace:key`.
#[derive(Debug, Clone, Default)]
pub struct FilterPolicy {
    mode: FilterMode,
    blocked_namespaces: HashSet<String>,
    blocked_ids: HashSet<String>,
    id_patterns: Vec<glob::Pattern>,
}

impl FilterPolicy {
    /// Create a new policy
    pub fn new(mode: FilterMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn from_settings(settings: &AdvancementSettings) -> Self {
        Self::new(settings.mode)
            .with_namespaces(settings.block_namespaces.iter().cloned())
            .with_ids(settings.block_ids.iter().cloned())
    }

    /// Builder: block these namespaces
    pub fn with_namespaces(mut self, namespaces: impl IntoIterator<Item = String>) -> Self {
        self.blocked_namespaces
            .extend(namespaces.into_iter().map(|n| n.trim().to_string()).filter(|n| !n.is_empty()));
        self
    }

    /// Builder: block these ids or id patterns
    pub fn with_ids(mut self, ids: impl IntoIterator<Item = String>) -> Self {
        for id in ids {
            let id = id.trim().to_string();
            if id.is_empty() {
                continue;
            }
            if id.contains(['*', '?', '[']) {
                match glob::Pattern::new(&id) {
                    Ok(pattern) => {
                        self.id_patterns.push(pattern);
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!(pattern = %id, error = %e, "Invalid block-id pattern, matching literally");
                    }
                }
            }
            self.blocked_ids.insert(id);
        }
        self
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    /// Whether the filter does anything at all
    pub fn is_enabled(&self) -> bool {
        self.mode != FilterMode::VanillaOnly
    }

    pub fn blocked_namespaces(&self) -> impl Iterator<Item = &str> {
        self.blocked_namespaces.iter().map(String::as_str)
    }

    pub fn blocks_namespace(&self, namespace: &str) -> bool {
        self.blocked_namespaces.contains(namespace)
    }

    pub fn blocked_ids(&self) -> impl Iterator<Item = &str> {
        self.blocked_ids.iter().map(String::as_str)
    }

    /// Decide for one `namespace:key`; bare keys are host-native
    ///
    /// This system's own namespace is never blocked.
    pub fn should_block(&self, key: &str) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let parsed = NamespacedKey::parse_or(key, VANILLA_NAMESPACE);
        if parsed.namespace == DEFAULT_NAMESPACE {
            return false;
        }
        self.mode == FilterMode::DisableVanilla
            || self.blocked_namespaces.contains(&parsed.namespace)
            || self.blocked_ids.contains(key)
            || self.id_patterns.iter().any(|p| p.matches(key))
    }
}
