//! Outbound Filter - rewrites advancement traffic before it reaches a client
//!
//! Two message kinds are inspected:
//!
//! - bulk advancement updates: blocked entries are dropped from the
//!   `added` payload (hides them in the advancement screen) and from the
//!   `progress` payload (suppresses their toasts)
//! - system chat lines carrying an advancement announcement
//!
//! A message the filter cannot fully read is passed through untouched.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

use serde_json::Value;
use shared::{FilterMode, NamespacedKey, VANILLA_NAMESPACE};

use crate::error::FilterError;
use crate::message::{AddedEntries, AddedEntry, AdvancementsMessage, OutboundMessage, ProgressMap, SystemChatMessage};
use crate::policy::FilterPolicy;

/// Translation key marking an advancement announcement in chat
pub const ADVANCEMENT_CHAT_MARKER: &str = "chat.type.advancement";

/// With debug on, every Nth advancement message has its keys logged
const TRACE_SAMPLE_EVERY: u64 = 100;

/// Everything one message is judged against
///
/// Built off the send path and never mutated after publication.
#[derive(Debug, Clone, Default)]
pub struct FilterView {
    policy: FilterPolicy,
    /// `namespace:key` of every entry this system registered
    owned: HashSet<String>,
    /// Titles of loaded milestones, used to recognise own announcements
    titles: Vec<String>,
    debug: bool,
}

impl FilterView {
    pub fn new(policy: FilterPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Builder: entries registered by this system, any namespace
    pub fn with_owned(mut self, keys: impl IntoIterator<Item = NamespacedKey>) -> Self {
        self.owned = keys.into_iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn with_titles(mut self, titles: impl IntoIterator<Item = String>) -> Self {
        self.titles = titles.into_iter().filter(|t| !t.is_empty()).collect();
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn policy(&self) -> &FilterPolicy {
        &self.policy
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Whether `key` belongs to an entry this system registered; bare
    /// keys are host-native
    pub fn is_owned(&self, key: &str) -> bool {
        if key.contains(':') {
            self.owned.contains(key)
        } else {
            self.owned.contains(format!("{VANILLA_NAMESPACE}:{key}").as_str())
        }
    }

    pub fn owned_count(&self) -> usize {
        self.owned.len()
    }

    /// Owned entries are never blocked; everything else follows the policy
    pub fn should_block(&self, key: &str) -> bool {
        !self.is_owned(key) && self.policy.should_block(key)
    }

    fn announces_own(&self, json: &str) -> bool {
        self.titles.iter().any(|title| json.contains(title.as_str()))
    }
}

/// What the network layer should do with the message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVerdict {
    /// Deliver as is
    Pass,
    /// Deliver the rewritten message
    Rewritten { removed: usize },
    /// Drop the message
    Cancel,
}

/// Counters since startup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub inspected: u64,
    pub entries_removed: u64,
    pub chats_cancelled: u64,
    pub errors: u64,
}

#[derive(Debug, Default)]
struct Counters {
    inspected: AtomicU64,
    entries_removed: AtomicU64,
    chats_cancelled: AtomicU64,
    errors: AtomicU64,
}

/// Outbound Filter
///
/// Called from network threads. The main context publishes a fresh
/// [`FilterView`] on reload and after registration; each message takes
/// one snapshot up front and is judged against it alone.
pub struct OutboundFilter {
    view: watch::Sender<Arc<FilterView>>,
    counters: Counters,
}

impl OutboundFilter {
    pub fn new(view: FilterView) -> Self {
        let (view, _) = watch::channel(Arc::new(view));
        Self {
            view,
            counters: Counters::default(),
        }
    }

    /// Filter with a policy and no owned entries
    pub fn with_policy(policy: FilterPolicy) -> Self {
        Self::new(FilterView::new(policy))
    }

    /// Install a new policy, keeping the owned entries; later messages see it
    pub fn update_policy(&self, policy: FilterPolicy, debug_enabled: bool) {
        info!(mode = ?policy.mode(), debug = debug_enabled, "Outbound filter policy updated");
        let current = self.view();
        self.publish(FilterView {
            policy,
            debug: debug_enabled,
            ..(*current).clone()
        });
    }

    /// Replace the set of entries this system owns, keeping the policy
    pub fn update_owned(&self, keys: impl IntoIterator<Item = NamespacedKey>, titles: impl IntoIterator<Item = String>) {
        let current = self.view();
        let view = FilterView {
            policy: current.policy.clone(),
            debug: current.debug,
            ..FilterView::default()
        }
        .with_owned(keys)
        .with_titles(titles);
        debug!(owned = view.owned_count(), "Outbound filter owned entries updated");
        self.publish(view);
    }

    /// Swap in a whole view
    pub fn publish(&self, view: FilterView) {
        self.view.send_replace(Arc::new(view));
    }

    /// Current snapshot
    pub fn view(&self) -> Arc<FilterView> {
        self.view.borrow().clone()
    }

    /// Current policy
    pub fn policy(&self) -> FilterPolicy {
        self.view().policy.clone()
    }

    pub fn stats(&self) -> FilterStats {
        FilterStats {
            inspected: self.counters.inspected.load(Ordering::Relaxed),
            entries_removed: self.counters.entries_removed.load(Ordering::Relaxed),
            chats_cancelled: self.counters.chats_cancelled.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
        }
    }

    /// Decide for one key under the current view
    pub fn should_block(&self, key: &str) -> bool {
        self.view().should_block(key)
    }

    /// Inspect one outbound message, rewriting it in place when needed
    pub fn on_outbound(&self, message: &mut OutboundMessage) -> FilterVerdict {
        let view = self.view();
        if !view.policy.is_enabled() {
            return FilterVerdict::Pass;
        }
        match message {
            OutboundMessage::Advancements(msg) => {
                let seen = self.counters.inspected.fetch_add(1, Ordering::Relaxed);
                if view.debug && seen % TRACE_SAMPLE_EVERY == 0 {
                    if let Some(Ok(ids)) = msg.added.as_ref().map(AddedEntries::ids) {
                        debug!(seen, keys = ?ids, "Sampled advancement keys");
                    }
                }
                match filter_advancements(&view, msg) {
                    Ok(0) => FilterVerdict::Pass,
                    Ok(removed) => {
                        self.counters.entries_removed.fetch_add(removed as u64, Ordering::Relaxed);
                        FilterVerdict::Rewritten { removed }
                    }
                    Err(e) => {
                        self.counters.errors.fetch_add(1, Ordering::Relaxed);
                        if view.debug {
                            debug!(error = %e, "Passing unreadable advancement message through");
                        }
                        FilterVerdict::Pass
                    }
                }
            }
            OutboundMessage::SystemChat(msg) => {
                self.counters.inspected.fetch_add(1, Ordering::Relaxed);
                if should_cancel_chat(&view, msg) {
                    self.counters.chats_cancelled.fetch_add(1, Ordering::Relaxed);
                    if view.debug {
                        debug!(content = msg.content.as_deref().unwrap_or_default(), "Blocked advancement chat");
                    }
                    FilterVerdict::Cancel
                } else {
                    FilterVerdict::Pass
                }
            }
            OutboundMessage::Other => FilterVerdict::Pass,
        }
    }
}

/// Both payloads are filtered into copies first; the message is only
/// written once every id has been read.
fn filter_advancements(view: &FilterView, msg: &mut AdvancementsMessage) -> Result<usize, FilterError> {
    let added = match &msg.added {
        Some(added) if !added.is_empty() => filter_added(view, added)?,
        _ => None,
    };
    let progress = match &msg.progress {
        Some(progress) if !progress.is_empty() => filter_keyed(view, progress),
        _ => None,
    };

    let mut removed = 0;
    if let Some((entries, count)) = added {
        if view.debug {
            debug!(count, "Filtered advancements from added payload");
        }
        msg.added = Some(entries);
        removed += count;
    }
    if let Some((entries, count)) = progress {
        if view.debug {
            debug!(count, "Filtered advancements from progress payload");
        }
        msg.progress = Some(entries);
        removed += count;
    }
    Ok(removed)
}

/// `None` when nothing would be removed
fn filter_added(view: &FilterView, added: &AddedEntries) -> Result<Option<(AddedEntries, usize)>, FilterError> {
    match added {
        AddedEntries::Sequence(entries) => {
            let mut kept: Vec<AddedEntry> = Vec::with_capacity(entries.len());
            for entry in entries {
                if !view.should_block(&entry.id()?) {
                    kept.push(entry.clone());
                }
            }
            let removed = entries.len() - kept.len();
            Ok((removed > 0).then_some((AddedEntries::Sequence(kept), removed)))
        }
        AddedEntries::Keyed(entries) => Ok(filter_keyed(view, entries).map(|(kept, n)| (AddedEntries::Keyed(kept), n))),
    }
}

/// Keys are judged as sent, malformed or not
fn filter_keyed(view: &FilterView, entries: &BTreeMap<String, Value>) -> Option<(ProgressMap, usize)> {
    let kept: ProgressMap = entries
        .iter()
        .filter(|(key, _)| !view.should_block(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    let removed = entries.len() - kept.len();
    (removed > 0).then_some((kept, removed))
}

fn should_cancel_chat(view: &FilterView, msg: &SystemChatMessage) -> bool {
    let Some(json) = msg.content.as_deref() else {
        return false;
    };
    if !json.contains(ADVANCEMENT_CHAT_MARKER) || view.announces_own(json) {
        return false;
    }

    let policy = &view.policy;
    match policy.mode() {
        FilterMode::DisableVanilla => true,
        FilterMode::Hybrid => {
            if policy.blocks_namespace(VANILLA_NAMESPACE) && json.contains("\"translate\":\"advancements.") {
                return true;
            }
            policy.blocked_namespaces().any(|ns| {
                json.contains(&format!("advancements.{ns}.")) || json.contains(&format!("\"minecraft:{ns}/"))
            }) || policy.blocked_ids().any(|id| json.contains(&format!("\"{id}\"")))
        }
        FilterMode::VanillaOnly => false,
    }
}
