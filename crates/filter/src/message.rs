//! Outbound message model
//!
//! The network layer decodes the two message types the filter cares
//! about into these shapes and re-encodes them afterwards.

use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::error::FilterError;

/// Per-entry progress payload, keyed by entry id
pub type ProgressMap = BTreeMap<String, Value>;

/// One entry in a sequence-shaped `added` payload
#[derive(Debug, Clone, PartialEq)]
pub enum AddedEntry {
    /// Entry with a typed id accessor
    Holder { id: String, definition: Value },
    /// Entry only available as the host's text rendering
    Opaque(String),
}

impl AddedEntry {
    pub fn holder(id: impl Into<String>, definition: Value) -> Self {
        AddedEntry::Holder {
            id: id.into(),
            definition,
        }
    }

    /// Entry id, read from the accessor or parsed from the text rendering
    pub fn id(&self) -> Result<String, FilterError> {
        match self {
            AddedEntry::Holder { id, .. } => Ok(id.clone()),
            AddedEntry::Opaque(text) => parse_opaque_id(text),
        }
    }
}

fn holder_id_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"id=([^,\]\s]+)").ok())
        .as_ref()
}

/// `AdvancementHolder[id=minecraft:story/root, ...]` → `minecraft:story/root`;
/// any other non-empty text is taken as the id itself
fn parse_opaque_id(text: &str) -> Result<String, FilterError> {
    let text = text.trim();
    if text.starts_with("AdvancementHolder") {
        return holder_id_pattern()
            .and_then(|re| re.captures(text))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| FilterError::UnreadableEntry(text.to_string()));
    }
    if text.is_empty() {
        return Err(FilterError::UnreadableEntry(String::new()));
    }
    Ok(text.to_string())
}

/// The `added` payload of a bulk advancement message
#[derive(Debug, Clone, PartialEq)]
pub enum AddedEntries {
    Sequence(Vec<AddedEntry>),
    Keyed(BTreeMap<String, Value>),
}

impl AddedEntries {
    pub fn len(&self) -> usize {
        match self {
            AddedEntries::Sequence(entries) => entries.len(),
            AddedEntries::Keyed(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entry ids in payload order
    pub fn ids(&self) -> Result<Vec<String>, FilterError> {
        match self {
            AddedEntries::Sequence(entries) => entries.iter().map(AddedEntry::id).collect(),
            AddedEntries::Keyed(entries) => Ok(entries.keys().cloned().collect()),
        }
    }
}

/// Bulk advancement update
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AdvancementsMessage {
    pub reset: bool,
    pub added: Option<AddedEntries>,
    pub removed: Vec<String>,
    pub progress: Option<ProgressMap>,
}

/// Server-to-client chat line, as serialized rich text
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SystemChatMessage {
    pub content: Option<String>,
    pub overlay: bool,
}

impl SystemChatMessage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            overlay: false,
        }
    }
}

/// Anything the network layer hands to the filter
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    Advancements(AdvancementsMessage),
    SystemChat(SystemChatMessage),
    Other,
}
