//! Milestone definition loading
//!
//! Walks `*.yml` files below the definitions directory. A file inside a
//! subdirectory qualifies its bare ids and parents with the first path
//! segment; root-level files leave them bare.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{InvalidDefinitionError, MilestoneError, Result};
use crate::milestone::{Milestone, MilestoneDisplay, MilestoneId, MilestoneKind};
use crate::trigger::{Trigger, TriggerEvent};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTrigger {
    #[serde(rename = "type")]
    kind: Option<String>,
    value: Option<String>,
    progress: Option<i64>,
    amount: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDefinition {
    #[serde(rename = "type")]
    kind: Option<String>,
    max: Option<i64>,
    parent: Option<String>,
    icon: Option<String>,
    title: Option<String>,
    description: Vec<String>,
    visible: Option<bool>,
    show_toast: Option<bool>,
    announce_to_chat: Option<bool>,
    category: Option<String>,
    trigger: Option<RawTrigger>,
}

/// Loads milestone definitions from a directory tree
#[derive(Debug, Clone)]
pub struct MilestoneLoader {
    root: PathBuf,
}

impl MilestoneLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Definition files, sorted for a stable load order
    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        let pattern = format!("{}/**/*.yml", self.root.display());
        let paths = glob::glob(&pattern).map_err(|e| MilestoneError::Config(e.to_string()))?;

        let mut files = Vec::new();
        for entry in paths {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Skipping unreadable definition path"),
            }
        }
        files.sort();
        Ok(files)
    }

    /// Load every definition file. A broken file is logged and skipped.
    pub fn load_all(&self) -> Result<Vec<Milestone>> {
        if !self.root.exists() {
            tracing::warn!(dir = %self.root.display(), "Milestone directory does not exist");
            return Ok(Vec::new());
        }

        let mut milestones: Vec<Milestone> = Vec::new();
        for file in self.discover()? {
            let namespace = self.default_namespace(&file);
            tracing::info!(
                file = %file.display(),
                namespace = namespace.as_deref().unwrap_or(crate::DEFAULT_NAMESPACE),
                "Loading milestones"
            );
            match load_file(&file, namespace.as_deref()) {
                Ok(loaded) => {
                    for milestone in loaded {
                        if let Some(pos) = milestones.iter().position(|m| m.id == milestone.id) {
                            tracing::warn!(id = %milestone.id, file = %file.display(), "Duplicate milestone id, later definition wins");
                            milestones.remove(pos);
                        }
                        milestones.push(milestone);
                    }
                }
                Err(e) => {
                    tracing::error!(file = %file.display(), error = %e, "Failed to load milestones");
                }
            }
        }
        Ok(milestones)
    }

    /// First directory below the root, if the file is nested
    fn default_namespace(&self, file: &Path) -> Option<String> {
        let relative = file.strip_prefix(&self.root).ok()?;
        let mut components = relative.components();
        let first = components.next()?;
        components.next()?;
        Some(first.as_os_str().to_string_lossy().into_owned())
    }
}

/// Load a single definition file
pub fn load_file(path: &Path, default_namespace: Option<&str>) -> Result<Vec<Milestone>> {
    let content = std::fs::read_to_string(path)?;
    parse_definitions(&content, default_namespace, &path.display().to_string())
}

/// Parse the `milestones:` section of a definition document, in file order
pub fn parse_definitions(
    content: &str,
    default_namespace: Option<&str>,
    source_file: &str,
) -> Result<Vec<Milestone>> {
    let document: serde_yaml::Value = serde_yaml::from_str(content)?;
    let Some(section) = document.get("milestones").and_then(|v| v.as_mapping()) else {
        return Ok(Vec::new());
    };

    let mut milestones = Vec::with_capacity(section.len());
    for (key, value) in section {
        let Some(local_id) = key.as_str() else {
            return Err(InvalidDefinitionError {
                id: format!("{:?}", key),
                source_file: source_file.to_string(),
                reason: "milestone keys must be strings".to_string(),
            }
            .into());
        };
        let raw: RawDefinition = if value.is_null() {
            RawDefinition::default()
        } else {
            serde_yaml::from_value(value.clone()).map_err(|e| InvalidDefinitionError {
                id: local_id.to_string(),
                source_file: source_file.to_string(),
                reason: e.to_string(),
            })?
        };
        milestones.push(build_milestone(local_id, raw, default_namespace));
    }
    Ok(milestones)
}

fn qualify(id: &str, default_namespace: Option<&str>) -> String {
    match default_namespace {
        Some(ns) if !id.contains(':') => format!("{}:{}", ns, id),
        _ => id.to_string(),
    }
}

fn build_milestone(local_id: &str, raw: RawDefinition, default_namespace: Option<&str>) -> Milestone {
    let id = qualify(local_id, default_namespace);
    let parent = raw.parent.as_deref().map(|p| MilestoneId::new(qualify(p, default_namespace)));

    let kind = match raw.kind.as_deref().map(|k| k.trim().to_ascii_uppercase()).as_deref() {
        Some("COUNTER") => {
            let max = raw.max.unwrap_or(1);
            let max = if max <= 0 {
                tracing::warn!(id = %id, max, "Counter max must be positive, using 1");
                1
            } else {
                u32::try_from(max).unwrap_or(u32::MAX)
            };
            MilestoneKind::Counter { max }
        }
        Some("MULTI_CONDITION") => MilestoneKind::MultiCondition,
        Some("HIDDEN") => MilestoneKind::Hidden,
        Some("ONE_TIME") | None => MilestoneKind::OneTime,
        Some(other) => {
            tracing::warn!(id = %id, kind = other, "Unknown milestone type, using ONE_TIME");
            MilestoneKind::OneTime
        }
    };

    let category = raw.category.or_else(|| match id.split_once(':') {
        Some((ns, _)) => Some(ns.to_string()),
        None => default_namespace.map(str::to_string),
    });

    let trigger = raw.trigger.map(|t| {
        let type_name = t.kind.unwrap_or_else(|| "UNKNOWN".to_string());
        let event = TriggerEvent::parse(&type_name);
        if event == TriggerEvent::Unknown {
            tracing::warn!(id = %id, trigger = %type_name, "Invalid trigger type");
        }
        let progress = t.progress.or(t.amount).unwrap_or(0);
        Trigger {
            event,
            value: t.value,
            progress: u32::try_from(progress).unwrap_or(0),
        }
    });

    Milestone {
        id: MilestoneId::new(id),
        parent,
        kind,
        display: MilestoneDisplay {
            icon: raw.icon.unwrap_or_else(|| "stone".to_string()).to_ascii_lowercase(),
            title: raw.title.unwrap_or_else(|| "Untitled".to_string()),
            description: raw.description,
        },
        category,
        visible: raw.visible.unwrap_or(true),
        show_toast: raw.show_toast.unwrap_or(true),
        announce_to_chat: raw.announce_to_chat.unwrap_or(true),
        trigger,
    }
}
