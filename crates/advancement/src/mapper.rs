//! Milestone to advancement definition mapping

use serde_json::{json, Value};

use shared::{Milestone, NamespacedKey, VANILLA_NAMESPACE};

use crate::host::COMPLETION_CRITERION;

/// Background texture every root entry needs
pub const ROOT_BACKGROUND: &str = "minecraft:textures/gui/advancements/backgrounds/stone.png";

/// Build the host definition for `milestone`
///
/// `parent` is the resolved parent key; `None` makes this a root with a
/// background. Chat announcements are left to the notifier, so the host
/// entry never announces.
pub fn definition_for(milestone: &Milestone, parent: Option<&NamespacedKey>) -> Value {
    let icon = NamespacedKey::parse_or(&milestone.display.icon.to_ascii_lowercase(), VANILLA_NAMESPACE);

    let mut display = json!({
        "icon": { "id": icon.to_string() },
        "title": milestone.display.title,
        "description": milestone.display.description.join("\n"),
        "frame": milestone.kind.frame().as_str(),
        "show_toast": milestone.show_toast,
        "announce_to_chat": false,
        "hidden": !milestone.visible,
    });

    let mut criteria = serde_json::Map::new();
    criteria.insert(
        COMPLETION_CRITERION.to_string(),
        json!({ "trigger": "minecraft:impossible" }),
    );
    let mut definition = json!({ "criteria": criteria });

    match parent {
        Some(parent) => {
            definition["parent"] = Value::String(parent.to_string());
        }
        None => {
            display["background"] = Value::String(ROOT_BACKGROUND.to_string());
        }
    }
    definition["display"] = display;
    definition
}
