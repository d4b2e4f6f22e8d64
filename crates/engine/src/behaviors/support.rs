//! Shared helpers for the bundled behavior modules.

use fabula_domain::EntityId;
use fabula_protocol::{Action, WordEntry};

use crate::accessor::Accessor;
use crate::behavior::HandlerResult;
use crate::resolver::{resolve_object, Resolution};

/// The direct object, or a "what?" failure for verbs that need one.
pub fn object_or_fail(action: &Action, prompt: &str) -> Result<WordEntry, HandlerResult> {
    action
        .object_word()
        .ok_or_else(|| HandlerResult::fail(prompt))
}

/// The indirect object, or a failure.
pub fn indirect_or_fail(action: &Action, prompt: &str) -> Result<WordEntry, HandlerResult> {
    action
        .indirect_object_word()
        .ok_or_else(|| HandlerResult::fail(prompt))
}

pub fn not_found(word: &WordEntry) -> HandlerResult {
    HandlerResult::fail(format!("You don't see any {} here.", word.word))
}

/// Resolve the direct object with the action's adjectives.
pub fn resolve_action_object(
    acc: &dyn Accessor,
    action: &Action,
    word: &WordEntry,
) -> Resolution {
    resolve_object(acc, action.actor(), word, &action.adjective_list())
}

/// Resolve the indirect object with its own adjective.
pub fn resolve_action_indirect(
    acc: &dyn Accessor,
    action: &Action,
    word: &WordEntry,
) -> Resolution {
    let adjectives: Vec<String> = action
        .indirect_adjective
        .as_deref()
        .map(|adj| {
            adj.to_lowercase()
                .split_whitespace()
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    resolve_object(acc, action.actor(), word, &adjectives)
}

/// Display name of any entity.
pub fn entity_name(acc: &dyn Accessor, id: &str) -> String {
    acc.entity(id)
        .map(|entity| entity.name().to_string())
        .unwrap_or_else(|| id.to_string())
}

/// The entity's `interaction_distance` property (`"any"` when absent).
pub fn interaction_distance(acc: &dyn Accessor, id: &str) -> String {
    acc.entity(id)
        .and_then(|entity| {
            entity
                .properties()
                .get_str("interaction_distance")
                .map(str::to_string)
        })
        .unwrap_or_else(|| "any".to_string())
}

/// Implicit positioning for interaction handlers. A `"near"` target the
/// actor is not already focused on produces a movement beat, moves focus,
/// and clears posture; the default `"any"` moves focus silently.
pub fn ensure_positioned(acc: &mut dyn Accessor, actor_id: &str, target: &EntityId) -> Option<String> {
    let already_focused = acc
        .actor(actor_id)
        .and_then(|a| a.focused_on())
        .is_some_and(|f| &f == target);
    if already_focused {
        return None;
    }

    let near = interaction_distance(acc, target.as_str()) == "near";
    let name = entity_name(acc, target.as_str());
    let actor = acc.actor_mut(actor_id)?;
    actor.set_focused_on(Some(target));
    if near {
        actor.set_posture(None);
        Some(format!("You move closer to the {name}."))
    } else {
        None
    }
}

/// Find an item in the actor's inventory by word, synonym, or id.
pub fn find_in_inventory(acc: &dyn Accessor, actor_id: &str, word: &WordEntry) -> Option<EntityId> {
    let candidates = word.candidates();
    let inventory = acc.actor(actor_id)?.inventory.clone();

    // Exact id match first.
    for item_id in &inventory {
        if candidates.iter().any(|c| c == item_id.as_str()) {
            return Some(item_id.clone());
        }
    }
    for item_id in &inventory {
        let Some(item) = acc.item(item_id.as_str()) else {
            continue;
        };
        let mut names = vec![item.name.to_lowercase()];
        names.extend(item.synonyms().iter().map(|s| s.to_lowercase()));
        if candidates.iter().any(|c| names.iter().any(|n| n == c)) {
            return Some(item_id.clone());
        }
    }
    None
}

/// Map a domain error into a failing handler result. Inconsistent-state
/// errors keep their latch prefix.
pub fn domain_failure(err: fabula_domain::DomainError) -> HandlerResult {
    HandlerResult::fail(err.to_string())
}
