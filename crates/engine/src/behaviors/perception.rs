//! Perception: `look` and `examine`.

use serde_json::Map;

use fabula_domain::EntityKind;
use fabula_protocol::Action;

use crate::accessor::Accessor;
use crate::behavior::{BehaviorModule, HandlerFn, HandlerResult, SourceType};
use crate::resolver::Resolution;
use crate::serializer::{entity_to_value, player_context, serialize_location, SerializeOpts};
use crate::vocabulary::{VerbEntry, Vocabulary};

use super::support::{ensure_positioned, not_found, resolve_action_object};

pub struct Perception;

impl BehaviorModule for Perception {
    fn name(&self) -> &'static str {
        "core.perception"
    }

    fn source(&self) -> SourceType {
        SourceType::Core
    }

    fn vocabulary(&self) -> Vocabulary {
        Vocabulary {
            verbs: vec![
                VerbEntry::new("look").with_synonyms(&["l"]),
                VerbEntry::new("examine")
                    .with_synonyms(&["x", "inspect"])
                    .object_required(),
            ],
            ..Vocabulary::default()
        }
    }

    fn handlers(&self) -> Vec<(&'static str, HandlerFn)> {
        vec![("look", handle_look), ("examine", handle_examine)]
    }
}

pub fn handle_look(acc: &mut dyn Accessor, action: &Action) -> HandlerResult {
    // `look <object>` reads as examine.
    if action.object.is_some() {
        return handle_examine(acc, action);
    }

    let actor_id = action.actor().to_string();
    let Some(loc_id) = acc.current_location(&actor_id) else {
        return HandlerResult::fail("You are nowhere.");
    };
    let description = acc
        .location(loc_id.as_str())
        .map(|loc| {
            if loc.description.is_empty() {
                loc.name.clone()
            } else {
                loc.description.clone()
            }
        })
        .unwrap_or_else(|| "Darkness.".to_string());

    let data = serialize_location(acc, loc_id.as_str(), &actor_id);
    HandlerResult::ok(description).with_data(data)
}

pub fn handle_examine(acc: &mut dyn Accessor, action: &Action) -> HandlerResult {
    let Some(word) = action.object_word() else {
        return HandlerResult::fail("Examine what?");
    };
    let actor_id = action.actor().to_string();

    let target = match resolve_action_object(acc, action, &word) {
        Resolution::Entity(id) => id,
        Resolution::Universal(surface) => {
            return HandlerResult::ok(format!(
                "You look over the {surface}; nothing about it stands out."
            ));
        }
        Resolution::NotFound => return not_found(&word),
    };

    let mut beats = Vec::new();
    if let Some(beat) = ensure_positioned(acc, &actor_id, &target) {
        beats.push(beat);
    }

    let kind = acc.entity_kind(target.as_str());
    let description = acc
        .entity(target.as_str())
        .and_then(|entity| entity.description().map(str::to_string))
        .unwrap_or_else(|| format!("You see nothing special about the {}.", word.word));

    // Entity reactions may add beats (a mirror fogging over, a lock
    // clicking as you lean in).
    if kind != Some(EntityKind::Lock) {
        if let Ok(outcome) = acc.update(target.as_str(), &Map::new(), Some("examine")) {
            beats.extend(outcome.beats);
        }
    }

    let opts = SerializeOpts::default().with_player_context(player_context(acc, &actor_id));
    let data = entity_to_value(acc.world(), target.as_str(), &opts);

    let mut result = HandlerResult::ok(description).with_beats(beats);
    if let Some(data) = data {
        result = result.with_data(data);
    }
    result
}
