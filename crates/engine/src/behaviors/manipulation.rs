//! Object manipulation: `take`, `drop`, and `put`.

use serde_json::Map;

use fabula_domain::EntityKind;
use fabula_protocol::Action;

use crate::accessor::Accessor;
use crate::behavior::{
    BehaviorModule, HandlerFn, HandlerResult, SourceType,
};
use crate::resolver::Resolution;
use crate::vocabulary::{VerbEntry, Vocabulary};

use super::support::{
    domain_failure, ensure_positioned, entity_name, find_in_inventory, indirect_or_fail,
    not_found, object_or_fail, resolve_action_indirect, resolve_action_object,
};

pub struct Manipulation;

impl BehaviorModule for Manipulation {
    fn name(&self) -> &'static str {
        "core.manipulation"
    }

    fn source(&self) -> SourceType {
        SourceType::Core
    }

    fn vocabulary(&self) -> Vocabulary {
        Vocabulary {
            verbs: vec![
                VerbEntry::new("take")
                    .with_synonyms(&["get", "grab", "pick"])
                    .object_required(),
                VerbEntry::new("drop").with_synonyms(&["discard"]).object_required(),
                VerbEntry::new("put")
                    .with_synonyms(&["place"])
                    .object_required()
                    .with_preposition("in"),
            ],
            ..Vocabulary::default()
        }
    }

    fn handlers(&self) -> Vec<(&'static str, HandlerFn)> {
        vec![
            ("take", handle_take),
            ("drop", handle_drop),
            ("put", handle_put),
        ]
    }
}

pub fn handle_take(acc: &mut dyn Accessor, action: &Action) -> HandlerResult {
    let word = match object_or_fail(action, "Take what?") {
        Ok(word) => word,
        Err(fail) => return fail,
    };
    let actor_id = action.actor().to_string();

    if find_in_inventory(acc, &actor_id, &word).is_some() {
        return HandlerResult::fail(format!("You already have the {}.", word.word));
    }

    let target = match resolve_action_object(acc, action, &word) {
        Resolution::Entity(id) => id,
        Resolution::Universal(surface) => {
            return HandlerResult::fail(format!("You can't take the {surface}."));
        }
        Resolution::NotFound => return not_found(&word),
    };

    if acc.entity_kind(target.as_str()) != Some(EntityKind::Item) {
        return HandlerResult::fail("You can't take that.");
    }
    let Some(item) = acc.item(target.as_str()) else {
        return not_found(&word);
    };
    let name = item.name.clone();
    if item.is_door() {
        return HandlerResult::fail(format!("The {name} is firmly attached."));
    }
    if !item.is_portable() {
        return HandlerResult::fail(format!("You can't take the {name}."));
    }

    let mut beats = Vec::new();
    if let Some(beat) = ensure_positioned(acc, &actor_id, &target) {
        beats.push(beat);
    }

    if let Err(err) = acc.set_entity_where(target.as_str(), &actor_id) {
        return domain_failure(err);
    }
    if let Some(actor) = acc.actor_mut(&actor_id) {
        actor.inventory.push(target.clone());
    }

    match acc.update(target.as_str(), &Map::new(), Some("take")) {
        Ok(outcome) => beats.extend(outcome.beats),
        Err(err) => return domain_failure(err),
    }

    HandlerResult::ok(format!("You take the {name}.")).with_beats(beats)
}

pub fn handle_drop(acc: &mut dyn Accessor, action: &Action) -> HandlerResult {
    let word = match object_or_fail(action, "Drop what?") {
        Ok(word) => word,
        Err(fail) => return fail,
    };
    let actor_id = action.actor().to_string();

    let Some(target) = find_in_inventory(acc, &actor_id, &word) else {
        return HandlerResult::fail(format!("You aren't carrying any {}.", word.word));
    };
    let Some(loc_id) = acc.current_location(&actor_id) else {
        return HandlerResult::fail("You are nowhere to drop anything.");
    };
    let name = entity_name(acc, target.as_str());

    if let Err(err) = acc.set_entity_where(target.as_str(), loc_id.as_str()) {
        return domain_failure(err);
    }
    if let Some(actor) = acc.actor_mut(&actor_id) {
        actor.remove_from_inventory(target.as_str());
    }

    let beats = match acc.update(target.as_str(), &Map::new(), Some("drop")) {
        Ok(outcome) => outcome.beats,
        Err(err) => return domain_failure(err),
    };

    HandlerResult::ok(format!("You drop the {name}.")).with_beats(beats)
}

pub fn handle_put(acc: &mut dyn Accessor, action: &Action) -> HandlerResult {
    let word = match object_or_fail(action, "Put what?") {
        Ok(word) => word,
        Err(fail) => return fail,
    };
    let actor_id = action.actor().to_string();

    let Some(moved) = find_in_inventory(acc, &actor_id, &word) else {
        return HandlerResult::fail(format!("You aren't carrying any {}.", word.word));
    };
    let moved_name = entity_name(acc, moved.as_str());

    let preposition = action.preposition.clone().unwrap_or_else(|| "in".to_string());
    let indirect = match indirect_or_fail(
        action,
        &format!("Put the {moved_name} {preposition} what?"),
    ) {
        Ok(word) => word,
        Err(fail) => return fail,
    };

    let container_id = match resolve_action_indirect(acc, action, &indirect) {
        Resolution::Entity(id) => id,
        _ => return not_found(&indirect),
    };
    if moved == container_id {
        return HandlerResult::fail("You can't put something inside itself.");
    }
    let Some(container) = acc.item(container_id.as_str()) else {
        return HandlerResult::fail(format!(
            "You can't put things {preposition} the {}.",
            entity_name(acc, container_id.as_str())
        ));
    };
    let container_name = container.name.clone();
    let Some(spec) = container.container() else {
        return HandlerResult::fail(format!(
            "You can't put things {preposition} the {container_name}."
        ));
    };

    if spec.is_surface && preposition == "in" {
        return HandlerResult::fail(format!("You can't put things in the {container_name}."));
    }
    if !spec.is_surface {
        if spec.locked {
            return HandlerResult::fail(format!("The {container_name} is locked."));
        }
        if !spec.open {
            return HandlerResult::fail(format!("The {container_name} is closed."));
        }
    }
    if let Some(capacity) = spec.capacity {
        let held = acc
            .entities_at(container_id.as_str(), Some(EntityKind::Item))
            .len() as u64;
        if held >= capacity {
            return HandlerResult::fail(format!("The {container_name} is full."));
        }
    }

    let mut beats = Vec::new();
    if let Some(beat) = ensure_positioned(acc, &actor_id, &container_id) {
        beats.push(beat);
    }

    if let Err(err) = acc.set_entity_where(moved.as_str(), container_id.as_str()) {
        return domain_failure(err);
    }
    if let Some(actor) = acc.actor_mut(&actor_id) {
        actor.remove_from_inventory(moved.as_str());
    }

    match acc.update(moved.as_str(), &Map::new(), Some("put")) {
        Ok(outcome) => beats.extend(outcome.beats),
        Err(err) => return domain_failure(err),
    }

    let joint = if spec.is_surface { "on" } else { "in" };
    HandlerResult::ok(format!(
        "You put the {moved_name} {joint} the {container_name}."
    ))
    .with_beats(beats)
}
