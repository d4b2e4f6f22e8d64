//! Doors and lids: `open`, `close`, `unlock`, `lock`.
//!
//! Works on door items (the `door` property sub-map) and on enclosed
//! containers (the `container` sub-map). Keys must be carried and listed in
//! the lock's `opens_with`; a lock's `fail_message` overrides the default
//! refusal.

use serde_json::Map;

use fabula_domain::EntityId;
use fabula_protocol::Action;

use crate::accessor::Accessor;
use crate::behavior::{BehaviorModule, HandlerFn, HandlerResult, SourceType};
use crate::resolver::Resolution;
use crate::vocabulary::{VerbEntry, Vocabulary};

use super::support::{
    domain_failure, ensure_positioned, find_in_inventory, not_found, object_or_fail,
    resolve_action_object,
};

pub struct Portals;

impl BehaviorModule for Portals {
    fn name(&self) -> &'static str {
        "core.portals"
    }

    fn source(&self) -> SourceType {
        SourceType::Core
    }

    fn vocabulary(&self) -> Vocabulary {
        Vocabulary {
            verbs: vec![
                VerbEntry::new("open").object_required(),
                VerbEntry::new("close").with_synonyms(&["shut"]).object_required(),
                VerbEntry::new("unlock").object_required().with_preposition("with"),
                VerbEntry::new("lock").object_required().with_preposition("with"),
            ],
            ..Vocabulary::default()
        }
    }

    fn handlers(&self) -> Vec<(&'static str, HandlerFn)> {
        vec![
            ("open", handle_open),
            ("close", handle_close),
            ("unlock", handle_unlock),
            ("lock", handle_lock),
        ]
    }
}

fn resolve_openable(
    acc: &dyn Accessor,
    action: &Action,
    prompt: &str,
) -> Result<EntityId, HandlerResult> {
    let word = object_or_fail(action, prompt)?;
    match resolve_action_object(acc, action, &word) {
        Resolution::Entity(id) => Ok(id),
        _ => Err(not_found(&word)),
    }
}

pub fn handle_open(acc: &mut dyn Accessor, action: &Action) -> HandlerResult {
    let target = match resolve_openable(acc, action, "Open what?") {
        Ok(id) => id,
        Err(fail) => return fail,
    };
    let actor_id = action.actor().to_string();
    let Some(item) = acc.item(target.as_str()) else {
        return HandlerResult::fail("You can't open that.");
    };
    let name = item.name.clone();

    let mut beats = Vec::new();
    if item.is_door() {
        if item.door_open() {
            return HandlerResult::fail(format!("The {name} is already open."));
        }
        if item.door_locked() {
            return HandlerResult::fail(format!("The {name} is locked."));
        }
        if let Some(beat) = ensure_positioned(acc, &actor_id, &target) {
            beats.push(beat);
        }
        if let Some(door) = acc.item_mut(target.as_str()) {
            door.set_door_open(true);
        }
    } else if let Some(spec) = item.container() {
        if spec.is_surface || spec.open {
            return HandlerResult::fail(format!("The {name} is already open."));
        }
        if spec.locked {
            return HandlerResult::fail(format!("The {name} is locked."));
        }
        if let Some(beat) = ensure_positioned(acc, &actor_id, &target) {
            beats.push(beat);
        }
        if let Some(container) = acc.item_mut(target.as_str()) {
            container.set_container_open(true);
        }
    } else {
        return HandlerResult::fail(format!("You can't open the {name}."));
    }

    match acc.update(target.as_str(), &Map::new(), Some("open")) {
        Ok(outcome) => beats.extend(outcome.beats),
        Err(err) => return domain_failure(err),
    }
    HandlerResult::ok(format!("You open the {name}.")).with_beats(beats)
}

pub fn handle_close(acc: &mut dyn Accessor, action: &Action) -> HandlerResult {
    let target = match resolve_openable(acc, action, "Close what?") {
        Ok(id) => id,
        Err(fail) => return fail,
    };
    let actor_id = action.actor().to_string();
    let Some(item) = acc.item(target.as_str()) else {
        return HandlerResult::fail("You can't close that.");
    };
    let name = item.name.clone();

    let mut beats = Vec::new();
    if item.is_door() {
        if !item.door_open() {
            return HandlerResult::fail(format!("The {name} is already closed."));
        }
        if let Some(beat) = ensure_positioned(acc, &actor_id, &target) {
            beats.push(beat);
        }
        if let Some(door) = acc.item_mut(target.as_str()) {
            door.set_door_open(false);
        }
    } else if let Some(spec) = item.container() {
        if spec.is_surface {
            return HandlerResult::fail(format!("The {name} has nothing to close."));
        }
        if !spec.open {
            return HandlerResult::fail(format!("The {name} is already closed."));
        }
        if let Some(beat) = ensure_positioned(acc, &actor_id, &target) {
            beats.push(beat);
        }
        if let Some(container) = acc.item_mut(target.as_str()) {
            container.set_container_open(false);
        }
    } else {
        return HandlerResult::fail(format!("You can't close the {name}."));
    }

    match acc.update(target.as_str(), &Map::new(), Some("close")) {
        Ok(outcome) => beats.extend(outcome.beats),
        Err(err) => return domain_failure(err),
    }
    HandlerResult::ok(format!("You close the {name}.")).with_beats(beats)
}

/// The lock guarding a door or enclosed container, if any.
fn lock_of(acc: &dyn Accessor, item_id: &str) -> Option<EntityId> {
    let item = acc.item(item_id)?;
    if item.is_door() {
        item.door_lock_id()
    } else {
        item.container().and_then(|spec| spec.lock_id)
    }
}

/// A carried key that the lock accepts.
fn carried_key(acc: &dyn Accessor, actor_id: &str, lock_id: &str) -> Option<EntityId> {
    let lock = acc.lock(lock_id)?;
    let actor = acc.actor(actor_id)?;
    actor
        .inventory
        .iter()
        .find(|item_id| lock.opens_with_contains(item_id.as_str()))
        .cloned()
}

pub fn handle_unlock(acc: &mut dyn Accessor, action: &Action) -> HandlerResult {
    let target = match resolve_openable(acc, action, "Unlock what?") {
        Ok(id) => id,
        Err(fail) => return fail,
    };
    let actor_id = action.actor().to_string();
    let Some(item) = acc.item(target.as_str()) else {
        return HandlerResult::fail("You can't unlock that.");
    };
    let name = item.name.clone();
    let is_door = item.is_door();
    let locked = if is_door {
        item.door_locked()
    } else {
        item.container().is_some_and(|spec| spec.locked)
    };
    if !locked {
        return HandlerResult::fail(format!("The {name} isn't locked."));
    }

    let Some(lock_id) = lock_of(acc, target.as_str()) else {
        return HandlerResult::fail(format!("The {name} has no lock."));
    };
    let Some(key_id) = carried_key(acc, &actor_id, lock_id.as_str()) else {
        let refusal = acc
            .lock(lock_id.as_str())
            .and_then(|lock| lock.fail_message().map(str::to_string))
            .unwrap_or_else(|| format!("You don't have a key that fits the {name}."));
        return HandlerResult::fail(refusal);
    };
    let key_name = acc
        .item(key_id.as_str())
        .map(|key| key.name.clone())
        .unwrap_or_else(|| key_id.to_string());

    let mut beats = Vec::new();
    if let Some(beat) = ensure_positioned(acc, &actor_id, &target) {
        beats.push(beat);
    }
    if let Some(item) = acc.item_mut(target.as_str()) {
        if is_door {
            item.set_door_locked(false);
        } else {
            item.set_container_locked(false);
        }
    }

    match acc.update(target.as_str(), &Map::new(), Some("unlock")) {
        Ok(outcome) => beats.extend(outcome.beats),
        Err(err) => return domain_failure(err),
    }
    HandlerResult::ok(format!("You unlock the {name} with the {key_name}.")).with_beats(beats)
}

pub fn handle_lock(acc: &mut dyn Accessor, action: &Action) -> HandlerResult {
    let target = match resolve_openable(acc, action, "Lock what?") {
        Ok(id) => id,
        Err(fail) => return fail,
    };
    let actor_id = action.actor().to_string();
    let Some(item) = acc.item(target.as_str()) else {
        return HandlerResult::fail("You can't lock that.");
    };
    let name = item.name.clone();
    let is_door = item.is_door();
    let (open, locked) = if is_door {
        (item.door_open(), item.door_locked())
    } else {
        match item.container() {
            Some(spec) if !spec.is_surface => (spec.open, spec.locked),
            _ => return HandlerResult::fail(format!("You can't lock the {name}.")),
        }
    };
    if locked {
        return HandlerResult::fail(format!("The {name} is already locked."));
    }
    if open {
        return HandlerResult::fail(format!("You'll have to close the {name} first."));
    }

    let Some(lock_id) = lock_of(acc, target.as_str()) else {
        return HandlerResult::fail(format!("The {name} has no lock."));
    };
    let Some(key_id) = carried_key(acc, &actor_id, lock_id.as_str()) else {
        return HandlerResult::fail(format!("You don't have a key that fits the {name}."));
    };
    let key_name = acc
        .item(key_id.as_str())
        .map(|key| key.name.clone())
        .unwrap_or_else(|| key_id.to_string());

    let mut beats = Vec::new();
    if let Some(beat) = ensure_positioned(acc, &actor_id, &target) {
        beats.push(beat);
    }
    if let Some(item) = acc.item_mut(target.as_str()) {
        if is_door {
            item.set_door_locked(true);
        } else {
            item.set_container_locked(true);
        }
    }

    match acc.update(target.as_str(), &Map::new(), Some("lock")) {
        Ok(outcome) => beats.extend(outcome.beats),
        Err(err) => return domain_failure(err),
    }
    HandlerResult::ok(format!("You lock the {name} with the {key_name}.")).with_beats(beats)
}
