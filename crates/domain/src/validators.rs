//! Structural validators.
//!
//! These checks cover structural integrity only: ids, references, cycles.
//! Behavior-specific property shapes are a module concern. Every offence
//! found in one pass is accumulated into a single [`ValidationError`] so a
//! world author fixes the file in one round trip.

use std::collections::{HashMap, HashSet};

use crate::entities::ExitKind;
use crate::error::ValidationError;
use crate::ids::{is_reserved_actor_name, EntityId, ExitSlot, RESERVED_ACTOR_NAMES, PLAYER};
use crate::world::World;

/// Entity labels used in diagnostics. Door items get their own label so
/// reference checks can distinguish them from ordinary items.
type IdRegistry = HashMap<String, &'static str>;

/// Validate structural integrity of a world.
///
/// When `loaded_modules` is supplied (after the behavior registry has been
/// built), every id in any entity's `behaviors` list must name a loaded
/// module.
pub fn validate_world(
    world: &World,
    loaded_modules: Option<&HashSet<String>>,
) -> Result<(), ValidationError> {
    let mut errors: Vec<String> = Vec::new();

    let registry = build_id_registry(world, &mut errors);

    validate_exit_references(world, &registry, &mut errors);
    validate_item_locations(world, &registry, &mut errors);
    validate_lock_references(world, &registry, &mut errors);
    validate_metadata(world, &registry, &mut errors);
    validate_player_state(world, &registry, &mut errors);
    validate_containment_cycles(world, &mut errors);
    validate_actor_names(world, &mut errors);
    validate_parts(world, &registry, &mut errors);

    if let Some(modules) = loaded_modules {
        validate_behavior_references(world, modules, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        tracing::warn!(count = errors.len(), "world validation failed");
        Err(ValidationError::new(errors))
    }
}

fn build_id_registry(world: &World, errors: &mut Vec<String>) -> IdRegistry {
    let mut registry: IdRegistry = HashMap::new();
    registry.insert(PLAYER.to_string(), "player");

    let mut add = |id: &EntityId, label: &'static str, errors: &mut Vec<String>| {
        if id.as_str() == PLAYER {
            errors.push(format!("ID 'player' is reserved, cannot use for {label}"));
        } else if let Some(existing) = registry.get(id.as_str()) {
            errors.push(format!(
                "Duplicate ID '{id}' (used by {existing} and {label})"
            ));
        } else {
            registry.insert(id.to_string(), label);
        }
    };

    for loc in world.locations.values() {
        add(&loc.id, "location", errors);
    }
    for item in world.items.values() {
        let label = if item.is_door() { "door_item" } else { "item" };
        add(&item.id, label, errors);
    }
    for lock in world.locks.values() {
        add(&lock.id, "lock", errors);
    }
    for actor in world.actors.values() {
        if !actor.id.is_player() {
            add(&actor.id, "npc", errors);
        }
    }
    for part in world.parts.values() {
        add(&part.id, "part", errors);
    }
    for exit in world.exits.values() {
        add(&exit.id, "exit", errors);
    }

    registry
}

fn validate_exit_references(world: &World, registry: &IdRegistry, errors: &mut Vec<String>) {
    // Legacy per-location exit tables.
    for loc in world.locations.values() {
        for (direction, desc) in &loc.exits {
            if let Some(to) = &desc.to {
                match registry.get(to.as_str()) {
                    None => errors.push(format!(
                        "Exit '{direction}' in '{}' references nonexistent location '{to}'",
                        loc.id
                    )),
                    Some(&"location") => {}
                    Some(other) => errors.push(format!(
                        "Exit '{direction}' in '{}' references '{to}' which is a {other}, not a location",
                        loc.id
                    )),
                }
            }
            if desc.kind == ExitKind::Door {
                match &desc.door_id {
                    None => errors.push(format!(
                        "Exit '{direction}' in '{}' is type 'door' but missing door_id",
                        loc.id
                    )),
                    Some(door_id) => match registry.get(door_id.as_str()) {
                        None => errors.push(format!(
                            "Exit '{direction}' in '{}' references nonexistent door '{door_id}'",
                            loc.id
                        )),
                        Some(&"door_item") => {}
                        Some(other) => errors.push(format!(
                            "Exit '{direction}' in '{}' references '{door_id}' which is a {other}, not a door",
                            loc.id
                        )),
                    },
                }
            }
        }
    }

    // First-class exit entities.
    for exit in world.exits.values() {
        match registry.get(exit.location.as_str()) {
            None => errors.push(format!(
                "Exit '{}' originates from nonexistent location '{}'",
                exit.id, exit.location
            )),
            Some(&"location") => {}
            Some(other) => errors.push(format!(
                "Exit '{}' originates from '{}' which is a {other}, not a location",
                exit.id, exit.location
            )),
        }
        for target in &exit.connections {
            if registry.get(target.as_str()).copied() != Some("exit") {
                errors.push(format!(
                    "Exit '{}' connects to '{target}' which is not an exit",
                    exit.id
                ));
            }
        }
        if let Some(door_id) = &exit.door_id {
            if registry.get(door_id.as_str()).copied() != Some("door_item") {
                errors.push(format!(
                    "Exit '{}' references '{door_id}' which is not a door item",
                    exit.id
                ));
            }
        }
    }
}

fn validate_item_locations(world: &World, registry: &IdRegistry, errors: &mut Vec<String>) {
    let valid_containers = ["location", "item", "door_item", "npc", "player"];

    for item in world.items.values() {
        let loc = &item.location;
        if loc.is_removal_sentinel() || loc.as_str() == PLAYER {
            continue;
        }

        if loc.is_exit_slot() {
            if !item.is_door() {
                errors.push(format!(
                    "Item '{}' uses exit location '{loc}' but is not a door item",
                    item.id
                ));
                continue;
            }
            match loc.exit_slot() {
                None => errors.push(format!(
                    "Door item '{}' has malformed exit location '{loc}' \
                     (expected format: exit:location_id:direction)",
                    item.id
                )),
                Some(ExitSlot { location, .. }) => match registry.get(location.as_str()) {
                    None => errors.push(format!(
                        "Door item '{}' references nonexistent location '{location}' \
                         in exit location '{loc}'",
                        item.id
                    )),
                    Some(&"location") => {}
                    Some(other) => errors.push(format!(
                        "Door item '{}' exit location references '{location}' \
                         which is a {other}, not a location",
                        item.id
                    )),
                },
            }
            continue;
        }

        if item.is_door() {
            errors.push(format!(
                "Door item '{}' must use an exit:<location>:<direction> location, found '{loc}'",
                item.id
            ));
            continue;
        }

        match registry.get(loc.as_str()) {
            None => errors.push(format!(
                "Item '{}' has invalid location '{loc}' (entity does not exist)",
                item.id
            )),
            Some(label) if valid_containers.contains(label) => {}
            Some(other) => errors.push(format!(
                "Item '{}' has invalid location '{loc}' (cannot be placed in a {other})",
                item.id
            )),
        }
    }
}

fn validate_lock_references(world: &World, registry: &IdRegistry, errors: &mut Vec<String>) {
    for lock in world.locks.values() {
        for key_id in lock.opens_with() {
            match registry.get(key_id.as_str()) {
                None => errors.push(format!(
                    "Lock '{}' opens_with references nonexistent item '{key_id}'",
                    lock.id
                )),
                Some(&"item") => {}
                Some(other) => errors.push(format!(
                    "Lock '{}' opens_with references '{key_id}' which is a {other}, not an item",
                    lock.id
                )),
            }
        }
    }

    for item in world.items.values() {
        if let Some(lock_id) = item.door_lock_id() {
            if !world.locks.contains_key(lock_id.as_str()) {
                errors.push(format!(
                    "Door '{}' references nonexistent lock '{lock_id}'",
                    item.id
                ));
            }
        }
        if let Some(container) = item.container() {
            if let Some(lock_id) = container.lock_id {
                if !world.locks.contains_key(lock_id.as_str()) {
                    errors.push(format!(
                        "Container '{}' references nonexistent lock '{lock_id}'",
                        item.id
                    ));
                }
            }
        }
    }
}

fn validate_metadata(world: &World, registry: &IdRegistry, errors: &mut Vec<String>) {
    if let Some(start) = &world.metadata.start_location {
        match registry.get(start.as_str()) {
            None => errors.push(format!("Metadata start_location '{start}' does not exist")),
            Some(&"location") => {}
            Some(other) => errors.push(format!(
                "Metadata start_location '{start}' is a {other}, not a location"
            )),
        }
    }
}

fn validate_player_state(world: &World, registry: &IdRegistry, errors: &mut Vec<String>) {
    let Some(player) = world.player() else {
        return;
    };

    match registry.get(player.location.as_str()) {
        None => errors.push(format!(
            "Player location '{}' does not exist",
            player.location
        )),
        Some(&"location") => {}
        Some(other) => errors.push(format!(
            "Player location '{}' is a {other}, not a location",
            player.location
        )),
    }

    for item_id in &player.inventory {
        match registry.get(item_id.as_str()) {
            None => errors.push(format!(
                "Player inventory contains nonexistent item '{item_id}'"
            )),
            Some(&"item") | Some(&"door_item") => {}
            Some(other) => errors.push(format!(
                "Player inventory contains '{item_id}' which is a {other}, not an item"
            )),
        }
    }
}

fn validate_containment_cycles(world: &World, errors: &mut Vec<String>) {
    for item in world.items.values() {
        if !world.items.contains_key(item.location.as_str()) {
            continue;
        }
        // This item sits inside another item; walk the parent chain.
        let mut visited: Vec<&str> = Vec::new();
        let mut current: &str = item.id.as_str();
        loop {
            if visited.contains(&current) {
                let chain = visited.join("' -> '");
                errors.push(format!(
                    "Containment cycle detected: '{chain}' -> '{current}'"
                ));
                break;
            }
            visited.push(current);
            match world.items.get(current) {
                Some(inner) if world.items.contains_key(inner.location.as_str()) => {
                    current = inner.location.as_str();
                }
                _ => break,
            }
        }
    }
}

fn validate_actor_names(world: &World, errors: &mut Vec<String>) {
    for actor in world.actors.values() {
        if actor.id.is_player() {
            continue;
        }
        if is_reserved_actor_name(&actor.name) {
            let reserved: Vec<&str> = {
                let mut names = RESERVED_ACTOR_NAMES.to_vec();
                names.sort_unstable();
                names
            };
            errors.push(format!(
                "Actor '{}' has prohibited name '{}' (reserved words: {})",
                actor.id,
                actor.name,
                reserved.join(", ")
            ));
        }
    }
}

fn validate_parts(world: &World, registry: &IdRegistry, errors: &mut Vec<String>) {
    for part in world.parts.values() {
        if part.id.as_str().is_empty() {
            errors.push("Part has empty id".to_string());
        }
        if part.name.is_empty() {
            errors.push(format!("Part {} has empty name", part.id));
        }
        if part.part_of.as_str().is_empty() {
            errors.push(format!("Part {} missing required part_of field", part.id));
            continue;
        }

        match registry.get(part.part_of.as_str()) {
            None => errors.push(format!(
                "Part {} references non-existent parent {}",
                part.id, part.part_of
            )),
            Some(&"part") => errors.push(format!(
                "Part {} cannot have another part as parent (nested parts are not supported)",
                part.id
            )),
            Some(&"location") | Some(&"item") | Some(&"door_item") => {}
            Some(other) => errors.push(format!(
                "Part {} parent '{}' is a {other}; parts may only belong to locations or items",
                part.id, part.part_of
            )),
        }
    }
}

fn validate_behavior_references(
    world: &World,
    loaded_modules: &HashSet<String>,
    errors: &mut Vec<String>,
) {
    let mut check = |entity_kind: &str, id: &EntityId, behaviors: &[String]| {
        for module in behaviors {
            if !loaded_modules.contains(module) {
                errors.push(format!(
                    "{entity_kind} '{id}' references unknown behavior module '{module}'"
                ));
            }
        }
    };

    for item in world.items.values() {
        check("Item", &item.id, &item.behaviors);
    }
    for actor in world.actors.values() {
        check("Actor", &actor.id, &actor.behaviors);
    }
    for loc in world.locations.values() {
        check("Location", &loc.id, &loc.behaviors);
    }
    for part in world.parts.values() {
        check("Part", &part.id, &part.behaviors);
    }
    for exit in world.exits.values() {
        check("Exit", &exit.id, &exit.behaviors);
    }
}

/// Advisory checks that are recommended in data but deliberately never hard
/// errors: exit-connection symmetry and actor-inventory/item-location
/// agreement. Handlers legitimately maintain one side before the other
/// mid-transaction, so a hard check would reject real save files.
pub fn warn_soft_invariants(world: &World) {
    for exit in world.exits.values() {
        for target in &exit.connections {
            if let Some(other) = world.exits.get(target.as_str()) {
                if !other.connections.contains(&exit.id) {
                    tracing::warn!(
                        exit = %exit.id,
                        target = %target,
                        "exit connection is not symmetric"
                    );
                }
            }
        }
    }

    for actor in world.actors.values() {
        for item_id in &actor.inventory {
            if let Some(item) = world.items.get(item_id.as_str()) {
                if item.location != actor.id {
                    tracing::warn!(
                        actor = %actor.id,
                        item = %item_id,
                        item_location = %item.location,
                        "inventory entry disagrees with item location"
                    );
                }
            }
        }
    }
}
