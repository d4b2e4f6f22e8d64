//! World-file loading and saving.
//!
//! A world file is a single JSON document. Fields outside each entity's
//! structural allowlist are promoted into the entity's `properties` map on
//! load (via serde flattening on the entity types) and flattened back to the
//! top level on save. `load ∘ save` is the identity on valid worlds, except
//! that a zero turn counter is not written.

use std::path::Path;

use serde_json::{Map, Value};

use crate::entities::{Actor, Exit, Item, Location, Lock, Part};
use crate::error::LoadError;
use crate::ids::PLAYER;
use crate::validators::{validate_world, warn_soft_invariants};
use crate::world::{Metadata, World};

/// Load and validate a world from a parsed JSON document. The containment
/// and connection indices are built before validation; any structural
/// failure aborts the load with an aggregated report.
pub fn load_world(value: &Value) -> Result<World, LoadError> {
    let root = value
        .as_object()
        .ok_or_else(|| LoadError::shape("world document must be a JSON object"))?;

    let metadata: Metadata = match root.get("metadata") {
        Some(meta) => serde_json::from_value(meta.clone())
            .map_err(|e| LoadError::shape(format!("metadata: {e}")))?,
        None => Metadata::default(),
    };
    let mut world = World::new(metadata);

    for (index, entry) in array_of(root, "locations")?.iter().enumerate() {
        let location: Location = serde_json::from_value(entry.clone())
            .map_err(|e| LoadError::shape(format!("locations[{index}]: {e}")))?;
        world.add_location(location);
    }
    for (index, entry) in array_of(root, "items")?.iter().enumerate() {
        let item: Item = serde_json::from_value(entry.clone())
            .map_err(|e| LoadError::shape(format!("items[{index}]: {e}")))?;
        world.add_item(item);
    }
    if let Some(actors) = root.get("actors") {
        let actors = actors
            .as_object()
            .ok_or_else(|| LoadError::shape("actors must be an object"))?;
        for (id, entry) in actors {
            // The map key is authoritative; records may omit their own id.
            let mut record = entry
                .as_object()
                .cloned()
                .ok_or_else(|| LoadError::shape(format!("actors['{id}'] must be an object")))?;
            record
                .entry("id")
                .or_insert_with(|| Value::String(id.clone()));
            let actor: Actor = serde_json::from_value(Value::Object(record))
                .map_err(|e| LoadError::shape(format!("actors['{id}']: {e}")))?;
            world.add_actor(actor);
        }
    }
    for (index, entry) in array_of(root, "locks")?.iter().enumerate() {
        let lock: Lock = serde_json::from_value(entry.clone())
            .map_err(|e| LoadError::shape(format!("locks[{index}]: {e}")))?;
        world.add_lock(lock);
    }
    for (index, entry) in array_of(root, "parts")?.iter().enumerate() {
        let part: Part = serde_json::from_value(entry.clone())
            .map_err(|e| LoadError::shape(format!("parts[{index}]: {e}")))?;
        world.add_part(part);
    }
    for (index, entry) in array_of(root, "exits")?.iter().enumerate() {
        let exit: Exit = serde_json::from_value(entry.clone())
            .map_err(|e| LoadError::shape(format!("exits[{index}]: {e}")))?;
        world.add_exit(exit);
    }

    if let Some(extra) = root.get("extra") {
        world.extra = extra
            .as_object()
            .cloned()
            .ok_or_else(|| LoadError::shape("extra must be an object"))?;
    }
    if let Some(turns) = root.get("turn_count") {
        world.turn_count = turns
            .as_u64()
            .ok_or_else(|| LoadError::shape("turn_count must be a non-negative integer"))?;
    }

    if !world.actors.contains_key(PLAYER) {
        return Err(LoadError::shape("actors must contain 'player'"));
    }

    world
        .rebuild_indices()
        .map_err(|e| LoadError::shape(e.to_string()))?;
    validate_world(&world, None)?;
    warn_soft_invariants(&world);

    tracing::info!(
        title = %world.metadata.title,
        locations = world.locations.len(),
        items = world.items.len(),
        actors = world.actors.len(),
        "world loaded"
    );
    Ok(world)
}

/// Read, parse, and validate a world file.
pub fn load_world_from_path(path: impl AsRef<Path>) -> Result<World, LoadError> {
    let text = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&text)?;
    load_world(&value)
}

/// Serialize a world back to its file form. Entity properties are flattened
/// to the top level of each record and a zero turn counter is suppressed.
pub fn world_to_value(world: &World) -> Result<Value, LoadError> {
    let mut root = Map::new();
    root.insert("metadata".to_string(), serde_json::to_value(&world.metadata)?);
    root.insert(
        "locations".to_string(),
        collect_values(world.locations.values())?,
    );
    root.insert("items".to_string(), collect_values(world.items.values())?);

    let mut actors = Map::new();
    for actor in world.actors.values() {
        actors.insert(actor.id.to_string(), serde_json::to_value(actor)?);
    }
    root.insert("actors".to_string(), Value::Object(actors));

    root.insert("locks".to_string(), collect_values(world.locks.values())?);
    if !world.parts.is_empty() {
        root.insert("parts".to_string(), collect_values(world.parts.values())?);
    }
    if !world.exits.is_empty() {
        root.insert("exits".to_string(), collect_values(world.exits.values())?);
    }
    if !world.extra.is_empty() {
        root.insert("extra".to_string(), Value::Object(world.extra.clone()));
    }
    if world.turn_count != 0 {
        root.insert("turn_count".to_string(), Value::from(world.turn_count));
    }
    Ok(Value::Object(root))
}

/// Write a world file as pretty-printed JSON.
pub fn save_world_to_path(world: &World, path: impl AsRef<Path>) -> Result<(), LoadError> {
    let value = world_to_value(world)?;
    let text = serde_json::to_string_pretty(&value)?;
    std::fs::write(&path, text)?;
    tracing::info!(path = %path.as_ref().display(), "world saved");
    Ok(())
}

fn array_of<'a>(root: &'a Map<String, Value>, key: &str) -> Result<&'a [Value], LoadError> {
    match root.get(key) {
        None => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(LoadError::shape(format!("{key} must be an array"))),
    }
}

fn collect_values<'a, T: serde::Serialize + 'a>(
    entities: impl Iterator<Item = &'a T>,
) -> Result<Value, LoadError> {
    let mut out = Vec::new();
    for entity in entities {
        out.push(serde_json::to_value(entity)?);
    }
    Ok(Value::Array(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal_world() -> Value {
        json!({
            "metadata": {"title": "Test", "version": "1.0", "start_location": "loc_1"},
            "locations": [
                {"id": "loc_1", "name": "Room", "description": "A room"}
            ],
            "items": [
                {
                    "id": "item_1",
                    "name": "Torch",
                    "description": "A torch",
                    "location": "loc_1",
                    "type": "tool",
                    "portable": true,
                    "custom_field": "custom_value"
                }
            ],
            "actors": {
                "player": {
                    "name": "Adventurer",
                    "description": "Test player",
                    "location": "loc_1"
                }
            }
        })
    }

    #[test]
    fn loader_promotes_unknown_fields_into_properties() {
        let world = load_world(&minimal_world()).expect("loads");
        let item = world.item("item_1").expect("item exists");

        assert_eq!(item.name, "Torch");
        assert_eq!(item.location, "loc_1");
        assert!(item.is_portable());
        assert_eq!(item.properties.get_str("type"), Some("tool"));
        assert_eq!(item.properties.get_str("custom_field"), Some("custom_value"));
    }

    #[test]
    fn loader_injects_actor_id_from_map_key() {
        let world = load_world(&minimal_world()).expect("loads");
        let player = world.player().expect("player exists");
        assert_eq!(player.id.as_str(), "player");
        assert_eq!(player.name, "Adventurer");
    }

    #[test]
    fn loader_requires_player_actor() {
        let mut doc = minimal_world();
        doc["actors"] = json!({});
        let err = load_world(&doc).expect_err("must fail");
        assert!(err.to_string().contains("player"));
    }

    #[test]
    fn loader_builds_containment_index() {
        let world = load_world(&minimal_world()).expect("loads");
        assert_eq!(
            world.entity_where("item_1"),
            Some(crate::ids::EntityId::new("loc_1"))
        );
    }

    #[test]
    fn save_flattens_properties_and_suppresses_zero_turns() {
        let world = load_world(&minimal_world()).expect("loads");
        let saved = world_to_value(&world).expect("saves");

        assert_eq!(saved["items"][0]["portable"], json!(true));
        assert_eq!(saved["items"][0]["custom_field"], json!("custom_value"));
        assert!(saved.get("turn_count").is_none());
    }

    #[test]
    fn save_writes_nonzero_turn_counter() {
        let mut world = load_world(&minimal_world()).expect("loads");
        world.increment_turn();
        world.increment_turn();

        let saved = world_to_value(&world).expect("saves");
        assert_eq!(saved["turn_count"], json!(2));
    }

    #[test]
    fn save_then_load_round_trips() {
        let mut world = load_world(&minimal_world()).expect("loads");
        world.increment_turn();

        let saved = world_to_value(&world).expect("saves");
        let reloaded = load_world(&saved).expect("reloads");

        assert_eq!(reloaded.turn_count, 1);
        assert_eq!(reloaded.items, world.items);
        assert_eq!(reloaded.actors, world.actors);
        assert_eq!(reloaded.locations, world.locations);
        assert_eq!(reloaded.metadata, world.metadata);
    }

    #[test]
    fn save_and_reload_through_the_filesystem() {
        let world = load_world(&minimal_world()).expect("loads");
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("save.json");

        save_world_to_path(&world, &path).expect("saves");
        let reloaded = load_world_from_path(&path).expect("reloads");
        assert_eq!(reloaded.items, world.items);
    }
}
