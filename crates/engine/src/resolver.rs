//! Noun resolution: mapping parsed surface words to entity identities.
//!
//! Resolution searches, in order: the actor's inventory, the current
//! location's contents (items, other actors, exits, doors whose slot
//! belongs here, visible parts), then open or surface containers one level
//! deep. Matching is by lower-cased name, declared entity synonyms, or the
//! word record's own synonyms; an id-exact match always wins. Hidden
//! entities are skipped unless addressed by id. Universal surface words
//! fall back to a synthesized description when no explicit part exists.

use fabula_domain::{EntityId, EntityKind};
use fabula_protocol::WordEntry;

use crate::accessor::Accessor;

/// Surface words every location implicitly has.
pub const UNIVERSAL_SURFACES: [&str; 5] = ["ceiling", "floor", "walls", "ground", "sky"];

/// Outcome of resolving a surface word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The word names this entity.
    Entity(EntityId),
    /// No entity matched, but the word is a universal surface.
    Universal(String),
    NotFound,
}

impl Resolution {
    pub fn entity(&self) -> Option<&EntityId> {
        match self {
            Self::Entity(id) => Some(id),
            _ => None,
        }
    }
}

/// Resolve `word` (with optional adjectives) from `actor_id`'s point of view.
pub fn resolve_object(
    acc: &dyn Accessor,
    actor_id: &str,
    word: &WordEntry,
    adjectives: &[String],
) -> Resolution {
    let candidates = word.candidates();

    // 1. Inventory.
    if let Some(actor) = acc.actor(actor_id) {
        for item_id in actor.inventory.clone() {
            if match_item(acc, item_id.as_str(), &candidates, adjectives) {
                return Resolution::Entity(item_id);
            }
        }
    }

    let Some(loc_id) = acc.current_location(actor_id) else {
        return Resolution::NotFound;
    };

    // 2. Location contents: items and other actors.
    let here = acc.entities_at(loc_id.as_str(), None);
    for entity_id in &here {
        if entity_id.as_str() == actor_id {
            continue;
        }
        match acc.entity_kind(entity_id.as_str()) {
            Some(EntityKind::Item) => {
                if match_item(acc, entity_id.as_str(), &candidates, adjectives) {
                    return Resolution::Entity(entity_id.clone());
                }
            }
            Some(EntityKind::Actor) => {
                if match_actor(acc, entity_id.as_str(), &candidates, adjectives) {
                    return Resolution::Entity(entity_id.clone());
                }
            }
            _ => {}
        }
    }

    // 2b. Exits from this location.
    for exit_id in acc.exits_from_location(loc_id.as_str()) {
        if let Some(exit) = acc.exit(exit_id.as_str()) {
            if exit.is_hidden() && !candidates.iter().any(|c| c == exit.id.as_str()) {
                continue;
            }
            let mut names = vec![exit.name.to_lowercase()];
            names.extend(exit.synonyms().iter().map(|s| s.to_lowercase()));
            if let Some(direction) = &exit.direction {
                names.push(direction.to_lowercase());
            }
            if word_matches(&candidates, exit.id.as_str(), &names)
                && adjectives_match(adjectives, exit.properties.get_str("description").unwrap_or(""), &[])
            {
                return Resolution::Entity(exit_id);
            }
        }
    }

    // 2c. Doors whose exit slot belongs to this location (either side).
    for item in acc.world().items.values() {
        if !item.is_door() {
            continue;
        }
        let belongs_here = item
            .location
            .exit_slot()
            .is_some_and(|slot| slot.location == loc_id)
            || door_referenced_from(acc, loc_id.as_str(), item.id.as_str());
        if belongs_here && match_item(acc, item.id.as_str(), &candidates, adjectives) {
            return Resolution::Entity(item.id.clone());
        }
    }

    // 2d. Visible parts of the location and of items here.
    let mut part_parents: Vec<EntityId> = vec![loc_id.clone()];
    part_parents.extend(here.iter().cloned());
    for parent in part_parents {
        for part_id in acc.parts_of(parent.as_str()) {
            if match_part(acc, part_id.as_str(), &candidates, adjectives) {
                return Resolution::Entity(part_id);
            }
        }
    }

    // 3. Open or surface containers, one level deep.
    for entity_id in &here {
        let Some(container_item) = acc.item(entity_id.as_str()) else {
            continue;
        };
        let accessible = container_item
            .container()
            .is_some_and(|spec| spec.is_accessible());
        if !accessible {
            continue;
        }
        for inner_id in acc.entities_at(entity_id.as_str(), Some(EntityKind::Item)) {
            if match_item(acc, inner_id.as_str(), &candidates, adjectives) {
                return Resolution::Entity(inner_id);
            }
        }
    }

    // Universal surface fallback.
    let lowered = word.word.to_lowercase();
    if UNIVERSAL_SURFACES.contains(&lowered.as_str()) {
        return Resolution::Universal(lowered);
    }

    Resolution::NotFound
}

/// True when any connection of this location's exits carries the door, or
/// the legacy exit table references it. Lets both sides of a doorway see
/// the same door item.
fn door_referenced_from(acc: &dyn Accessor, loc_id: &str, door_id: &str) -> bool {
    if let Some(loc) = acc.location(loc_id) {
        if loc
            .exits
            .values()
            .any(|desc| desc.door_id.as_ref().is_some_and(|d| d == door_id))
        {
            return true;
        }
    }
    acc.exits_from_location(loc_id).iter().any(|exit_id| {
        acc.exit(exit_id.as_str())
            .and_then(|exit| exit.door_id.clone())
            .is_some_and(|d| d == door_id)
    })
}

fn match_item(acc: &dyn Accessor, item_id: &str, candidates: &[String], adjectives: &[String]) -> bool {
    let Some(item) = acc.item(item_id) else {
        return false;
    };
    // Id-exact addressing bypasses the hidden check.
    if candidates.iter().any(|c| c == item_id) {
        return true;
    }
    if item.is_hidden() {
        return false;
    }
    let mut names = vec![item.name.to_lowercase()];
    names.extend(item.synonyms().iter().map(|s| s.to_lowercase()));
    word_matches(candidates, item_id, &names)
        && adjectives_match(adjectives, &item.description, &item.adjectives())
}

fn match_actor(acc: &dyn Accessor, actor_id: &str, candidates: &[String], adjectives: &[String]) -> bool {
    let Some(actor) = acc.actor(actor_id) else {
        return false;
    };
    if candidates.iter().any(|c| c == actor_id) {
        return true;
    }
    if actor.is_hidden() {
        return false;
    }
    let mut names = vec![actor.name.to_lowercase()];
    names.extend(actor.synonyms().iter().map(|s| s.to_lowercase()));
    word_matches(candidates, actor_id, &names)
        && adjectives_match(adjectives, &actor.description, &[])
}

fn match_part(acc: &dyn Accessor, part_id: &str, candidates: &[String], adjectives: &[String]) -> bool {
    let Some(part) = acc.part(part_id) else {
        return false;
    };
    if candidates.iter().any(|c| c == part_id) {
        return true;
    }
    if part.is_hidden() {
        return false;
    }
    let mut names = vec![part.name.to_lowercase()];
    names.extend(part.synonyms().iter().map(|s| s.to_lowercase()));
    word_matches(candidates, part_id, &names)
        && adjectives_match(adjectives, part.description().unwrap_or(""), &[])
}

fn word_matches(candidates: &[String], id: &str, names: &[String]) -> bool {
    candidates
        .iter()
        .any(|c| c == id || names.iter().any(|n| n == c))
}

/// Every supplied adjective must appear in the description or the entity's
/// declared adjective list.
fn adjectives_match(adjectives: &[String], description: &str, declared: &[String]) -> bool {
    if adjectives.is_empty() {
        return true;
    }
    let desc = description.to_lowercase();
    adjectives.iter().all(|adj| {
        desc.contains(adj.as_str()) || declared.iter().any(|d| d.eq_ignore_ascii_case(adj))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::WorldAccessor;
    use crate::registry::BehaviorRegistry;
    use fabula_domain::{Actor, Item, Location, Metadata, Part, Properties, World};
    use serde_json::{json, Value};

    fn props(value: Value) -> Properties {
        match value {
            Value::Object(map) => Properties::from_map(map),
            other => panic!("expected object, got {other}"),
        }
    }

    fn empty_registry() -> BehaviorRegistry {
        BehaviorRegistry::load(Vec::new()).expect("empty registry")
    }

    fn test_world() -> World {
        let mut world = World::new(Metadata::titled("Test"));
        world.add_location(Location::new("loc_room", "Test Room", "A test room"));
        world.add_item(Item::new(
            "item_sword",
            "sword",
            "A rusty iron sword",
            "loc_room",
        ));
        world.add_item(
            Item::new("item_dagger", "sword", "A gleaming silver sword", "loc_room")
                .with_properties(props(json!({"synonyms": ["dagger"]}))),
        );
        world.add_item(
            Item::new("item_table", "table", "A wooden table", "loc_room")
                .with_properties(props(json!({"container": {"is_surface": true}}))),
        );
        world.add_item(Item::new("item_cup", "cup", "A tin cup", "item_table"));
        world.add_item(
            Item::new("item_chest", "chest", "A heavy chest", "loc_room")
                .with_properties(props(json!({"container": {"is_surface": false, "open": false}}))),
        );
        world.add_item(Item::new("item_coin", "coin", "A gold coin", "item_chest"));
        world.add_item(
            Item::new("item_ghost", "phantom", "A barely-there phantom", "loc_room")
                .with_properties(props(json!({"states": {"hidden": true}}))),
        );
        world.add_item(Item::new("item_apple", "apple", "A red apple", "player"));
        world.add_actor(
            Actor::new("player", "Adventurer", "You", "loc_room")
                .with_inventory(vec![EntityId::new("item_apple")]),
        );
        world.add_actor(Actor::new("npc_guard", "guard", "A bored guard", "loc_room"));
        world.add_part(
            Part::new("part_north_wall", "north wall", "loc_room")
                .with_properties(props(json!({"description": "A stone wall"}))),
        );
        world.rebuild_indices().expect("indices");
        world
    }

    fn resolve(world: &mut World, word: &str, adjectives: &[&str]) -> Resolution {
        let registry = empty_registry();
        let acc = WorldAccessor::new(world, &registry);
        let adjectives: Vec<String> = adjectives.iter().map(|s| s.to_string()).collect();
        resolve_object(&acc, "player", &WordEntry::noun(word), &adjectives)
    }

    #[test]
    fn inventory_is_searched_first() {
        let mut world = test_world();
        assert_eq!(
            resolve(&mut world, "apple", &[]),
            Resolution::Entity(EntityId::new("item_apple"))
        );
    }

    #[test]
    fn location_items_match_by_name() {
        let mut world = test_world();
        assert_eq!(
            resolve(&mut world, "table", &[]),
            Resolution::Entity(EntityId::new("item_table"))
        );
    }

    #[test]
    fn adjectives_disambiguate_same_named_items() {
        let mut world = test_world();
        assert_eq!(
            resolve(&mut world, "sword", &["silver"]),
            Resolution::Entity(EntityId::new("item_dagger"))
        );
        assert_eq!(
            resolve(&mut world, "sword", &["rusty"]),
            Resolution::Entity(EntityId::new("item_sword"))
        );
    }

    #[test]
    fn synonyms_from_entity_properties_match() {
        let mut world = test_world();
        assert_eq!(
            resolve(&mut world, "dagger", &[]),
            Resolution::Entity(EntityId::new("item_dagger"))
        );
    }

    #[test]
    fn actors_resolve_by_name() {
        let mut world = test_world();
        assert_eq!(
            resolve(&mut world, "guard", &[]),
            Resolution::Entity(EntityId::new("npc_guard"))
        );
    }

    #[test]
    fn surface_contents_are_visible_one_level_deep() {
        let mut world = test_world();
        assert_eq!(
            resolve(&mut world, "cup", &[]),
            Resolution::Entity(EntityId::new("item_cup"))
        );
    }

    #[test]
    fn closed_container_contents_are_invisible() {
        let mut world = test_world();
        assert_eq!(resolve(&mut world, "coin", &[]), Resolution::NotFound);

        if let Some(chest) = world.item_mut("item_chest") {
            chest.set_container_open(true);
        }
        assert_eq!(
            resolve(&mut world, "coin", &[]),
            Resolution::Entity(EntityId::new("item_coin"))
        );
    }

    #[test]
    fn hidden_entities_are_skipped_unless_addressed_by_id() {
        let mut world = test_world();
        assert_eq!(resolve(&mut world, "phantom", &[]), Resolution::NotFound);
        assert_eq!(
            resolve(&mut world, "item_ghost", &[]),
            Resolution::Entity(EntityId::new("item_ghost"))
        );
    }

    #[test]
    fn parts_resolve_by_name() {
        let mut world = test_world();
        assert_eq!(
            resolve(&mut world, "north wall", &[]),
            Resolution::Entity(EntityId::new("part_north_wall"))
        );
    }

    #[test]
    fn universal_surfaces_fall_back_when_no_part_exists() {
        let mut world = test_world();
        assert_eq!(
            resolve(&mut world, "ceiling", &[]),
            Resolution::Universal("ceiling".to_string())
        );
        // An explicit part takes precedence over the fallback.
        assert_eq!(
            resolve(&mut world, "north wall", &[]),
            Resolution::Entity(EntityId::new("part_north_wall"))
        );
    }

    #[test]
    fn doors_in_exit_slots_resolve_from_both_sides() {
        let mut world = test_world();
        world.add_location(Location::new("loc_hall", "Hall", "A hall"));
        let mut door = Item::new("door_iron", "door", "A heavy iron door", "exit:loc_room:east");
        door.properties.set("door", json!({"open": false}));
        world.add_item(door);
        world.rebuild_indices().expect("indices");

        assert_eq!(
            resolve(&mut world, "door", &["iron"]),
            Resolution::Entity(EntityId::new("door_iron"))
        );
    }

    #[test]
    fn unknown_words_are_not_found() {
        let mut world = test_world();
        assert_eq!(resolve(&mut world, "dragon", &[]), Resolution::NotFound);
    }
}
