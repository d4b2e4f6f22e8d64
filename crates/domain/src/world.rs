//! The world aggregate: every entity collection, the open `extra` payload
//! area, the turn counter, and the derived indices.
//!
//! Entity collections are insertion-ordered maps so that iteration order is
//! deterministic and matches the world file. All movement goes through
//! [`World::set_entity_where`]; the indices are private and cannot drift
//! from the entity graph.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::entities::{Actor, Exit, Item, Location, Lock, Part};
use crate::error::DomainError;
use crate::ids::{EntityId, EntityKind, ExitSlot};
use crate::indices::{ConnectionIndex, ContainmentIndex};

/// World-file metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub author: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_location: Option<EntityId>,
    /// Turn-phase hooks to run before the engine's base sequence.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_turn_phases: Vec<String>,
}

impl Metadata {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Borrowed view of an entity of any kind.
#[derive(Debug, Clone, Copy)]
pub enum EntityRef<'a> {
    Location(&'a Location),
    Item(&'a Item),
    Actor(&'a Actor),
    Lock(&'a Lock),
    Part(&'a Part),
    Exit(&'a Exit),
}

impl EntityRef<'_> {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Location(_) => EntityKind::Location,
            Self::Item(_) => EntityKind::Item,
            Self::Actor(_) => EntityKind::Actor,
            Self::Lock(_) => EntityKind::Lock,
            Self::Part(_) => EntityKind::Part,
            Self::Exit(_) => EntityKind::Exit,
        }
    }

    pub fn id(&self) -> &EntityId {
        match self {
            Self::Location(e) => &e.id,
            Self::Item(e) => &e.id,
            Self::Actor(e) => &e.id,
            Self::Lock(e) => &e.id,
            Self::Part(e) => &e.id,
            Self::Exit(e) => &e.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Location(e) => &e.name,
            Self::Item(e) => &e.name,
            Self::Actor(e) => &e.name,
            Self::Lock(e) => &e.name,
            Self::Part(e) => &e.name,
            Self::Exit(e) => &e.name,
        }
    }

    /// Display description. Parts and exits keep theirs in properties.
    pub fn description(&self) -> Option<&str> {
        let text = match self {
            Self::Location(e) => e.description.as_str(),
            Self::Item(e) => e.description.as_str(),
            Self::Actor(e) => e.description.as_str(),
            Self::Lock(e) => e.description.as_str(),
            Self::Part(e) => e.properties.get_str("description").unwrap_or(""),
            Self::Exit(e) => e.properties.get_str("description").unwrap_or(""),
        };
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    pub fn properties(&self) -> &crate::properties::Properties {
        match self {
            Self::Location(e) => &e.properties,
            Self::Item(e) => &e.properties,
            Self::Actor(e) => &e.properties,
            Self::Lock(e) => &e.properties,
            Self::Part(e) => &e.properties,
            Self::Exit(e) => &e.properties,
        }
    }

    /// The entity's `behaviors` list; locks carry none.
    pub fn behaviors(&self) -> &[String] {
        match self {
            Self::Location(e) => &e.behaviors,
            Self::Item(e) => &e.behaviors,
            Self::Actor(e) => &e.behaviors,
            Self::Lock(_) => &[],
            Self::Part(e) => &e.behaviors,
            Self::Exit(e) => &e.behaviors,
        }
    }
}

/// Complete game state for one world.
#[derive(Debug, Clone, Default)]
pub struct World {
    pub metadata: Metadata,
    pub locations: IndexMap<EntityId, Location>,
    pub items: IndexMap<EntityId, Item>,
    pub actors: IndexMap<EntityId, Actor>,
    pub locks: IndexMap<EntityId, Lock>,
    pub parts: IndexMap<EntityId, Part>,
    pub exits: IndexMap<EntityId, Exit>,
    /// Behavior-scoped payloads (recipes, item templates, ...).
    pub extra: Map<String, Value>,
    pub turn_count: u64,
    containment: ContainmentIndex,
    connections: ConnectionIndex,
}

impl World {
    pub fn new(metadata: Metadata) -> Self {
        Self {
            metadata,
            ..Self::default()
        }
    }

    // Construction helpers, used by the loader and by test fixtures. The
    // indices are stale until `rebuild_indices` runs.

    pub fn add_location(&mut self, location: Location) {
        self.locations.insert(location.id.clone(), location);
    }

    pub fn add_item(&mut self, item: Item) {
        self.items.insert(item.id.clone(), item);
    }

    pub fn add_actor(&mut self, actor: Actor) {
        self.actors.insert(actor.id.clone(), actor);
    }

    pub fn add_lock(&mut self, lock: Lock) {
        self.locks.insert(lock.id.clone(), lock);
    }

    pub fn add_part(&mut self, part: Part) {
        self.parts.insert(part.id.clone(), part);
    }

    pub fn add_exit(&mut self, exit: Exit) {
        self.exits.insert(exit.id.clone(), exit);
    }

    /// Rebuild both derived indices from entity fields. Called after load
    /// and after any bulk construction.
    pub fn rebuild_indices(&mut self) -> Result<(), DomainError> {
        self.containment = ContainmentIndex::build(&self.items, &self.actors);
        self.connections = ConnectionIndex::build(&self.exits)?;
        Ok(())
    }

    // Lookups

    pub fn location(&self, id: &str) -> Option<&Location> {
        self.locations.get(id)
    }

    pub fn location_mut(&mut self, id: &str) -> Option<&mut Location> {
        self.locations.get_mut(id)
    }

    pub fn item(&self, id: &str) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn item_mut(&mut self, id: &str) -> Option<&mut Item> {
        self.items.get_mut(id)
    }

    pub fn actor(&self, id: &str) -> Option<&Actor> {
        self.actors.get(id)
    }

    pub fn actor_mut(&mut self, id: &str) -> Option<&mut Actor> {
        self.actors.get_mut(id)
    }

    pub fn lock(&self, id: &str) -> Option<&Lock> {
        self.locks.get(id)
    }

    pub fn lock_mut(&mut self, id: &str) -> Option<&mut Lock> {
        self.locks.get_mut(id)
    }

    pub fn part(&self, id: &str) -> Option<&Part> {
        self.parts.get(id)
    }

    pub fn part_mut(&mut self, id: &str) -> Option<&mut Part> {
        self.parts.get_mut(id)
    }

    pub fn exit(&self, id: &str) -> Option<&Exit> {
        self.exits.get(id)
    }

    pub fn exit_mut(&mut self, id: &str) -> Option<&mut Exit> {
        self.exits.get_mut(id)
    }

    pub fn player(&self) -> Option<&Actor> {
        self.actors.get(crate::ids::PLAYER)
    }

    pub fn player_mut(&mut self) -> Option<&mut Actor> {
        self.actors.get_mut(crate::ids::PLAYER)
    }

    /// Look up an entity of any kind.
    pub fn entity(&self, id: &str) -> Option<EntityRef<'_>> {
        if let Some(loc) = self.locations.get(id) {
            Some(EntityRef::Location(loc))
        } else if let Some(item) = self.items.get(id) {
            Some(EntityRef::Item(item))
        } else if let Some(actor) = self.actors.get(id) {
            Some(EntityRef::Actor(actor))
        } else if let Some(lock) = self.locks.get(id) {
            Some(EntityRef::Lock(lock))
        } else if let Some(part) = self.parts.get(id) {
            Some(EntityRef::Part(part))
        } else {
            self.exits.get(id).map(EntityRef::Exit)
        }
    }

    /// Structural kind of a known entity id.
    pub fn entity_kind(&self, id: &str) -> Option<EntityKind> {
        if self.locations.contains_key(id) {
            Some(EntityKind::Location)
        } else if self.items.contains_key(id) {
            Some(EntityKind::Item)
        } else if self.actors.contains_key(id) {
            Some(EntityKind::Actor)
        } else if self.locks.contains_key(id) {
            Some(EntityKind::Lock)
        } else if self.parts.contains_key(id) {
            Some(EntityKind::Part)
        } else if self.exits.contains_key(id) {
            Some(EntityKind::Exit)
        } else {
            None
        }
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.entity_kind(id).is_some()
    }

    // Containment queries

    /// Entities located in `container`, optionally filtered by kind.
    pub fn entities_at(&self, container: &str, kind: Option<EntityKind>) -> Vec<EntityId> {
        let all = self.containment.at(container);
        match kind {
            None => all,
            Some(wanted) => all
                .into_iter()
                .filter(|id| self.entity_kind(id.as_str()) == Some(wanted))
                .collect(),
        }
    }

    pub fn entity_where(&self, id: &str) -> Option<EntityId> {
        self.containment.where_of(id).cloned()
    }

    pub fn parts_of(&self, parent_id: &str) -> Vec<EntityId> {
        self.parts
            .values()
            .filter(|part| part.part_of == parent_id)
            .map(|part| part.id.clone())
            .collect()
    }

    pub fn current_location(&self, actor_id: &str) -> Option<EntityId> {
        self.actors.get(actor_id).map(|actor| actor.location.clone())
    }

    /// Move an item or actor into a new container. The only supported way
    /// to relocate an entity: it updates the entity's `location` field and
    /// both directions of the containment index in one step. A removal
    /// sentinel target removes the entity from the indices while keeping
    /// its record.
    pub fn set_entity_where(&mut self, entity: &str, container: &str) -> Result<(), DomainError> {
        let is_item = self.items.contains_key(entity);
        let is_actor = self.actors.contains_key(entity);
        if !is_item && !is_actor {
            return Err(DomainError::not_found("entity", entity));
        }

        let target = EntityId::new(container);
        if !self.is_valid_container(&target) {
            return Err(DomainError::container_not_found(container));
        }

        if entity == container {
            return Err(DomainError::inconsistent(format!(
                "entity '{entity}' cannot contain itself"
            )));
        }
        if is_item && self.items.contains_key(container) {
            // Walk the target's parent chain; reaching the moved entity
            // would create a containment cycle.
            let mut current = container.to_string();
            while let Some(item) = self.items.get(current.as_str()) {
                if item.location == entity {
                    return Err(DomainError::inconsistent(format!(
                        "moving '{entity}' into '{container}' would create a containment cycle"
                    )));
                }
                current = item.location.to_string();
            }
        }

        let entity_id = EntityId::new(entity);
        if let Some(item) = self.items.get_mut(entity) {
            item.location = target.clone();
        } else if let Some(actor) = self.actors.get_mut(entity) {
            actor.location = target.clone();
        }
        self.containment.move_entity(&entity_id, &target);
        Ok(())
    }

    /// Valid move targets: known entities, removal sentinels, and exit
    /// slots whose location exists.
    fn is_valid_container(&self, container: &EntityId) -> bool {
        if container.is_removal_sentinel() {
            return true;
        }
        if let Some(slot) = container.exit_slot() {
            return self.locations.contains_key(slot.location.as_str());
        }
        self.contains_id(container.as_str())
    }

    // Exit queries

    pub fn exit_connections(&self, exit_id: &str) -> Vec<EntityId> {
        self.connections.connections_of(exit_id)
    }

    pub fn exits_from_location(&self, loc_id: &str) -> Vec<EntityId> {
        self.exits
            .values()
            .filter(|exit| exit.location == loc_id)
            .map(|exit| exit.id.clone())
            .collect()
    }

    pub fn connect_exits(&mut self, a: &str, b: &str) -> Result<(), DomainError> {
        for id in [a, b] {
            if !self.exits.contains_key(id) {
                return Err(DomainError::not_found("exit", id));
            }
        }
        let (a_id, b_id) = (EntityId::new(a), EntityId::new(b));
        if let Some(exit) = self.exits.get_mut(a) {
            if !exit.connections.contains(&b_id) {
                exit.connections.push(b_id.clone());
            }
        }
        if let Some(exit) = self.exits.get_mut(b) {
            if !exit.connections.contains(&a_id) {
                exit.connections.push(a_id.clone());
            }
        }
        self.connections.connect(&a_id, &b_id);
        Ok(())
    }

    pub fn disconnect_exits(&mut self, a: &str, b: &str) -> Result<(), DomainError> {
        for id in [a, b] {
            if !self.exits.contains_key(id) {
                return Err(DomainError::not_found("exit", id));
            }
        }
        let (a_id, b_id) = (EntityId::new(a), EntityId::new(b));
        if let Some(exit) = self.exits.get_mut(a) {
            exit.connections.retain(|c| c != &b_id);
        }
        if let Some(exit) = self.exits.get_mut(b) {
            exit.connections.retain(|c| c != &a_id);
        }
        self.connections.disconnect(&a_id, &b_id);
        Ok(())
    }

    /// The door item occupying the `exit:<loc>:<direction>` slot, falling
    /// back to the legacy exit table's `door_id`.
    pub fn door_for_exit(&self, loc_id: &str, direction: &str) -> Option<EntityId> {
        let slot = ExitSlot::new(loc_id, direction).id();
        if let Some(item) = self.items.values().find(|i| i.is_door() && i.location == slot) {
            return Some(item.id.clone());
        }
        self.locations
            .get(loc_id)
            .and_then(|loc| loc.exits.get(direction))
            .and_then(|desc| desc.door_id.clone())
    }

    /// Look up an item by id, but only if it is a door.
    pub fn door_item(&self, id: &str) -> Option<&Item> {
        self.items.get(id).filter(|item| item.is_door())
    }

    pub fn increment_turn(&mut self) {
        self.turn_count += 1;
    }
}
