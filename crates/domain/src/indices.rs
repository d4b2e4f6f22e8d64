//! Derived indices over world state.
//!
//! Both indices are rebuilt from entity fields at load time and never
//! persisted. They are mutated only through the world's mutation methods so
//! the entity graph and the indices cannot drift apart.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};

use crate::entities::{Actor, Exit, Item};
use crate::error::DomainError;
use crate::ids::EntityId;

/// Bidirectional containment map: container id -> entities located there,
/// and entity id -> current container. Entities whose location is a removal
/// sentinel appear in neither direction.
#[derive(Debug, Clone, Default)]
pub struct ContainmentIndex {
    entities_at: HashMap<EntityId, IndexSet<EntityId>>,
    entity_where: HashMap<EntityId, EntityId>,
}

impl ContainmentIndex {
    /// Build from item locations, actor locations, and actor inventories.
    pub fn build(items: &IndexMap<EntityId, Item>, actors: &IndexMap<EntityId, Actor>) -> Self {
        let mut index = Self::default();
        for item in items.values() {
            index.insert(&item.id, &item.location);
        }
        for actor in actors.values() {
            index.insert(&actor.id, &actor.location);
            // Inventory items may carry `location: <actor>` already; insert
            // is idempotent for the same pair.
            for item_id in &actor.inventory {
                index.insert(item_id, &actor.id);
            }
        }
        index
    }

    /// Record `entity` as being inside `container`. Sentinel containers are
    /// ignored: removed entities live in no index.
    pub fn insert(&mut self, entity: &EntityId, container: &EntityId) {
        if container.is_removal_sentinel() {
            return;
        }
        self.entities_at
            .entry(container.clone())
            .or_default()
            .insert(entity.clone());
        self.entity_where
            .insert(entity.clone(), container.clone());
    }

    /// Drop `entity` from both directions.
    pub fn remove(&mut self, entity: &EntityId) {
        if let Some(container) = self.entity_where.remove(entity) {
            if let Some(set) = self.entities_at.get_mut(&container) {
                set.shift_remove(entity);
            }
        }
    }

    /// Re-home `entity` into `container`; a sentinel target removes it.
    pub fn move_entity(&mut self, entity: &EntityId, container: &EntityId) {
        self.remove(entity);
        self.insert(entity, container);
    }

    /// Entities inside `container`, in insertion order.
    pub fn at(&self, container: &str) -> Vec<EntityId> {
        self.entities_at
            .get(container)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn where_of(&self, entity: &str) -> Option<&EntityId> {
        self.entity_where.get(entity)
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.entity_where.contains_key(entity)
    }
}

/// Exit-connection map: exit id -> exits it opens onto.
#[derive(Debug, Clone, Default)]
pub struct ConnectionIndex {
    connected_to: HashMap<EntityId, IndexSet<EntityId>>,
}

impl ConnectionIndex {
    /// Build from each exit's `connections` list. A connection naming an
    /// unknown exit is an error.
    pub fn build(exits: &IndexMap<EntityId, Exit>) -> Result<Self, DomainError> {
        let mut index = Self::default();
        for exit in exits.values() {
            let entry = index.connected_to.entry(exit.id.clone()).or_default();
            for target in &exit.connections {
                if !exits.contains_key(target.as_str()) {
                    return Err(DomainError::constraint(format!(
                        "Exit '{}' connects to '{}' which does not exist",
                        exit.id, target
                    )));
                }
                entry.insert(target.clone());
            }
        }
        Ok(index)
    }

    pub fn connect(&mut self, a: &EntityId, b: &EntityId) {
        self.connected_to
            .entry(a.clone())
            .or_default()
            .insert(b.clone());
        self.connected_to
            .entry(b.clone())
            .or_default()
            .insert(a.clone());
    }

    pub fn disconnect(&mut self, a: &EntityId, b: &EntityId) {
        if let Some(set) = self.connected_to.get_mut(a) {
            set.shift_remove(b);
        }
        if let Some(set) = self.connected_to.get_mut(b) {
            set.shift_remove(a);
        }
    }

    pub fn connections_of(&self, exit_id: &str) -> Vec<EntityId> {
        self.connected_to
            .get(exit_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }
}
