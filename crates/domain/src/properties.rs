//! Open per-entity property storage.
//!
//! Every entity carries a free-form `properties` map. The loader promotes
//! any world-file field that is not a structural attribute into this map and
//! the saver flattens it back, so new behaviors can introduce new property
//! keys without schema changes. Nested sub-maps (`door`, `container`,
//! `states`, `llm_context`) are preserved verbatim; the typed views below
//! read through the map rather than caching, keeping save/load symmetrical.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::EntityId;

/// Free-form property map attached to every entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties(Map<String, Value>);

impl Properties {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    /// Boolean property with a default for the missing/mistyped case.
    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(Value::as_u64)
    }

    /// String-list property; missing or mistyped yields an empty list.
    pub fn get_str_list(&self, key: &str) -> Vec<String> {
        self.0
            .get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get_map(&self, key: &str) -> Option<&Map<String, Value>> {
        self.0.get(key).and_then(Value::as_object)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Merge `fields` into the map, replacing existing keys.
    pub fn merge(&mut self, fields: &Map<String, Value>) {
        for (key, value) in fields {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Read a boolean out of the `states` sub-map (false when absent).
    pub fn state_bool(&self, key: &str) -> bool {
        self.get_map("states")
            .and_then(|states| states.get(key))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Write a boolean into the `states` sub-map, creating it if needed.
    pub fn set_state(&mut self, key: impl Into<String>, value: bool) {
        let states = self
            .0
            .entry("states")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(map) = states {
            map.insert(key.into(), Value::Bool(value));
        }
    }

    /// Set one key inside a named sub-map, creating the sub-map if needed.
    /// Other keys of the sub-map are untouched.
    pub fn set_in(&mut self, sub_map: &str, key: impl Into<String>, value: Value) {
        let entry = self
            .0
            .entry(sub_map)
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(map) = entry {
            map.insert(key.into(), value);
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn as_map_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

/// Read-only view of the `door` sub-map that makes an item a door.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DoorState {
    pub open: bool,
    pub locked: bool,
    pub lock_id: Option<EntityId>,
}

impl DoorState {
    /// Present only when the entity carries a `door` sub-map.
    pub fn from_properties(properties: &Properties) -> Option<Self> {
        let door = properties.get_map("door")?;
        Some(Self {
            open: door.get("open").and_then(Value::as_bool).unwrap_or(false),
            locked: door.get("locked").and_then(Value::as_bool).unwrap_or(false),
            lock_id: door
                .get("lock_id")
                .and_then(Value::as_str)
                .map(EntityId::from),
        })
    }
}

/// Read-only view of the `container` sub-map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSpec {
    pub is_surface: bool,
    pub capacity: Option<u64>,
    pub open: bool,
    pub locked: bool,
    pub lock_id: Option<EntityId>,
}

impl ContainerSpec {
    /// Present only when the entity carries a `container` sub-map. Surfaces
    /// are always open; enclosed containers default to closed.
    pub fn from_properties(properties: &Properties) -> Option<Self> {
        let container = properties.get_map("container")?;
        let is_surface = container
            .get("is_surface")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        Some(Self {
            is_surface,
            capacity: container.get("capacity").and_then(Value::as_u64),
            open: container
                .get("open")
                .and_then(Value::as_bool)
                .unwrap_or(is_surface),
            locked: container
                .get("locked")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            lock_id: container
                .get("lock_id")
                .and_then(Value::as_str)
                .map(EntityId::from),
        })
    }

    /// Contents are reachable when the container is a surface or stands open.
    pub fn is_accessible(&self) -> bool {
        self.is_surface || self.open
    }
}
