//! Item entity - objects that can be possessed or interacted with.
//!
//! A door is not a distinct type: it is an item whose properties carry a
//! `door` sub-map and whose `location` is a virtual `exit:<loc>:<direction>`
//! slot. Both connected locations can observe such an item. The door flags
//! exposed here are derived views over `properties.door`; the sub-map stays
//! authoritative so saving a world never needs reconciliation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::EntityId;
use crate::properties::{ContainerSpec, DoorState, Properties};

/// An object that can be possessed or interacted with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Id of the container: a location, actor, item, exit slot, or a
    /// removal sentinel.
    pub location: EntityId,
    /// Behavior modules attached to this item, in invocation order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub behaviors: Vec<String>,
    #[serde(flatten)]
    pub properties: Properties,
}

impl Item {
    pub fn new(
        id: impl Into<EntityId>,
        name: impl Into<String>,
        description: impl Into<String>,
        location: impl Into<EntityId>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            location: location.into(),
            behaviors: Vec::new(),
            properties: Properties::new(),
        }
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_behaviors(mut self, behaviors: Vec<String>) -> Self {
        self.behaviors = behaviors;
        self
    }

    // Door views (derived from properties.door)

    pub fn is_door(&self) -> bool {
        self.properties.get_map("door").is_some()
    }

    pub fn door(&self) -> Option<DoorState> {
        DoorState::from_properties(&self.properties)
    }

    pub fn door_open(&self) -> bool {
        self.door().map(|d| d.open).unwrap_or(false)
    }

    pub fn door_locked(&self) -> bool {
        self.door().map(|d| d.locked).unwrap_or(false)
    }

    pub fn door_lock_id(&self) -> Option<EntityId> {
        self.door().and_then(|d| d.lock_id)
    }

    pub fn set_door_open(&mut self, open: bool) {
        self.properties.set_in("door", "open", Value::Bool(open));
    }

    pub fn set_door_locked(&mut self, locked: bool) {
        self.properties.set_in("door", "locked", Value::Bool(locked));
    }

    // Container views (derived from properties.container)

    pub fn container(&self) -> Option<ContainerSpec> {
        ContainerSpec::from_properties(&self.properties)
    }

    pub fn is_container(&self) -> bool {
        self.properties.get_map("container").is_some()
    }

    pub fn set_container_open(&mut self, open: bool) {
        self.properties.set_in("container", "open", Value::Bool(open));
    }

    pub fn set_container_locked(&mut self, locked: bool) {
        self.properties
            .set_in("container", "locked", Value::Bool(locked));
    }

    // Common property reads

    pub fn is_portable(&self) -> bool {
        self.properties.bool_or("portable", false)
    }

    pub fn provides_light(&self) -> bool {
        self.properties.bool_or("provides_light", false)
    }

    pub fn is_hidden(&self) -> bool {
        self.properties.state_bool("hidden")
    }

    pub fn is_lit(&self) -> bool {
        self.properties.state_bool("lit")
    }

    pub fn synonyms(&self) -> Vec<String> {
        self.properties.get_str_list("synonyms")
    }

    pub fn adjectives(&self) -> Vec<String> {
        self.properties.get_str_list("adjectives")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_item_is_not_a_door() {
        let item = Item::new("item_sword", "sword", "A sharp sword", "loc_room");
        assert!(!item.is_door());
        assert!(!item.door_open());
        assert!(item.door_lock_id().is_none());
    }

    #[test]
    fn door_flags_read_through_properties() {
        let mut item = Item::new("door_iron", "door", "An iron door", "exit:loc_hall:east");
        item.properties.set(
            "door",
            json!({"open": false, "locked": true, "lock_id": "lock_1"}),
        );

        assert!(item.is_door());
        assert!(!item.door_open());
        assert!(item.door_locked());
        assert_eq!(item.door_lock_id(), Some(EntityId::new("lock_1")));

        item.set_door_locked(false);
        item.set_door_open(true);
        assert!(item.door_open());
        assert!(!item.door_locked());
        // lock_id untouched by the flag setters
        assert_eq!(item.door_lock_id(), Some(EntityId::new("lock_1")));
    }

    #[test]
    fn unknown_json_fields_land_in_properties() {
        let item: Item = serde_json::from_value(json!({
            "id": "item_torch",
            "name": "torch",
            "description": "A wooden torch",
            "location": "loc_cave",
            "portable": true,
            "states": {"lit": false},
            "custom_field": "custom_value"
        }))
        .expect("item parses");

        assert!(item.is_portable());
        assert!(!item.is_lit());
        assert_eq!(item.properties.get_str("custom_field"), Some("custom_value"));
    }

    #[test]
    fn serialization_flattens_properties_back() {
        let mut item = Item::new("item_chest", "chest", "A chest", "loc_room");
        item.properties
            .set("container", json!({"is_surface": false, "capacity": 10}));

        let value = serde_json::to_value(&item).expect("serializes");
        assert_eq!(value["container"]["capacity"], json!(10));
        assert_eq!(value["id"], json!("item_chest"));
        assert!(value.get("properties").is_none());
    }
}
