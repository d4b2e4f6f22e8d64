//! Actor entity - the player and NPCs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::EntityId;
use crate::properties::Properties;

/// An actor occupying a location. The reserved id `player` is the viewpoint
/// actor; every other actor is an NPC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub id: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Id of the location this actor occupies.
    pub location: EntityId,
    /// Ordered item ids the actor carries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inventory: Vec<EntityId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub behaviors: Vec<String>,
    #[serde(flatten)]
    pub properties: Properties,
}

impl Actor {
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
            inventory: Vec::new(),
            behaviors: Vec::new(),
            properties: Properties::new(),
        }
    }

    pub fn with_inventory(mut self, inventory: Vec<EntityId>) -> Self {
        self.inventory = inventory;
        self
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_behaviors(mut self, behaviors: Vec<String>) -> Self {
        self.behaviors = behaviors;
        self
    }

    pub fn is_player(&self) -> bool {
        self.id.is_player()
    }

    pub fn carries(&self, item_id: &str) -> bool {
        self.inventory.iter().any(|id| id == item_id)
    }

    pub fn remove_from_inventory(&mut self, item_id: &str) {
        self.inventory.retain(|id| id != item_id);
    }

    // Positioning properties, cooperatively maintained by spatial handlers.

    /// Entity the actor is currently interacting with, if any. Survives
    /// across turns until explicitly changed.
    pub fn focused_on(&self) -> Option<EntityId> {
        self.properties.get_str("focused_on").map(EntityId::from)
    }

    pub fn set_focused_on(&mut self, target: Option<&EntityId>) {
        match target {
            Some(id) => self
                .properties
                .set("focused_on", Value::String(id.to_string())),
            None => self.properties.set("focused_on", Value::Null),
        }
    }

    /// Free-form posture string (`cover`, `concealed`, `climbing`,
    /// `on_surface`). Cleared on any movement-inducing focus change.
    pub fn posture(&self) -> Option<String> {
        self.properties.get_str("posture").map(str::to_string)
    }

    pub fn set_posture(&mut self, posture: Option<&str>) {
        match posture {
            Some(p) => self.properties.set("posture", Value::String(p.to_string())),
            None => self.properties.set("posture", Value::Null),
        }
    }

    pub fn synonyms(&self) -> Vec<String> {
        self.properties.get_str_list("synonyms")
    }

    pub fn is_hidden(&self) -> bool {
        self.properties.state_bool("hidden")
    }
}
