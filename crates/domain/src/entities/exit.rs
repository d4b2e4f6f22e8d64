//! Exit entity - a first-class passage out of a location.
//!
//! Exits supersede the legacy per-location `exits` table: each exit belongs
//! to one location, optionally faces a compass direction (portals have
//! none), and opens onto the exits listed in `connections`. Traversal
//! follows a connection to its owning location.

use serde::{Deserialize, Serialize};

use crate::ids::EntityId;
use crate::properties::Properties;

/// A passage out of a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exit {
    pub id: EntityId,
    pub name: String,
    /// Originating location.
    pub location: EntityId,
    /// Compass word, or `None` for portals addressed by name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    /// Exit ids this exit opens onto. Symmetry is recommended in data but
    /// not enforced at load.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<EntityId>,
    /// Door item gating this exit, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub door_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub behaviors: Vec<String>,
    #[serde(flatten)]
    pub properties: Properties,
}

impl Exit {
    pub fn new(
        id: impl Into<EntityId>,
        name: impl Into<String>,
        location: impl Into<EntityId>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location: location.into(),
            direction: None,
            connections: Vec::new(),
            door_id: None,
            behaviors: Vec::new(),
            properties: Properties::new(),
        }
    }

    pub fn with_direction(mut self, direction: impl Into<String>) -> Self {
        self.direction = Some(direction.into());
        self
    }

    pub fn with_connections(mut self, connections: Vec<EntityId>) -> Self {
        self.connections = connections;
        self
    }

    pub fn with_door(mut self, door_id: impl Into<EntityId>) -> Self {
        self.door_id = Some(door_id.into());
        self
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    /// Portals are exits without a compass direction.
    pub fn is_portal(&self) -> bool {
        self.direction.is_none()
    }

    pub fn is_hidden(&self) -> bool {
        self.properties.state_bool("hidden")
    }

    pub fn synonyms(&self) -> Vec<String> {
        self.properties.get_str_list("synonyms")
    }
}
