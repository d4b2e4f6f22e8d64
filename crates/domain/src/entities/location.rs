//! Location entity and the legacy per-location exit table.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ids::EntityId;
use crate::properties::Properties;

/// A place an actor can occupy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Legacy direction -> descriptor table. Worlds using first-class
    /// [`Exit`](crate::entities::Exit) entities may leave this empty.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub exits: IndexMap<String, ExitDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub behaviors: Vec<String>,
    #[serde(flatten)]
    pub properties: Properties,
}

impl Location {
    pub fn new(
        id: impl Into<EntityId>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            exits: IndexMap::new(),
            behaviors: Vec::new(),
            properties: Properties::new(),
        }
    }

    pub fn with_exit(mut self, direction: impl Into<String>, exit: ExitDescriptor) -> Self {
        self.exits.insert(direction.into(), exit);
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
}

/// Kind of a legacy exit table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitKind {
    #[default]
    Open,
    Door,
}

/// One entry in a location's legacy `exits` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitDescriptor {
    #[serde(rename = "type", default)]
    pub kind: ExitKind,
    /// Destination location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<EntityId>,
    /// Door item guarding this exit, for `type: door` entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub door_id: Option<EntityId>,
    #[serde(flatten)]
    pub properties: Properties,
}

impl ExitDescriptor {
    pub fn open(to: impl Into<EntityId>) -> Self {
        Self {
            kind: ExitKind::Open,
            to: Some(to.into()),
            door_id: None,
            properties: Properties::new(),
        }
    }

    pub fn door(to: impl Into<EntityId>, door_id: impl Into<EntityId>) -> Self {
        Self {
            kind: ExitKind::Door,
            to: Some(to.into()),
            door_id: Some(door_id.into()),
            properties: Properties::new(),
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.properties.bool_or("hidden", false)
    }
}
