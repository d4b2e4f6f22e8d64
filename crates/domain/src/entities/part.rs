//! Part entity - a named fragment of a location or item.

use serde::{Deserialize, Serialize};

use crate::ids::EntityId;
use crate::properties::Properties;

/// A part of a parent entity (the north wall of a room, the left side of a
/// bench). Parents must be locations or items; parts of parts are not
/// supported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub id: EntityId,
    pub name: String,
    /// Id of the parent entity.
    pub part_of: EntityId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub behaviors: Vec<String>,
    #[serde(flatten)]
    pub properties: Properties,
}

impl Part {
    pub fn new(
        id: impl Into<EntityId>,
        name: impl Into<String>,
        part_of: impl Into<EntityId>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            part_of: part_of.into(),
            behaviors: Vec::new(),
            properties: Properties::new(),
        }
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    pub fn description(&self) -> Option<&str> {
        self.properties.get_str("description")
    }

    pub fn synonyms(&self) -> Vec<String> {
        self.properties.get_str_list("synonyms")
    }

    pub fn is_hidden(&self) -> bool {
        self.properties.state_bool("hidden")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn description_lives_in_properties() {
        let part: Part = serde_json::from_value(json!({
            "id": "part_room_north_wall",
            "name": "north wall",
            "part_of": "loc_room",
            "description": "A stone wall"
        }))
        .expect("part parses");

        assert_eq!(part.part_of, EntityId::new("loc_room"));
        assert_eq!(part.description(), Some("A stone wall"));
    }
}
