//! Lock entity - referenced by doors and containers through `lock_id`.

use serde::{Deserialize, Serialize};

use crate::ids::EntityId;
use crate::properties::Properties;

/// A lock opened by one or more key items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lock {
    pub id: EntityId,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(flatten)]
    pub properties: Properties,
}

impl Lock {
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            description: String::new(),
            properties: Properties::new(),
        }
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    /// Ids of the key items that open this lock.
    pub fn opens_with(&self) -> Vec<EntityId> {
        self.properties
            .get_str_list("opens_with")
            .into_iter()
            .map(EntityId::from)
            .collect()
    }

    /// Message shown when unlocking fails.
    pub fn fail_message(&self) -> Option<&str> {
        self.properties.get_str("fail_message")
    }

    pub fn opens_with_contains(&self, key_id: &str) -> bool {
        self.opens_with().iter().any(|id| id == key_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn opens_with_and_fail_message_read_from_properties() {
        let lock: Lock = serde_json::from_value(json!({
            "id": "lock_1",
            "opens_with": ["item_key"],
            "fail_message": "The lock won't budge."
        }))
        .expect("lock parses");

        assert!(lock.opens_with_contains("item_key"));
        assert!(!lock.opens_with_contains("item_sword"));
        assert_eq!(lock.fail_message(), Some("The lock won't budge."));
    }
}
