//! Entity identity types.
//!
//! Every entity in a world carries an author-written string id that is
//! globally unique within that world. Three reserved forms exist:
//!
//! - `player` always names the viewpoint actor.
//! - `__<anything>__` is a removal sentinel: an entity whose location is a
//!   sentinel keeps its record for audit but leaves every index.
//! - `exit:<location>:<direction>` is a virtual location denoting a door's
//!   slot in an exit. [`ExitSlot`] is the single canonical parse of that
//!   form, shared by the loader, the validators, and the serializer.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The reserved id of the viewpoint actor.
pub const PLAYER: &str = "player";

/// Actor names that may not be used, case-insensitively. They collide with
/// self-reference vocabulary or generic parser terms.
pub const RESERVED_ACTOR_NAMES: [&str; 5] = ["player", "npc", "self", "me", "myself"];

/// Identifier of a world entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The reserved viewpoint-actor id.
    pub fn player() -> Self {
        Self(PLAYER.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_player(&self) -> bool {
        self.0 == PLAYER
    }

    /// True for `__<anything>__` ids, which mark an entity as logically
    /// destroyed while its record is retained.
    pub fn is_removal_sentinel(&self) -> bool {
        self.0.starts_with("__")
    }

    /// Parse this id as a virtual door slot, if it has the `exit:` form.
    pub fn exit_slot(&self) -> Option<ExitSlot> {
        ExitSlot::parse(&self.0)
    }

    pub fn is_exit_slot(&self) -> bool {
        self.0.starts_with("exit:")
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for EntityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for EntityId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for EntityId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// A door's virtual slot in an exit: `exit:<location>:<direction>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitSlot {
    pub location: EntityId,
    pub direction: String,
}

impl ExitSlot {
    pub fn new(location: impl Into<EntityId>, direction: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            direction: direction.into(),
        }
    }

    /// Parse `exit:<location>:<direction>`. Both tokens must be non-empty
    /// and the form must have exactly three segments.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.splitn(3, ':');
        if parts.next()? != "exit" {
            return None;
        }
        let location = parts.next()?;
        let direction = parts.next()?;
        if location.is_empty() || direction.is_empty() || direction.contains(':') {
            return None;
        }
        Some(Self::new(location, direction))
    }

    /// Format the slot back into its canonical id.
    pub fn id(&self) -> EntityId {
        EntityId::new(format!("exit:{}:{}", self.location, self.direction))
    }
}

impl fmt::Display for ExitSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exit:{}:{}", self.location, self.direction)
    }
}

/// The structural kind of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Location,
    Item,
    Actor,
    Lock,
    Part,
    Exit,
}

impl EntityKind {
    /// Lower-case label used in diagnostics and validation messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Location => "location",
            Self::Item => "item",
            Self::Actor => "actor",
            Self::Lock => "lock",
            Self::Part => "part",
            Self::Exit => "exit",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Case-insensitive check against [`RESERVED_ACTOR_NAMES`].
pub fn is_reserved_actor_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    RESERVED_ACTOR_NAMES.contains(&lower.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_slot_round_trips() {
        let slot = ExitSlot::parse("exit:loc_hall:east").expect("valid slot");
        assert_eq!(slot.location, "loc_hall");
        assert_eq!(slot.direction, "east");
        assert_eq!(slot.id().as_str(), "exit:loc_hall:east");
    }

    #[test]
    fn exit_slot_rejects_malformed_forms() {
        assert!(ExitSlot::parse("exit:loc_hall").is_none());
        assert!(ExitSlot::parse("exit::east").is_none());
        assert!(ExitSlot::parse("exit:loc_hall:").is_none());
        assert!(ExitSlot::parse("exit:loc:east:extra").is_none());
        assert!(ExitSlot::parse("door:loc_hall:east").is_none());
    }

    #[test]
    fn removal_sentinels_are_detected() {
        assert!(EntityId::new("__consumed_by_player__").is_removal_sentinel());
        assert!(!EntityId::new("item_sword").is_removal_sentinel());
    }

    #[test]
    fn reserved_actor_names_match_case_insensitively() {
        assert!(is_reserved_actor_name("Player"));
        assert!(is_reserved_actor_name("MYSELF"));
        assert!(!is_reserved_actor_name("guard"));
    }
}
