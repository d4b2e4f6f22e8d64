//! Fabula domain layer: the world state model and everything derived from
//! it: typed entities over an open property map, containment and
//! exit-connection indices, the world-file loader/saver, and the structural
//! validators that gate every load.

pub mod entities;
pub mod error;
pub mod ids;
pub mod indices;
pub mod loader;
pub mod properties;
pub mod validators;
pub mod world;

pub use entities::{Actor, Exit, ExitDescriptor, ExitKind, Item, Location, Lock, Part};
pub use error::{DomainError, LoadError, ValidationError};
pub use ids::{is_reserved_actor_name, EntityId, EntityKind, ExitSlot, PLAYER};
pub use loader::{load_world, load_world_from_path, save_world_to_path, world_to_value};
pub use properties::{ContainerSpec, DoorState, Properties};
pub use validators::{validate_world, warn_soft_invariants};
pub use world::{EntityRef, Metadata, World};
