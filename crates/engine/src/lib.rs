//! Fabula engine: binds a loaded world to a tree of behavior modules and
//! answers JSON command/query messages.
//!
//! The usual assembly, mirroring a game's startup order:
//!
//! ```no_run
//! use std::sync::Arc;
//! use fabula_engine::{behaviors, BehaviorRegistry, ProtocolHandler};
//!
//! let world = fabula_domain::load_world_from_path("world.json").expect("world loads");
//! let registry = BehaviorRegistry::load(behaviors::standard_modules()).expect("modules load");
//! let mut handler = ProtocolHandler::new(world, Arc::new(registry)).expect("handler binds");
//! let reply = handler.handle_json_str(r#"{"type":"command","action":{"verb":"look"}}"#);
//! println!("{reply}");
//! ```

pub mod accessor;
pub mod behavior;
pub mod behaviors;
pub mod error;
pub mod handler;
pub mod hook_validation;
pub mod registry;
pub mod resolver;
pub mod scheduler;
pub mod serializer;
pub mod vocabulary;

pub use accessor::{Accessor, UpdateOutcome, WorldAccessor};
pub use behavior::{
    BehaviorModule, EventContext, EventFn, EventRegistration, EventResult, HandlerFn,
    HandlerResult, HookDefinition, HookInvocation, SourceType,
};
pub use error::{EngineError, RegistryError};
pub use handler::{ProtocolHandler, META_VERBS};
pub use registry::BehaviorRegistry;
pub use resolver::{resolve_object, Resolution, UNIVERSAL_SURFACES};
pub use scheduler::{fire_phases, phase_order, BASE_TURN_PHASES};
pub use serializer::{
    entity_to_value, entity_to_value_with_rng, player_context, serialize_location, PlayerContext,
    SerializeOpts,
};
pub use vocabulary::{base_vocabulary, extract_nouns, VerbEntry, Vocabulary};
