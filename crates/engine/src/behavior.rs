//! The behavior-module contract.
//!
//! A behavior module is a bundle of vocabulary, command handlers, event
//! handlers, and hook definitions. Registration is explicit: a module hands
//! the registry tables of named function pointers, so there is no reflection
//! anywhere in dispatch. Games extend the engine by registering additional
//! modules; later source tiers (`Core < Library < Game`) override earlier
//! ones on verb collisions.

use serde_json::{Map, Value};

use fabula_domain::EntityId;
use fabula_protocol::Action;

use crate::accessor::Accessor;
use crate::vocabulary::Vocabulary;

/// A command handler: one verb, one function.
pub type HandlerFn = fn(&mut dyn Accessor, &Action) -> HandlerResult;

/// An event handler, fired per entity reaction or per turn phase.
pub type EventFn = fn(&mut dyn Accessor, &EventContext) -> Option<EventResult>;

/// Where a module was loaded from. Later sources override earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SourceType {
    Core,
    Library,
    Game,
}

impl SourceType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Library => "library",
            Self::Game => "game",
        }
    }
}

/// Outcome of a command handler.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResult {
    pub success: bool,
    pub message: String,
    pub data: Option<Value>,
    /// Narration beats contributed by entity reactions and implicit
    /// positioning; the protocol handler folds them into the reply message.
    pub beats: Vec<String>,
}

impl HandlerResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
            beats: Vec::new(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            beats: Vec::new(),
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_beats(mut self, beats: Vec<String>) -> Self {
        self.beats = beats;
        self
    }

    pub fn push_beat(&mut self, beat: impl Into<String>) {
        self.beats.push(beat.into());
    }

    /// True when the message carries the corruption-latch prefix.
    pub fn is_inconsistent_state(&self) -> bool {
        self.message.starts_with("INCONSISTENT STATE:")
    }
}

/// Context handed to an event handler.
#[derive(Debug, Clone)]
pub struct EventContext {
    /// Event being fired (`on_take`, `on_npc_action`, ...).
    pub event: String,
    /// Target entity for entity-scoped events; `None` for turn phases.
    pub entity: Option<EntityId>,
    /// Verb that triggered the event, for `on_<verb>` reactions.
    pub verb: Option<String>,
    /// Hook the event is registered for, for turn phases.
    pub hook: Option<String>,
    /// Acting entity; defaults to the player.
    pub actor_id: EntityId,
    /// Free-form extra context.
    pub payload: Map<String, Value>,
}

impl EventContext {
    pub fn for_entity(event: impl Into<String>, entity: EntityId, actor_id: EntityId) -> Self {
        Self {
            event: event.into(),
            entity: Some(entity),
            verb: None,
            hook: None,
            actor_id,
            payload: Map::new(),
        }
    }

    pub fn for_phase(event: impl Into<String>, hook: impl Into<String>, actor_id: EntityId) -> Self {
        Self {
            event: event.into(),
            entity: None,
            verb: None,
            hook: Some(hook.into()),
            actor_id,
            payload: Map::new(),
        }
    }
}

/// Outcome of an event handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventResult {
    pub message: Option<String>,
    /// A vetoing reaction stops the remaining reactions for this event and
    /// asks the invoking handler to refuse further mutation.
    pub veto: bool,
}

impl EventResult {
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            message: Some(text.into()),
            veto: false,
        }
    }

    pub fn veto(text: impl Into<String>) -> Self {
        Self {
            message: Some(text.into()),
            veto: true,
        }
    }
}

/// How a hook is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookInvocation {
    /// Fired once per successful command, world-scoped.
    TurnPhase,
    /// Fired on a single entity as a side-effect of dispatch.
    Entity,
}

impl HookInvocation {
    pub fn label(&self) -> &'static str {
        match self {
            Self::TurnPhase => "turn_phase",
            Self::Entity => "entity",
        }
    }
}

/// Declaration of an extension point other modules can register events for.
#[derive(Debug, Clone, PartialEq)]
pub struct HookDefinition {
    pub hook: String,
    pub invocation: HookInvocation,
    /// Turn-phase hooks that must run before this one.
    pub after: Vec<String>,
    pub description: String,
    /// Module that declared the hook; filled in by the registry.
    pub defined_by: String,
}

impl HookDefinition {
    pub fn new(hook: impl Into<String>, invocation: HookInvocation) -> Self {
        Self {
            hook: hook.into(),
            invocation,
            after: Vec::new(),
            description: String::new(),
            defined_by: String::new(),
        }
    }

    pub fn with_after(mut self, after: &[&str]) -> Self {
        self.after = after.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// One event registration: `(event name, optional hook, handler)`.
#[derive(Debug, Clone)]
pub struct EventRegistration {
    pub event: String,
    pub hook: Option<String>,
    pub handler: EventFn,
}

impl EventRegistration {
    pub fn new(event: impl Into<String>, handler: EventFn) -> Self {
        Self {
            event: event.into(),
            hook: None,
            handler,
        }
    }

    pub fn for_hook(event: impl Into<String>, hook: impl Into<String>, handler: EventFn) -> Self {
        Self {
            event: event.into(),
            hook: Some(hook.into()),
            handler,
        }
    }
}

/// A loadable behavior module.
pub trait BehaviorModule {
    /// Stable module id, referenced by entity `behaviors` lists.
    fn name(&self) -> &'static str;

    fn source(&self) -> SourceType;

    fn vocabulary(&self) -> Vocabulary {
        Vocabulary::default()
    }

    fn handlers(&self) -> Vec<(&'static str, HandlerFn)> {
        Vec::new()
    }

    fn events(&self) -> Vec<EventRegistration> {
        Vec::new()
    }

    fn hook_definitions(&self) -> Vec<HookDefinition> {
        Vec::new()
    }
}
