//! The JSON protocol handler.
//!
//! Owns one world, the behavior registry, the corruption latch, and the
//! cached turn-phase order. Messages are dispatched by `type`: commands
//! route through the verb registry and advance the turn on success; queries
//! are read-only and never fire phases. A handler whose failure message
//! begins `INCONSISTENT STATE:` latches the corruption flag, after which
//! only the meta verbs keep answering. The latch is per-handler state and
//! never clears within a process.

use std::sync::Arc;

use serde_json::{Map, Value};

use fabula_domain::{validate_world, EntityId, EntityKind, World};
use fabula_protocol::{Action, Message, Reply};

use crate::accessor::{Accessor, WorldAccessor};
use crate::error::EngineError;
use crate::hook_validation;
use crate::registry::BehaviorRegistry;
use crate::scheduler::{fire_phases, phase_order};
use crate::serializer::{entity_to_value, player_context, serialize_location, SerializeOpts};
use crate::vocabulary::{base_vocabulary, extract_nouns};

/// Verbs that keep working after state corruption.
pub const META_VERBS: [&str; 4] = ["save", "quit", "help", "load"];

/// Protocol handler bound to one world.
pub struct ProtocolHandler {
    world: World,
    registry: Arc<BehaviorRegistry>,
    corrupted: bool,
    phase_order: Vec<String>,
}

impl ProtocolHandler {
    /// Bind a world to a loaded registry. Runs the world-sanity gates that
    /// need both sides (behavior references and the turn-phase-on-entity
    /// ban) and caches the topological phase order. Any failure aborts
    /// construction; the engine does not start in partial validity.
    pub fn new(world: World, registry: Arc<BehaviorRegistry>) -> Result<Self, EngineError> {
        let module_names = registry.loaded_module_names();
        validate_world(&world, Some(&module_names))?;

        let mut errors = Vec::new();
        hook_validation::validate_turn_phase_not_on_entities(
            &world,
            &registry.turn_phase_modules(),
            &mut errors,
        );
        if !errors.is_empty() {
            return Err(crate::error::RegistryError::new(errors).into());
        }

        let phase_order = phase_order(&world.metadata, &registry)?;
        Ok(Self {
            world,
            registry,
            corrupted: false,
            phase_order,
        })
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// The host applies save/load signals through this.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn is_corrupted(&self) -> bool {
        self.corrupted
    }

    pub fn turn_count(&self) -> u64 {
        self.world.turn_count
    }

    /// Parse a JSON string, handle it, and serialize the reply.
    pub fn handle_json_str(&mut self, input: &str) -> String {
        let reply = match serde_json::from_str::<Value>(input) {
            Ok(value) => self.handle_value(&value),
            Err(e) => serde_json::to_value(Reply::error(format!("Invalid JSON: {e}")))
                .unwrap_or(Value::Null),
        };
        serde_json::to_string(&reply).unwrap_or_else(|_| "{\"type\":\"error\"}".to_string())
    }

    /// Handle a parsed JSON value, mapping unknown shapes to error replies.
    pub fn handle_value(&mut self, value: &Value) -> Value {
        let message_type = value.get("type").and_then(Value::as_str);
        let reply = match message_type {
            Some("command") | Some("query") => match serde_json::from_value::<Message>(value.clone()) {
                Ok(message) => self.handle_message(message),
                Err(e) => Reply::error(format!("Malformed message: {e}")),
            },
            other => Reply::error(format!("Unknown message type: {}", other.unwrap_or("(none)"))),
        };
        serde_json::to_value(&reply).unwrap_or(Value::Null)
    }

    /// Route a typed message to its handler.
    pub fn handle_message(&mut self, message: Message) -> Reply {
        match message {
            Message::Command { action } => self.handle_command(action),
            Message::Query {
                query_type,
                entity_type,
                entity_id,
                location_id,
                actor_id,
                include,
            } => self.handle_query(
                &query_type,
                entity_type.as_deref(),
                entity_id.as_deref(),
                location_id.as_deref(),
                actor_id.as_deref(),
                &include,
            ),
        }
    }

    fn handle_command(&mut self, action: Action) -> Reply {
        let Some(verb) = action.verb.clone() else {
            return Reply::error("Missing required field: action");
        };

        if self.corrupted && !META_VERBS.contains(&verb.as_str()) {
            return Reply::fatal(verb.as_str(), "Game state is corrupted. Please save and restart.");
        }

        let action = action.normalized("player");
        let actor_id = EntityId::new(action.actor());

        let Some(handler) = self.registry.handler_for(&verb) else {
            return Reply::fail(
                verb.as_str(),
                format!("I don't understand '{verb}'. Try actions like go, take, open, or examine."),
            );
        };

        tracing::debug!(verb = %verb, actor = %actor_id, "dispatching command");
        let registry = Arc::clone(&self.registry);
        let result = {
            let mut acc = WorldAccessor::new(&mut self.world, &registry);
            handler(&mut acc, &action)
        };

        if !result.success && result.is_inconsistent_state() {
            self.corrupted = true;
            tracing::error!(verb = %verb, message = %result.message, "corruption latch set");
            return Reply::fatal(verb.as_str(), result.message);
        }

        if !result.success {
            return Reply::fail(verb.as_str(), result.message);
        }

        // Fold reaction beats into the narration.
        let mut message = result.message;
        for beat in &result.beats {
            if !beat.is_empty() {
                if !message.is_empty() {
                    message.push(' ');
                }
                message.push_str(beat);
            }
        }

        // Successful command: the turn advances, then phases fire in order.
        self.world.increment_turn();
        let turn_messages = {
            let mut acc = WorldAccessor::new(&mut self.world, &registry);
            fire_phases(&mut acc, &registry, &self.phase_order, &actor_id)
        };

        let mut reply = Reply::ok(verb.as_str(), message);
        if let Some(data) = result.data {
            reply = reply.with_data(data);
        }
        if let Reply::Result {
            turn_phase_messages,
            ..
        } = &mut reply
        {
            *turn_phase_messages = turn_messages;
        }
        reply
    }

    fn handle_query(
        &mut self,
        query_type: &str,
        entity_type: Option<&str>,
        entity_id: Option<&str>,
        location_id: Option<&str>,
        actor_id: Option<&str>,
        include: &[String],
    ) -> Reply {
        match query_type {
            "location" => self.query_location(actor_id.unwrap_or("player"), include),
            "entity" => self.query_entity(entity_type.unwrap_or(""), entity_id.unwrap_or("")),
            "entities" => self.query_entities(entity_type, location_id),
            "vocabulary" => self.query_vocabulary(),
            "metadata" => self.query_metadata(),
            other => Reply::error(format!("Unknown query type: {other}")),
        }
    }

    fn query_location(&mut self, actor_id: &str, include: &[String]) -> Reply {
        let Some(loc_id) = self.world.current_location(actor_id) else {
            return Reply::error(format!("Actor not found: {actor_id}"));
        };
        let registry = Arc::clone(&self.registry);
        let acc = WorldAccessor::new(&mut self.world, &registry);
        let full = serialize_location(&acc, loc_id.as_str(), actor_id);

        let data = if include.is_empty() {
            full
        } else {
            let mut filtered = Map::new();
            if let Value::Object(full) = full {
                if let Some(location) = full.get("location") {
                    filtered.insert("location".to_string(), location.clone());
                }
                for key in ["items", "doors", "exits", "actors"] {
                    if include.iter().any(|k| k == key) {
                        if let Some(section) = full.get(key) {
                            filtered.insert(key.to_string(), section.clone());
                        }
                    }
                }
            }
            Value::Object(filtered)
        };

        Reply::query_response("location", data)
    }

    fn query_entity(&mut self, entity_type: &str, entity_id: &str) -> Reply {
        let world = &self.world;
        let opts = SerializeOpts::default();
        let found = match entity_type {
            "item" => world
                .item(entity_id)
                .filter(|item| !item.is_door())
                .and_then(|item| {
                    entity_to_value(world, item.id.as_str(), &opts)
                        .map(|value| self.with_container_context(item.id.as_str(), value))
                }),
            "door" => world
                .door_item(entity_id)
                .and_then(|door| entity_to_value(world, door.id.as_str(), &opts)),
            "npc" => world
                .actor(entity_id)
                .filter(|actor| !actor.is_player())
                .and_then(|actor| entity_to_value(world, actor.id.as_str(), &opts)),
            "location" => world
                .location(entity_id)
                .and_then(|loc| entity_to_value(world, loc.id.as_str(), &opts)),
            _ => None,
        };

        match found {
            Some(entity) => {
                let mut data = Map::new();
                data.insert("entity".to_string(), entity);
                Reply::query_response("entity", Value::Object(data))
            }
            None => Reply::error(format!("Entity not found: {entity_id}")),
        }
    }

    /// Query-specific context: where an item rests when it sits in or on a
    /// container.
    fn with_container_context(&self, item_id: &str, value: Value) -> Value {
        let Value::Object(mut map) = value else {
            return value;
        };
        let container = self
            .world
            .item(item_id)
            .and_then(|item| self.world.item(item.location.as_str()))
            .filter(|container| container.is_container());
        if let Some(container) = container {
            let key = if container.container().is_some_and(|spec| spec.is_surface) {
                "on_surface"
            } else {
                "in_container"
            };
            map.insert(key.to_string(), Value::String(container.name.clone()));
        }
        Value::Object(map)
    }

    fn query_entities(&mut self, entity_type: Option<&str>, location_id: Option<&str>) -> Reply {
        let loc_id = match location_id {
            Some(id) => Some(EntityId::new(id)),
            None => self.world.current_location("player"),
        };
        let Some(loc_id) = loc_id else {
            return Reply::error("No location in scope".to_string());
        };

        let world = &self.world;
        let opts = SerializeOpts::default();
        let mut entities: Vec<Value> = Vec::new();

        match entity_type {
            Some("door") => {
                let mut seen: Vec<EntityId> = Vec::new();
                let mut push = |door_id: &EntityId, direction: Option<&str>, out: &mut Vec<Value>| {
                    if seen.contains(door_id) || world.door_item(door_id.as_str()).is_none() {
                        return;
                    }
                    if let Some(Value::Object(mut value)) =
                        entity_to_value(world, door_id.as_str(), &opts)
                    {
                        if let Some(direction) = direction {
                            value.insert(
                                "direction".to_string(),
                                Value::String(direction.to_string()),
                            );
                        }
                        out.push(Value::Object(value));
                        seen.push(door_id.clone());
                    }
                };
                if let Some(loc) = world.location(loc_id.as_str()) {
                    for (direction, desc) in &loc.exits {
                        if let Some(door_id) = &desc.door_id {
                            push(door_id, Some(direction), &mut entities);
                        }
                    }
                }
                for exit_id in world.exits_from_location(loc_id.as_str()) {
                    if let Some(exit) = world.exit(exit_id.as_str()) {
                        if let Some(door_id) = &exit.door_id {
                            push(door_id, exit.direction.as_deref(), &mut entities);
                        }
                    }
                }
                for item in world.items.values() {
                    if let Some(slot) = item.location.exit_slot() {
                        if item.is_door() && slot.location == loc_id {
                            push(&item.id, Some(slot.direction.as_str()), &mut entities);
                        }
                    }
                }
            }
            Some("item") => {
                for item_id in world.entities_at(loc_id.as_str(), Some(EntityKind::Item)) {
                    let visible = world
                        .item(item_id.as_str())
                        .is_some_and(|item| !item.is_hidden() && !item.is_door());
                    if !visible {
                        continue;
                    }
                    if let Some(value) = entity_to_value(world, item_id.as_str(), &opts) {
                        entities.push(value);
                    }
                }
            }
            Some("npc") => {
                for actor_id in world.entities_at(loc_id.as_str(), Some(EntityKind::Actor)) {
                    let visible = world
                        .actor(actor_id.as_str())
                        .is_some_and(|actor| !actor.is_player() && !actor.is_hidden());
                    if !visible {
                        continue;
                    }
                    if let Some(value) = entity_to_value(world, actor_id.as_str(), &opts) {
                        entities.push(value);
                    }
                }
            }
            _ => {}
        }

        let mut data = Map::new();
        data.insert("entities".to_string(), Value::Array(entities));
        Reply::query_response("entities", Value::Object(data))
    }

    fn query_vocabulary(&self) -> Reply {
        let merged = self.registry.merged_vocabulary(base_vocabulary());
        let mut verbs = Map::new();
        for verb in &merged.verbs {
            let mut entry = Map::new();
            entry.insert(
                "synonyms".to_string(),
                Value::Array(
                    verb.synonyms
                        .iter()
                        .map(|s| Value::String(s.clone()))
                        .collect(),
                ),
            );
            entry.insert(
                "object_required".to_string(),
                Value::Bool(verb.object_required),
            );
            verbs.insert(verb.word.clone(), Value::Object(entry));
        }

        // Entity names and declared synonyms join the module noun lists so
        // the external parser recognises everything in this world.
        let mut nouns = merged.nouns;
        for noun in extract_nouns(&self.world) {
            if !nouns.contains(&noun) {
                nouns.push(noun);
            }
        }

        let mut data = Map::new();
        data.insert("verbs".to_string(), Value::Object(verbs));
        data.insert(
            "nouns".to_string(),
            Value::Array(nouns.into_iter().map(Value::String).collect()),
        );
        data.insert(
            "directions".to_string(),
            Value::Array(
                merged
                    .directions
                    .into_iter()
                    .map(Value::String)
                    .collect(),
            ),
        );
        Reply::query_response("vocabulary", Value::Object(data))
    }

    fn query_metadata(&self) -> Reply {
        let metadata = &self.world.metadata;
        let mut data = Map::new();
        data.insert("title".to_string(), Value::String(metadata.title.clone()));
        data.insert("author".to_string(), Value::String(metadata.author.clone()));
        data.insert(
            "version".to_string(),
            Value::String(metadata.version.clone()),
        );
        data.insert(
            "description".to_string(),
            Value::String(metadata.description.clone()),
        );
        Reply::query_response("metadata", Value::Object(data))
    }

    /// Build the player context for handlers that serialize entities.
    pub fn current_player_context(&mut self) -> crate::serializer::PlayerContext {
        let registry = Arc::clone(&self.registry);
        let acc = WorldAccessor::new(&mut self.world, &registry);
        player_context(&acc, "player")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::{
        BehaviorModule, EventContext, EventRegistration, EventResult, HandlerFn, HandlerResult,
        HookDefinition, HookInvocation, SourceType,
    };
    use crate::vocabulary::{VerbEntry, Vocabulary};
    use fabula_domain::{Actor, Item, Location, Metadata};
    use serde_json::json;

    // A minimal module with a well-behaved verb, a failing verb, and a verb
    // that corrupts the state, plus one turn-phase hook that appends a
    // marker.

    fn handle_wave(_acc: &mut dyn Accessor, _action: &Action) -> HandlerResult {
        HandlerResult::ok("You wave.")
    }

    fn handle_stumble(_acc: &mut dyn Accessor, _action: &Action) -> HandlerResult {
        HandlerResult::fail("You stumble.")
    }

    fn handle_break(_acc: &mut dyn Accessor, _action: &Action) -> HandlerResult {
        HandlerResult::fail("INCONSISTENT STATE: test")
    }

    fn handle_save(_acc: &mut dyn Accessor, _action: &Action) -> HandlerResult {
        HandlerResult::ok("Game saved.")
    }

    fn on_tick(_acc: &mut dyn Accessor, _ctx: &EventContext) -> Option<EventResult> {
        Some(EventResult::message("tick"))
    }

    struct TestVerbs;

    impl BehaviorModule for TestVerbs {
        fn name(&self) -> &'static str {
            "test.verbs"
        }

        fn source(&self) -> SourceType {
            SourceType::Core
        }

        fn vocabulary(&self) -> Vocabulary {
            Vocabulary {
                verbs: vec![
                    VerbEntry::new("wave"),
                    VerbEntry::new("stumble"),
                    VerbEntry::new("break"),
                    VerbEntry::new("save"),
                ],
                ..Vocabulary::default()
            }
        }

        fn handlers(&self) -> Vec<(&'static str, HandlerFn)> {
            vec![
                ("wave", handle_wave),
                ("stumble", handle_stumble),
                ("break", handle_break),
                ("save", handle_save),
            ]
        }

        fn events(&self) -> Vec<EventRegistration> {
            vec![EventRegistration::for_hook(
                "on_condition_tick",
                "turn_condition_tick",
                on_tick,
            )]
        }

        fn hook_definitions(&self) -> Vec<HookDefinition> {
            vec![HookDefinition::new(
                "turn_condition_tick",
                HookInvocation::TurnPhase,
            )]
        }
    }

    fn test_world() -> World {
        let mut world = World::new(Metadata::titled("Latch Test"));
        world.add_location(Location::new("loc_room", "Room", "A room"));
        world.add_item(
            Item::new("item_sword", "sword", "A sword", "loc_room").with_properties(
                match json!({"portable": true}) {
                    Value::Object(map) => fabula_domain::Properties::from_map(map),
                    _ => unreachable!(),
                },
            ),
        );
        world.add_actor(Actor::new("player", "Adventurer", "You", "loc_room"));
        world.rebuild_indices().expect("indices");
        world
    }

    fn test_handler() -> ProtocolHandler {
        let registry = BehaviorRegistry::load(vec![Box::new(TestVerbs)]).expect("registry");
        ProtocolHandler::new(test_world(), Arc::new(registry)).expect("handler")
    }

    fn command(verb: &str) -> Message {
        Message::Command {
            action: Action::verb(verb),
        }
    }

    #[test]
    fn successful_command_advances_turn_and_fires_phases() {
        let mut handler = test_handler();
        let reply = handler.handle_message(command("wave"));

        let Reply::Result {
            success,
            turn_phase_messages,
            ..
        } = &reply
        else {
            panic!("expected result");
        };
        assert!(*success);
        assert_eq!(turn_phase_messages, &vec!["tick".to_string()]);
        assert_eq!(handler.turn_count(), 1);
    }

    #[test]
    fn failed_command_keeps_turn_and_skips_phases() {
        let mut handler = test_handler();
        let reply = handler.handle_message(command("stumble"));

        assert!(!reply.is_success());
        assert_eq!(handler.turn_count(), 0);
        let Reply::Result {
            turn_phase_messages,
            error,
            ..
        } = &reply
        else {
            panic!("expected result");
        };
        assert!(turn_phase_messages.is_empty());
        assert_eq!(error.as_ref().map(|e| e.message.as_str()), Some("You stumble."));
    }

    #[test]
    fn unknown_verb_is_a_recoverable_error() {
        let mut handler = test_handler();
        let reply = handler.handle_message(command("defenestrate"));

        let Reply::Result { error, .. } = &reply else {
            panic!("expected result");
        };
        assert!(error
            .as_ref()
            .is_some_and(|e| e.message.contains("I don't understand 'defenestrate'")));
        assert_eq!(handler.turn_count(), 0);
    }

    #[test]
    fn missing_verb_is_a_protocol_error() {
        let mut handler = test_handler();
        let reply = handler.handle_message(Message::Command {
            action: Action::default(),
        });
        assert!(matches!(reply, Reply::Error { .. }));
    }

    #[test]
    fn inconsistent_state_latches_and_blocks_non_meta_verbs() {
        let mut handler = test_handler();

        // First reply is fatal.
        let reply = handler.handle_message(command("break"));
        let Reply::Result { error, .. } = &reply else {
            panic!("expected result");
        };
        let err = error.as_ref().expect("error payload");
        assert_eq!(err.fatal, Some(true));
        assert!(err.message.starts_with("INCONSISTENT STATE:"));
        assert!(handler.is_corrupted());
        assert_eq!(handler.turn_count(), 0);

        // Subsequent non-meta commands are blocked without dispatch.
        let reply = handler.handle_message(command("wave"));
        let Reply::Result { error, .. } = &reply else {
            panic!("expected result");
        };
        let err = error.as_ref().expect("error payload");
        assert_eq!(err.fatal, Some(true));
        assert!(err.message.contains("corrupted"));
        assert_eq!(handler.turn_count(), 0);

        // Meta verbs bypass the latch.
        let reply = handler.handle_message(command("save"));
        assert!(reply.is_success());

        // The latch never clears.
        assert!(handler.is_corrupted());
    }

    #[test]
    fn queries_do_not_advance_the_turn() {
        let mut handler = test_handler();
        let reply = handler.handle_message(Message::Query {
            query_type: "metadata".to_string(),
            entity_type: None,
            entity_id: None,
            location_id: None,
            actor_id: None,
            include: Vec::new(),
        });

        let Reply::QueryResponse { query_type, data } = &reply else {
            panic!("expected query response");
        };
        assert_eq!(query_type, "metadata");
        assert_eq!(data["title"], json!("Latch Test"));
        assert_eq!(handler.turn_count(), 0);
    }

    #[test]
    fn location_query_respects_include_filter() {
        let mut handler = test_handler();
        let reply = handler.handle_message(Message::Query {
            query_type: "location".to_string(),
            entity_type: None,
            entity_id: None,
            location_id: None,
            actor_id: None,
            include: vec!["items".to_string()],
        });

        let Reply::QueryResponse { data, .. } = &reply else {
            panic!("expected query response");
        };
        assert!(data.get("location").is_some());
        assert!(data.get("items").is_some());
        assert!(data.get("doors").is_none());
        assert!(data.get("actors").is_none());
    }

    #[test]
    fn entity_query_finds_items_and_reports_missing_ids() {
        let mut handler = test_handler();
        let reply = handler.handle_message(Message::Query {
            query_type: "entity".to_string(),
            entity_type: Some("item".to_string()),
            entity_id: Some("item_sword".to_string()),
            location_id: None,
            actor_id: None,
            include: Vec::new(),
        });
        let Reply::QueryResponse { data, .. } = &reply else {
            panic!("expected query response");
        };
        assert_eq!(data["entity"]["id"], json!("item_sword"));

        let reply = handler.handle_message(Message::Query {
            query_type: "entity".to_string(),
            entity_type: Some("item".to_string()),
            entity_id: Some("item_ghost".to_string()),
            location_id: None,
            actor_id: None,
            include: Vec::new(),
        });
        assert!(matches!(reply, Reply::Error { .. }));
    }

    #[test]
    fn unknown_message_and_query_types_are_errors() {
        let mut handler = test_handler();

        let value = handler.handle_value(&json!({"type": "telemetry"}));
        assert_eq!(value["type"], json!("error"));
        assert!(value["message"].as_str().is_some_and(|m| m.contains("telemetry")));

        let reply = handler.handle_message(Message::Query {
            query_type: "horoscope".to_string(),
            entity_type: None,
            entity_id: None,
            location_id: None,
            actor_id: None,
            include: Vec::new(),
        });
        let Reply::Error { message } = &reply else {
            panic!("expected error");
        };
        assert!(message.contains("Unknown query type: horoscope"));
    }

    #[test]
    fn invalid_json_maps_to_error_reply() {
        let mut handler = test_handler();
        let raw = handler.handle_json_str("{not json");
        let value: Value = serde_json::from_str(&raw).expect("reply is JSON");
        assert_eq!(value["type"], json!("error"));
        assert!(value["message"].as_str().is_some_and(|m| m.contains("Invalid JSON")));
    }

    #[test]
    fn vocabulary_query_lists_verbs_with_synonyms() {
        let mut handler = test_handler();
        let reply = handler.handle_message(Message::Query {
            query_type: "vocabulary".to_string(),
            entity_type: None,
            entity_id: None,
            location_id: None,
            actor_id: None,
            include: Vec::new(),
        });

        let Reply::QueryResponse { data, .. } = &reply else {
            panic!("expected query response");
        };
        assert!(data["verbs"].get("wave").is_some());
        assert_eq!(data["verbs"]["wave"]["object_required"], json!(false));
    }
}
