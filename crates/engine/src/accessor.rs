//! The accessor: the single legal path by which handlers read and mutate
//! state.
//!
//! Behavior handlers depend on the [`Accessor`] trait, not on the concrete
//! world, so the capability set is the contract. [`WorldAccessor`] binds a
//! world and the behavior registry for one dispatch; modules must not
//! retain it across turns.

use serde_json::{Map, Value};

use fabula_domain::{
    Actor, DomainError, EntityId, EntityKind, EntityRef, Exit, Item, Location, Lock, Part, World,
};

use crate::behavior::{EventContext, EventResult};
use crate::registry::BehaviorRegistry;
use crate::vocabulary::{base_vocabulary, VerbEntry};

/// Result of [`Accessor::update`]: reaction narration beats, and whether a
/// reaction vetoed further mutation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOutcome {
    pub beats: Vec<String>,
    pub vetoed: bool,
}

/// Capability set handed to behavior handlers.
pub trait Accessor {
    fn world(&self) -> &World;
    fn world_mut(&mut self) -> &mut World;

    // Typed lookups

    fn location(&self, id: &str) -> Option<&Location> {
        self.world().location(id)
    }

    fn item(&self, id: &str) -> Option<&Item> {
        self.world().item(id)
    }

    fn item_mut(&mut self, id: &str) -> Option<&mut Item> {
        self.world_mut().item_mut(id)
    }

    fn actor(&self, id: &str) -> Option<&Actor> {
        self.world().actor(id)
    }

    fn actor_mut(&mut self, id: &str) -> Option<&mut Actor> {
        self.world_mut().actor_mut(id)
    }

    fn lock(&self, id: &str) -> Option<&Lock> {
        self.world().lock(id)
    }

    fn part(&self, id: &str) -> Option<&Part> {
        self.world().part(id)
    }

    fn exit(&self, id: &str) -> Option<&Exit> {
        self.world().exit(id)
    }

    /// Look up an entity of any kind.
    fn entity(&self, id: &str) -> Option<EntityRef<'_>> {
        self.world().entity(id)
    }

    fn entity_kind(&self, id: &str) -> Option<EntityKind> {
        self.world().entity_kind(id)
    }

    // Containment queries

    fn entities_at(&self, container: &str, kind: Option<EntityKind>) -> Vec<EntityId> {
        self.world().entities_at(container, kind)
    }

    fn entity_where(&self, id: &str) -> Option<EntityId> {
        self.world().entity_where(id)
    }

    fn items_at_part(&self, part_id: &str) -> Vec<EntityId> {
        self.world().entities_at(part_id, Some(EntityKind::Item))
    }

    fn parts_of(&self, parent_id: &str) -> Vec<EntityId> {
        self.world().parts_of(parent_id)
    }

    fn current_location(&self, actor_id: &str) -> Option<EntityId> {
        self.world().current_location(actor_id)
    }

    // Exit queries

    fn exit_connections(&self, exit_id: &str) -> Vec<EntityId> {
        self.world().exit_connections(exit_id)
    }

    fn exits_from_location(&self, loc_id: &str) -> Vec<EntityId> {
        self.world().exits_from_location(loc_id)
    }

    fn connect_exits(&mut self, a: &str, b: &str) -> Result<(), DomainError> {
        self.world_mut().connect_exits(a, b)
    }

    fn disconnect_exits(&mut self, a: &str, b: &str) -> Result<(), DomainError> {
        self.world_mut().disconnect_exits(a, b)
    }

    fn door_for_exit(&self, loc_id: &str, direction: &str) -> Option<EntityId> {
        self.world().door_for_exit(loc_id, direction)
    }

    fn door_item(&self, id: &str) -> Option<&Item> {
        self.world().door_item(id)
    }

    // Mutation

    /// Move an item or actor. See [`World::set_entity_where`] for the full
    /// semantics, including removal sentinels.
    fn set_entity_where(&mut self, entity: &str, container: &str) -> Result<(), DomainError> {
        self.world_mut().set_entity_where(entity, container)
    }

    /// Merge `fields` into the entity's properties. When `verb` is supplied,
    /// every `on_<verb>` reaction registered by the modules in the entity's
    /// `behaviors` list fires, in list order. A vetoing reaction stops the
    /// rest and is reported through the outcome.
    fn update(
        &mut self,
        entity: &str,
        fields: &Map<String, Value>,
        verb: Option<&str>,
    ) -> Result<UpdateOutcome, DomainError>;

    /// Fire an event explicitly. Entity-scoped contexts run the handlers the
    /// entity's `behaviors` list registered for the event; contexts without
    /// an entity run every registered handler.
    fn invoke_event(&mut self, ctx: &EventContext) -> Option<EventResult>;

    /// Merged verb table, for handlers that render command summaries.
    fn merged_verbs(&self) -> Vec<VerbEntry>;
}

/// Accessor bound to a world and registry for the duration of one dispatch.
pub struct WorldAccessor<'a> {
    world: &'a mut World,
    registry: &'a BehaviorRegistry,
}

impl<'a> WorldAccessor<'a> {
    pub fn new(world: &'a mut World, registry: &'a BehaviorRegistry) -> Self {
        Self { world, registry }
    }

    /// The entity's `behaviors` list, for any behavior-carrying kind.
    fn behaviors_of(&self, entity: &str) -> Option<Vec<String>> {
        self.world
            .entity(entity)
            .map(|entity| entity.behaviors().to_vec())
    }

    fn merge_fields(&mut self, entity: &str, fields: &Map<String, Value>) {
        if fields.is_empty() {
            return;
        }
        if let Some(item) = self.world.item_mut(entity) {
            item.properties.merge(fields);
        } else if let Some(actor) = self.world.actor_mut(entity) {
            actor.properties.merge(fields);
        } else if let Some(loc) = self.world.location_mut(entity) {
            loc.properties.merge(fields);
        } else if let Some(part) = self.world.part_mut(entity) {
            part.properties.merge(fields);
        } else if let Some(lock) = self.world.lock_mut(entity) {
            lock.properties.merge(fields);
        } else if let Some(exit) = self.world.exit_mut(entity) {
            exit.properties.merge(fields);
        }
    }
}

impl Accessor for WorldAccessor<'_> {
    fn world(&self) -> &World {
        self.world
    }

    fn world_mut(&mut self) -> &mut World {
        self.world
    }

    fn update(
        &mut self,
        entity: &str,
        fields: &Map<String, Value>,
        verb: Option<&str>,
    ) -> Result<UpdateOutcome, DomainError> {
        let Some(behaviors) = self.behaviors_of(entity) else {
            return Err(DomainError::not_found("entity", entity));
        };
        self.merge_fields(entity, fields);

        let mut outcome = UpdateOutcome::default();
        if let Some(verb) = verb {
            let event = format!("on_{verb}");
            let handlers = self.registry.entity_event_handlers(&behaviors, &event);
            if handlers.is_empty() {
                return Ok(outcome);
            }
            let mut ctx = EventContext::for_entity(
                event,
                EntityId::new(entity),
                EntityId::player(),
            );
            ctx.verb = Some(verb.to_string());
            for handler in handlers {
                if let Some(result) = handler(self, &ctx) {
                    if let Some(message) = result.message {
                        outcome.beats.push(message);
                    }
                    if result.veto {
                        outcome.vetoed = true;
                        break;
                    }
                }
            }
        }
        Ok(outcome)
    }

    fn invoke_event(&mut self, ctx: &EventContext) -> Option<EventResult> {
        let handlers = match &ctx.entity {
            Some(entity) => {
                let behaviors = self.behaviors_of(entity.as_str())?;
                self.registry.entity_event_handlers(&behaviors, &ctx.event)
            }
            None => self.registry.event_handlers(&ctx.event),
        };
        if handlers.is_empty() {
            return None;
        }

        let mut messages: Vec<String> = Vec::new();
        let mut veto = false;
        for handler in handlers {
            if let Some(result) = handler(self, ctx) {
                if let Some(message) = result.message {
                    messages.push(message);
                }
                if result.veto {
                    veto = true;
                    break;
                }
            }
        }
        if messages.is_empty() && !veto {
            return None;
        }
        Some(EventResult {
            message: if messages.is_empty() {
                None
            } else {
                Some(messages.join(" "))
            },
            veto,
        })
    }

    fn merged_verbs(&self) -> Vec<VerbEntry> {
        self.registry.merged_vocabulary(base_vocabulary()).verbs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::{
        BehaviorModule, EventRegistration, HandlerFn, HookDefinition, SourceType,
    };
    use crate::vocabulary::Vocabulary;
    use fabula_domain::Metadata;
    use serde_json::json;

    /// Test module mirroring a light-source reaction: taking a lantern
    /// lights it, dropping extinguishes it.
    struct RuneLight;

    fn on_take_light(acc: &mut dyn Accessor, ctx: &EventContext) -> Option<EventResult> {
        let entity = ctx.entity.as_ref()?;
        let item = acc.item_mut(entity.as_str())?;
        if !item.provides_light() {
            return None;
        }
        item.properties.set_state("lit", true);
        Some(EventResult::message("The runes along its side flare to light."))
    }

    fn on_drop_light(acc: &mut dyn Accessor, ctx: &EventContext) -> Option<EventResult> {
        let entity = ctx.entity.as_ref()?;
        let item = acc.item_mut(entity.as_str())?;
        if !item.provides_light() {
            return None;
        }
        item.properties.set_state("lit", false);
        Some(EventResult::message("The runes fade."))
    }

    impl BehaviorModule for RuneLight {
        fn name(&self) -> &'static str {
            "test.rune_light"
        }

        fn source(&self) -> SourceType {
            SourceType::Core
        }

        fn vocabulary(&self) -> Vocabulary {
            Vocabulary::default()
        }

        fn handlers(&self) -> Vec<(&'static str, HandlerFn)> {
            Vec::new()
        }

        fn events(&self) -> Vec<EventRegistration> {
            vec![
                EventRegistration::new("on_take", on_take_light),
                EventRegistration::new("on_drop", on_drop_light),
            ]
        }

        fn hook_definitions(&self) -> Vec<HookDefinition> {
            Vec::new()
        }
    }

    fn lantern_world() -> World {
        let mut world = World::new(Metadata::titled("Test"));
        world.add_location(fabula_domain::Location::new("room1", "Test Room", "A test room."));
        let lantern = Item::new("lantern", "lantern", "A magic lantern.", "room1")
            .with_properties(match json!({
                "portable": true,
                "provides_light": true,
                "states": {"lit": false}
            }) {
                Value::Object(map) => fabula_domain::Properties::from_map(map),
                _ => unreachable!(),
            })
            .with_behaviors(vec!["test.rune_light".to_string()]);
        world.add_item(lantern);
        world.add_actor(Actor::new("player", "Adventurer", "", "room1"));
        world.rebuild_indices().expect("indices");
        world
    }

    #[test]
    fn update_with_verb_fires_entity_reactions() {
        let registry = BehaviorRegistry::load(vec![Box::new(RuneLight)]).expect("registry");
        let mut world = lantern_world();
        let mut acc = WorldAccessor::new(&mut world, &registry);

        let outcome = acc
            .update("lantern", &Map::new(), Some("take"))
            .expect("update");

        assert_eq!(outcome.beats, vec!["The runes along its side flare to light."]);
        assert!(acc.item("lantern").is_some_and(Item::is_lit));
    }

    #[test]
    fn update_without_verb_only_merges_fields() {
        let registry = BehaviorRegistry::load(vec![Box::new(RuneLight)]).expect("registry");
        let mut world = lantern_world();
        let mut acc = WorldAccessor::new(&mut world, &registry);

        let mut fields = Map::new();
        fields.insert("dusty".to_string(), Value::Bool(true));
        let outcome = acc.update("lantern", &fields, None).expect("update");

        assert!(outcome.beats.is_empty());
        assert!(acc
            .item("lantern")
            .is_some_and(|i| i.properties.bool_or("dusty", false)));
        assert!(!acc.item("lantern").is_some_and(Item::is_lit));
    }

    #[test]
    fn update_skips_reactions_for_modules_not_on_entity() {
        let registry = BehaviorRegistry::load(vec![Box::new(RuneLight)]).expect("registry");
        let mut world = lantern_world();
        if let Some(item) = world.item_mut("lantern") {
            item.behaviors.clear();
        }
        let mut acc = WorldAccessor::new(&mut world, &registry);

        let outcome = acc
            .update("lantern", &Map::new(), Some("take"))
            .expect("update");
        assert!(outcome.beats.is_empty());
        assert!(!acc.item("lantern").is_some_and(Item::is_lit));
    }

    #[test]
    fn update_unknown_entity_is_an_error() {
        let registry = BehaviorRegistry::load(vec![Box::new(RuneLight)]).expect("registry");
        let mut world = lantern_world();
        let mut acc = WorldAccessor::new(&mut world, &registry);

        let err = acc
            .update("ghost", &Map::new(), Some("take"))
            .expect_err("unknown entity");
        assert!(matches!(err, DomainError::EntityNotFound { .. }));
    }
}
