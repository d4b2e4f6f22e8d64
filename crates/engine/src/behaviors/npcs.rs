//! NPC turn phase: defines `turn_npc_action` and gives idle lines to
//! actors sharing the player's location.

use crate::accessor::Accessor;
use crate::behavior::{
    BehaviorModule, EventContext, EventRegistration, EventResult, HookDefinition, HookInvocation,
    SourceType,
};
use crate::vocabulary::Vocabulary;

pub struct Npcs;

impl BehaviorModule for Npcs {
    fn name(&self) -> &'static str {
        "core.npcs"
    }

    fn source(&self) -> SourceType {
        SourceType::Core
    }

    fn vocabulary(&self) -> Vocabulary {
        Vocabulary::default()
    }

    fn events(&self) -> Vec<EventRegistration> {
        vec![EventRegistration::for_hook(
            "on_npc_action",
            "turn_npc_action",
            on_npc_action,
        )]
    }

    fn hook_definitions(&self) -> Vec<HookDefinition> {
        vec![HookDefinition::new("turn_npc_action", HookInvocation::TurnPhase)
            .with_description("NPCs act after each successful command")]
    }
}

/// Emit each co-located NPC's `npc_idle` line, in actor-map order.
fn on_npc_action(acc: &mut dyn Accessor, ctx: &EventContext) -> Option<EventResult> {
    let loc_id = acc.current_location(ctx.actor_id.as_str())?;

    let mut lines: Vec<String> = Vec::new();
    for actor_id in acc.entities_at(loc_id.as_str(), Some(fabula_domain::EntityKind::Actor)) {
        if actor_id == ctx.actor_id {
            continue;
        }
        let Some(actor) = acc.actor(actor_id.as_str()) else {
            continue;
        };
        if actor.is_hidden() {
            continue;
        }
        if let Some(line) = actor.properties.get_str("npc_idle") {
            lines.push(line.to_string());
        }
    }

    if lines.is_empty() {
        None
    } else {
        Some(EventResult::message(lines.join(" ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::{Accessor, WorldAccessor};
    use crate::registry::BehaviorRegistry;
    use fabula_domain::{Actor, EntityId, Location, Metadata, Properties, World};
    use serde_json::Value;

    fn props(value: Value) -> Properties {
        match value {
            Value::Object(map) => Properties::from_map(map),
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn idle_lines_come_from_co_located_npcs_only() {
        let registry = BehaviorRegistry::load(vec![Box::new(Npcs)]).expect("registry");
        let mut world = World::new(Metadata::titled("Test"));
        world.add_location(Location::new("loc_gate", "Gate", ""));
        world.add_location(Location::new("loc_keep", "Keep", ""));
        world.add_actor(Actor::new("player", "Adventurer", "", "loc_gate"));
        world.add_actor(
            Actor::new("npc_guard", "Guard", "", "loc_gate").with_properties(props(
                serde_json::json!({"npc_idle": "The guard shifts his weight."}),
            )),
        );
        world.add_actor(
            Actor::new("npc_cook", "Cook", "", "loc_keep").with_properties(props(
                serde_json::json!({"npc_idle": "The cook hums."}),
            )),
        );
        world.rebuild_indices().expect("indices");

        let mut acc = WorldAccessor::new(&mut world, &registry);
        let ctx = EventContext::for_phase("on_npc_action", "turn_npc_action", EntityId::player());
        let result = acc.invoke_event(&ctx).expect("phase message");

        let message = result.message.expect("message");
        assert!(message.contains("guard shifts"));
        assert!(!message.contains("cook"));
    }

    #[test]
    fn silent_when_no_npc_has_an_idle_line() {
        let registry = BehaviorRegistry::load(vec![Box::new(Npcs)]).expect("registry");
        let mut world = World::new(Metadata::titled("Test"));
        world.add_location(Location::new("loc_gate", "Gate", ""));
        world.add_actor(Actor::new("player", "Adventurer", "", "loc_gate"));
        world.rebuild_indices().expect("indices");

        let mut acc = WorldAccessor::new(&mut world, &registry);
        let ctx = EventContext::for_phase("on_npc_action", "turn_npc_action", EntityId::player());
        assert!(acc.invoke_event(&ctx).is_none());
    }
}
