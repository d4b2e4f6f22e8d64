//! Environment turn phases: ambient effects, timed conditions, and the
//! death check. Defines the remaining three base hooks.

use serde_json::Value;

use crate::accessor::Accessor;
use crate::behavior::{
    BehaviorModule, EventContext, EventRegistration, EventResult, HookDefinition, HookInvocation,
    SourceType,
};
use crate::vocabulary::Vocabulary;

pub struct Environment;

impl BehaviorModule for Environment {
    fn name(&self) -> &'static str {
        "core.environment"
    }

    fn source(&self) -> SourceType {
        SourceType::Core
    }

    fn vocabulary(&self) -> Vocabulary {
        Vocabulary::default()
    }

    fn events(&self) -> Vec<EventRegistration> {
        vec![
            EventRegistration::for_hook(
                "on_environmental_effect",
                "turn_environmental_effect",
                on_environmental_effect,
            ),
            EventRegistration::for_hook("on_condition_tick", "turn_condition_tick", on_condition_tick),
            EventRegistration::for_hook("on_death_check", "turn_death_check", on_death_check),
        ]
    }

    fn hook_definitions(&self) -> Vec<HookDefinition> {
        vec![
            HookDefinition::new("turn_environmental_effect", HookInvocation::TurnPhase)
                .with_description("Ambient location effects"),
            HookDefinition::new("turn_condition_tick", HookInvocation::TurnPhase)
                .with_after(&["turn_environmental_effect"])
                .with_description("Timed actor conditions count down"),
            HookDefinition::new("turn_death_check", HookInvocation::TurnPhase)
                .with_after(&["turn_condition_tick"])
                .with_description("Actors at zero health are marked dead"),
        ]
    }
}

/// The current location's `ambient` line, if it declares one.
fn on_environmental_effect(acc: &mut dyn Accessor, ctx: &EventContext) -> Option<EventResult> {
    let loc_id = acc.current_location(ctx.actor_id.as_str())?;
    let line = acc
        .location(loc_id.as_str())?
        .properties
        .get_str("ambient")?
        .to_string();
    Some(EventResult::message(line))
}

/// Count down each actor's `conditions` map; expired conditions are removed
/// and announced.
fn on_condition_tick(acc: &mut dyn Accessor, _ctx: &EventContext) -> Option<EventResult> {
    let actor_ids: Vec<_> = acc.world().actors.keys().cloned().collect();
    let mut messages: Vec<String> = Vec::new();

    for actor_id in actor_ids {
        let Some(actor) = acc.actor_mut(actor_id.as_str()) else {
            continue;
        };
        let Some(conditions) = actor.properties.get_map("conditions").cloned() else {
            continue;
        };
        let name = actor.name.clone();
        let mut remaining = serde_json::Map::new();
        for (condition, turns) in conditions {
            match turns.as_u64() {
                Some(0) | None => {
                    remaining.insert(condition, turns);
                }
                Some(1) => {
                    messages.push(format!("{name}'s {condition} wears off."));
                }
                Some(n) => {
                    remaining.insert(condition, Value::from(n - 1));
                }
            }
        }
        actor.properties.set("conditions", Value::Object(remaining));
    }

    if messages.is_empty() {
        None
    } else {
        Some(EventResult::message(messages.join(" ")))
    }
}

/// Mark actors whose `stats.health` has reached zero.
fn on_death_check(acc: &mut dyn Accessor, _ctx: &EventContext) -> Option<EventResult> {
    let actor_ids: Vec<_> = acc.world().actors.keys().cloned().collect();
    let mut messages: Vec<String> = Vec::new();

    for actor_id in actor_ids {
        let Some(actor) = acc.actor_mut(actor_id.as_str()) else {
            continue;
        };
        let health = actor
            .properties
            .get_map("stats")
            .and_then(|stats| stats.get("health"))
            .and_then(Value::as_i64);
        let dead = actor.properties.state_bool("dead");
        if let Some(health) = health {
            if health <= 0 && !dead {
                actor.properties.set_state("dead", true);
                messages.push(format!("{} has died.", actor.name));
            }
        }
    }

    if messages.is_empty() {
        None
    } else {
        Some(EventResult::message(messages.join(" ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::WorldAccessor;
    use crate::registry::BehaviorRegistry;
    use fabula_domain::{Actor, EntityId, Location, Metadata, Properties, World};
    use serde_json::json;

    fn props(value: Value) -> Properties {
        match value {
            Value::Object(map) => Properties::from_map(map),
            other => panic!("expected object, got {other}"),
        }
    }

    fn registry() -> BehaviorRegistry {
        BehaviorRegistry::load(vec![Box::new(Environment)]).expect("registry")
    }

    #[test]
    fn ambient_lines_surface_for_the_actors_location() {
        let registry = registry();
        let mut world = World::new(Metadata::titled("Test"));
        world.add_location(
            Location::new("loc_cave", "Cave", "")
                .with_properties(props(json!({"ambient": "Water drips somewhere in the dark."}))),
        );
        world.add_actor(Actor::new("player", "Adventurer", "", "loc_cave"));
        world.rebuild_indices().expect("indices");

        let mut acc = WorldAccessor::new(&mut world, &registry);
        let ctx = EventContext::for_phase(
            "on_environmental_effect",
            "turn_environmental_effect",
            EntityId::player(),
        );
        let result = acc.invoke_event(&ctx).expect("ambient message");
        assert_eq!(
            result.message.as_deref(),
            Some("Water drips somewhere in the dark.")
        );
    }

    #[test]
    fn conditions_tick_down_and_expire() {
        let registry = registry();
        let mut world = World::new(Metadata::titled("Test"));
        world.add_location(Location::new("loc_cave", "Cave", ""));
        world.add_actor(
            Actor::new("player", "Adventurer", "", "loc_cave")
                .with_properties(props(json!({"conditions": {"poisoned": 2}}))),
        );
        world.rebuild_indices().expect("indices");

        let ctx = EventContext::for_phase(
            "on_condition_tick",
            "turn_condition_tick",
            EntityId::player(),
        );

        {
            let mut acc = WorldAccessor::new(&mut world, &registry);
            assert!(acc.invoke_event(&ctx).is_none());
        }
        assert_eq!(
            world
                .player()
                .and_then(|p| p.properties.get_map("conditions").cloned())
                .and_then(|c| c.get("poisoned").cloned()),
            Some(json!(1))
        );

        {
            let mut acc = WorldAccessor::new(&mut world, &registry);
            let result = acc.invoke_event(&ctx).expect("expiry message");
            assert!(result
                .message
                .is_some_and(|m| m.contains("poisoned wears off")));
        }
        assert!(world
            .player()
            .and_then(|p| p.properties.get_map("conditions").cloned())
            .is_some_and(|c| c.is_empty()));
    }

    #[test]
    fn death_check_fires_once_per_actor() {
        let registry = registry();
        let mut world = World::new(Metadata::titled("Test"));
        world.add_location(Location::new("loc_cave", "Cave", ""));
        world.add_actor(Actor::new("player", "Adventurer", "", "loc_cave"));
        world.add_actor(
            Actor::new("npc_rat", "Rat", "", "loc_cave")
                .with_properties(props(json!({"stats": {"health": 0}}))),
        );
        world.rebuild_indices().expect("indices");

        let ctx = EventContext::for_phase("on_death_check", "turn_death_check", EntityId::player());

        {
            let mut acc = WorldAccessor::new(&mut world, &registry);
            let result = acc.invoke_event(&ctx).expect("death message");
            assert!(result.message.is_some_and(|m| m.contains("Rat has died.")));
        }

        // Already marked dead; no repeat announcement.
        let mut acc = WorldAccessor::new(&mut world, &registry);
        assert!(acc.invoke_event(&ctx).is_none());
    }
}
