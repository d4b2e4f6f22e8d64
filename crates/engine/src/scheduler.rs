//! Turn-phase scheduling.
//!
//! After every successful command the engine fires a fixed base sequence of
//! turn-phase hooks, prepended by any `extra_turn_phases` the world's
//! metadata declares. Declared `after` dependencies are honoured by a
//! stable topological sort computed once at handler construction; a cycle
//! is a fatal startup error. Within a phase every registered handler runs;
//! there is no short-circuit.

use fabula_domain::{EntityId, Metadata};

use crate::accessor::Accessor;
use crate::behavior::EventContext;
use crate::error::EngineError;
use crate::registry::BehaviorRegistry;

/// Base turn-phase hooks, fired in this order after any extras.
pub const BASE_TURN_PHASES: [&str; 4] = [
    "turn_npc_action",
    "turn_environmental_effect",
    "turn_condition_tick",
    "turn_death_check",
];

/// Compute the cached phase order: metadata extras first, then the base
/// sequence, reordered only as far as declared `after` edges require.
pub fn phase_order(
    metadata: &Metadata,
    registry: &BehaviorRegistry,
) -> Result<Vec<String>, EngineError> {
    let mut sequence: Vec<String> = Vec::new();
    for phase in &metadata.extra_turn_phases {
        if !sequence.contains(phase) {
            sequence.push(phase.clone());
        }
    }
    for phase in BASE_TURN_PHASES {
        let phase = phase.to_string();
        if !sequence.contains(&phase) {
            sequence.push(phase);
        }
    }

    stable_topological_sort(sequence, registry)
}

/// Kahn's algorithm with the ready set kept in declared order, so worlds
/// without dependencies keep exactly their declared sequence. Edges naming
/// hooks outside the sequence are ignored; they only constrain scheduled
/// phases.
fn stable_topological_sort(
    sequence: Vec<String>,
    registry: &BehaviorRegistry,
) -> Result<Vec<String>, EngineError> {
    let definitions = registry.hook_definitions();
    let in_sequence = |hook: &str| sequence.iter().any(|s| s == hook);

    // after-edges restricted to scheduled phases: dep -> dependents
    let mut pending: Vec<(usize, Vec<String>)> = sequence
        .iter()
        .enumerate()
        .map(|(i, hook)| {
            let deps: Vec<String> = definitions
                .get(hook)
                .map(|def| {
                    def.after
                        .iter()
                        .filter(|dep| in_sequence(dep))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            (i, deps)
        })
        .collect();

    let mut ordered: Vec<String> = Vec::new();
    while !pending.is_empty() {
        let ready = pending.iter().position(|(_, deps)| {
            deps.iter().all(|dep| ordered.iter().any(|done| done == dep))
        });
        match ready {
            Some(pos) => {
                let (index, _) = pending.remove(pos);
                ordered.push(sequence[index].clone());
            }
            None => {
                let stuck: Vec<&str> = pending
                    .iter()
                    .map(|(i, _)| sequence[*i].as_str())
                    .collect();
                return Err(EngineError::PhaseCycle(stuck.join(", ")));
            }
        }
    }
    Ok(ordered)
}

/// Fire every phase in order. For each hook the registered event (if any)
/// runs all of its handlers with a `{hook, actor_id}` context; non-empty
/// messages are collected for the reply's `turn_phase_messages`.
pub fn fire_phases(
    acc: &mut dyn Accessor,
    registry: &BehaviorRegistry,
    order: &[String],
    actor_id: &EntityId,
) -> Vec<String> {
    let mut messages = Vec::new();
    for hook in order {
        let Some(event) = registry.event_for_hook(hook) else {
            continue;
        };
        let ctx = EventContext::for_phase(event, hook.clone(), actor_id.clone());
        if let Some(result) = acc.invoke_event(&ctx) {
            if let Some(message) = result.message {
                if !message.is_empty() {
                    messages.push(message);
                }
            }
        }
    }
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::{
        BehaviorModule, HookDefinition, HookInvocation, SourceType,
    };
    use crate::vocabulary::Vocabulary;

    struct HookOnlyModule {
        name: &'static str,
        hooks: Vec<HookDefinition>,
    }

    impl BehaviorModule for HookOnlyModule {
        fn name(&self) -> &'static str {
            self.name
        }

        fn source(&self) -> SourceType {
            SourceType::Core
        }

        fn vocabulary(&self) -> Vocabulary {
            Vocabulary::default()
        }

        fn hook_definitions(&self) -> Vec<HookDefinition> {
            self.hooks.clone()
        }
    }

    fn registry_with_hooks(hooks: Vec<HookDefinition>) -> BehaviorRegistry {
        BehaviorRegistry::load(vec![Box::new(HookOnlyModule {
            name: "test.hooks",
            hooks,
        })])
        .expect("registry loads")
    }

    fn base_hook_definitions() -> Vec<HookDefinition> {
        BASE_TURN_PHASES
            .iter()
            .map(|hook| HookDefinition::new(*hook, HookInvocation::TurnPhase))
            .collect()
    }

    #[test]
    fn base_phases_only_keep_fixed_order() {
        let registry = registry_with_hooks(base_hook_definitions());
        let order = phase_order(&Metadata::titled("Test"), &registry).expect("order");
        assert_eq!(order, BASE_TURN_PHASES.to_vec());
    }

    #[test]
    fn extra_phases_are_prepended() {
        let mut hooks = base_hook_definitions();
        hooks.push(HookDefinition::new(
            "turn_phase_scheduled",
            HookInvocation::TurnPhase,
        ));
        hooks.push(HookDefinition::new(
            "turn_phase_commitment",
            HookInvocation::TurnPhase,
        ));
        let registry = registry_with_hooks(hooks);

        let mut metadata = Metadata::titled("Test");
        metadata.extra_turn_phases = vec![
            "turn_phase_scheduled".to_string(),
            "turn_phase_commitment".to_string(),
        ];

        let order = phase_order(&metadata, &registry).expect("order");
        assert_eq!(order[0], "turn_phase_scheduled");
        assert_eq!(order[1], "turn_phase_commitment");
        assert_eq!(&order[2..], &BASE_TURN_PHASES);
    }

    #[test]
    fn after_edges_reorder_phases() {
        let mut hooks = base_hook_definitions();
        hooks.push(HookDefinition::new("turn_gossip", HookInvocation::TurnPhase));
        hooks.push(
            HookDefinition::new("turn_spread", HookInvocation::TurnPhase)
                .with_after(&["turn_gossip"]),
        );
        let registry = registry_with_hooks(hooks);

        let mut metadata = Metadata::titled("Test");
        // Declared backwards; the dependency flips them.
        metadata.extra_turn_phases = vec!["turn_spread".to_string(), "turn_gossip".to_string()];

        let order = phase_order(&metadata, &registry).expect("order");
        let gossip = order.iter().position(|h| h == "turn_gossip").expect("gossip");
        let spread = order.iter().position(|h| h == "turn_spread").expect("spread");
        assert!(gossip < spread);
    }

    #[test]
    fn dependency_cycles_are_fatal() {
        let hooks = vec![
            HookDefinition::new("turn_a", HookInvocation::TurnPhase).with_after(&["turn_b"]),
            HookDefinition::new("turn_b", HookInvocation::TurnPhase).with_after(&["turn_a"]),
        ];
        let registry = registry_with_hooks(hooks);

        let mut metadata = Metadata::titled("Test");
        metadata.extra_turn_phases = vec!["turn_a".to_string(), "turn_b".to_string()];

        let err = phase_order(&metadata, &registry).expect_err("cycle");
        assert!(matches!(err, EngineError::PhaseCycle(_)));
        assert!(err.to_string().contains("turn_a"));
    }

    #[test]
    fn edges_outside_the_sequence_are_ignored() {
        let mut hooks = base_hook_definitions();
        hooks.push(
            HookDefinition::new("turn_solo", HookInvocation::TurnPhase)
                .with_after(&["turn_never_scheduled"]),
        );
        // turn_never_scheduled is defined (so dependency validation passes)
        // but not scheduled by any world.
        hooks.push(HookDefinition::new(
            "turn_never_scheduled",
            HookInvocation::TurnPhase,
        ));
        let registry = registry_with_hooks(hooks);

        let mut metadata = Metadata::titled("Test");
        metadata.extra_turn_phases = vec!["turn_solo".to_string()];

        let order = phase_order(&metadata, &registry).expect("order");
        assert_eq!(order[0], "turn_solo");
    }
}
