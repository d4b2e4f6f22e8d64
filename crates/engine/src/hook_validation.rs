//! Hook-system validation gates.
//!
//! Five checks run at registry finalisation (the first four here; the
//! world-dependent gate runs when a protocol handler is constructed).
//! Offences are accumulated rather than short-circuited so module authors
//! see every problem at once.

use std::collections::HashSet;

use indexmap::IndexMap;

use fabula_domain::World;

use crate::behavior::{HookDefinition, HookInvocation};
use crate::registry::EventInfo;

/// Turn-phase hooks must start with `turn_`; entity hooks with `entity_`.
pub fn validate_hook_prefixes(
    hooks: &IndexMap<String, HookDefinition>,
    errors: &mut Vec<String>,
) {
    for def in hooks.values() {
        match def.invocation {
            HookInvocation::TurnPhase => {
                if !def.hook.starts_with("turn_") {
                    errors.push(format!(
                        "Turn phase hook '{}' (defined by '{}') must start with 'turn_'",
                        def.hook, def.defined_by
                    ));
                }
            }
            HookInvocation::Entity => {
                if !def.hook.starts_with("entity_") {
                    errors.push(format!(
                        "Entity hook '{}' (defined by '{}') must start with 'entity_'",
                        def.hook, def.defined_by
                    ));
                }
            }
        }
    }
}

/// Each turn-phase hook's `after` list may name only defined turn-phase
/// hooks. Entity hooks do not use dependencies; their `after` is ignored.
pub fn validate_turn_phase_dependencies(
    hooks: &IndexMap<String, HookDefinition>,
    errors: &mut Vec<String>,
) {
    for def in hooks.values() {
        if def.invocation != HookInvocation::TurnPhase {
            continue;
        }
        for dep in &def.after {
            match hooks.get(dep) {
                None => errors.push(format!(
                    "Turn phase hook '{}' depends on undefined hook '{dep}'",
                    def.hook
                )),
                Some(target) if target.invocation != HookInvocation::TurnPhase => {
                    errors.push(format!(
                        "Turn phase hook '{}' depends on '{dep}' which is not a turn phase hook",
                        def.hook
                    ));
                }
                Some(_) => {}
            }
        }
    }
}

/// Every event registration with a non-empty hook must name a defined hook.
pub fn validate_hooks_are_defined(
    hooks: &IndexMap<String, HookDefinition>,
    events: &IndexMap<String, EventInfo>,
    errors: &mut Vec<String>,
) {
    for info in events.values() {
        let Some(hook) = &info.hook else {
            continue;
        };
        if !hooks.contains_key(hook) {
            let mut available: Vec<&str> = hooks.keys().map(String::as_str).collect();
            available.sort_unstable();
            errors.push(format!(
                "Event '{}' references undefined hook '{hook}'. Available hooks: {}",
                info.event_name,
                if available.is_empty() {
                    "(none)".to_string()
                } else {
                    available.join(", ")
                }
            ));
        }
    }
}

/// A hook name must carry exactly one invocation type across all modules.
/// Registration already rejects live conflicts; this gate catches any that
/// slipped through aggregation so the failure is always reported.
pub fn validate_invocation_consistency(
    hooks: &IndexMap<String, HookDefinition>,
    errors: &mut Vec<String>,
) {
    let mut seen: IndexMap<&str, HookInvocation> = IndexMap::new();
    for def in hooks.values() {
        if let Some(existing) = seen.get(def.hook.as_str()) {
            if *existing != def.invocation {
                errors.push(format!(
                    "Hook '{}' carries both {} and {} invocations",
                    def.hook,
                    existing.label(),
                    def.invocation.label()
                ));
            }
        } else {
            seen.insert(def.hook.as_str(), def.invocation);
        }
    }
}

/// No entity's `behaviors` list may contain a module that defines a
/// turn-phase hook: turn phases are world-scoped, never entity-scoped.
pub fn validate_turn_phase_not_on_entities(
    world: &World,
    turn_phase_modules: &HashSet<String>,
    errors: &mut Vec<String>,
) {
    let mut check = |kind: &str, id: &str, behaviors: &[String]| {
        for module in behaviors {
            if turn_phase_modules.contains(module) {
                errors.push(format!(
                    "{kind} '{id}' has turn phase behavior '{module}'; \
                     turn phase hooks are world-scoped and cannot be entity behaviors"
                ));
            }
        }
    };

    for item in world.items.values() {
        check("Item", item.id.as_str(), &item.behaviors);
    }
    for actor in world.actors.values() {
        check("Actor", actor.id.as_str(), &actor.behaviors);
    }
    for loc in world.locations.values() {
        check("Location", loc.id.as_str(), &loc.behaviors);
    }
    for part in world.parts.values() {
        check("Part", part.id.as_str(), &part.behaviors);
    }
    for exit in world.exits.values() {
        check("Exit", exit.id.as_str(), &exit.behaviors);
    }
}
