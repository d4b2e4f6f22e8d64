//! The behavior registry.
//!
//! Loading is a two-phase process. Phase 1 (registration) walks the module
//! list in deterministic order, sorted by `(source tier, name)`, and
//! records vocabulary, command handlers, event registrations, and hook
//! definitions; verb collisions across tiers resolve to the later tier,
//! collisions within a tier are errors. Phase 2 (finalisation) runs the
//! hook validators and aborts startup on any offence, all offences
//! reported together.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::behavior::{
    BehaviorModule, EventFn, HandlerFn, HookDefinition, HookInvocation, SourceType,
};
use crate::error::RegistryError;
use crate::hook_validation;
use crate::vocabulary::{base_vocabulary, Vocabulary};

/// One registered event: its optional hook and every handler modules
/// registered for it, in registration order.
#[derive(Debug, Clone)]
pub struct EventInfo {
    pub event_name: String,
    pub hook: Option<String>,
    pub registered_by: Vec<String>,
    pub(crate) handlers: Vec<(String, EventFn)>,
}

#[derive(Debug, Clone)]
struct HandlerEntry {
    module: String,
    source: SourceType,
    func: HandlerFn,
}

/// Registry of every loaded behavior module.
#[derive(Debug)]
pub struct BehaviorRegistry {
    modules: Vec<(String, SourceType)>,
    vocabulary: Vocabulary,
    handlers: HashMap<String, HandlerEntry>,
    events: IndexMap<String, EventInfo>,
    hooks: IndexMap<String, HookDefinition>,
    event_for_hook: HashMap<String, String>,
}

impl BehaviorRegistry {
    /// Load a module list through both phases.
    pub fn load(mut modules: Vec<Box<dyn BehaviorModule>>) -> Result<Self, RegistryError> {
        modules.sort_by(|a, b| (a.source(), a.name()).cmp(&(b.source(), b.name())));

        let mut registry = Self {
            modules: Vec::new(),
            vocabulary: Vocabulary::default(),
            handlers: HashMap::new(),
            events: IndexMap::new(),
            hooks: IndexMap::new(),
            event_for_hook: HashMap::new(),
        };
        let mut errors: Vec<String> = Vec::new();

        // Phase 1: registration.
        for module in &modules {
            registry.register_module(module.as_ref(), &mut errors);
        }

        // Phase 2: finalisation.
        hook_validation::validate_hook_prefixes(&registry.hooks, &mut errors);
        hook_validation::validate_turn_phase_dependencies(&registry.hooks, &mut errors);
        hook_validation::validate_hooks_are_defined(&registry.hooks, &registry.events, &mut errors);
        hook_validation::validate_invocation_consistency(&registry.hooks, &mut errors);
        registry.validate_handler_verbs(&mut errors);

        if errors.is_empty() {
            tracing::info!(
                modules = registry.modules.len(),
                verbs = registry.handlers.len(),
                hooks = registry.hooks.len(),
                "behavior registry loaded"
            );
            Ok(registry)
        } else {
            tracing::error!(count = errors.len(), "behavior registry failed to load");
            Err(RegistryError::new(errors))
        }
    }

    fn register_module(&mut self, module: &dyn BehaviorModule, errors: &mut Vec<String>) {
        let name = module.name().to_string();
        let source = module.source();
        if self.modules.iter().any(|(existing, _)| existing == &name) {
            errors.push(format!("Module '{name}' registered twice"));
            return;
        }
        tracing::debug!(module = %name, source = source.label(), "registering behavior module");
        self.modules.push((name.clone(), source));

        self.vocabulary.merge(&module.vocabulary());

        for (verb, func) in module.handlers() {
            match self.handlers.get(verb) {
                Some(existing) if existing.source == source => {
                    errors.push(format!(
                        "Verb '{verb}' has handlers in both '{}' and '{name}' at the {} tier",
                        existing.module,
                        source.label()
                    ));
                }
                Some(existing) => {
                    tracing::debug!(
                        verb,
                        replaced = %existing.module,
                        replacement = %name,
                        "later source tier overrides verb handler"
                    );
                    self.handlers.insert(
                        verb.to_string(),
                        HandlerEntry {
                            module: name.clone(),
                            source,
                            func,
                        },
                    );
                }
                None => {
                    self.handlers.insert(
                        verb.to_string(),
                        HandlerEntry {
                            module: name.clone(),
                            source,
                            func,
                        },
                    );
                }
            }
        }

        for registration in module.events() {
            let info = self
                .events
                .entry(registration.event.clone())
                .or_insert_with(|| EventInfo {
                    event_name: registration.event.clone(),
                    hook: registration.hook.clone(),
                    registered_by: Vec::new(),
                    handlers: Vec::new(),
                });
            if info.hook != registration.hook {
                errors.push(format!(
                    "Event '{}' registered with conflicting hooks ({:?} vs {:?})",
                    registration.event, info.hook, registration.hook
                ));
            }
            info.registered_by.push(name.clone());
            info.handlers.push((name.clone(), registration.handler));

            if let Some(hook) = &registration.hook {
                match self.event_for_hook.get(hook) {
                    Some(existing) if existing != &registration.event => {
                        errors.push(format!(
                            "Hook '{hook}' already drives event '{existing}'; \
                             '{}' cannot also claim it",
                            registration.event
                        ));
                    }
                    _ => {
                        self.event_for_hook
                            .insert(hook.clone(), registration.event.clone());
                    }
                }
            }
        }

        for mut definition in module.hook_definitions() {
            definition.defined_by = name.clone();
            match self.hooks.get(&definition.hook) {
                Some(existing) if existing.invocation != definition.invocation => {
                    errors.push(format!(
                        "Hook '{}' defined as {} by '{}' and as {} by '{name}'",
                        definition.hook,
                        existing.invocation.label(),
                        existing.defined_by,
                        definition.invocation.label()
                    ));
                }
                Some(_) => {}
                None => {
                    self.hooks.insert(definition.hook.clone(), definition);
                }
            }
        }
    }

    /// Every registered handler must correspond to a verb (or direction)
    /// declared in the merged vocabulary the parser will see.
    fn validate_handler_verbs(&self, errors: &mut Vec<String>) {
        let merged = self.merged_vocabulary(base_vocabulary());
        for (verb, entry) in &self.handlers {
            let declared = merged.verb(verb).is_some()
                || merged.directions.iter().any(|d| d == verb)
                || merged
                    .verbs
                    .iter()
                    .any(|v| v.synonyms.iter().any(|s| s == verb));
            if !declared {
                errors.push(format!(
                    "Handler for verb '{verb}' in module '{}' has no vocabulary declaration",
                    entry.module
                ));
            }
        }
    }

    // Invocation surface

    pub fn has_handler(&self, verb: &str) -> bool {
        self.handlers.contains_key(verb)
    }

    pub fn handler_for(&self, verb: &str) -> Option<HandlerFn> {
        self.handlers.get(verb).map(|entry| entry.func)
    }

    pub fn event(&self, name: &str) -> Option<&EventInfo> {
        self.events.get(name)
    }

    /// Every handler registered for an event, in registration order.
    pub fn event_handlers(&self, name: &str) -> Vec<EventFn> {
        self.events
            .get(name)
            .map(|info| info.handlers.iter().map(|(_, f)| *f).collect())
            .unwrap_or_default()
    }

    /// Handlers for an event restricted to an entity's `behaviors` list, in
    /// the order of that list. This ordering is a stable contract.
    pub fn entity_event_handlers(&self, behaviors: &[String], event: &str) -> Vec<EventFn> {
        let Some(info) = self.events.get(event) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for module in behaviors {
            for (registered_module, func) in &info.handlers {
                if registered_module == module {
                    out.push(*func);
                }
            }
        }
        out
    }

    /// Reverse lookup used by the turn-phase driver.
    pub fn event_for_hook(&self, hook: &str) -> Option<&str> {
        self.event_for_hook.get(hook).map(String::as_str)
    }

    pub fn hook_definitions(&self) -> &IndexMap<String, HookDefinition> {
        &self.hooks
    }

    /// Module names that define at least one turn-phase hook. No entity may
    /// list these in its `behaviors`.
    pub fn turn_phase_modules(&self) -> HashSet<String> {
        self.hooks
            .values()
            .filter(|def| def.invocation == HookInvocation::TurnPhase)
            .map(|def| def.defined_by.clone())
            .collect()
    }

    pub fn loaded_module_names(&self) -> HashSet<String> {
        self.modules.iter().map(|(name, _)| name.clone()).collect()
    }

    /// The merged vocabulary handed to the external parser: base engine
    /// vocabulary plus every module contribution.
    pub fn merged_vocabulary(&self, base: &Vocabulary) -> Vocabulary {
        let mut merged = base.clone();
        merged.merge(&self.vocabulary);
        merged
    }
}
