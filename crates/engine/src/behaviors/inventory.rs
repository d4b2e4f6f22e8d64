//! The `inventory` verb.

use fabula_protocol::Action;

use crate::accessor::Accessor;
use crate::behavior::{BehaviorModule, HandlerFn, HandlerResult, SourceType};
use crate::vocabulary::{VerbEntry, Vocabulary};

pub struct InventoryVerb;

impl BehaviorModule for InventoryVerb {
    fn name(&self) -> &'static str {
        "core.inventory"
    }

    fn source(&self) -> SourceType {
        SourceType::Core
    }

    fn vocabulary(&self) -> Vocabulary {
        Vocabulary {
            verbs: vec![VerbEntry::new("inventory").with_synonyms(&["i", "inv"])],
            ..Vocabulary::default()
        }
    }

    fn handlers(&self) -> Vec<(&'static str, HandlerFn)> {
        vec![("inventory", handle_inventory)]
    }
}

pub fn handle_inventory(acc: &mut dyn Accessor, action: &Action) -> HandlerResult {
    let actor_id = action.actor();
    let Some(actor) = acc.actor(actor_id) else {
        return HandlerResult::fail("No such actor.");
    };

    if actor.inventory.is_empty() {
        return HandlerResult::ok("You aren't carrying anything.");
    }

    let names: Vec<String> = actor
        .inventory
        .iter()
        .map(|item_id| {
            acc.item(item_id.as_str())
                .map(|item| item.name.clone())
                .unwrap_or_else(|| item_id.to_string())
        })
        .collect();
    HandlerResult::ok(format!("You are carrying: {}.", names.join(", ")))
}
