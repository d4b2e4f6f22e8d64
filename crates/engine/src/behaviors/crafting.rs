//! Crafting: `combine X with Y` and `craft <recipe>`.
//!
//! A library-tier module driven entirely by recipe records in the world's
//! `extra.recipes` payload:
//!
//! ```json
//! "extra": {
//!   "recipes": {
//!     "torch": {
//!       "ingredients": ["item_stick", "item_oily_rag"],
//!       "result": {"id": "item_torch", "name": "torch", "portable": true,
//!                  "location": "player", "description": "A crude torch"},
//!       "description": "You bind the rag around the stick.",
//!       "requires_location": "loc_workshop",
//!       "requires_message": "You need a workbench for that."
//!     }
//!   }
//! }
//! ```
//!
//! Ingredients are consumed to a removal sentinel; the result item is
//! spawned into the crafter's inventory.

use serde_json::{Map, Value};

use fabula_domain::{EntityId, Item};
use fabula_protocol::{Action, WordEntry};

use crate::accessor::Accessor;
use crate::behavior::{BehaviorModule, HandlerFn, HandlerResult, SourceType};
use crate::vocabulary::{VerbEntry, Vocabulary};

use super::support::{find_in_inventory, indirect_or_fail, object_or_fail};

const CONSUMED: &str = "__consumed_crafting__";

pub struct Crafting;

impl BehaviorModule for Crafting {
    fn name(&self) -> &'static str {
        "library.crafting"
    }

    fn source(&self) -> SourceType {
        SourceType::Library
    }

    fn vocabulary(&self) -> Vocabulary {
        Vocabulary {
            verbs: vec![
                VerbEntry::new("combine")
                    .with_synonyms(&["mix", "merge"])
                    .object_required()
                    .with_preposition("with"),
                VerbEntry::new("craft")
                    .with_synonyms(&["create", "make", "build", "assemble"])
                    .object_required(),
            ],
            ..Vocabulary::default()
        }
    }

    fn handlers(&self) -> Vec<(&'static str, HandlerFn)> {
        vec![("combine", handle_combine), ("craft", handle_craft)]
    }
}

fn recipe_catalog(acc: &dyn Accessor) -> Map<String, Value> {
    acc.world()
        .extra
        .get("recipes")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

fn recipe_ingredients(recipe: &Value) -> Vec<String> {
    recipe
        .get("ingredients")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Location requirement gate, if the recipe declares one.
fn check_requirements(acc: &dyn Accessor, actor_id: &str, recipe: &Value) -> Option<String> {
    let required = recipe.get("requires_location").and_then(Value::as_str)?;
    let here = acc.current_location(actor_id)?;
    if here == required {
        return None;
    }
    Some(
        recipe
            .get("requires_message")
            .and_then(Value::as_str)
            .unwrap_or("You can't craft that here.")
            .to_string(),
    )
}

/// Consume the ingredients and spawn the result into the inventory.
fn execute_craft(
    acc: &mut dyn Accessor,
    actor_id: &str,
    name: &str,
    recipe: &Value,
    used: &[EntityId],
) -> HandlerResult {
    for ingredient in used {
        if let Err(err) = acc.set_entity_where(ingredient.as_str(), CONSUMED) {
            return super::support::domain_failure(err);
        }
        if let Some(actor) = acc.actor_mut(actor_id) {
            actor.remove_from_inventory(ingredient.as_str());
        }
    }

    let result_item: Option<Item> = recipe
        .get("result")
        .and_then(|value| serde_json::from_value(value.clone()).ok());
    let Some(mut item) = result_item else {
        return HandlerResult::fail(format!(
            "INCONSISTENT STATE: recipe '{name}' has no usable result"
        ));
    };
    item.location = EntityId::new(actor_id);
    let item_id = item.id.clone();
    let item_name = item.name.clone();
    acc.world_mut().add_item(item);
    // Indexing the fresh item is a self-move through the normal path.
    if let Err(err) = acc.set_entity_where(item_id.as_str(), actor_id) {
        return super::support::domain_failure(err);
    }
    if let Some(actor) = acc.actor_mut(actor_id) {
        actor.inventory.push(item_id);
    }

    let message = recipe
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("You craft the {item_name}."));
    HandlerResult::ok(message)
}

pub fn handle_combine(acc: &mut dyn Accessor, action: &Action) -> HandlerResult {
    let first = match object_or_fail(action, "Combine what?") {
        Ok(word) => word,
        Err(fail) => return fail,
    };
    let second = match indirect_or_fail(action, &format!("Combine {} with what?", first.word)) {
        Ok(word) => word,
        Err(fail) => return fail,
    };
    let actor_id = action.actor().to_string();

    let Some(first_id) = find_in_inventory(acc, &actor_id, &first) else {
        return HandlerResult::fail(format!("You don't have any {}.", first.word));
    };
    let Some(second_id) = find_in_inventory(acc, &actor_id, &second) else {
        return HandlerResult::fail(format!("You don't have any {}.", second.word));
    };

    let catalog = recipe_catalog(acc);
    let found = catalog.iter().find(|(_, recipe)| {
        let mut ingredients = recipe_ingredients(recipe);
        ingredients.sort_unstable();
        let mut used = vec![first_id.to_string(), second_id.to_string()];
        used.sort_unstable();
        ingredients == used
    });
    let Some((name, recipe)) = found else {
        return HandlerResult::fail(format!(
            "You can't combine {} and {}.",
            first.word, second.word
        ));
    };
    if let Some(refusal) = check_requirements(acc, &actor_id, recipe) {
        return HandlerResult::fail(refusal);
    }

    let name = name.clone();
    let recipe = recipe.clone();
    execute_craft(acc, &actor_id, &name, &recipe, &[first_id, second_id])
}

pub fn handle_craft(acc: &mut dyn Accessor, action: &Action) -> HandlerResult {
    let word = match object_or_fail(action, "Craft what?") {
        Ok(word) => word,
        Err(fail) => return fail,
    };
    let actor_id = action.actor().to_string();

    let catalog = recipe_catalog(acc);
    let Some(recipe) = catalog.get(&word.word).cloned() else {
        return HandlerResult::fail(format!("You don't know how to craft {}.", word.word));
    };

    let mut used: Vec<EntityId> = Vec::new();
    let mut missing: Vec<String> = Vec::new();
    for ingredient in recipe_ingredients(&recipe) {
        if find_in_inventory(acc, &actor_id, &WordEntry::noun(ingredient.clone())).is_some() {
            used.push(EntityId::new(ingredient));
        } else {
            let name = acc
                .item(&ingredient)
                .map(|item| item.name.clone())
                .unwrap_or(ingredient);
            missing.push(name);
        }
    }
    if !missing.is_empty() {
        return HandlerResult::fail(format!("You need: {}.", missing.join(", ")));
    }
    if let Some(refusal) = check_requirements(acc, &actor_id, &recipe) {
        return HandlerResult::fail(refusal);
    }

    execute_craft(acc, &actor_id, &word.word, &recipe, &used)
}
