//! Positioning: `approach`, `hide`, `climb`, `stand`.
//!
//! These verbs maintain the cooperative `focused_on` / `posture` actor
//! properties. Focus survives across turns until explicitly changed;
//! posture clears on any movement-inducing focus change.

use fabula_protocol::Action;

use crate::accessor::Accessor;
use crate::behavior::{BehaviorModule, HandlerFn, HandlerResult, SourceType};
use crate::resolver::Resolution;
use crate::vocabulary::{VerbEntry, Vocabulary};

use super::support::{entity_name, not_found, object_or_fail, resolve_action_object};

pub struct Spatial;

impl BehaviorModule for Spatial {
    fn name(&self) -> &'static str {
        "core.spatial"
    }

    fn source(&self) -> SourceType {
        SourceType::Core
    }

    fn vocabulary(&self) -> Vocabulary {
        Vocabulary {
            verbs: vec![
                VerbEntry::new("approach").object_required(),
                VerbEntry::new("hide").with_preposition("behind"),
                VerbEntry::new("climb").with_synonyms(&["mount"]).object_required(),
                VerbEntry::new("stand").with_synonyms(&["dismount"]),
            ],
            ..Vocabulary::default()
        }
    }

    fn handlers(&self) -> Vec<(&'static str, HandlerFn)> {
        vec![
            ("approach", handle_approach),
            ("hide", handle_hide),
            ("climb", handle_climb),
            ("stand", handle_stand),
        ]
    }
}

pub fn handle_approach(acc: &mut dyn Accessor, action: &Action) -> HandlerResult {
    let word = match object_or_fail(action, "Approach what?") {
        Ok(word) => word,
        Err(fail) => return fail,
    };
    let actor_id = action.actor().to_string();

    let target = match resolve_action_object(acc, action, &word) {
        Resolution::Entity(id) => id,
        Resolution::Universal(surface) => {
            return HandlerResult::fail(format!("You can't get any closer to the {surface}."));
        }
        Resolution::NotFound => return not_found(&word),
    };
    let name = entity_name(acc, target.as_str());

    let already = acc
        .actor(&actor_id)
        .and_then(|a| a.focused_on())
        .is_some_and(|f| f == target);
    if already {
        return HandlerResult::ok(format!("You're already at the {name}."));
    }

    if let Some(actor) = acc.actor_mut(&actor_id) {
        actor.set_focused_on(Some(&target));
        actor.set_posture(None);
    }
    HandlerResult::ok(format!("You move to the {name}."))
}

pub fn handle_hide(acc: &mut dyn Accessor, action: &Action) -> HandlerResult {
    let actor_id = action.actor().to_string();

    match action.object_word() {
        Some(word) => {
            let target = match resolve_action_object(acc, action, &word) {
                Resolution::Entity(id) => id,
                _ => return not_found(&word),
            };
            let offers_cover = match acc.entity_kind(target.as_str()) {
                Some(fabula_domain::EntityKind::Item) => acc
                    .item(target.as_str())
                    .is_some_and(|i| i.properties.bool_or("cover", false)),
                Some(fabula_domain::EntityKind::Part) => acc
                    .part(target.as_str())
                    .is_some_and(|p| p.properties.bool_or("cover", false)),
                _ => false,
            };
            let name = entity_name(acc, target.as_str());
            if !offers_cover {
                return HandlerResult::fail(format!("The {name} offers no cover."));
            }
            if let Some(actor) = acc.actor_mut(&actor_id) {
                actor.set_focused_on(Some(&target));
                actor.set_posture(Some("cover"));
            }
            HandlerResult::ok(format!("You take cover behind the {name}."))
        }
        None => {
            if let Some(actor) = acc.actor_mut(&actor_id) {
                actor.set_posture(Some("concealed"));
            }
            HandlerResult::ok("You press yourself out of sight.")
        }
    }
}

pub fn handle_climb(acc: &mut dyn Accessor, action: &Action) -> HandlerResult {
    let word = match object_or_fail(action, "Climb what?") {
        Ok(word) => word,
        Err(fail) => return fail,
    };
    let actor_id = action.actor().to_string();

    let target = match resolve_action_object(acc, action, &word) {
        Resolution::Entity(id) => id,
        _ => return not_found(&word),
    };
    let name = entity_name(acc, target.as_str());

    // A surface container is mounted; anything climbable is climbed.
    let (posture, phrase) = if acc
        .item(target.as_str())
        .and_then(|i| i.container())
        .is_some_and(|spec| spec.is_surface)
    {
        ("on_surface", format!("You climb onto the {name}."))
    } else if is_climbable(acc, target.as_str()) {
        ("climbing", format!("You climb the {name}."))
    } else {
        return HandlerResult::fail(format!("You can't climb the {name}."));
    };

    if let Some(actor) = acc.actor_mut(&actor_id) {
        actor.set_focused_on(Some(&target));
        actor.set_posture(Some(posture));
    }
    HandlerResult::ok(phrase)
}

fn is_climbable(acc: &dyn Accessor, id: &str) -> bool {
    match acc.entity_kind(id) {
        Some(fabula_domain::EntityKind::Item) => acc
            .item(id)
            .is_some_and(|i| i.properties.bool_or("climbable", false)),
        Some(fabula_domain::EntityKind::Part) => acc
            .part(id)
            .is_some_and(|p| p.properties.bool_or("climbable", false)),
        _ => false,
    }
}

pub fn handle_stand(acc: &mut dyn Accessor, action: &Action) -> HandlerResult {
    let actor_id = action.actor().to_string();
    let posture = acc.actor(&actor_id).and_then(|a| a.posture());
    let Some(posture) = posture else {
        return HandlerResult::fail("You're already on your feet.");
    };

    if let Some(actor) = acc.actor_mut(&actor_id) {
        actor.set_posture(None);
    }
    let phrase = match posture.as_str() {
        "on_surface" | "climbing" => "You climb back down.",
        _ => "You step back into the open.",
    };
    HandlerResult::ok(phrase)
}
