//! Movement: `go <direction>`, bare directions, and portal traversal.
//!
//! Exit entities are traversed through their connections: the destination
//! is the owning location of the first connected exit. Worlds still using
//! the legacy per-location exit table fall back to its `to` field. Doors
//! gate traversal in both models. Leaving a location clears posture and
//! focus, and fires the destination's `on_enter` event (hook
//! `entity_entered_location`).

use fabula_domain::EntityId;
use fabula_protocol::Action;

use crate::accessor::Accessor;
use crate::behavior::{
    BehaviorModule, EventContext, EventRegistration, EventResult, HandlerFn, HandlerResult,
    HookDefinition, HookInvocation, SourceType,
};
use crate::serializer::serialize_location;
use crate::vocabulary::{VerbEntry, Vocabulary};

pub struct Movement;

const DIRECTIONS: [(&str, &str); 6] = [
    ("north", "n"),
    ("south", "s"),
    ("east", "e"),
    ("west", "w"),
    ("up", "u"),
    ("down", "d"),
];

impl BehaviorModule for Movement {
    fn name(&self) -> &'static str {
        "core.movement"
    }

    fn source(&self) -> SourceType {
        SourceType::Core
    }

    fn vocabulary(&self) -> Vocabulary {
        let mut verbs = vec![VerbEntry::new("go").object_required()];
        for (word, short) in DIRECTIONS {
            verbs.push(VerbEntry::new(word).with_synonyms(&[short]));
        }
        Vocabulary {
            verbs,
            directions: DIRECTIONS.iter().map(|(word, _)| word.to_string()).collect(),
            ..Vocabulary::default()
        }
    }

    fn handlers(&self) -> Vec<(&'static str, HandlerFn)> {
        let mut handlers: Vec<(&'static str, HandlerFn)> = vec![("go", handle_go)];
        for (word, _) in DIRECTIONS {
            handlers.push((word, handle_go));
        }
        handlers
    }

    fn events(&self) -> Vec<EventRegistration> {
        vec![EventRegistration::for_hook(
            "on_enter",
            "entity_entered_location",
            on_enter_location,
        )]
    }

    fn hook_definitions(&self) -> Vec<HookDefinition> {
        vec![HookDefinition::new(
            "entity_entered_location",
            HookInvocation::Entity,
        )
        .with_description("Fired on a location when an actor enters it")]
    }
}

/// Location reaction: announce the location's `on_enter_message` property.
fn on_enter_location(acc: &mut dyn Accessor, ctx: &EventContext) -> Option<EventResult> {
    let entity = ctx.entity.as_ref()?;
    let message = acc
        .location(entity.as_str())?
        .properties
        .get_str("on_enter_message")?
        .to_string();
    Some(EventResult::message(message))
}

fn canonical_direction(word: &str) -> Option<&'static str> {
    let lower = word.to_lowercase();
    DIRECTIONS
        .iter()
        .find(|(long, short)| *long == lower || *short == lower)
        .map(|(long, _)| *long)
}

pub fn handle_go(acc: &mut dyn Accessor, action: &Action) -> HandlerResult {
    let actor_id = action.actor().to_string();
    let Some(loc_id) = acc.current_location(&actor_id) else {
        return HandlerResult::fail("You are nowhere.");
    };

    // The direction comes from the verb itself (`north`) or the object
    // (`go north`, `go mirror` for portals).
    let verb = action.verb.as_deref().unwrap_or("go");
    let surface_word = if verb == "go" {
        match action.object_word() {
            Some(word) => word.word,
            None => return HandlerResult::fail("Go where?"),
        }
    } else {
        verb.to_string()
    };
    let direction = canonical_direction(&surface_word);

    // Prefer first-class exits, by direction or by name for portals.
    let mut chosen_exit: Option<EntityId> = None;
    for exit_id in acc.exits_from_location(loc_id.as_str()) {
        let Some(exit) = acc.exit(exit_id.as_str()) else {
            continue;
        };
        if exit.is_hidden() {
            continue;
        }
        let by_direction = direction
            .is_some_and(|d| exit.direction.as_deref() == Some(d));
        let by_name = exit.name.eq_ignore_ascii_case(&surface_word)
            || exit
                .synonyms()
                .iter()
                .any(|s| s.eq_ignore_ascii_case(&surface_word));
        if by_direction || by_name {
            chosen_exit = Some(exit_id);
            break;
        }
    }

    if let Some(exit_id) = chosen_exit {
        let exit = match acc.exit(exit_id.as_str()) {
            Some(exit) => exit.clone(),
            None => return HandlerResult::fail("You can't go that way."),
        };

        if let Some(fail) = door_blocks(acc, exit.door_id.as_ref().map(EntityId::as_str)) {
            return fail;
        }
        let slot_door = exit
            .direction
            .as_deref()
            .and_then(|d| acc.door_for_exit(loc_id.as_str(), d));
        if let Some(fail) = door_blocks(acc, slot_door.as_ref().map(EntityId::as_str)) {
            return fail;
        }

        let destination = acc
            .exit_connections(exit_id.as_str())
            .first()
            .and_then(|target| acc.exit(target.as_str()))
            .map(|target| target.location.clone());
        let Some(destination) = destination else {
            return HandlerResult::fail(format!("The {} leads nowhere.", exit.name));
        };

        let phrase = match &exit.direction {
            Some(direction) => format!("You go {direction}."),
            None => format!("You step through the {}.", exit.name),
        };
        return move_actor(acc, &actor_id, &destination, phrase);
    }

    // Legacy per-location exit table.
    let Some(direction) = direction else {
        return HandlerResult::fail("You can't go that way.");
    };
    let descriptor = acc
        .location(loc_id.as_str())
        .and_then(|loc| loc.exits.get(direction))
        .cloned();
    let Some(descriptor) = descriptor else {
        return HandlerResult::fail("You can't go that way.");
    };
    if descriptor.is_hidden() {
        return HandlerResult::fail("You can't go that way.");
    }

    let door_id = descriptor
        .door_id
        .clone()
        .or_else(|| acc.door_for_exit(loc_id.as_str(), direction));
    if let Some(fail) = door_blocks(acc, door_id.as_ref().map(EntityId::as_str)) {
        return fail;
    }

    let Some(destination) = descriptor.to.clone() else {
        return HandlerResult::fail("That way leads nowhere.");
    };
    move_actor(acc, &actor_id, &destination, format!("You go {direction}."))
}

/// A closed or locked door refuses traversal.
fn door_blocks(acc: &dyn Accessor, door_id: Option<&str>) -> Option<HandlerResult> {
    let door = acc.door_item(door_id?)?;
    if door.door_open() {
        return None;
    }
    let name = door.name.clone();
    if door.door_locked() {
        Some(HandlerResult::fail(format!("The {name} is locked.")))
    } else {
        Some(HandlerResult::fail(format!("The {name} is closed.")))
    }
}

fn move_actor(
    acc: &mut dyn Accessor,
    actor_id: &str,
    destination: &EntityId,
    phrase: String,
) -> HandlerResult {
    if let Err(err) = acc.set_entity_where(actor_id, destination.as_str()) {
        return super::support::domain_failure(err);
    }
    if let Some(actor) = acc.actor_mut(actor_id) {
        actor.set_posture(None);
        actor.set_focused_on(None);
    }

    let mut beats = Vec::new();
    let ctx = EventContext::for_entity(
        "on_enter",
        destination.clone(),
        EntityId::new(actor_id),
    );
    if let Some(result) = acc.invoke_event(&ctx) {
        if let Some(message) = result.message {
            beats.push(message);
        }
    }

    let name = acc
        .location(destination.as_str())
        .map(|loc| loc.name.clone())
        .unwrap_or_default();
    let data = serialize_location(acc, destination.as_str(), actor_id);
    let message = if name.is_empty() {
        phrase
    } else {
        format!("{phrase} You are in the {name}.")
    };
    HandlerResult::ok(message).with_data(data).with_beats(beats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::WorldAccessor;
    use crate::registry::BehaviorRegistry;
    use fabula_domain::{
        Actor, Exit, ExitDescriptor, Item, Location, Metadata, Properties, World,
    };
    use serde_json::{json, Value};

    fn props(value: Value) -> Properties {
        match value {
            Value::Object(map) => Properties::from_map(map),
            other => panic!("expected object, got {other}"),
        }
    }

    fn exit_world() -> World {
        let mut world = World::new(Metadata::titled("Test"));
        world.add_location(Location::new("loc_hall", "Hall", "A hall"));
        world.add_location(
            Location::new("loc_treasure", "Treasure Room", "Glittering hoard").with_properties(
                props(json!({"on_enter_message": "Gold glitters all around you."})),
            ),
        );
        world.add_exit(
            Exit::new("exit_hall_east", "east exit", "loc_hall")
                .with_direction("east")
                .with_connections(vec![EntityId::new("exit_treasure_west")]),
        );
        world.add_exit(
            Exit::new("exit_treasure_west", "west exit", "loc_treasure")
                .with_direction("west")
                .with_connections(vec![EntityId::new("exit_hall_east")]),
        );
        world.add_actor(Actor::new("player", "Adventurer", "You", "loc_hall"));
        world.rebuild_indices().expect("indices");
        world
    }

    fn registry() -> BehaviorRegistry {
        BehaviorRegistry::load(vec![Box::new(Movement)]).expect("registry")
    }

    #[test]
    fn go_traverses_exit_connections() {
        let registry = registry();
        let mut world = exit_world();
        let mut acc = WorldAccessor::new(&mut world, &registry);

        let action = Action::verb("go").with_object("east").normalized("player");
        let result = handle_go(&mut acc, &action);

        assert!(result.success, "go failed: {}", result.message);
        assert_eq!(
            world.player().map(|p| p.location.clone()),
            Some(EntityId::new("loc_treasure"))
        );
    }

    #[test]
    fn bare_direction_verbs_work() {
        let registry = registry();
        let mut world = exit_world();
        let mut acc = WorldAccessor::new(&mut world, &registry);

        let action = Action::verb("east").normalized("player");
        let result = handle_go(&mut acc, &action);
        assert!(result.success);
    }

    #[test]
    fn movement_clears_posture_and_focus() {
        let registry = registry();
        let mut world = exit_world();
        if let Some(player) = world.player_mut() {
            player.set_posture(Some("cover"));
            player.set_focused_on(Some(&EntityId::new("exit_hall_east")));
        }
        let mut acc = WorldAccessor::new(&mut world, &registry);

        let action = Action::verb("east").normalized("player");
        assert!(handle_go(&mut acc, &action).success);

        let player = world.player().expect("player");
        assert!(player.posture().is_none());
        assert!(player.focused_on().is_none());
    }

    #[test]
    fn entering_a_location_fires_its_on_enter_reaction() {
        let registry = registry();
        let mut world = exit_world();
        if let Some(loc) = world.location_mut("loc_treasure") {
            loc.behaviors.push("core.movement".to_string());
        }
        let mut acc = WorldAccessor::new(&mut world, &registry);

        let action = Action::verb("east").normalized("player");
        let result = handle_go(&mut acc, &action);
        assert!(result.success);
        assert!(result
            .beats
            .iter()
            .any(|b| b.contains("Gold glitters all around you.")));
    }

    #[test]
    fn closed_and_locked_doors_block_traversal() {
        let registry = registry();
        let mut world = exit_world();
        let mut door = Item::new("door_iron", "iron door", "An iron door", "exit:loc_hall:east");
        door.properties
            .set("door", json!({"open": false, "locked": true}));
        world.add_item(door);
        if let Some(exit) = world.exit_mut("exit_hall_east") {
            exit.door_id = Some(EntityId::new("door_iron"));
        }
        world.rebuild_indices().expect("indices");

        {
            let mut acc = WorldAccessor::new(&mut world, &registry);
            let action = Action::verb("east").normalized("player");
            let result = handle_go(&mut acc, &action);
            assert!(!result.success);
            assert!(result.message.contains("locked"));
        }

        if let Some(door) = world.item_mut("door_iron") {
            door.set_door_locked(false);
        }
        {
            let mut acc = WorldAccessor::new(&mut world, &registry);
            let action = Action::verb("east").normalized("player");
            let result = handle_go(&mut acc, &action);
            assert!(!result.success);
            assert!(result.message.contains("closed"));
        }

        if let Some(door) = world.item_mut("door_iron") {
            door.set_door_open(true);
        }
        {
            let mut acc = WorldAccessor::new(&mut world, &registry);
            let action = Action::verb("east").normalized("player");
            assert!(handle_go(&mut acc, &action).success);
        }
    }

    #[test]
    fn legacy_exit_table_still_traverses() {
        let registry = registry();
        let mut world = World::new(Metadata::titled("Test"));
        world.add_location(
            Location::new("loc_a", "Room A", "")
                .with_exit("north", ExitDescriptor::open("loc_b")),
        );
        world.add_location(Location::new("loc_b", "Room B", ""));
        world.add_actor(Actor::new("player", "Adventurer", "You", "loc_a"));
        world.rebuild_indices().expect("indices");

        let mut acc = WorldAccessor::new(&mut world, &registry);
        let action = Action::verb("north").normalized("player");
        let result = handle_go(&mut acc, &action);

        assert!(result.success);
        assert_eq!(
            world.player().map(|p| p.location.clone()),
            Some(EntityId::new("loc_b"))
        );
    }

    #[test]
    fn portals_traverse_by_name() {
        let registry = registry();
        let mut world = exit_world();
        world.add_exit(
            Exit::new("exit_mirror", "shimmering mirror", "loc_hall")
                .with_connections(vec![EntityId::new("exit_treasure_west")]),
        );
        world.rebuild_indices().expect("indices");

        let mut acc = WorldAccessor::new(&mut world, &registry);
        let action = Action::verb("go").with_object("shimmering mirror").normalized("player");
        let result = handle_go(&mut acc, &action);

        assert!(result.success);
        assert!(result.message.contains("step through"));
    }

    #[test]
    fn unknown_directions_fail_without_moving() {
        let registry = registry();
        let mut world = exit_world();
        let mut acc = WorldAccessor::new(&mut world, &registry);

        let action = Action::verb("go").with_object("sideways").normalized("player");
        let result = handle_go(&mut acc, &action);
        assert!(!result.success);
        assert_eq!(
            world.player().map(|p| p.location.clone()),
            Some(EntityId::new("loc_hall"))
        );
    }
}
