//! Session meta verbs: `save`, `load`, `quit`, `help`.
//!
//! These handlers never perform I/O. Save, load, and quit return a
//! `data.signal` payload for the host to act on; all four keep working
//! after the corruption latch is set.

use fabula_protocol::{Action, Signal};

use crate::accessor::Accessor;
use crate::behavior::{BehaviorModule, HandlerFn, HandlerResult, SourceType};
use crate::vocabulary::{VerbEntry, Vocabulary};

pub struct Meta;

impl BehaviorModule for Meta {
    fn name(&self) -> &'static str {
        "core.meta"
    }

    fn source(&self) -> SourceType {
        SourceType::Core
    }

    fn vocabulary(&self) -> Vocabulary {
        Vocabulary {
            verbs: vec![
                VerbEntry::new("save"),
                VerbEntry::new("load").with_synonyms(&["restore"]),
                VerbEntry::new("quit").with_synonyms(&["exit"]),
                VerbEntry::new("help"),
            ],
            ..Vocabulary::default()
        }
    }

    fn handlers(&self) -> Vec<(&'static str, HandlerFn)> {
        vec![
            ("save", handle_save),
            ("load", handle_load),
            ("quit", handle_quit),
            ("help", handle_help),
        ]
    }
}

/// Filename from the object word, with the raw input line kept for host-side
/// fallback parsing.
fn filename_of(action: &Action) -> Option<String> {
    action.object_word().map(|word| word.word)
}

pub fn handle_save(_acc: &mut dyn Accessor, action: &Action) -> HandlerResult {
    let filename = filename_of(action);
    HandlerResult::ok("Saving the game.").with_data(Signal::Save.payload(
        filename.as_deref(),
        action.raw_input.as_deref(),
    ))
}

pub fn handle_load(_acc: &mut dyn Accessor, action: &Action) -> HandlerResult {
    let filename = filename_of(action);
    HandlerResult::ok("Loading a saved game.").with_data(Signal::Load.payload(
        filename.as_deref(),
        action.raw_input.as_deref(),
    ))
}

pub fn handle_quit(_acc: &mut dyn Accessor, action: &Action) -> HandlerResult {
    HandlerResult::ok("Thanks for playing!")
        .with_data(Signal::Quit.payload(None, action.raw_input.as_deref()))
}

pub fn handle_help(acc: &mut dyn Accessor, _action: &Action) -> HandlerResult {
    let mut words: Vec<String> = acc
        .merged_verbs()
        .iter()
        .map(|verb| verb.word.clone())
        .collect();
    words.sort_unstable();
    HandlerResult::ok(format!("Available commands: {}.", words.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::WorldAccessor;
    use crate::registry::BehaviorRegistry;
    use fabula_domain::{Actor, Location, Metadata, World};
    use serde_json::json;

    fn test_world() -> World {
        let mut world = World::new(Metadata::titled("Test"));
        world.add_location(Location::new("room1", "Room", "A room"));
        world.add_actor(Actor::new("player", "Adventurer", "Test player", "room1"));
        world.rebuild_indices().expect("indices");
        world
    }

    fn registry() -> BehaviorRegistry {
        BehaviorRegistry::load(vec![Box::new(Meta)]).expect("registry")
    }

    #[test]
    fn quit_returns_the_quit_signal() {
        let registry = registry();
        let mut world = test_world();
        let mut acc = WorldAccessor::new(&mut world, &registry);

        let result = handle_quit(&mut acc, &Action::verb("quit").normalized("player"));

        assert!(result.success);
        assert!(result.message.to_lowercase().contains("playing"));
        let data = result.data.expect("signal payload");
        assert_eq!(data["signal"], json!("quit"));
    }

    #[test]
    fn save_without_filename_reports_null_filename() {
        let registry = registry();
        let mut world = test_world();
        let mut acc = WorldAccessor::new(&mut world, &registry);

        let result = handle_save(&mut acc, &Action::verb("save").normalized("player"));

        assert!(result.success);
        let data = result.data.expect("signal payload");
        assert_eq!(data["signal"], json!("save"));
        assert_eq!(data["filename"], json!(null));
    }

    #[test]
    fn save_with_object_extracts_the_filename() {
        let registry = registry();
        let mut world = test_world();
        let mut acc = WorldAccessor::new(&mut world, &registry);

        let mut action = Action::verb("save").with_object("savegame.json");
        action.raw_input = Some("save savegame.json".to_string());
        let result = handle_save(&mut acc, &action.normalized("player"));

        let data = result.data.expect("signal payload");
        assert_eq!(data["filename"], json!("savegame.json"));
        assert_eq!(data["raw_input"], json!("save savegame.json"));
    }

    #[test]
    fn load_returns_the_load_signal() {
        let registry = registry();
        let mut world = test_world();
        let mut acc = WorldAccessor::new(&mut world, &registry);

        let result = handle_load(&mut acc, &Action::verb("load").normalized("player"));
        let data = result.data.expect("signal payload");
        assert_eq!(data["signal"], json!("load"));
    }

    #[test]
    fn help_lists_registered_verbs() {
        let registry = registry();
        let mut world = test_world();
        let mut acc = WorldAccessor::new(&mut world, &registry);

        let result = handle_help(&mut acc, &Action::verb("help").normalized("player"));
        assert!(result.success);
        for verb in ["save", "load", "quit", "help"] {
            assert!(result.message.contains(verb), "missing {verb}");
        }
    }
}
