//! Bundled behavior modules.
//!
//! The core tier carries the foundational verb set every game starts from;
//! the library tier holds opt-in mechanics. Games register their own
//! modules on top and may override any verb here from the game tier.

pub mod crafting;
pub mod environment;
pub mod inventory;
pub mod light_sources;
pub mod manipulation;
pub mod meta;
pub mod movement;
pub mod npcs;
pub mod perception;
pub mod portals;
pub mod spatial;
mod support;

pub use crafting::Crafting;
pub use environment::Environment;
pub use inventory::InventoryVerb;
pub use light_sources::LightSources;
pub use manipulation::Manipulation;
pub use meta::Meta;
pub use movement::Movement;
pub use npcs::Npcs;
pub use perception::Perception;
pub use portals::Portals;
pub use spatial::Spatial;

use crate::behavior::BehaviorModule;

/// The core module tier.
pub fn core_modules() -> Vec<Box<dyn BehaviorModule>> {
    vec![
        Box::new(Manipulation),
        Box::new(Perception),
        Box::new(Movement),
        Box::new(Portals),
        Box::new(Spatial),
        Box::new(InventoryVerb),
        Box::new(Meta),
        Box::new(LightSources),
        Box::new(Npcs),
        Box::new(Environment),
    ]
}

/// The bundled library tier.
pub fn library_modules() -> Vec<Box<dyn BehaviorModule>> {
    vec![Box::new(Crafting)]
}

/// Core plus bundled libraries, the usual starting set for a game.
pub fn standard_modules() -> Vec<Box<dyn BehaviorModule>> {
    let mut modules = core_modules();
    modules.extend(library_modules());
    modules
}
