//! Light-source reactions: items that light when taken and dim when dropped.
//!
//! Attached per entity through the `behaviors` list; only items with
//! `provides_light` respond.

use crate::accessor::Accessor;
use crate::behavior::{
    BehaviorModule, EventContext, EventRegistration, EventResult, SourceType,
};
use crate::vocabulary::Vocabulary;

pub struct LightSources;

impl BehaviorModule for LightSources {
    fn name(&self) -> &'static str {
        "core.light_sources"
    }

    fn source(&self) -> SourceType {
        SourceType::Core
    }

    fn vocabulary(&self) -> Vocabulary {
        Vocabulary::default()
    }

    fn events(&self) -> Vec<EventRegistration> {
        vec![
            EventRegistration::new("on_take", on_take),
            EventRegistration::new("on_drop", on_drop),
        ]
    }
}

fn on_take(acc: &mut dyn Accessor, ctx: &EventContext) -> Option<EventResult> {
    let entity = ctx.entity.as_ref()?;
    let item = acc.item_mut(entity.as_str())?;
    if !item.provides_light() || item.is_lit() {
        return None;
    }
    item.properties.set_state("lit", true);
    let name = item.name.clone();
    Some(EventResult::message(format!(
        "Runes along the {name} flare into cold light."
    )))
}

fn on_drop(acc: &mut dyn Accessor, ctx: &EventContext) -> Option<EventResult> {
    let entity = ctx.entity.as_ref()?;
    let item = acc.item_mut(entity.as_str())?;
    if !item.provides_light() || !item.is_lit() {
        return None;
    }
    item.properties.set_state("lit", false);
    let name = item.name.clone();
    Some(EventResult::message(format!("The runes on the {name} fade.")))
}
