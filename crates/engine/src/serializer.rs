//! Entity serialization for narrator-facing responses.
//!
//! One function converts any entity into the JSON object the narrator
//! consumes: core fields, a derived `type`, door and light flags, the
//! entity's `llm_context` with traits re-shuffled per call (the source is
//! never mutated), a `perspective_note` selected from the entity's
//! `perspective_variants` by the player's posture and focus, and a
//! `spatial_relation` when the player holds a posture. The RNG is a
//! parameter so tests can be deterministic.

use rand::seq::SliceRandom;
use rand::RngCore;
use serde_json::{Map, Value};

use fabula_domain::{EntityId, EntityKind, Exit, World};

use crate::accessor::Accessor;

/// Player positioning snapshot used for perspective selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerContext {
    pub posture: Option<String>,
    pub focused_on: Option<EntityId>,
}

/// Serialization options.
#[derive(Debug, Clone)]
pub struct SerializeOpts {
    pub include_llm_context: bool,
    /// Trait-count cap applied after shuffling, for brief narration modes.
    pub max_traits: Option<usize>,
    pub player_context: Option<PlayerContext>,
}

impl Default for SerializeOpts {
    fn default() -> Self {
        Self {
            include_llm_context: true,
            max_traits: None,
            player_context: None,
        }
    }
}

impl SerializeOpts {
    pub fn with_player_context(mut self, ctx: PlayerContext) -> Self {
        self.player_context = Some(ctx);
        self
    }

    pub fn with_max_traits(mut self, max: usize) -> Self {
        self.max_traits = Some(max);
        self
    }
}

/// Snapshot an actor's posture and focus for perspective selection.
pub fn player_context(acc: &dyn Accessor, actor_id: &str) -> PlayerContext {
    match acc.actor(actor_id) {
        Some(actor) => PlayerContext {
            posture: actor.posture(),
            focused_on: actor.focused_on(),
        },
        None => PlayerContext::default(),
    }
}

/// Serialize any entity by id, using the thread RNG for trait shuffling.
pub fn entity_to_value(world: &World, id: &str, opts: &SerializeOpts) -> Option<Value> {
    entity_to_value_with_rng(world, id, opts, &mut rand::thread_rng())
}

/// Serialize any entity by id with a caller-supplied RNG.
pub fn entity_to_value_with_rng(
    world: &World,
    id: &str,
    opts: &SerializeOpts,
    rng: &mut dyn RngCore,
) -> Option<Value> {
    let kind = world.entity_kind(id)?;
    let mut result = Map::new();

    let properties = match kind {
        EntityKind::Item => {
            let item = world.item(id)?;
            insert_core(&mut result, id, &item.name, &item.description);
            let entity_type = if item.is_door() {
                "door"
            } else if item.is_container() {
                "container"
            } else {
                "item"
            };
            result.insert("type".to_string(), Value::String(entity_type.to_string()));
            if item.is_door() {
                result.insert("open".to_string(), Value::Bool(item.door_open()));
                result.insert("locked".to_string(), Value::Bool(item.door_locked()));
            }
            if item.is_lit() {
                result.insert("lit".to_string(), Value::Bool(true));
            }
            if item.provides_light() {
                result.insert("provides_light".to_string(), Value::Bool(true));
            }
            Some(&item.properties)
        }
        EntityKind::Actor => {
            let actor = world.actor(id)?;
            insert_core(&mut result, id, &actor.name, &actor.description);
            result.insert("type".to_string(), Value::String("actor".to_string()));
            Some(&actor.properties)
        }
        EntityKind::Location => {
            let loc = world.location(id)?;
            insert_core(&mut result, id, &loc.name, &loc.description);
            result.insert("type".to_string(), Value::String("location".to_string()));
            Some(&loc.properties)
        }
        EntityKind::Lock => {
            let lock = world.lock(id)?;
            insert_core(&mut result, id, &lock.name, &lock.description);
            result.insert("type".to_string(), Value::String("lock".to_string()));
            Some(&lock.properties)
        }
        EntityKind::Part => {
            let part = world.part(id)?;
            insert_core(&mut result, id, &part.name, part.description().unwrap_or(""));
            result.insert("type".to_string(), Value::String("part".to_string()));
            Some(&part.properties)
        }
        EntityKind::Exit => {
            let exit = world.exit(id)?;
            insert_core(&mut result, id, &exit.name, exit.properties.get_str("description").unwrap_or(""));
            result.insert("type".to_string(), Value::String("exit".to_string()));
            if let Some(direction) = &exit.direction {
                result.insert("direction".to_string(), Value::String(direction.clone()));
            }
            if let Some(destination) = exit_destination(world, exit) {
                result.insert(
                    "destination".to_string(),
                    Value::String(destination.to_string()),
                );
            }
            Some(&exit.properties)
        }
    };

    if opts.include_llm_context {
        if let Some(llm_context) = properties.and_then(|p| p.get_map("llm_context")) {
            add_llm_context(&mut result, llm_context, opts, rng);
        }
    }

    if let Some(player) = opts.player_context.as_ref().filter(|p| p.posture.is_some()) {
        if let Some(relation) = spatial_relation(world, id, kind, player) {
            result.insert("spatial_relation".to_string(), Value::String(relation));
        }
    }

    Some(Value::Object(result))
}

fn insert_core(result: &mut Map<String, Value>, id: &str, name: &str, description: &str) {
    result.insert("id".to_string(), Value::String(id.to_string()));
    if !name.is_empty() {
        result.insert("name".to_string(), Value::String(name.to_string()));
    }
    if !description.is_empty() {
        result.insert(
            "description".to_string(),
            Value::String(description.to_string()),
        );
    }
}

/// Destination of an exit: the owning location of its first connection.
pub fn exit_destination(world: &World, exit: &Exit) -> Option<EntityId> {
    world
        .exit_connections(exit.id.as_str())
        .first()
        .and_then(|target| world.exit(target.as_str()))
        .map(|target| target.location.clone())
}

/// Copy the llm_context, shuffle its traits, apply the trait cap, and pick
/// a perspective note. `perspective_variants` never reaches the output so
/// the narrator only sees the selected note.
fn add_llm_context(
    result: &mut Map<String, Value>,
    llm_context: &Map<String, Value>,
    opts: &SerializeOpts,
    rng: &mut dyn RngCore,
) {
    let mut context = llm_context.clone();

    if let Some(Value::Array(traits)) = context.get("traits") {
        let mut shuffled = traits.clone();
        shuffled.shuffle(rng);
        if let Some(max) = opts.max_traits {
            shuffled.truncate(max);
        }
        context.insert("traits".to_string(), Value::Array(shuffled));
    }

    if let Some(note) = select_perspective_variant(&context, opts.player_context.as_ref()) {
        result.insert("perspective_note".to_string(), Value::String(note));
    }
    context.remove("perspective_variants");

    result.insert("llm_context".to_string(), Value::Object(context));
}

/// Pick the best perspective variant: exact `"<posture>:<focused_on>"`,
/// then `"<posture>"`, then `"default"`.
fn select_perspective_variant(
    llm_context: &Map<String, Value>,
    player: Option<&PlayerContext>,
) -> Option<String> {
    let variants = llm_context.get("perspective_variants")?.as_object()?;

    if let Some(player) = player {
        if let (Some(posture), Some(focused_on)) = (&player.posture, &player.focused_on) {
            let exact = format!("{posture}:{focused_on}");
            if let Some(note) = variants.get(&exact).and_then(Value::as_str) {
                return Some(note.to_string());
            }
        }
        if let Some(posture) = &player.posture {
            if let Some(note) = variants.get(posture).and_then(Value::as_str) {
                return Some(note.to_string());
            }
        }
    }

    variants
        .get("default")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Relation between an entity and a positioned player: `within_reach` for
/// the focus target and anything on it, `below` for floor-level entities
/// seen from an elevated posture, `nearby` otherwise.
fn spatial_relation(
    world: &World,
    id: &str,
    kind: EntityKind,
    player: &PlayerContext,
) -> Option<String> {
    player.posture.as_ref()?;

    if let Some(focused_on) = &player.focused_on {
        if focused_on == id {
            return Some("within_reach".to_string());
        }
        let entity_location = match kind {
            EntityKind::Item => world.item(id).map(|i| i.location.clone()),
            EntityKind::Actor => world.actor(id).map(|a| a.location.clone()),
            _ => None,
        };
        if entity_location.as_ref() == Some(focused_on) {
            return Some("within_reach".to_string());
        }
    }

    if matches!(player.posture.as_deref(), Some("on_surface") | Some("climbing")) {
        let entity_location = match kind {
            EntityKind::Item => world.item(id).map(|i| i.location.clone()),
            EntityKind::Actor => world.actor(id).map(|a| a.location.clone()),
            _ => None,
        };
        if let Some(loc) = entity_location {
            if world.entity_kind(loc.as_str()) == Some(EntityKind::Location) {
                return Some("below".to_string());
            }
        }
    }

    Some("nearby".to_string())
}

/// The unified location payload: the location itself, visible items (with
/// container context), doors, exits, and co-located actors.
pub fn serialize_location(acc: &dyn Accessor, loc_id: &str, actor_id: &str) -> Value {
    let world = acc.world();
    let opts = SerializeOpts::default().with_player_context(player_context(acc, actor_id));

    let mut data = Map::new();
    data.insert(
        "location".to_string(),
        entity_to_value(world, loc_id, &opts).unwrap_or(Value::Null),
    );

    // Items on the floor, then contents of accessible containers.
    let mut items: Vec<Value> = Vec::new();
    let here = world.entities_at(loc_id, Some(EntityKind::Item));
    for item_id in &here {
        let Some(item) = world.item(item_id.as_str()) else {
            continue;
        };
        if item.is_hidden() || item.is_door() {
            continue;
        }
        if let Some(value) = entity_to_value(world, item_id.as_str(), &opts) {
            items.push(value);
        }
        if item.container().is_some_and(|spec| spec.is_accessible()) {
            let is_surface = item.container().is_some_and(|spec| spec.is_surface);
            for inner_id in world.entities_at(item_id.as_str(), Some(EntityKind::Item)) {
                let Some(inner) = world.item(inner_id.as_str()) else {
                    continue;
                };
                if inner.is_hidden() {
                    continue;
                }
                if let Some(Value::Object(mut value)) =
                    entity_to_value(world, inner_id.as_str(), &opts)
                {
                    let key = if is_surface { "on_surface" } else { "in_container" };
                    value.insert(key.to_string(), Value::String(item.name.clone()));
                    items.push(Value::Object(value));
                }
            }
        }
    }
    data.insert("items".to_string(), Value::Array(items));

    // Doors guarding this location's exits, annotated with direction.
    let mut doors: Vec<Value> = Vec::new();
    let mut seen_doors: Vec<EntityId> = Vec::new();
    let mut push_door = |door_id: &EntityId, direction: Option<&str>, doors: &mut Vec<Value>| {
        if seen_doors.contains(door_id) {
            return;
        }
        if let Some(Value::Object(mut value)) = entity_to_value(world, door_id.as_str(), &opts) {
            if let Some(direction) = direction {
                value.insert(
                    "direction".to_string(),
                    Value::String(direction.to_string()),
                );
            }
            doors.push(Value::Object(value));
            seen_doors.push(door_id.clone());
        }
    };
    if let Some(loc) = world.location(loc_id) {
        for (direction, desc) in &loc.exits {
            if let Some(door_id) = &desc.door_id {
                push_door(door_id, Some(direction), &mut doors);
            }
        }
    }
    for exit_id in world.exits_from_location(loc_id) {
        if let Some(exit) = world.exit(exit_id.as_str()) {
            if let Some(door_id) = &exit.door_id {
                push_door(door_id, exit.direction.as_deref(), &mut doors);
            }
        }
    }
    for item in world.items.values() {
        if let Some(slot) = item.location.exit_slot() {
            if item.is_door() && slot.location == loc_id {
                push_door(&item.id, Some(slot.direction.as_str()), &mut doors);
            }
        }
    }
    data.insert("doors".to_string(), Value::Array(doors));

    // Exits: first-class entities plus legacy table entries.
    let mut exits: Vec<Value> = Vec::new();
    for exit_id in world.exits_from_location(loc_id) {
        let hidden = world
            .exit(exit_id.as_str())
            .is_some_and(|exit| exit.is_hidden());
        if hidden {
            continue;
        }
        if let Some(value) = entity_to_value(world, exit_id.as_str(), &opts) {
            exits.push(value);
        }
    }
    if let Some(loc) = world.location(loc_id) {
        for (direction, desc) in &loc.exits {
            if desc.is_hidden() {
                continue;
            }
            let mut value = Map::new();
            value.insert(
                "direction".to_string(),
                Value::String(direction.clone()),
            );
            if let Some(to) = &desc.to {
                value.insert("destination".to_string(), Value::String(to.to_string()));
            }
            if let Some(door_id) = &desc.door_id {
                value.insert("door_id".to_string(), Value::String(door_id.to_string()));
            }
            exits.push(Value::Object(value));
        }
    }
    data.insert("exits".to_string(), Value::Array(exits));

    // Other actors present.
    let mut actors: Vec<Value> = Vec::new();
    for other_id in world.entities_at(loc_id, Some(EntityKind::Actor)) {
        if other_id.as_str() == actor_id {
            continue;
        }
        let hidden = world
            .actor(other_id.as_str())
            .is_some_and(|actor| actor.is_hidden());
        if hidden {
            continue;
        }
        if let Some(value) = entity_to_value(world, other_id.as_str(), &opts) {
            actors.push(value);
        }
    }
    data.insert("actors".to_string(), Value::Array(actors));

    Value::Object(data)
}
