//! Vocabulary declarations and merging.
//!
//! Each behavior module contributes verbs, nouns, adjectives, prepositions,
//! and directions. The registry merges module vocabularies over the engine
//! base vocabulary; the merged view is what the external parser consumes
//! (exposed through the `vocabulary` query).

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use fabula_domain::World;

/// One verb with its synonyms and argument requirements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerbEntry {
    pub word: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub object_required: bool,
    /// Preposition this verb expects between object and indirect object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preposition: Option<String>,
}

impl VerbEntry {
    pub fn new(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            ..Self::default()
        }
    }

    pub fn with_synonyms(mut self, synonyms: &[&str]) -> Self {
        self.synonyms = synonyms.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn object_required(mut self) -> Self {
        self.object_required = true;
        self
    }

    pub fn with_preposition(mut self, preposition: impl Into<String>) -> Self {
        self.preposition = Some(preposition.into());
        self
    }
}

/// A vocabulary contribution or merged view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verbs: Vec<VerbEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nouns: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub adjectives: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prepositions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub directions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub articles: Vec<String>,
}

impl Vocabulary {
    /// Merge `other` into this vocabulary. Verb entries from `other` win on
    /// word collision (synonyms and `object_required` replaced); noun,
    /// adjective, preposition, direction, and article lists deduplicate
    /// preserving first-seen order.
    pub fn merge(&mut self, other: &Vocabulary) {
        for verb in &other.verbs {
            match self.verbs.iter_mut().find(|v| v.word == verb.word) {
                Some(existing) => *existing = verb.clone(),
                None => self.verbs.push(verb.clone()),
            }
        }
        merge_words(&mut self.nouns, &other.nouns);
        merge_words(&mut self.adjectives, &other.adjectives);
        merge_words(&mut self.prepositions, &other.prepositions);
        merge_words(&mut self.directions, &other.directions);
        merge_words(&mut self.articles, &other.articles);
    }

    pub fn verb(&self, word: &str) -> Option<&VerbEntry> {
        self.verbs.iter().find(|v| v.word == word)
    }
}

fn merge_words(target: &mut Vec<String>, source: &[String]) {
    for word in source {
        if !target.iter().any(|w| w == word) {
            target.push(word.clone());
        }
    }
}

/// Engine-default vocabulary: articles and prepositions every game shares,
/// and the compass directions. Verbs come from behavior modules.
pub fn base_vocabulary() -> &'static Vocabulary {
    static BASE: Lazy<Vocabulary> = Lazy::new(|| Vocabulary {
        verbs: Vec::new(),
        nouns: Vec::new(),
        adjectives: Vec::new(),
        prepositions: ["in", "on", "with", "to", "at", "from", "into", "behind", "under"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        directions: ["north", "south", "east", "west", "up", "down"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        articles: ["a", "an", "the"].iter().map(|s| s.to_string()).collect(),
    });
    &BASE
}

/// Harvest entity names and declared synonyms from a world into a noun
/// list for the external parser.
pub fn extract_nouns(world: &World) -> Vec<String> {
    let mut nouns: Vec<String> = Vec::new();
    let mut push = |word: &str| {
        let lower = word.to_lowercase();
        if !lower.is_empty() && !nouns.iter().any(|n| n == &lower) {
            nouns.push(lower);
        }
    };

    for item in world.items.values() {
        push(&item.name);
        for syn in item.synonyms() {
            push(&syn);
        }
    }
    for actor in world.actors.values() {
        if !actor.id.is_player() {
            push(&actor.name);
            for syn in actor.synonyms() {
                push(&syn);
            }
        }
    }
    for part in world.parts.values() {
        push(&part.name);
        for syn in part.synonyms() {
            push(&syn);
        }
    }
    for exit in world.exits.values() {
        push(&exit.name);
        for syn in exit.synonyms() {
            push(&syn);
        }
    }
    nouns
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabula_domain::{Actor, Item, Metadata, Properties, World};
    use serde_json::json;

    #[test]
    fn later_verbs_win_on_collision() {
        let mut base = Vocabulary {
            verbs: vec![VerbEntry::new("take").with_synonyms(&["get"])],
            ..Vocabulary::default()
        };
        let override_vocab = Vocabulary {
            verbs: vec![VerbEntry::new("take")
                .with_synonyms(&["get", "grab", "snatch"])
                .object_required()],
            ..Vocabulary::default()
        };

        base.merge(&override_vocab);

        let take = base.verb("take").expect("take exists");
        assert_eq!(take.synonyms, vec!["get", "grab", "snatch"]);
        assert!(take.object_required);
        assert_eq!(base.verbs.len(), 1);
    }

    #[test]
    fn word_lists_deduplicate_preserving_order() {
        let mut vocab = Vocabulary {
            nouns: vec!["sword".to_string(), "shield".to_string()],
            ..Vocabulary::default()
        };
        vocab.merge(&Vocabulary {
            nouns: vec!["shield".to_string(), "lantern".to_string()],
            ..Vocabulary::default()
        });

        assert_eq!(vocab.nouns, vec!["sword", "shield", "lantern"]);
    }

    #[test]
    fn extract_nouns_includes_synonyms_and_skips_player() {
        let mut world = World::new(Metadata::titled("Test"));
        world.add_location(fabula_domain::Location::new("loc_1", "Room", ""));
        world.add_actor(Actor::new("player", "Adventurer", "", "loc_1"));
        world.add_actor(Actor::new("npc_guard", "Guard", "", "loc_1"));
        let item = Item::new("item_1", "Lantern", "", "loc_1").with_properties(
            match json!({"synonyms": ["lamp"]}) {
                serde_json::Value::Object(map) => Properties::from_map(map),
                _ => unreachable!(),
            },
        );
        world.add_item(item);

        let nouns = extract_nouns(&world);
        assert!(nouns.contains(&"lantern".to_string()));
        assert!(nouns.contains(&"lamp".to_string()));
        assert!(nouns.contains(&"guard".to_string()));
        assert!(!nouns.contains(&"adventurer".to_string()));
    }
}
