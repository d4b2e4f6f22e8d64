//! Word records produced by the external parser.

use serde::{Deserialize, Serialize};

/// Lexical category of a parsed word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WordType {
    #[default]
    Noun,
    Adjective,
    Verb,
    Preposition,
    Direction,
}

/// A parsed surface word with the synonyms the parser's vocabulary attached
/// to it. Synonyms let the resolver match an entity even when the player
/// typed an alternate name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordEntry {
    pub word: String,
    #[serde(default)]
    pub word_type: WordType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synonyms: Vec<String>,
}

impl WordEntry {
    pub fn noun(word: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            word_type: WordType::Noun,
            synonyms: Vec::new(),
        }
    }

    pub fn with_synonyms(mut self, synonyms: Vec<String>) -> Self {
        self.synonyms = synonyms;
        self
    }

    /// The word plus its synonyms, lower-cased, for matching.
    pub fn candidates(&self) -> Vec<String> {
        let mut out = vec![self.word.to_lowercase()];
        for syn in &self.synonyms {
            let lower = syn.to_lowercase();
            if !out.contains(&lower) {
                out.push(lower);
            }
        }
        out
    }
}

/// An object reference as it arrives on the wire: either a full word record
/// or a bare string awaiting promotion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjectRef {
    Word(WordEntry),
    Bare(String),
}

impl ObjectRef {
    /// Promote a bare string into a noun word record; word records pass
    /// through unchanged.
    pub fn into_word(self) -> WordEntry {
        match self {
            Self::Word(entry) => entry,
            Self::Bare(word) => WordEntry::noun(word),
        }
    }

    pub fn as_word(&self) -> Option<&WordEntry> {
        match self {
            Self::Word(entry) => Some(entry),
            Self::Bare(_) => None,
        }
    }
}
