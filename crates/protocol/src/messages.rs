//! JSON protocol messages between the narrator and the engine.
//!
//! Inbound messages are dispatched by `type` (`command` or `query`);
//! outbound replies are `result`, `query_response`, or `error`. Shapes are
//! stable wire contracts: field names here are field names on the wire.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::word::{ObjectRef, WordEntry};

/// The action payload of a command message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Verb to dispatch. Required on the wire; optional here so the handler
    /// can answer its absence with a protocol error instead of a parse
    /// failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<ObjectRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjective: Option<String>,
    /// Multi-adjective form; either field may be supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjectives: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indirect_object: Option<ObjectRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indirect_adjective: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preposition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
    /// Raw text after the preposition, for dialog-topic style verbs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_after_preposition: Option<String>,
    /// Raw command line, used by meta verbs for filename fallback parsing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_input: Option<String>,
}

impl Action {
    pub fn verb(verb: impl Into<String>) -> Self {
        Self {
            verb: Some(verb.into()),
            ..Self::default()
        }
    }

    pub fn with_object(mut self, word: impl Into<String>) -> Self {
        self.object = Some(ObjectRef::Bare(word.into()));
        self
    }

    pub fn with_adjective(mut self, adjective: impl Into<String>) -> Self {
        self.adjective = Some(adjective.into());
        self
    }

    pub fn with_indirect_object(mut self, word: impl Into<String>) -> Self {
        self.indirect_object = Some(ObjectRef::Bare(word.into()));
        self
    }

    pub fn with_preposition(mut self, preposition: impl Into<String>) -> Self {
        self.preposition = Some(preposition.into());
        self
    }

    /// Promote bare-string objects to word records and fill in the default
    /// actor. Handlers can then rely on word records being present.
    pub fn normalized(mut self, default_actor: &str) -> Self {
        self.object = self.object.map(|o| ObjectRef::Word(o.into_word()));
        self.indirect_object = self.indirect_object.map(|o| ObjectRef::Word(o.into_word()));
        if self.actor_id.is_none() {
            self.actor_id = Some(default_actor.to_string());
        }
        self
    }

    pub fn object_word(&self) -> Option<WordEntry> {
        self.object.clone().map(ObjectRef::into_word)
    }

    pub fn indirect_object_word(&self) -> Option<WordEntry> {
        self.indirect_object.clone().map(ObjectRef::into_word)
    }

    pub fn actor(&self) -> &str {
        self.actor_id.as_deref().unwrap_or("player")
    }

    /// All supplied adjectives, lower-cased. Accepts the single-string form
    /// (whitespace-split) and the list form.
    pub fn adjective_list(&self) -> Vec<String> {
        if let Some(list) = &self.adjectives {
            return list
                .iter()
                .filter(|a| !a.is_empty())
                .map(|a| a.to_lowercase())
                .collect();
        }
        self.adjective
            .as_deref()
            .map(|adj| {
                adj.to_lowercase()
                    .split_whitespace()
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Inbound protocol message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    Command {
        #[serde(default)]
        action: Action,
    },
    Query {
        query_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        entity_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        entity_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        actor_id: Option<String>,
        /// Sections to include in a location query; empty means all.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        include: Vec<String>,
    },
}

/// Error payload of a failed result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyError {
    pub message: String,
    /// Set when the failure latched the corruption flag or the latch was
    /// already set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fatal: Option<bool>,
}

/// Outbound protocol message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    Result {
        success: bool,
        action: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        turn_phase_messages: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<ReplyError>,
    },
    QueryResponse {
        query_type: String,
        data: Value,
    },
    Error {
        message: String,
    },
}

impl Reply {
    pub fn ok(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Result {
            success: true,
            action: action.into(),
            message: Some(message.into()),
            data: None,
            turn_phase_messages: Vec::new(),
            error: None,
        }
    }

    pub fn fail(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Result {
            success: false,
            action: action.into(),
            message: None,
            data: None,
            turn_phase_messages: Vec::new(),
            error: Some(ReplyError {
                message: message.into(),
                fatal: None,
            }),
        }
    }

    pub fn fatal(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Result {
            success: false,
            action: action.into(),
            message: None,
            data: None,
            turn_phase_messages: Vec::new(),
            error: Some(ReplyError {
                message: message.into(),
                fatal: Some(true),
            }),
        }
    }

    pub fn query_response(query_type: impl Into<String>, data: Value) -> Self {
        Self::QueryResponse {
            query_type: query_type.into(),
            data,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn with_data(self, value: Value) -> Self {
        match self {
            Self::Result {
                success,
                action,
                message,
                turn_phase_messages,
                error,
                ..
            } => Self::Result {
                success,
                action,
                message,
                data: Some(value),
                turn_phase_messages,
                error,
            },
            other => other,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Result { success: true, .. })
    }
}

/// Session signals carried in `data.signal`. The engine reports them; the
/// host performs the corresponding I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Quit,
    Save,
    Load,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quit => "quit",
            Self::Save => "save",
            Self::Load => "load",
        }
    }

    /// Build the `data` payload carrying this signal.
    pub fn payload(&self, filename: Option<&str>, raw_input: Option<&str>) -> Value {
        let mut data = Map::new();
        data.insert("signal".to_string(), Value::String(self.as_str().into()));
        data.insert(
            "filename".to_string(),
            filename.map(|f| Value::String(f.to_string())).unwrap_or(Value::Null),
        );
        if let Some(raw) = raw_input {
            data.insert("raw_input".to_string(), Value::String(raw.to_string()));
        }
        Value::Object(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn command_message_parses_with_bare_object() {
        let msg: Message = serde_json::from_value(json!({
            "type": "command",
            "action": {"verb": "take", "object": "sword"}
        }))
        .expect("parses");

        let Message::Command { action } = msg else {
            panic!("expected command");
        };
        assert_eq!(action.verb.as_deref(), Some("take"));
        let normalized = action.normalized("player");
        assert_eq!(normalized.object_word().map(|w| w.word), Some("sword".into()));
        assert_eq!(normalized.actor(), "player");
    }

    #[test]
    fn adjective_list_handles_both_forms() {
        let single = Action::verb("open").with_adjective("Rusty Iron");
        assert_eq!(single.adjective_list(), vec!["rusty", "iron"]);

        let mut multi = Action::verb("open");
        multi.adjectives = Some(vec!["Iron".to_string(), "heavy".to_string()]);
        assert_eq!(multi.adjective_list(), vec!["iron", "heavy"]);

        assert!(Action::verb("open").adjective_list().is_empty());
    }

    #[test]
    fn success_reply_serializes_to_wire_shape() {
        let reply = Reply::ok("take", "You take the sword.");
        let value = serde_json::to_value(&reply).expect("serializes");
        assert_eq!(
            value,
            json!({
                "type": "result",
                "success": true,
                "action": "take",
                "message": "You take the sword."
            })
        );
    }

    #[test]
    fn fatal_reply_carries_error_payload() {
        let reply = Reply::fatal("test", "INCONSISTENT STATE: test");
        let value = serde_json::to_value(&reply).expect("serializes");
        assert_eq!(value["error"]["fatal"], json!(true));
        assert_eq!(value["success"], json!(false));
        assert!(value.get("message").is_none());
    }

    #[test]
    fn query_message_parses_with_filters() {
        let msg: Message = serde_json::from_value(json!({
            "type": "query",
            "query_type": "location",
            "include": ["items", "doors"]
        }))
        .expect("parses");

        let Message::Query {
            query_type,
            include,
            ..
        } = msg
        else {
            panic!("expected query");
        };
        assert_eq!(query_type, "location");
        assert_eq!(include, vec!["items", "doors"]);
    }

    #[test]
    fn signal_payload_includes_filename_and_raw_input() {
        let payload = Signal::Save.payload(Some("savegame.json"), Some("save savegame.json"));
        assert_eq!(payload["signal"], json!("save"));
        assert_eq!(payload["filename"], json!("savegame.json"));
        assert_eq!(payload["raw_input"], json!("save savegame.json"));

        let bare = Signal::Quit.payload(None, None);
        assert_eq!(bare["filename"], json!(null));
    }
}
