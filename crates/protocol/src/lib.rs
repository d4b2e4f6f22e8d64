//! Fabula protocol: the JSON message types exchanged with an external
//! narrator. The engine consumes [`Message`] and produces [`Reply`]; the
//! narrator-side parser produces [`WordEntry`] records for nouns.

pub mod messages;
pub mod word;

pub use messages::{Action, Message, Reply, ReplyError, Signal};
pub use word::{ObjectRef, WordEntry, WordType};
