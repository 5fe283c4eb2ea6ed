use chat_directives::{Message, Role};
use serde::{Deserialize, Serialize};

pub const SESSION_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionHeader {
    pub version: u32,
    pub session_id: String,
    pub name: String,
    pub created_at: String,
}

impl SessionHeader {
    #[must_use]
    pub fn v1(
        session_id: impl Into<String>,
        name: impl Into<String>,
        created_at: impl Into<String>,
    ) -> Self {
        Self {
            version: SESSION_VERSION,
            session_id: session_id.into(),
            name: name.into(),
            created_at: created_at.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionEntry {
    pub ts: String,
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub hidden: bool,
}

impl SessionEntry {
    #[must_use]
    pub fn new(ts: impl Into<String>, message: Message) -> Self {
        Self {
            ts: ts.into(),
            role: message.role,
            content: message.content,
            hidden: message.hidden,
        }
    }

    #[must_use]
    pub fn to_message(&self) -> Message {
        Message {
            role: self.role,
            content: self.content.clone(),
            hidden: self.hidden,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum JsonLine {
    Session(SessionHeader),
    Entry(SessionEntry),
}
