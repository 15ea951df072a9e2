//! The logical Message/Block schema and the `cpe_*` extra-field keys that
//! carry identity across the save/read boundary.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Extra-field key: the persisted id of an already-saved message, or the
/// id assigned to a newly-saved one.
pub const FIELD_MESSAGE_ID: &str = "cpe_message_id";
/// Extra-field key: the persisted id of the message's parent (omitted for
/// roots).
pub const FIELD_MESSAGE_PARENT_ID: &str = "cpe_message_parent_id";
/// Extra-field key: copied into the `title` column on first save.
pub const FIELD_MESSAGE_TITLE: &str = "cpe_message_title";
/// Extra-field key: the message's `created_at` timestamp, attached on read.
pub const FIELD_MESSAGE_CREATED_AT: &str = "cpe_message_created_at";

/// The three roles a message may carry. Stored and read as the lowercase
/// wire strings below; any other string is corrupt data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    ToolResult,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::ToolResult => "tool_result",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "tool_result" => Ok(Role::ToolResult),
            other => Err(other.to_string()),
        }
    }
}

/// A single content block within a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub id: Option<String>,
    pub block_type: String,
    pub modality: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    pub content: String,
    #[serde(default)]
    pub extra_fields: Option<Value>,
}

/// A node in the branching conversation graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub tool_result_error: bool,
    #[serde(default)]
    pub blocks: Vec<Block>,
    /// Message-level extra fields. Recognized `cpe_*` keys drive
    /// identity/title; anything else is accepted on input but never
    /// persisted, and populated with the recognized keys on read.
    #[serde(default)]
    pub extra_fields: HashMap<String, Value>,
}

impl Message {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            tool_result_error: false,
            blocks: Vec::new(),
            extra_fields: HashMap::new(),
        }
    }

    pub fn with_blocks(mut self, blocks: Vec<Block>) -> Self {
        self.blocks = blocks;
        self
    }

    pub fn persisted_id(&self) -> Option<&str> {
        self.extra_fields.get(FIELD_MESSAGE_ID).and_then(Value::as_str)
    }

    pub fn persisted_parent_id(&self) -> Option<&str> {
        self.extra_fields
            .get(FIELD_MESSAGE_PARENT_ID)
            .and_then(Value::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.extra_fields.get(FIELD_MESSAGE_TITLE).and_then(Value::as_str)
    }
}
