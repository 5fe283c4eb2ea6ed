//! Role-tagged transcript messages and fenced code block scanning.

use std::fmt;

use markdown::{mdast, to_mdast, ParseOptions};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single transcript entry. Identity is positional; messages are never
/// mutated after they are appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub hidden: bool,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            hidden: false,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Fenced code blocks in document order.
    #[must_use]
    pub fn code_blocks(&self) -> Vec<CodeBlock> {
        code_blocks(&self.content)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// First word of the fence info string; empty when the fence has none.
    pub lang: String,
    pub code: String,
}

#[must_use]
pub fn code_blocks(text: &str) -> Vec<CodeBlock> {
    let Ok(root) = to_mdast(text, &ParseOptions::gfm()) else {
        return Vec::new();
    };

    let mut blocks = Vec::new();
    collect_code_blocks(&root, &mut blocks);
    blocks
}

fn collect_code_blocks(node: &mdast::Node, blocks: &mut Vec<CodeBlock>) {
    if let mdast::Node::Code(code) = node {
        blocks.push(CodeBlock {
            lang: code.lang.clone().unwrap_or_default(),
            code: code.value.clone(),
        });
        return;
    }

    if let Some(children) = node.children() {
        for child in children {
            collect_code_blocks(child, blocks);
        }
    }
}

/// Contents of the most recent fenced code block, scanning newest message
/// first and taking the last block within that message.
#[must_use]
pub fn last_code_block(messages: &[Message]) -> Option<String> {
    messages
        .iter()
        .rev()
        .find_map(|message| message.code_blocks().pop())
        .map(|block| block.code)
}
