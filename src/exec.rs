//! Routing of an assistant message's code blocks to executors.

use tracing::debug;

use crate::collab::{Emit, Executor};
use crate::error::CommandError;
use crate::message::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecKind {
    Shell,
    Python,
}

impl ExecKind {
    /// Maps a fence language to an executor; `None` for non-executable blocks.
    #[must_use]
    pub fn from_lang(lang: &str) -> Option<Self> {
        match lang {
            "bash" | "sh" | "shell" => Some(Self::Shell),
            "python" | "py" | "ipython" => Some(Self::Python),
            _ => None,
        }
    }
}

/// Runs every executable block of `message` in document order.
pub fn execute_message(
    message: &Message,
    require_confirmation: bool,
    shell: &mut dyn Executor,
    python: &mut dyn Executor,
    emit: &mut Emit<'_>,
) -> Result<(), CommandError> {
    for block in message.code_blocks() {
        let Some(kind) = ExecKind::from_lang(&block.lang) else {
            continue;
        };

        debug!(?kind, bytes = block.code.len(), "executing code block");
        match kind {
            ExecKind::Shell => shell.run(&block.code, require_confirmation, emit)?,
            ExecKind::Python => python.run(&block.code, require_confirmation, emit)?,
        }
    }

    Ok(())
}
