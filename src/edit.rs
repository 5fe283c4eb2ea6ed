//! Editor round-trip of the transcript.
//!
//! The transcript is written newest-first as a TOML document, handed to the
//! user's editor, and parsed back. The transcript is only replaced once a
//! returned document parses; failed attempts never touch it.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::collab::{MessageSink, Toolbox, Transcript};
use crate::error::CommandError;
use crate::message::Message;

pub const EDIT_EXTENSION: &str = "toml";

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct EditDocument {
    #[serde(default)]
    messages: Vec<Message>,
}

#[derive(Debug, Error)]
pub enum EditParseError {
    #[error("{0}")]
    Toml(#[from] toml::de::Error),
}

/// Serializes messages in the order given.
pub fn messages_to_toml<'a>(
    messages: impl IntoIterator<Item = &'a Message>,
) -> Result<String, CommandError> {
    let document = EditDocument {
        messages: messages.into_iter().cloned().collect(),
    };
    toml::to_string_pretty(&document).map_err(CommandError::EditSerialize)
}

/// Parses a document produced by [`messages_to_toml`], possibly hand-edited.
/// A document without messages is an empty transcript.
pub fn toml_to_messages(text: &str) -> Result<Vec<Message>, EditParseError> {
    let document: EditDocument = toml::from_str(text)?;
    Ok(document.messages)
}

/// Result of an edit session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Applied,
    Interrupted,
}

/// Runs the edit loop against an already-retracted transcript.
pub fn edit_session(
    transcript: &mut dyn Transcript,
    tools: &mut Toolbox,
    marker: char,
    retry_pause: Duration,
    emit: &mut MessageSink<'_>,
) -> Result<EditOutcome, CommandError> {
    let mut text = messages_to_toml(transcript.messages().iter().rev())?;

    let parsed = loop {
        text = tools.editor.edit(&text, EDIT_EXTENSION)?;
        match toml_to_messages(&text) {
            Ok(messages) => break messages,
            Err(error) => {
                warn!(%error, "edited transcript failed to parse");
                tools.console.line(&format!("\nFailed to parse TOML: {error}"));
                if tools.pause.pause(retry_pause) {
                    emit(&mut *transcript, Message::system("Interrupted"))?;
                    return Ok(EditOutcome::Interrupted);
                }
            }
        }
    };

    let chronological = parsed.into_iter().rev().collect();
    transcript.replace(chronological)?;
    transcript.persist()?;
    tools.console.line(&format!(
        "Applied edited messages, write {marker}log to see the result"
    ));

    Ok(EditOutcome::Applied)
}
