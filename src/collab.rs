//! Seams to the collaborators the dispatcher drives but does not own.

use std::time::Duration;

use crate::error::{CommandError, TranscriptError};
use crate::message::Message;

/// The session's append-only message log.
///
/// Implementations are the single writer; the dispatcher holds a mutable
/// reference, so every mutation is visible to the caller immediately.
pub trait Transcript {
    fn messages(&self) -> &[Message];

    fn append(&mut self, message: Message) -> Result<(), TranscriptError>;

    /// Removes up to `n` messages from the tail and returns them, newest
    /// first. Removing from an empty log is not an error.
    fn undo(&mut self, n: usize) -> Result<Vec<Message>, TranscriptError>;

    /// Replaces the whole log in one step.
    fn replace(&mut self, messages: Vec<Message>) -> Result<(), TranscriptError>;

    fn persist(&mut self) -> Result<(), TranscriptError>;

    fn name(&self) -> &str;

    fn rename(&mut self, name: &str) -> Result<(), TranscriptError>;

    /// Copies the session under `name` and continues writing to the copy.
    fn fork(&mut self, name: &str) -> Result<(), TranscriptError>;
}

/// Receives messages one at a time as an executor produces them.
pub type Emit<'a> = dyn FnMut(Message) -> Result<(), CommandError> + 'a;

/// Receives messages a command produces, together with the transcript they
/// belong to. The default sink appends.
pub type MessageSink<'a> =
    dyn FnMut(&mut dyn Transcript, Message) -> Result<(), CommandError> + 'a;

/// Runs one kind of executable snippet (shell, code).
pub trait Executor {
    fn run(
        &mut self,
        code: &str,
        require_confirmation: bool,
        emit: &mut Emit<'_>,
    ) -> Result<(), CommandError>;
}

pub trait Prompter {
    /// Reads one line. `None` means the input stream is closed.
    fn prompt_line(&mut self, label: &str) -> Result<Option<String>, CommandError>;
}

pub trait TextEditor {
    /// Hands `text` to the user for editing and returns the result.
    /// `extension` hints at the document format (e.g. `"toml"`).
    fn edit(&mut self, text: &str, extension: &str) -> Result<String, CommandError>;
}

pub trait Summarizer {
    fn summarize(&mut self, messages: &[Message]) -> Result<String, CommandError>;
}

pub trait ContextSource {
    fn context_message(&mut self) -> Result<Message, CommandError>;
}

/// User-facing output.
pub trait Console {
    fn line(&mut self, text: &str);

    fn message(&mut self, message: &Message);
}

/// Waits between failed edit attempts.
pub trait RetryPause {
    /// Returns `true` when the user interrupted the pause.
    fn pause(&mut self, duration: Duration) -> bool;
}

/// Everything the dispatcher needs besides the transcript.
pub struct Toolbox {
    pub shell: Box<dyn Executor>,
    pub python: Box<dyn Executor>,
    pub prompter: Box<dyn Prompter>,
    pub editor: Box<dyn TextEditor>,
    pub summarizer: Box<dyn Summarizer>,
    pub context: Box<dyn ContextSource>,
    pub console: Box<dyn Console>,
    pub pause: Box<dyn RetryPause>,
}

impl Toolbox {
    /// Prompts for a value, treating a closed input stream as an error.
    pub fn require_line(&mut self, label: &str) -> Result<String, CommandError> {
        self.prompter
            .prompt_line(label)?
            .ok_or_else(|| CommandError::InputClosed {
                label: label.to_string(),
            })
    }
}
