//! Directive interpreter for transcript-style chat sessions.
//!
//! Invariant: a handled directive's own message is retracted from the
//! transcript exactly once, unless its registry entry says otherwise.
//!
//! # Public API Overview
//! - Recognize directives with [`parse_directive`] and resolve them through the
//!   static [`COMMANDS`] table.
//! - Run them with a [`Dispatcher`] over any [`Transcript`] implementation.
//! - Collaborators (executors, prompts, editor, console) plug in through the
//!   traits in [`collab`], bundled as a [`Toolbox`].

pub mod collab;
pub mod config;
pub mod directive;
pub mod dispatch;
pub mod edit;
pub mod error;
pub mod exec;
pub mod logging;
pub mod message;
pub mod registry;
pub mod replay;

pub use crate::collab::{
    Console, ContextSource, Emit, Executor, MessageSink, Prompter, RetryPause, Summarizer,
    TextEditor, Toolbox, Transcript,
};
pub use crate::config::DirectiveConfig;
pub use crate::directive::{is_directive, parse_directive, Directive};
pub use crate::dispatch::{undo_count, Dispatcher, Flow};
pub use crate::edit::{messages_to_toml, toml_to_messages, EditOutcome, EditParseError};
pub use crate::error::{CommandError, TranscriptError};
pub use crate::exec::{execute_message, ExecKind};
pub use crate::message::{code_blocks, last_code_block, CodeBlock, Message, Role};
pub use crate::registry::{lookup, resolve, Command, CommandDescriptor, COMMANDS};
pub use crate::replay::replay;
