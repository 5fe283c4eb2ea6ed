//! Directive dispatch.
//!
//! Every handler either retracts its own directive message before doing
//! anything else or leaves it in place, as declared by its registry entry.
//! Produced messages are handed to the caller's sink one at a time, so side
//! effects stay interleaved with production.

use std::fs;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, trace};

use crate::collab::{MessageSink, Toolbox, Transcript};
use crate::config::DirectiveConfig;
use crate::directive::{is_directive, split_directive, Directive};
use crate::edit::edit_session;
use crate::error::CommandError;
use crate::exec::execute_message;
use crate::message::{last_code_block, Message, Role};
use crate::registry::{resolve, Command, COMMANDS};
use crate::replay::replay;

/// What the caller should do after a directive has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Terminate the process with a success status.
    Exit,
}

pub struct Dispatcher {
    tools: Toolbox,
    marker: char,
    edit_retry_pause: Duration,
}

impl Dispatcher {
    pub fn new(tools: Toolbox, config: &DirectiveConfig) -> Self {
        Self {
            tools,
            marker: config.marker,
            edit_retry_pause: config.edit_retry_pause,
        }
    }

    /// Handles `message` if it is a user directive, appending whatever the
    /// command produces. Returns `None` for ordinary content.
    ///
    /// The directive message is expected to be the transcript's last entry.
    pub fn execute_directive(
        &mut self,
        message: &Message,
        transcript: &mut dyn Transcript,
        auto_confirm: bool,
    ) -> Result<Option<Flow>, CommandError> {
        if message.role != Role::User || !is_directive(&message.content, self.marker) {
            return Ok(None);
        }

        let flow = self.dispatch(
            &message.content,
            transcript,
            auto_confirm,
            &mut |transcript, produced| transcript.append(produced).map_err(Into::into),
        )?;
        Ok(Some(flow))
    }

    /// Runs one directive. `raw` may carry the marker or not.
    pub fn dispatch(
        &mut self,
        raw: &str,
        transcript: &mut dyn Transcript,
        auto_confirm: bool,
        emit: &mut MessageSink<'_>,
    ) -> Result<Flow, CommandError> {
        let body = raw.strip_prefix(self.marker).unwrap_or(raw);
        let directive = split_directive(body);
        let descriptor = resolve(&directive.name);
        debug!(
            command = descriptor.name,
            invoked_as = %directive.name,
            args = directive.args.len(),
            "dispatching directive"
        );

        let help_invocation = format!("{}help", self.marker);
        let asked_for_help = transcript
            .messages()
            .last()
            .is_some_and(|last| last.content == help_invocation);

        if descriptor.retracts {
            self.undo(transcript, 1, true)?;
        }

        match descriptor.command {
            Command::Shell => {
                self.tools
                    .shell
                    .run(directive.arg_text(), !auto_confirm, &mut |produced| {
                        emit(&mut *transcript, produced)
                    })?;
            }
            Command::Python => {
                self.tools
                    .python
                    .run(directive.arg_text(), !auto_confirm, &mut |produced| {
                        emit(&mut *transcript, produced)
                    })?;
            }
            Command::Continue => {}
            Command::Log => {
                let show_hidden = directive.args.iter().any(|arg| arg == "--hidden");
                for message in transcript.messages() {
                    if show_hidden || !message.hidden {
                        self.tools.console.message(message);
                    }
                }
            }
            Command::Rename => {
                let name = self.arg_or_prompt(&directive, "New name: ")?;
                transcript.rename(&name)?;
                self.tools
                    .console
                    .line(&format!("Renamed conversation to {name}"));
            }
            Command::Fork => {
                let name = self.arg_or_prompt(&directive, "New name: ")?;
                transcript.fork(&name)?;
                self.tools
                    .console
                    .line(&format!("Forked conversation to {name}"));
            }
            Command::Summarize => {
                let visible: Vec<Message> = transcript
                    .messages()
                    .iter()
                    .filter(|message| !message.hidden)
                    .cloned()
                    .collect();
                let summary = self.tools.summarizer.summarize(&visible)?;
                self.tools.console.line(&format!("Summary: {summary}"));
            }
            Command::Edit => {
                edit_session(
                    transcript,
                    &mut self.tools,
                    self.marker,
                    self.edit_retry_pause,
                    emit,
                )?;
            }
            Command::Context => {
                let context = self.tools.context.context_message()?;
                emit(&mut *transcript, context)?;
            }
            Command::Undo => {
                let count = undo_count(directive.first_arg());
                self.undo(transcript, count, false)?;
            }
            Command::Load => {
                let filename = self.arg_or_prompt(&directive, "Filename: ")?;
                let contents = fs::read_to_string(&filename).map_err(|source| {
                    CommandError::io("reading file to load", &filename, source)
                })?;
                emit(
                    &mut *transcript,
                    Message::system(format!("# filename: {filename}\n\n{contents}")),
                )?;
            }
            Command::Save => self.save(&directive, transcript)?,
            Command::Exit => return Ok(Flow::Exit),
            Command::Replay => {
                self.tools.console.line("Replaying conversation...");
                replay(transcript, &mut self.tools)?;
            }
            Command::Impersonate => {
                let content = if directive.arg_text().is_empty() {
                    self.tools.require_line("[impersonate] Assistant: ")?
                } else {
                    directive.arg_text().to_string()
                };
                let message = Message::assistant(content);
                emit(&mut *transcript, message.clone())?;

                let Toolbox { shell, python, .. } = &mut self.tools;
                execute_message(
                    &message,
                    !auto_confirm,
                    shell.as_mut(),
                    python.as_mut(),
                    &mut |produced| emit(&mut *transcript, produced),
                )?;
            }
            Command::Help => {
                if !asked_for_help {
                    self.tools.console.line("Unknown command");
                }
                transcript.persist()?;
                self.print_help();
            }
        }

        Ok(Flow::Continue)
    }

    /// Removes up to `n` trailing messages. Unless `quiet`, each removal is
    /// described, along with any shortfall.
    fn undo(
        &mut self,
        transcript: &mut dyn Transcript,
        n: usize,
        quiet: bool,
    ) -> Result<usize, CommandError> {
        let removed = transcript.undo(n)?;
        trace!(requested = n, removed = removed.len(), quiet, "undo");

        if !quiet {
            for message in &removed {
                self.tools
                    .console
                    .line(&format!("Undid: {}", preview(message)));
            }
            if removed.len() < n {
                self.tools.console.line("Nothing left to undo");
            }
        }

        Ok(removed.len())
    }

    fn save(
        &mut self,
        directive: &Directive,
        transcript: &mut dyn Transcript,
    ) -> Result<(), CommandError> {
        let Some(code) = last_code_block(transcript.messages()) else {
            self.tools.console.line("No code block found");
            return Ok(());
        };

        let filename = self.arg_or_prompt(directive, "Filename: ")?;
        if Path::new(&filename).exists() {
            let answer = self
                .tools
                .prompter
                .prompt_line("File already exists, overwrite? [y/N] ")?;
            if !answer.is_some_and(|answer| answer.eq_ignore_ascii_case("y")) {
                return Ok(());
            }
        }

        fs::write(&filename, code)
            .map_err(|source| CommandError::io("writing code block", &filename, source))?;
        self.tools
            .console
            .line(&format!("Saved code block to {filename}"));
        Ok(())
    }

    fn print_help(&mut self) {
        self.tools.console.line("Available commands:");
        for descriptor in COMMANDS {
            self.tools
                .console
                .line(&format!("  {}: {}", descriptor.name, descriptor.description));
        }
    }

    fn arg_or_prompt(
        &mut self,
        directive: &Directive,
        label: &str,
    ) -> Result<String, CommandError> {
        match directive.first_arg() {
            Some(arg) => Ok(arg.to_string()),
            None => self.tools.require_line(label),
        }
    }
}

/// Count for `undo`: a digits-only first argument, else 1. Values too large
/// for `usize` saturate.
#[must_use]
pub fn undo_count(arg: Option<&str>) -> usize {
    match arg {
        Some(arg) if !arg.is_empty() && arg.bytes().all(|b| b.is_ascii_digit()) => {
            arg.parse().unwrap_or(usize::MAX)
        }
        _ => 1,
    }
}

fn preview(message: &Message) -> String {
    const LIMIT: usize = 60;
    let first_line = message.content.lines().next().unwrap_or_default();
    let mut text: String = first_line.chars().take(LIMIT).collect();
    if first_line.chars().count() > LIMIT || message.content.lines().nth(1).is_some() {
        text.push_str("...");
    }
    format!("{}: {text}", message.role)
}
