//! The interactive loop: read a line, record it, handle it if it is a
//! directive.

use chat_directives::{CommandError, Dispatcher, Flow, Message, Prompter, Transcript};
use tracing::{debug, info};

pub const INPUT_PROMPT: &str = "> ";

pub struct App {
    dispatcher: Dispatcher,
    input: Box<dyn Prompter>,
    auto_confirm: bool,
}

impl App {
    pub fn new(dispatcher: Dispatcher, input: Box<dyn Prompter>, auto_confirm: bool) -> Self {
        Self {
            dispatcher,
            input,
            auto_confirm,
        }
    }

    /// Handles one submitted line. Blank lines are ignored. Anything else is
    /// appended as a user message first, so directives can retract it.
    pub fn submit(
        &mut self,
        line: &str,
        transcript: &mut dyn Transcript,
    ) -> Result<Flow, CommandError> {
        if line.trim().is_empty() {
            return Ok(Flow::Continue);
        }

        let message = Message::user(line);
        transcript.append(message.clone())?;

        match self
            .dispatcher
            .execute_directive(&message, transcript, self.auto_confirm)?
        {
            Some(flow) => Ok(flow),
            None => {
                debug!(chars = line.len(), "recorded user message");
                Ok(Flow::Continue)
            }
        }
    }

    /// Reads until the input closes or a directive asks to exit.
    pub fn run(&mut self, transcript: &mut dyn Transcript) -> Result<Flow, CommandError> {
        info!(session = transcript.name(), "session started");
        while let Some(line) = self.input.prompt_line(INPUT_PROMPT)? {
            if self.submit(&line, transcript)? == Flow::Exit {
                return Ok(Flow::Exit);
            }
        }

        debug!("input closed");
        Ok(Flow::Continue)
    }
}
