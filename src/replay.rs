//! Re-running code from earlier assistant messages.

use tracing::debug;

use crate::collab::{Toolbox, Transcript};
use crate::error::CommandError;
use crate::exec::execute_message;
use crate::message::{Message, Role};

/// Re-runs the executable blocks of every assistant message, in order, with
/// confirmation required. Output is printed, never appended to the transcript.
///
/// Returns the number of assistant messages replayed.
pub fn replay(transcript: &dyn Transcript, tools: &mut Toolbox) -> Result<usize, CommandError> {
    let assistant_messages: Vec<Message> = transcript
        .messages()
        .iter()
        .filter(|message| message.role == Role::Assistant)
        .cloned()
        .collect();

    let Toolbox {
        shell,
        python,
        console,
        ..
    } = tools;

    for message in &assistant_messages {
        execute_message(message, true, shell.as_mut(), python.as_mut(), &mut |output| {
            console.message(&output);
            Ok(())
        })?;
    }

    debug!(replayed = assistant_messages.len(), "replay finished");
    Ok(assistant_messages.len())
}
