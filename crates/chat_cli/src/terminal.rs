//! Line-oriented terminal collaborators.

use std::cell::RefCell;
use std::fs;
use std::io::{self, BufRead, Write};
use std::process::Command;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use chat_directives::{CommandError, Console, Message, Prompter, RetryPause, TextEditor};
use signal_hook::consts::SIGINT;
use tracing::debug;

/// Writes a label and reads one line. Trailing line endings are stripped.
pub struct LinePrompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl LinePrompter<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompter for LinePrompter<R, W> {
    fn prompt_line(&mut self, label: &str) -> Result<Option<String>, CommandError> {
        write!(self.output, "{label}")
            .and_then(|()| self.output.flush())
            .map_err(|source| CommandError::io("writing prompt", "<stdout>", source))?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .map_err(|source| CommandError::io("reading input", "<stdin>", source))?;
        if read == 0 {
            return Ok(None);
        }

        let trimmed_len = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed_len);
        Ok(Some(line))
    }
}

/// One prompter shared by every collaborator that reads input, so a single
/// reader owns stdin.
#[derive(Clone)]
pub struct SharedPrompter {
    inner: Rc<RefCell<Box<dyn Prompter>>>,
}

impl SharedPrompter {
    pub fn new(prompter: impl Prompter + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Box::new(prompter))),
        }
    }
}

impl Prompter for SharedPrompter {
    fn prompt_line(&mut self, label: &str) -> Result<Option<String>, CommandError> {
        self.inner.borrow_mut().prompt_line(label)
    }
}

/// Prints lines and messages to a writer. Output is best effort.
pub struct WriterConsole<W> {
    output: W,
}

impl<W: Write> WriterConsole<W> {
    pub fn new(output: W) -> Self {
        Self { output }
    }
}

impl WriterConsole<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Console for WriterConsole<W> {
    fn line(&mut self, text: &str) {
        let _ = writeln!(self.output, "{text}");
    }

    fn message(&mut self, message: &Message) {
        let hidden = if message.hidden { " (hidden)" } else { "" };
        let _ = writeln!(self.output, "{}{hidden}: {}", message.role, message.content);
    }
}

/// A cloneable in-memory writer, for capturing console output.
#[derive(Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&lock_unpoisoned(&self.bytes)).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        lock_unpoisoned(&self.bytes).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Opens a temporary file in the user's editor and reads it back.
///
/// The editor command goes through `sh`, so values like `code --wait` work.
pub struct ExternalEditor {
    command: String,
}

impl ExternalEditor {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl TextEditor for ExternalEditor {
    fn edit(&mut self, text: &str, extension: &str) -> Result<String, CommandError> {
        let file = tempfile::Builder::new()
            .prefix("chat-edit-")
            .suffix(&format!(".{extension}"))
            .tempfile()
            .map_err(|source| CommandError::io("creating edit buffer", "<tempdir>", source))?;
        let path = file.path().to_path_buf();
        fs::write(&path, text)
            .map_err(|source| CommandError::io("writing edit buffer", &path, source))?;

        debug!(editor = %self.command, path = %path.display(), "launching editor");
        let status = Command::new("sh")
            .arg("-c")
            .arg(format!("{} \"$1\"", self.command))
            .arg("sh")
            .arg(&path)
            .status()
            .map_err(|error| CommandError::Editor(format!("failed to launch editor: {error}")))?;
        if !status.success() {
            return Err(CommandError::Editor(format!(
                "editor `{}` exited with {status}",
                self.command
            )));
        }

        fs::read_to_string(&path)
            .map_err(|source| CommandError::io("reading edit buffer", &path, source))
    }
}

/// Sleeps between edit retries with SIGINT routed to a flag, so Ctrl-C
/// cancels the edit instead of the process. Outside a pause SIGINT keeps its
/// default action.
///
/// The handlers are registered once and never removed; create one per
/// process.
pub struct SignalPause {
    interrupted: Arc<AtomicBool>,
    terminate_on_interrupt: Arc<AtomicBool>,
}

impl SignalPause {
    const POLL: Duration = Duration::from_millis(20);

    pub fn new() -> io::Result<Self> {
        let interrupted = Arc::new(AtomicBool::new(false));
        let terminate_on_interrupt = Arc::new(AtomicBool::new(true));
        // Actions run in registration order; the default action must come first.
        signal_hook::flag::register_conditional_default(
            SIGINT,
            Arc::clone(&terminate_on_interrupt),
        )?;
        signal_hook::flag::register(SIGINT, Arc::clone(&interrupted))?;
        Ok(Self {
            interrupted,
            terminate_on_interrupt,
        })
    }
}

impl RetryPause for SignalPause {
    fn pause(&mut self, duration: Duration) -> bool {
        self.interrupted.store(false, Ordering::SeqCst);
        self.terminate_on_interrupt.store(false, Ordering::SeqCst);

        let deadline = Instant::now() + duration;
        while !self.interrupted.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep(Self::POLL.min(deadline - now));
        }

        self.terminate_on_interrupt.store(true, Ordering::SeqCst);
        let interrupted = self.interrupted.swap(false, Ordering::SeqCst);
        if interrupted {
            debug!("retry pause interrupted");
        }
        interrupted
    }
}

pub fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
