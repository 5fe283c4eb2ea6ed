use std::io::{self, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use chat_directives::{CommandError, Emit, ExecKind, Executor, Message, Prompter};
use tracing::{debug, warn};
use wait_timeout::ChildExt;

use crate::terminal::lock_unpoisoned;

pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 100 * 1024;

/// Minimum time output is still collected after the process has been reaped.
const PIPE_GRACE: Duration = Duration::from_millis(200);

pub const DECLINED_MESSAGE: &str = "Aborted, user chose not to run command.";

/// Runs snippets through an interpreter's `-c` flag, capturing output with a
/// timeout. Every run produces exactly one system message.
pub struct ProcessExecutor {
    kind: ExecKind,
    program: String,
    timeout: Duration,
    max_output_bytes: usize,
    confirm: Box<dyn Prompter>,
}

impl ProcessExecutor {
    pub fn shell(timeout: Duration, confirm: Box<dyn Prompter>) -> Self {
        Self::new(ExecKind::Shell, "bash", timeout, confirm)
    }

    pub fn python(timeout: Duration, confirm: Box<dyn Prompter>) -> Self {
        Self::new(ExecKind::Python, "python3", timeout, confirm)
    }

    pub fn new(
        kind: ExecKind,
        program: impl Into<String>,
        timeout: Duration,
        confirm: Box<dyn Prompter>,
    ) -> Self {
        Self {
            kind,
            program: program.into(),
            timeout,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            confirm,
        }
    }

    #[must_use]
    pub fn with_max_output_bytes(mut self, max_output_bytes: usize) -> Self {
        self.max_output_bytes = max_output_bytes;
        self
    }

    fn fence_lang(&self) -> &'static str {
        match self.kind {
            ExecKind::Shell => "bash",
            ExecKind::Python => "python",
        }
    }

    /// An empty answer or `y` runs; anything else, including a closed input,
    /// declines.
    fn confirmed(&mut self, code: &str) -> Result<bool, CommandError> {
        let noun = match self.kind {
            ExecKind::Shell => "command",
            ExecKind::Python => "code",
        };
        let label = format!("```{}\n{code}\n```\nRun {noun}? [Y/n] ", self.fence_lang());
        let answer = self.confirm.prompt_line(&label)?;
        Ok(answer.is_some_and(|answer| {
            let answer = answer.trim();
            answer.is_empty() || answer.eq_ignore_ascii_case("y")
        }))
    }

    fn execute(&self, code: &str) -> Result<String, CommandError> {
        let mut command = Command::new(&self.program);
        command
            .arg("-c")
            .arg(code)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(error) => {
                warn!(program = %self.program, %error, "failed to launch");
                return Ok(format!("Failed to launch {}: {error}", self.program));
            }
        };

        let started = Instant::now();
        let stdout_reader = spawn_pipe_reader(child.stdout.take());
        let stderr_reader = spawn_pipe_reader(child.stderr.take());

        let timeout_secs = self.timeout.as_secs();
        let status_label = match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => format_exit_status(status),
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                format!("timeout after {timeout_secs}s")
            }
            Err(error) => {
                let _ = child.kill();
                return Err(CommandError::Execution(format!(
                    "waiting for {}: {error}",
                    self.program
                )));
            }
        };

        // Background processes may inherit the pipes and outlive the child.
        let drain_deadline = (started + self.timeout).max(Instant::now() + PIPE_GRACE);
        let stdout = collect_pipe(stdout_reader, drain_deadline);
        let stderr = collect_pipe(stderr_reader, drain_deadline);
        debug!(
            program = %self.program,
            status = %status_label,
            stdout_bytes = stdout.len(),
            stderr_bytes = stderr.len(),
            "process finished"
        );

        let mut content = format!(
            "Ran command:\n```{}\n{code}\n```\n\nstatus: {status_label}\n",
            self.fence_lang()
        );
        for (label, bytes) in [("stdout", stdout), ("stderr", stderr)] {
            let text = String::from_utf8_lossy(&bytes);
            let text = text.trim_end();
            if text.is_empty() {
                continue;
            }
            let text = truncate_to_byte_limit(text.to_string(), self.max_output_bytes);
            content.push_str(&format!("\n{label}:\n```\n{text}\n```\n"));
        }
        Ok(content)
    }
}

impl Executor for ProcessExecutor {
    fn run(
        &mut self,
        code: &str,
        require_confirmation: bool,
        emit: &mut Emit<'_>,
    ) -> Result<(), CommandError> {
        if require_confirmation && !self.confirmed(code)? {
            return emit(Message::system(DECLINED_MESSAGE));
        }

        let output = self.execute(code)?;
        emit(Message::system(output))
    }
}

struct PipeReader {
    buffer: Arc<Mutex<Vec<u8>>>,
    done: Receiver<()>,
}

fn spawn_pipe_reader(pipe: Option<impl Read + Send + 'static>) -> Option<PipeReader> {
    let mut pipe = pipe?;
    let buffer = Arc::new(Mutex::new(Vec::new()));
    let (finished, done) = mpsc::channel();
    let sink = Arc::clone(&buffer);
    thread::spawn(move || {
        let mut chunk = [0u8; 8192];
        loop {
            match pipe.read(&mut chunk) {
                Ok(0) => break,
                Ok(read) => lock_unpoisoned(&sink).extend_from_slice(&chunk[..read]),
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
        let _ = finished.send(());
    });
    Some(PipeReader { buffer, done })
}

/// Waits for end of file until `deadline`, then takes whatever has arrived.
fn collect_pipe(reader: Option<PipeReader>, deadline: Instant) -> Vec<u8> {
    let Some(reader) = reader else {
        return Vec::new();
    };
    let wait = deadline.saturating_duration_since(Instant::now());
    if reader.done.recv_timeout(wait).is_err() {
        debug!("pipe still open after the process ended; keeping partial output");
    }
    let mut buffer = lock_unpoisoned(&reader.buffer);
    std::mem::take(&mut *buffer)
}

fn truncate_to_byte_limit(content: String, max_bytes: usize) -> String {
    if content.len() <= max_bytes {
        return content;
    }

    let mut cutoff = max_bytes.min(content.len());
    while cutoff > 0 && !content.is_char_boundary(cutoff) {
        cutoff -= 1;
    }

    let mut truncated = content[..cutoff].to_string();
    truncated.push_str("\n[truncated]");
    truncated
}

fn format_exit_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit_code={code}"),
        None => "exit_code=terminated_by_signal".to_string(),
    }
}
