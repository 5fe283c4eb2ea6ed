use std::env;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use chat_directives::{CommandError, ContextSource, Message, Role, Summarizer};
use tracing::debug;

/// Describes the working directory, including `git status` when the
/// directory is inside a repository.
pub struct WorkspaceContext {
    dir: Option<PathBuf>,
}

impl WorkspaceContext {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    /// Uses the process's current directory at the time of each request.
    pub fn current_dir() -> Self {
        Self { dir: None }
    }

    fn resolve_dir(&self) -> Result<PathBuf, CommandError> {
        match &self.dir {
            Some(dir) => Ok(dir.clone()),
            None => env::current_dir()
                .map_err(|source| CommandError::io("reading working directory", ".", source)),
        }
    }
}

impl ContextSource for WorkspaceContext {
    fn context_message(&mut self) -> Result<Message, CommandError> {
        let dir = self.resolve_dir()?;
        let mut content = format!("# Context\nWorking directory: {}\n", dir.display());

        match git_status(&dir) {
            Some(status) if status.trim().is_empty() => {
                content.push_str("\ngit status: clean\n");
            }
            Some(status) => {
                content.push_str(&format!("\ngit status:\n```\n{}\n```\n", status.trim_end()));
            }
            None => {}
        }

        Ok(Message::system(content))
    }
}

fn git_status(dir: &Path) -> Option<String> {
    let output = Command::new("git")
        .arg("status")
        .arg("--short")
        .current_dir(dir)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output();

    match output {
        Ok(output) if output.status.success() => {
            Some(String::from_utf8_lossy(&output.stdout).into_owned())
        }
        Ok(output) => {
            debug!(status = %output.status, "git status unavailable");
            None
        }
        Err(error) => {
            debug!(%error, "git not runnable");
            None
        }
    }
}

/// Offline summary: message counts per role and the latest user request.
#[derive(Default)]
pub struct StatsSummarizer;

impl Summarizer for StatsSummarizer {
    fn summarize(&mut self, messages: &[Message]) -> Result<String, CommandError> {
        if messages.is_empty() {
            return Ok("empty conversation".to_string());
        }

        let count = |role: Role| messages.iter().filter(|m| m.role == role).count();
        let mut summary = format!(
            "{} messages ({} user, {} assistant, {} system)",
            messages.len(),
            count(Role::User),
            count(Role::Assistant),
            count(Role::System),
        );

        if let Some(last) = messages.iter().rev().find(|m| m.role == Role::User) {
            let first_line = last.content.lines().next().unwrap_or_default();
            summary.push_str(&format!("; last request: {first_line}"));
        }

        Ok(summary)
    }
}
