use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chat_directives::Message;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::SessionStoreError;
use crate::paths::{conversation_path, session_dir, validate_session_name};
use crate::schema::{JsonLine, SessionEntry, SessionHeader, SESSION_VERSION};

/// A conversation persisted as JSON lines under `<root>/<name>/`.
///
/// Appends are written through as single lines; every other mutation
/// rewrites the file atomically.
pub struct SessionStore {
    pub(crate) root: PathBuf,
    pub(crate) path: PathBuf,
    pub(crate) header: SessionHeader,
    pub(crate) messages: Vec<Message>,
    pub(crate) timestamps: Vec<String>,
}

impl SessionStore {
    /// Creates a new, empty session. Fails if `name` is already taken.
    pub fn create(root: &Path, name: &str) -> Result<Self, SessionStoreError> {
        validate_session_name(name)?;
        let path = conversation_path(root, name);
        if path.exists() {
            return Err(SessionStoreError::NameTaken {
                name: name.to_string(),
                path,
            });
        }

        let dir = session_dir(root, name);
        fs::create_dir_all(&dir)
            .map_err(|source| SessionStoreError::io("creating session directory", &dir, source))?;

        let header = SessionHeader::v1(Uuid::new_v4().to_string(), name, now_rfc3339()?);
        let mut store = Self {
            root: root.to_path_buf(),
            path,
            header,
            messages: Vec::new(),
            timestamps: Vec::new(),
        };
        store.persist()?;
        debug!(path = %store.path.display(), "created session");
        Ok(store)
    }

    pub fn open_named(root: &Path, name: &str) -> Result<Self, SessionStoreError> {
        validate_session_name(name)?;
        let mut store = Self::open(&conversation_path(root, name))?;
        store.root = root.to_path_buf();
        Ok(store)
    }

    pub fn open_or_create(root: &Path, name: &str) -> Result<Self, SessionStoreError> {
        validate_session_name(name)?;
        if conversation_path(root, name).exists() {
            Self::open_named(root, name)
        } else {
            Self::create(root, name)
        }
    }

    pub fn open(path: &Path) -> Result<Self, SessionStoreError> {
        let path = path.to_path_buf();
        let read_file = File::open(&path)
            .map_err(|source| SessionStoreError::io("opening session file", &path, source))?;
        let reader = BufReader::new(read_file);

        let mut header: Option<SessionHeader> = None;
        let mut messages = Vec::new();
        let mut timestamps = Vec::new();

        for (line_index, line_result) in reader.lines().enumerate() {
            let line_number = line_index + 1;
            let line = line_result
                .map_err(|source| SessionStoreError::io_line(&path, line_number, source))?;
            let parsed = parse_json_line(&path, line_number, &line)?;

            if line_number == 1 {
                match parsed {
                    JsonLine::Session(parsed_header) => {
                        validate_header_line(&path, line_number, &parsed_header)?;
                        header = Some(parsed_header);
                    }
                    JsonLine::Entry(_) => {
                        return Err(SessionStoreError::InvalidHeaderRecord {
                            path,
                            line: line_number,
                        });
                    }
                }

                continue;
            }

            match parsed {
                JsonLine::Session(_) => {
                    return Err(SessionStoreError::InvalidEntryRecord {
                        path,
                        line: line_number,
                    });
                }
                JsonLine::Entry(entry) => {
                    validate_rfc3339(&path, line_number, "ts", &entry.ts)?;
                    messages.push(entry.to_message());
                    timestamps.push(entry.ts);
                }
            }
        }

        let header =
            header.ok_or_else(|| SessionStoreError::MissingHeader { path: path.clone() })?;
        let root = path
            .parent()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Ok(Self {
            root,
            path,
            header,
            messages,
            timestamps,
        })
    }

    pub fn append(&mut self, message: Message) -> Result<(), SessionStoreError> {
        let ts = now_rfc3339()?;
        let entry = SessionEntry::new(ts.as_str(), message.clone());
        let line = serialize_line(&self.path, JsonLine::Entry(entry))?;

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|source| {
                SessionStoreError::io("opening session file for append", &self.path, source)
            })?;
        writeln!(file, "{line}")
            .map_err(|source| SessionStoreError::io("appending entry", &self.path, source))?;

        self.messages.push(message);
        self.timestamps.push(ts);
        Ok(())
    }

    /// Removes up to `n` trailing messages, returning them newest first.
    pub fn undo(&mut self, n: usize) -> Result<Vec<Message>, SessionStoreError> {
        let keep = self.messages.len().saturating_sub(n);
        if keep == self.messages.len() {
            return Ok(Vec::new());
        }

        write_snapshot(
            &self.path,
            &self.header,
            &self.messages[..keep],
            &self.timestamps[..keep],
        )?;
        let mut removed = self.messages.split_off(keep);
        self.timestamps.truncate(keep);
        removed.reverse();
        Ok(removed)
    }

    /// Replaces every message; each is stamped with the current time.
    pub fn replace(&mut self, messages: Vec<Message>) -> Result<(), SessionStoreError> {
        let timestamps = vec![now_rfc3339()?; messages.len()];
        write_snapshot(&self.path, &self.header, &messages, &timestamps)?;
        self.messages = messages;
        self.timestamps = timestamps;
        Ok(())
    }

    /// Rewrites the whole file through a temporary sibling and a rename.
    pub fn persist(&mut self) -> Result<(), SessionStoreError> {
        write_snapshot(&self.path, &self.header, &self.messages, &self.timestamps)
    }

    /// Moves the session directory to `name`.
    pub fn rename(&mut self, name: &str) -> Result<(), SessionStoreError> {
        validate_session_name(name)?;
        let target = session_dir(&self.root, name);
        if target.exists() {
            return Err(SessionStoreError::NameTaken {
                name: name.to_string(),
                path: target,
            });
        }

        let current = session_dir(&self.root, &self.header.name);
        fs::rename(&current, &target).map_err(|source| {
            SessionStoreError::io("renaming session directory", &target, source)
        })?;

        let path = conversation_path(&self.root, name);
        let mut header = self.header.clone();
        header.name = name.to_string();
        if let Err(error) = write_snapshot(&path, &header, &self.messages, &self.timestamps) {
            if let Err(rollback) = fs::rename(&target, &current) {
                warn!(%rollback, "could not move session directory back after failed rename");
            }
            return Err(error);
        }

        self.path = path;
        self.header = header;
        Ok(())
    }

    /// Copies the session under `name` with a fresh identity and continues
    /// writing to the copy. The original is left as it was.
    pub fn fork(&mut self, name: &str) -> Result<(), SessionStoreError> {
        validate_session_name(name)?;
        let target = session_dir(&self.root, name);
        if target.exists() {
            return Err(SessionStoreError::NameTaken {
                name: name.to_string(),
                path: target,
            });
        }

        self.persist()?;
        fs::create_dir_all(&target)
            .map_err(|source| SessionStoreError::io("creating fork directory", &target, source))?;

        let header = SessionHeader::v1(Uuid::new_v4().to_string(), name, now_rfc3339()?);
        let path = conversation_path(&self.root, name);
        write_snapshot(&path, &header, &self.messages, &self.timestamps)?;
        self.header = header;
        self.path = path;
        Ok(())
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn header(&self) -> &SessionHeader {
        &self.header
    }
}

/// A fresh session name: today's UTC date plus a short random suffix.
#[must_use]
pub fn default_session_name() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", OffsetDateTime::now_utc().date(), &suffix[..8])
}

fn now_rfc3339() -> Result<String, SessionStoreError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(SessionStoreError::ClockFormat)
}

/// Writes a complete session file atomically; the caller commits its in-memory
/// state only once this succeeds.
fn write_snapshot(
    path: &Path,
    header: &SessionHeader,
    messages: &[Message],
    timestamps: &[String],
) -> Result<(), SessionStoreError> {
    let mut contents = serialize_line(path, JsonLine::Session(header.clone()))?;
    contents.push('\n');
    for (message, ts) in messages.iter().zip(timestamps) {
        let entry = SessionEntry::new(ts.as_str(), message.clone());
        contents.push_str(&serialize_line(path, JsonLine::Entry(entry))?);
        contents.push('\n');
    }

    let tmp_path = path.with_extension("jsonl.tmp");
    fs::write(&tmp_path, contents)
        .map_err(|source| SessionStoreError::io("writing session file", &tmp_path, source))?;
    fs::rename(&tmp_path, path)
        .map_err(|source| SessionStoreError::io("replacing session file", path, source))?;

    debug!(path = %path.display(), messages = messages.len(), "persisted session");
    Ok(())
}

fn serialize_line(path: &Path, line: JsonLine) -> Result<String, SessionStoreError> {
    serde_json::to_string(&line).map_err(|source| SessionStoreError::json_serialize(path, source))
}

pub(crate) fn parse_json_line(
    path: &Path,
    line_number: usize,
    line: &str,
) -> Result<JsonLine, SessionStoreError> {
    serde_json::from_str::<JsonLine>(line)
        .map_err(|source| SessionStoreError::json_line(path, line_number, source))
}

pub(crate) fn validate_header_line(
    path: &Path,
    line_number: usize,
    header: &SessionHeader,
) -> Result<(), SessionStoreError> {
    if header.version != SESSION_VERSION {
        return Err(SessionStoreError::UnsupportedVersion {
            path: path.to_path_buf(),
            line: line_number,
            found: header.version,
        });
    }

    validate_rfc3339(path, line_number, "created_at", &header.created_at)
}

pub(crate) fn validate_rfc3339(
    path: &Path,
    line_number: usize,
    field: &'static str,
    value: &str,
) -> Result<(), SessionStoreError> {
    if OffsetDateTime::parse(value, &Rfc3339).is_err() {
        return Err(SessionStoreError::InvalidTimestamp {
            path: path.to_path_buf(),
            line: line_number,
            field,
            value: value.to_string(),
        });
    }

    Ok(())
}
