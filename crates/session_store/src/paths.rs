use std::path::{Path, PathBuf};

use crate::error::SessionStoreError;

pub const CONVERSATION_FILE: &str = "conversation.jsonl";

#[must_use]
pub fn session_dir(root: &Path, name: &str) -> PathBuf {
    root.join(name)
}

#[must_use]
pub fn conversation_path(root: &Path, name: &str) -> PathBuf {
    session_dir(root, name).join(CONVERSATION_FILE)
}

/// A session name becomes a single directory component under the logs root.
pub fn validate_session_name(name: &str) -> Result<(), SessionStoreError> {
    let invalid = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.chars().any(char::is_control);

    if invalid {
        return Err(SessionStoreError::InvalidName {
            name: name.to_string(),
        });
    }

    Ok(())
}
