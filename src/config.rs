//! Environment configuration.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MARKER: char = '/';
pub const DEFAULT_EDIT_RETRY_MS: u64 = 1000;
pub const DEFAULT_EXEC_TIMEOUT_SEC: u64 = 30;
pub const DEFAULT_EDITOR: &str = "vi";

#[derive(Debug, Clone)]
pub struct DirectiveConfig {
    /// Character that marks a user message as a directive.
    pub marker: char,
    pub edit_retry_pause: Duration,
    pub logs_dir: Option<PathBuf>,
    pub editor: String,
    pub exec_timeout: Duration,
}

impl Default for DirectiveConfig {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER,
            edit_retry_pause: Duration::from_millis(DEFAULT_EDIT_RETRY_MS),
            logs_dir: None,
            editor: DEFAULT_EDITOR.to_string(),
            exec_timeout: Duration::from_secs(DEFAULT_EXEC_TIMEOUT_SEC),
        }
    }
}

impl DirectiveConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            marker: env_string_opt("CHAT_DIRECTIVE_PREFIX")
                .and_then(|value| value.chars().next())
                .unwrap_or(defaults.marker),
            edit_retry_pause: env_u64("CHAT_EDIT_RETRY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.edit_retry_pause),
            logs_dir: env_string_opt("CHAT_LOGS_DIR").map(PathBuf::from),
            editor: env_string_opt("EDITOR").unwrap_or(defaults.editor),
            exec_timeout: env_u64("CHAT_EXEC_TIMEOUT_SEC")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.exec_timeout),
        }
    }

    /// Logs root: the configured directory, else a per-user data directory.
    #[must_use]
    pub fn resolved_logs_dir(&self) -> PathBuf {
        if let Some(dir) = &self.logs_dir {
            return dir.clone();
        }

        let base = env_string_opt("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| {
                env_string_opt("HOME").map(|home| PathBuf::from(home).join(".local/share"))
            })
            .unwrap_or_else(env::temp_dir);
        base.join("chat_directives").join("logs")
    }
}

fn env_u64(key: &str) -> Option<u64> {
    env_string_opt(key).and_then(|value| value.trim().parse().ok())
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    struct EnvGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = &self.previous {
                env::set_var(self.key, value);
            } else {
                env::remove_var(self.key);
            }
        }
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
            .lock()
            .expect("env lock poisoned")
    }

    fn set_env_guard(key: &'static str, value: Option<&str>) -> EnvGuard {
        let previous = env::var(key).ok();
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
        EnvGuard { key, previous }
    }

    #[test]
    fn env_defaults_apply() {
        let _lock = env_lock();
        let _g1 = set_env_guard("CHAT_DIRECTIVE_PREFIX", None);
        let _g2 = set_env_guard("CHAT_EDIT_RETRY_MS", None);
        let _g3 = set_env_guard("CHAT_LOGS_DIR", None);
        let _g4 = set_env_guard("EDITOR", None);
        let _g5 = set_env_guard("CHAT_EXEC_TIMEOUT_SEC", None);

        let config = DirectiveConfig::from_env();
        assert_eq!(config.marker, '/');
        assert_eq!(config.edit_retry_pause, Duration::from_millis(1000));
        assert!(config.logs_dir.is_none());
        assert_eq!(config.editor, "vi");
        assert_eq!(config.exec_timeout, Duration::from_secs(30));
    }

    #[test]
    fn env_values_override_defaults() {
        let _lock = env_lock();
        let _g1 = set_env_guard("CHAT_DIRECTIVE_PREFIX", Some(".cmd"));
        let _g2 = set_env_guard("CHAT_EDIT_RETRY_MS", Some("25"));
        let _g3 = set_env_guard("CHAT_LOGS_DIR", Some("/tmp/chat-logs"));
        let _g4 = set_env_guard("EDITOR", Some("nano"));
        let _g5 = set_env_guard("CHAT_EXEC_TIMEOUT_SEC", Some("5"));

        let config = DirectiveConfig::from_env();
        assert_eq!(config.marker, '.');
        assert_eq!(config.edit_retry_pause, Duration::from_millis(25));
        assert_eq!(config.resolved_logs_dir(), PathBuf::from("/tmp/chat-logs"));
        assert_eq!(config.editor, "nano");
        assert_eq!(config.exec_timeout, Duration::from_secs(5));
    }

    #[test]
    fn malformed_numbers_fall_back() {
        let _lock = env_lock();
        let _g1 = set_env_guard("CHAT_EDIT_RETRY_MS", Some("soon"));
        let _g2 = set_env_guard("CHAT_EXEC_TIMEOUT_SEC", Some("0"));

        let config = DirectiveConfig::from_env();
        assert_eq!(config.edit_retry_pause, Duration::from_millis(1000));
        assert_eq!(config.exec_timeout, Duration::from_secs(30));
    }
}
