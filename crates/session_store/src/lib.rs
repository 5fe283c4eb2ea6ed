mod error;
mod paths;
mod schema;
mod store;
mod transcript;

pub use error::SessionStoreError;
pub use paths::{conversation_path, session_dir, validate_session_name, CONVERSATION_FILE};
pub use schema::{SessionEntry, SessionHeader};
pub use store::{default_session_name, SessionStore};
