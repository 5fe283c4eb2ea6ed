use chat_directives::{Message, Transcript, TranscriptError};

use crate::store::SessionStore;

impl Transcript for SessionStore {
    fn messages(&self) -> &[Message] {
        SessionStore::messages(self)
    }

    fn append(&mut self, message: Message) -> Result<(), TranscriptError> {
        SessionStore::append(self, message).map_err(|err| TranscriptError::new("append", err))
    }

    fn undo(&mut self, n: usize) -> Result<Vec<Message>, TranscriptError> {
        SessionStore::undo(self, n).map_err(|err| TranscriptError::new("undo", err))
    }

    fn replace(&mut self, messages: Vec<Message>) -> Result<(), TranscriptError> {
        SessionStore::replace(self, messages).map_err(|err| TranscriptError::new("replace", err))
    }

    fn persist(&mut self) -> Result<(), TranscriptError> {
        SessionStore::persist(self).map_err(|err| TranscriptError::new("persist", err))
    }

    fn name(&self) -> &str {
        &self.header.name
    }

    fn rename(&mut self, name: &str) -> Result<(), TranscriptError> {
        SessionStore::rename(self, name).map_err(|err| TranscriptError::new("rename", err))
    }

    fn fork(&mut self, name: &str) -> Result<(), TranscriptError> {
        SessionStore::fork(self, name).map_err(|err| TranscriptError::new("fork", err))
    }
}
