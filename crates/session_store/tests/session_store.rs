use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chat_directives::{Message, Role, Transcript};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use session_store::{conversation_path, SessionStore, SessionStoreError};
use tempfile::TempDir;

fn write_session_file(lines: &[String]) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let session_dir = dir.path().join("chat");
    fs::create_dir_all(&session_dir).expect("session dir should be created");
    let path = session_dir.join("conversation.jsonl");
    let mut file = File::create(&path).expect("session file should be created");

    for line in lines {
        writeln!(file, "{line}").expect("line should be written");
    }

    (dir, path)
}

fn header_line() -> String {
    json!({
        "type": "session",
        "version": 1,
        "session_id": "session-1",
        "name": "chat",
        "created_at": "2026-02-14T00:00:00Z",
    })
    .to_string()
}

fn entry_line(ts: &str, role: &str, content: &str) -> String {
    json!({
        "type": "entry",
        "ts": ts,
        "role": role,
        "content": content,
        "hidden": false,
    })
    .to_string()
}

fn file_lines(path: &Path) -> Vec<Value> {
    fs::read_to_string(path)
        .expect("session file should be readable")
        .lines()
        .map(|line| serde_json::from_str(line).expect("line should be JSON"))
        .collect()
}

fn store_with(root: &Path, messages: &[Message]) -> SessionStore {
    let mut store = SessionStore::create(root, "chat").expect("session should be created");
    for message in messages {
        store
            .append(message.clone())
            .expect("append should succeed");
    }
    store
}

#[test]
fn open_rejects_missing_header() {
    let (_dir, path) = write_session_file(&[]);

    let error = SessionStore::open(&path)
        .err()
        .expect("empty file must fail");
    assert!(matches!(error, SessionStoreError::MissingHeader { .. }));
}

#[test]
fn open_rejects_non_header_first_line() {
    let (_dir, path) = write_session_file(&[entry_line("2026-02-14T00:00:01Z", "user", "hi")]);

    let error = SessionStore::open(&path)
        .err()
        .expect("entry as first line must fail");
    assert!(matches!(
        error,
        SessionStoreError::InvalidHeaderRecord { line: 1, .. }
    ));
}

#[test]
fn open_rejects_unsupported_header_version() {
    let (_dir, path) = write_session_file(&[json!({
        "type": "session",
        "version": 2,
        "session_id": "session-1",
        "name": "chat",
        "created_at": "2026-02-14T00:00:00Z",
    })
    .to_string()]);

    let error = SessionStore::open(&path)
        .err()
        .expect("unsupported version must fail");
    assert!(matches!(
        error,
        SessionStoreError::UnsupportedVersion {
            line: 1,
            found: 2,
            ..
        }
    ));
}

#[test]
fn open_rejects_unknown_entry_fields_and_roles() {
    let (_dir, path) = write_session_file(&[
        header_line(),
        json!({
            "type": "entry",
            "ts": "2026-02-14T00:00:01Z",
            "role": "user",
            "content": "hi",
            "mood": "cheerful",
        })
        .to_string(),
    ]);
    let error = SessionStore::open(&path)
        .err()
        .expect("unknown entry field must fail");
    assert!(matches!(
        error,
        SessionStoreError::JsonLineParse { line: 2, .. }
    ));

    let (_dir, path) = write_session_file(&[
        header_line(),
        entry_line("2026-02-14T00:00:01Z", "tool", "hi"),
    ]);
    let error = SessionStore::open(&path)
        .err()
        .expect("unknown role must fail");
    assert!(matches!(
        error,
        SessionStoreError::JsonLineParse { line: 2, .. }
    ));
}

#[test]
fn open_rejects_second_header_and_bad_timestamps() {
    let (_dir, path) = write_session_file(&[header_line(), header_line()]);
    let error = SessionStore::open(&path)
        .err()
        .expect("second header must fail");
    assert!(matches!(
        error,
        SessionStoreError::InvalidEntryRecord { line: 2, .. }
    ));

    let (_dir, path) = write_session_file(&[header_line(), entry_line("yesterday", "user", "hi")]);
    let error = SessionStore::open(&path)
        .err()
        .expect("bad timestamp must fail");
    assert!(matches!(
        error,
        SessionStoreError::InvalidTimestamp {
            line: 2,
            field: "ts",
            ..
        }
    ));
}

#[test]
fn open_reads_messages_in_order() {
    let (_dir, path) = write_session_file(&[
        header_line(),
        entry_line("2026-02-14T00:00:01Z", "user", "hello"),
        entry_line("2026-02-14T00:00:02Z", "assistant", "hi there"),
    ]);

    let store = SessionStore::open(&path).expect("valid session should open");
    assert_eq!(store.header().name, "chat");
    assert_eq!(
        store.messages(),
        &[Message::user("hello"), Message::assistant("hi there")]
    );
    assert_eq!(store.root(), path.parent().and_then(Path::parent).expect("root"));
}

#[test]
fn create_writes_header_and_rejects_existing_name() {
    let root = tempfile::tempdir().expect("tempdir should be created");
    let store = SessionStore::create(root.path(), "chat").expect("session should be created");

    assert_eq!(store.path(), conversation_path(root.path(), "chat").as_path());
    let lines = file_lines(store.path());
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["type"], "session");
    assert_eq!(lines[0]["version"], 1);
    assert_eq!(lines[0]["name"], "chat");

    let error = SessionStore::create(root.path(), "chat")
        .err()
        .expect("duplicate name must fail");
    assert!(matches!(error, SessionStoreError::NameTaken { .. }));
}

#[test]
fn append_writes_through_and_reopens() {
    let root = tempfile::tempdir().expect("tempdir should be created");
    let store = store_with(
        root.path(),
        &[
            Message::user("hello"),
            Message::system("context").hidden(),
        ],
    );

    let lines = file_lines(store.path());
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1]["role"], "user");
    assert_eq!(lines[2]["hidden"], true);

    let reopened = SessionStore::open_named(root.path(), "chat").expect("session should reopen");
    assert_eq!(reopened.messages(), store.messages());
    assert_eq!(reopened.messages()[1].role, Role::System);
}

#[test]
fn undo_removes_tail_newest_first_and_clamps() {
    let root = tempfile::tempdir().expect("tempdir should be created");
    let mut store = store_with(
        root.path(),
        &[
            Message::user("a"),
            Message::assistant("b"),
            Message::user("c"),
        ],
    );

    let removed = store.undo(2).expect("undo should succeed");
    assert_eq!(removed, vec![Message::user("c"), Message::assistant("b")]);
    assert_eq!(store.messages(), &[Message::user("a")]);
    assert_eq!(file_lines(store.path()).len(), 2);

    let removed = store.undo(5).expect("undo beyond length should clamp");
    assert_eq!(removed, vec![Message::user("a")]);
    assert!(store.messages().is_empty());
    assert!(store.undo(1).expect("undo on empty log").is_empty());
}

#[test]
fn replace_rewrites_everything() {
    let root = tempfile::tempdir().expect("tempdir should be created");
    let mut store = store_with(root.path(), &[Message::user("old")]);

    store
        .replace(vec![Message::user("new"), Message::assistant("reply")])
        .expect("replace should succeed");

    let reopened = SessionStore::open(store.path()).expect("session should reopen");
    assert_eq!(
        reopened.messages(),
        &[Message::user("new"), Message::assistant("reply")]
    );
}

#[test]
fn failed_writes_leave_messages_untouched() {
    let root = tempfile::tempdir().expect("tempdir should be created");
    let original = [Message::user("a"), Message::assistant("b")];
    let mut store = store_with(root.path(), &original);
    fs::remove_dir_all(root.path().join("chat")).expect("session dir should be removed");

    assert!(store.undo(1).is_err());
    assert_eq!(store.messages(), &original);

    assert!(store.replace(vec![Message::user("new")]).is_err());
    assert_eq!(store.messages(), &original);

    assert!(store.fork("branch").is_err());
    assert_eq!(store.header().name, "chat");
    assert_eq!(store.path(), conversation_path(root.path(), "chat").as_path());
}

#[test]
fn rename_moves_the_session_directory() {
    let root = tempfile::tempdir().expect("tempdir should be created");
    let mut store = store_with(root.path(), &[Message::user("hello")]);

    Transcript::rename(&mut store, "renamed").expect("rename should succeed");

    assert!(!root.path().join("chat").exists());
    assert_eq!(store.path(), conversation_path(root.path(), "renamed"));
    assert_eq!(Transcript::name(&store), "renamed");
    let reopened = SessionStore::open_named(root.path(), "renamed").expect("renamed session");
    assert_eq!(reopened.header().name, "renamed");
    assert_eq!(reopened.messages(), &[Message::user("hello")]);
}

#[test]
fn rename_rejects_taken_and_invalid_names() {
    let root = tempfile::tempdir().expect("tempdir should be created");
    SessionStore::create(root.path(), "other").expect("other session");
    let mut store = store_with(root.path(), &[]);

    let error = store.rename("other").err().expect("taken name must fail");
    assert!(matches!(error, SessionStoreError::NameTaken { .. }));

    let error = store.rename("../escape").err().expect("invalid name must fail");
    assert!(matches!(error, SessionStoreError::InvalidName { .. }));
    assert_eq!(store.header().name, "chat");
}

#[test]
fn fork_copies_and_continues_on_the_copy() {
    let root = tempfile::tempdir().expect("tempdir should be created");
    let mut store = store_with(root.path(), &[Message::user("shared")]);
    let original_id = store.header().session_id.clone();

    store.fork("branch").expect("fork should succeed");
    store
        .append(Message::assistant("only on branch"))
        .expect("append to fork");

    assert_ne!(store.header().session_id, original_id);
    let original = SessionStore::open_named(root.path(), "chat").expect("original session");
    assert_eq!(original.messages(), &[Message::user("shared")]);
    let branch = SessionStore::open_named(root.path(), "branch").expect("forked session");
    assert_eq!(
        branch.messages(),
        &[Message::user("shared"), Message::assistant("only on branch")]
    );
}

#[test]
fn open_or_create_reuses_existing_sessions() {
    let root = tempfile::tempdir().expect("tempdir should be created");
    store_with(root.path(), &[Message::user("kept")]);

    let store = SessionStore::open_or_create(root.path(), "chat").expect("existing session");
    assert_eq!(store.messages(), &[Message::user("kept")]);

    let fresh = SessionStore::open_or_create(root.path(), "fresh").expect("new session");
    assert!(fresh.messages().is_empty());
}
