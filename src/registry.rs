//! Static command table.
//!
//! The table is built once and never mutated. It drives both dispatch (name
//! and alias lookup) and the help listing.

use std::collections::HashMap;

use once_cell::sync::Lazy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Shell,
    Python,
    Continue,
    Log,
    Rename,
    Fork,
    Summarize,
    Edit,
    Context,
    Undo,
    Load,
    Save,
    Exit,
    Replay,
    Impersonate,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandDescriptor {
    pub command: Command,
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub description: &'static str,
    /// Whether the handler removes its own directive message before doing
    /// anything else.
    pub retracts: bool,
}

impl CommandDescriptor {
    fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.aliases.contains(&name)
    }
}

pub static COMMANDS: &[CommandDescriptor] = &[
    CommandDescriptor {
        command: Command::Continue,
        name: "continue",
        aliases: &[],
        description: "Continue response",
        retracts: true,
    },
    CommandDescriptor {
        command: Command::Undo,
        name: "undo",
        aliases: &[],
        description: "Undo the last action",
        retracts: true,
    },
    CommandDescriptor {
        command: Command::Log,
        name: "log",
        aliases: &[],
        description: "Show the conversation log",
        retracts: true,
    },
    CommandDescriptor {
        command: Command::Edit,
        name: "edit",
        aliases: &[],
        description: "Edit previous messages",
        retracts: true,
    },
    CommandDescriptor {
        command: Command::Rename,
        name: "rename",
        aliases: &[],
        description: "Rename the conversation",
        retracts: true,
    },
    CommandDescriptor {
        command: Command::Fork,
        name: "fork",
        aliases: &[],
        description: "Create a copy of the conversation with a new name",
        retracts: false,
    },
    CommandDescriptor {
        command: Command::Summarize,
        name: "summarize",
        aliases: &[],
        description: "Summarize the conversation so far",
        retracts: false,
    },
    CommandDescriptor {
        command: Command::Context,
        name: "context",
        aliases: &[],
        description: "Generate a context message for the working directory",
        retracts: false,
    },
    CommandDescriptor {
        command: Command::Load,
        name: "load",
        aliases: &[],
        description: "Load a file",
        retracts: false,
    },
    CommandDescriptor {
        command: Command::Save,
        name: "save",
        aliases: &[],
        description: "Save the most recent code block to a file",
        retracts: true,
    },
    CommandDescriptor {
        command: Command::Shell,
        name: "shell",
        aliases: &["sh", "bash"],
        description: "Execute a shell command",
        retracts: false,
    },
    CommandDescriptor {
        command: Command::Python,
        name: "python",
        aliases: &["py"],
        description: "Execute a Python command",
        retracts: false,
    },
    CommandDescriptor {
        command: Command::Replay,
        name: "replay",
        aliases: &[],
        description: "Re-execute past commands in the conversation (does not store output in log)",
        retracts: true,
    },
    CommandDescriptor {
        command: Command::Impersonate,
        name: "impersonate",
        aliases: &[],
        description: "Impersonate the assistant",
        retracts: false,
    },
    CommandDescriptor {
        command: Command::Help,
        name: "help",
        aliases: &[],
        description: "Show this help message",
        retracts: true,
    },
    CommandDescriptor {
        command: Command::Exit,
        name: "exit",
        aliases: &[],
        description: "Exit the program",
        retracts: false,
    },
];

static BY_NAME: Lazy<HashMap<&'static str, &'static CommandDescriptor>> = Lazy::new(|| {
    let mut index = HashMap::new();
    for descriptor in COMMANDS {
        index.insert(descriptor.name, descriptor);
        for alias in descriptor.aliases {
            index.insert(*alias, descriptor);
        }
    }
    index
});

/// Case-sensitive lookup by canonical name or alias.
#[must_use]
pub fn lookup(name: &str) -> Option<&'static CommandDescriptor> {
    BY_NAME.get(name).copied()
}

/// Descriptor used for names that match nothing: the help listing.
#[must_use]
pub fn fallback() -> &'static CommandDescriptor {
    descriptor(Command::Help)
}

#[must_use]
pub fn descriptor(command: Command) -> &'static CommandDescriptor {
    COMMANDS
        .iter()
        .find(|descriptor| descriptor.command == command)
        .unwrap_or(&COMMANDS[0])
}

/// Resolves `name` to a descriptor, falling back to help for unknown names.
#[must_use]
pub fn resolve(name: &str) -> &'static CommandDescriptor {
    lookup(name).unwrap_or_else(fallback)
}

/// Names that resolve to `command`, canonical name first.
pub fn names_for(command: Command) -> impl Iterator<Item = &'static str> {
    COMMANDS
        .iter()
        .filter(move |descriptor| descriptor.command == command)
        .flat_map(|descriptor| {
            std::iter::once(descriptor.name).chain(descriptor.aliases.iter().copied())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_name_and_alias_is_unique() {
        let total: usize = COMMANDS.iter().map(|d| 1 + d.aliases.len()).sum();
        assert_eq!(BY_NAME.len(), total);
    }

    #[test]
    fn shell_is_reachable_by_three_names() {
        for name in ["shell", "sh", "bash"] {
            assert_eq!(lookup(name).map(|d| d.command), Some(Command::Shell));
        }
        assert_eq!(names_for(Command::Shell).count(), 3);
        assert_eq!(lookup("py").map(|d| d.command), Some(Command::Python));
    }

    #[test]
    fn lookup_is_case_sensitive() {
        assert!(lookup("Shell").is_none());
        assert!(lookup("UNDO").is_none());
        assert_eq!(resolve("UNDO").command, Command::Help);
    }

    #[test]
    fn only_fork_and_summarize_keep_directive_among_history_commands() {
        let keeps: Vec<_> = COMMANDS
            .iter()
            .filter(|d| {
                !d.retracts
                    && !matches!(
                        d.command,
                        Command::Shell
                            | Command::Python
                            | Command::Context
                            | Command::Load
                            | Command::Impersonate
                            | Command::Exit
                    )
            })
            .map(|d| d.command)
            .collect();
        assert_eq!(keeps, vec![Command::Fork, Command::Summarize]);
    }

    #[test]
    fn every_command_variant_has_a_descriptor() {
        for command in [
            Command::Shell,
            Command::Python,
            Command::Continue,
            Command::Log,
            Command::Rename,
            Command::Fork,
            Command::Summarize,
            Command::Edit,
            Command::Context,
            Command::Undo,
            Command::Load,
            Command::Save,
            Command::Exit,
            Command::Replay,
            Command::Impersonate,
            Command::Help,
        ] {
            assert_eq!(descriptor(command).command, command);
        }
    }
}
