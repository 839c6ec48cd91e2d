//! The `/command` registry.
//!
//! Every slash command is declared up front with its usage line and
//! argument bound; parsing yields a typed `Command` or a typed error, never
//! a lookup-by-name failure at dispatch time.

use std::collections::HashSet;

/// A parsed console input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/t [id]` — list recent topics or switch the current one.
    Topics(Option<u64>),
    /// `/ls [id]` — message history for a topic.
    History(Option<u64>),
    /// `/g` — list groups.
    Groups,
    /// `/read [group-id]` — mark everything (or one group) read.
    MarkRead(Option<u64>),
    Help,
    Quit,
    /// A plain line: post it to the current topic.
    Say(String),
    /// Whitespace-only input, ignored.
    Empty,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command /{0}, try /help")]
    Unknown(String),
    #[error("usage: {0}")]
    BadArity(&'static str),
    #[error("'{0}' is not a numeric id")]
    BadArgument(String),
}

struct CommandSpec {
    name: &'static str,
    usage: &'static str,
    summary: &'static str,
    max_args: usize,
    build: fn(Option<&str>) -> Result<Command, CommandError>,
}

pub struct CommandSet {
    specs: Vec<CommandSpec>,
}

impl CommandSet {
    pub fn new() -> anyhow::Result<Self> {
        let specs = vec![
            CommandSpec {
                name: "t",
                usage: "/t [topic-id]",
                summary: "list the most recent topics, or switch to one",
                max_args: 1,
                build: |arg| Ok(Command::Topics(opt_id(arg)?)),
            },
            CommandSpec {
                name: "ls",
                usage: "/ls [topic-id]",
                summary: "show message history for the current (or given) topic",
                max_args: 1,
                build: |arg| Ok(Command::History(opt_id(arg)?)),
            },
            CommandSpec {
                name: "g",
                usage: "/g",
                summary: "list groups with unread counts",
                max_args: 0,
                build: |_| Ok(Command::Groups),
            },
            CommandSpec {
                name: "read",
                usage: "/read [group-id]",
                summary: "mark everything, or one group, as read",
                max_args: 1,
                build: |arg| Ok(Command::MarkRead(opt_id(arg)?)),
            },
            CommandSpec {
                name: "help",
                usage: "/help",
                summary: "this summary",
                max_args: 0,
                build: |_| Ok(Command::Help),
            },
            CommandSpec {
                name: "q",
                usage: "/q",
                summary: "quit (Ctrl-D works too)",
                max_args: 0,
                build: |_| Ok(Command::Quit),
            },
        ];

        // a duplicate name would shadow a command; refuse to start
        let mut names = HashSet::new();
        for spec in &specs {
            if !names.insert(spec.name) {
                anyhow::bail!("duplicate command registration: /{}", spec.name);
            }
        }
        Ok(Self { specs })
    }

    pub fn parse(&self, line: &str) -> Result<Command, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Command::Empty);
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Command::Say(line.to_string()));
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or("");
        let args: Vec<&str> = parts.collect();

        let spec = self
            .specs
            .iter()
            .find(|spec| spec.name == name)
            .ok_or_else(|| CommandError::Unknown(name.to_string()))?;
        if args.len() > spec.max_args {
            return Err(CommandError::BadArity(spec.usage));
        }
        (spec.build)(args.first().copied())
    }

    pub fn help_lines(&self) -> Vec<String> {
        self.specs
            .iter()
            .map(|spec| format!("{:<16} {}", spec.usage, spec.summary))
            .collect()
    }
}

fn opt_id(arg: Option<&str>) -> Result<Option<u64>, CommandError> {
    arg.map(|raw| {
        raw.parse()
            .map_err(|_| CommandError::BadArgument(raw.to_string()))
    })
    .transpose()
}
