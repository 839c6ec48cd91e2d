//! The interactive loop: prompt, dispatch, and the listener that renders
//! live messages in between keystrokes.

use std::cmp::Ordering;
use std::io::Write as _;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use tokio::io::AsyncBufReadExt;
use tracing::error;

use natter_client::{NetworkError, Session, UpdateListener};
use natter_types::models::{EventKind, LiveMessage, Topic};

use crate::commands::{Command, CommandSet};
use crate::render;

const PROMPT: &str = "> ";
const TOPIC_LIST_LIMIT: usize = 10;

pub struct ConsoleOptions {
    pub notify: bool,
}

pub async fn run(session: Arc<Session>, options: ConsoleOptions) -> anyhow::Result<()> {
    let commands = CommandSet::new()?;

    session
        .on_live_update(Arc::new(RenderListener {
            session: Arc::downgrade(&session),
            username: session.username().map(str::to_string),
            notify: options.notify,
        }))
        .await;

    println!(
        "natter — connected as {}. /help for commands, /q or Ctrl-D to quit.",
        session.username().unwrap_or("anonymous")
    );
    // the banner is out; live output may start now
    session.notify_ready().await;

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut current_topic: Option<u64> = None;
    loop {
        prompt();
        let Some(line) = lines.next_line().await? else {
            break; // EOF
        };
        match commands.parse(&line) {
            Ok(Command::Quit) => break,
            Ok(Command::Help) => {
                for help_line in commands.help_lines() {
                    println!("{help_line}");
                }
            }
            Ok(command) => {
                // network failure is one diagnostic line, never the end of
                // the loop
                if let Err(err) = dispatch(&session, &mut current_topic, command).await {
                    error!("{err}");
                }
            }
            Err(err) => println!("{err}"),
        }
    }
    Ok(())
}

async fn dispatch(
    session: &Session,
    current_topic: &mut Option<u64>,
    command: Command,
) -> Result<(), NetworkError> {
    match command {
        Command::Empty | Command::Help | Command::Quit => {}

        Command::Groups => {
            let mut groups: Vec<_> = session.get_groups(false).await?.into_values().collect();
            groups.sort_by(|a, b| latest_first(a.latest_message_at, b.latest_message_at));
            for group in groups {
                println!("{:>8}  {} ({} unread)", group.id, group.slug, group.unread);
            }
        }

        Command::Topics(None) => {
            let mut topics: Vec<Topic> =
                session.get_topics(false).await?.into_values().collect();
            topics.sort_by(|a, b| latest_first(a.latest_message_at, b.latest_message_at));
            topics.truncate(TOPIC_LIST_LIMIT);
            for topic in topics {
                let marker = if Some(topic.id) == *current_topic { '*' } else { ' ' };
                println!(
                    "{marker}{:>8}  {} ({} unread)",
                    topic.id, topic.name, topic.unread
                );
            }
        }

        Command::Topics(Some(id)) => {
            let topics = session.get_topics(false).await?;
            match topics.get(&id) {
                Some(topic) => {
                    *current_topic = Some(id);
                    println!("current topic: {} ({})", topic.name, id);
                }
                None => println!("no such topic: {id}"),
            }
        }

        Command::History(arg) => {
            let Some(id) = arg.or(*current_topic) else {
                println!("no topic set — /t <id> first");
                return Ok(());
            };
            for message in session.get_topic_messages(id).await? {
                println!("{}", render::history_entry(&message));
            }
        }

        Command::MarkRead(None) => {
            session.mark_all_read().await?;
            println!("marked everything read");
        }

        Command::MarkRead(Some(group_id)) => {
            session.mark_group_read(group_id).await?;
            println!("marked group {group_id} read");
        }

        Command::Say(text) => {
            let Some(id) = *current_topic else {
                println!("no topic set — /t <id> first");
                return Ok(());
            };
            session.send_message(id, &text).await?;
        }
    }
    Ok(())
}

/// Descending by timestamp; entries without one sink to the bottom.
fn latest_first(a: Option<f64>, b: Option<f64>) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Renders incoming chat messages without clobbering the pending input
/// line. Holds only a weak session handle — the session owns the listener
/// list, so a strong one would be a cycle.
struct RenderListener {
    session: Weak<Session>,
    username: Option<String>,
    notify: bool,
}

#[async_trait]
impl UpdateListener for RenderListener {
    async fn on_update(&self, message: &LiveMessage) -> anyhow::Result<()> {
        if message.kind != EventKind::Message {
            return Ok(());
        }
        // don't echo our own messages back
        let author = message.user.as_ref().map(|u| u.username.as_str());
        if author.is_some() && author == self.username.as_deref() {
            return Ok(());
        }
        let Some(session) = self.session.upgrade() else {
            return Ok(());
        };

        // the cache listener ran first, so the group is normally cached
        let slug = match message.group_id {
            Some(group_id) => session
                .get_groups(false)
                .await
                .ok()
                .and_then(|groups| groups.get(&group_id).map(|g| g.slug.clone())),
            None => None,
        };
        interrupt(&render::live_entry(message, slug.as_deref()), self.notify);
        Ok(())
    }
}

fn prompt() {
    let mut out = std::io::stdout().lock();
    let _ = write!(out, "{PROMPT}");
    let _ = out.flush();
}

/// Wipe the pending prompt line, print the text, put the prompt back.
fn interrupt(text: &str, bell: bool) {
    let mut out = std::io::stdout().lock();
    let _ = write!(out, "\r\x1b[K{text}\n");
    if bell {
        let _ = write!(out, "\x07");
    }
    let _ = write!(out, "{PROMPT}");
    let _ = out.flush();
}
