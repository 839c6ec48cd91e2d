//! Client core for the Convore group-chat API.
//!
//! `Session` is the facade the console talks to: it owns the group/topic
//! cache, a command-path transport, and the background `LiveFeed` long-poll
//! task. All shared state sits behind one mutex so foreground commands and
//! the live-update path never observe half-applied cache updates.

pub mod config;
pub mod error;
pub mod live;
pub mod session;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ClientConfig, Credentials};
pub use error::NetworkError;
pub use live::UpdateListener;
pub use session::Session;
