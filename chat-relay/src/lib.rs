//! Console chat relay over TCP.
//!
//! A server relays every line a logged-in client sends to all connected
//! clients. Both sides are driven from a console where `#`-prefixed lines are
//! directives and everything else is chat.
//!
//! - [`cli`] parses the `server` and `client` subcommands.
//! - [`command`] classifies lines and parses each side's directive set.
//! - [`relay`] accepts connections, tracks them, and routes inbound lines.
//! - [`admin`] interprets the operator console on top of a [`relay::Relay`].
//! - [`client`] holds the client session state machine and its server link.
//! - [`connection`] has per-connection metadata and the outbound writer.
//! - [`console`] is the display sink and the shared input loop.
//! - [`guard`] decides when host/port may be reconfigured.
//! - [`error`] collects the error types.

pub mod admin;
pub mod cli;
pub mod client;
pub mod command;
pub mod connection;
pub mod console;
pub mod error;
pub mod guard;
pub mod relay;
