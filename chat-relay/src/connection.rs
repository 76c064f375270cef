use std::{collections::HashMap, io, net::SocketAddr, sync::Arc};

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::{Notify, mpsc},
};
use tracing::debug;

pub type ConnectionId = u64;

pub const LOGIN_ID_KEY: &str = "loginID";

/// Key/value information attached to one connection.
///
/// Only the task reading a connection touches its metadata, so no lock is
/// needed here.
#[derive(Debug, Default, Clone)]
pub struct ConnectionMetadata {
    info: HashMap<String, String>,
}

impl ConnectionMetadata {
    pub fn get_info(&self, key: &str) -> Option<&str> {
        self.info.get(key).map(String::as_str)
    }

    pub fn set_info(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.info.insert(key.into(), value.into());
    }

    pub fn login_id(&self) -> Option<&str> {
        self.get_info(LOGIN_ID_KEY)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Line(String),
    Close,
}

/// Sending side of one connection, shared between its reader task and the
/// relay registry.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    peer: Option<SocketAddr>,
    outbox: mpsc::UnboundedSender<Outbound>,
    closed: Arc<Notify>,
}

impl ConnectionHandle {
    pub fn new(
        peer: Option<SocketAddr>,
        outbox: mpsc::UnboundedSender<Outbound>,
        closed: Arc<Notify>,
    ) -> Self {
        Self {
            peer,
            outbox,
            closed,
        }
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Queues a line for the writer task. Lines are written in queue order.
    pub fn send(&self, line: impl Into<String>) -> bool {
        if self.outbox.send(Outbound::Line(line.into())).is_err() {
            debug!(peer = ?self.peer, "connection writer already gone");
            return false;
        }
        true
    }

    /// Flushes queued lines, then closes the socket and wakes the reader task.
    pub fn close(&self) {
        let _ = self.outbox.send(Outbound::Close);
        self.closed.notify_one();
    }

    pub(crate) fn closed(&self) -> &Notify {
        &self.closed
    }
}

pub async fn write_line<W>(writer: &mut W, line: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

/// Drains a connection's outbox until it is closed or the peer goes away.
pub async fn run_writer<W>(mut writer: W, mut outbox: mpsc::UnboundedReceiver<Outbound>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = outbox.recv().await {
        match message {
            Outbound::Line(line) => {
                if let Err(err) = write_line(&mut writer, &line).await {
                    debug!(?err, "failed to deliver line to client");
                    break;
                }
            }
            Outbound::Close => break,
        }
    }

    if let Err(err) = writer.shutdown().await {
        debug!(?err, "failed to shut down connection writer");
    }
}
