use std::{
    collections::HashMap,
    io,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, BufReader},
    net::{TcpListener, TcpStream, tcp::OwnedReadHalf},
    select,
    sync::{Mutex, Notify, mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    command::ClientRequest,
    connection::{
        ConnectionHandle, ConnectionId, ConnectionMetadata, LOGIN_ID_KEY, run_writer,
    },
    console::{Console, Flow},
    error::{PreconditionViolation, TransportError},
    guard,
};

pub const DEFAULT_PORT: u16 = 5555;

pub const SHUTDOWN_WARNING: [&str; 2] = [
    "WARNING - The server has stopped listening for connections",
    "SERVER SHUTTING DOWN! DISCONNECTING!",
];

#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    pub bind: IpAddr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
        }
    }
}

/// Handle to the running relay. Cheap to clone; all clones share one state.
#[derive(Clone)]
pub struct Relay {
    state: Arc<RelayState>,
}

impl Relay {
    pub fn new(config: ServerConfig, console: Console) -> Self {
        Self {
            state: Arc::new(RelayState::new(config, console)),
        }
    }

    /// Binds the configured port and starts accepting connections.
    pub async fn start(&self) -> Result<SocketAddr, TransportError> {
        let mut listener_state = self.state.listener.lock().await;
        if listener_state.active.is_some() {
            return Err(TransportError::AlreadyListening);
        }

        let port = listener_state.port;
        let bind_error = |source| TransportError::Bind { port, source };
        let listener = TcpListener::bind((self.state.bind, port))
            .await
            .map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        let (shutdown, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(accept_loop(listener, Arc::clone(&self.state), shutdown_rx));
        listener_state.active = Some(ActiveListener {
            local_addr,
            shutdown,
            task,
        });

        info!(%local_addr, "relay listening");
        self.state.console.display(format!(
            "Server listening for connections on port {}",
            local_addr.port()
        ));
        Ok(local_addr)
    }

    /// Stops accepting new connections. Existing connections stay open.
    /// Returns `false` if the relay was not listening.
    pub async fn stop(&self) -> bool {
        let mut listener_state = self.state.listener.lock().await;
        let Some(active) = listener_state.active.take() else {
            return false;
        };

        let _ = active.shutdown.send(());
        if let Err(err) = active.task.await {
            warn!(error = ?err, "accept loop ended abnormally");
        }

        info!(local_addr = %active.local_addr, "relay stopped listening");
        self.state
            .console
            .display("Server has stopped listening for connections.");
        true
    }

    /// Stops listening, warns every client and disconnects them all.
    pub async fn close(&self) {
        self.stop().await;
        for line in SHUTDOWN_WARNING {
            self.state.broadcast(line).await;
        }
        self.state.disconnect_all().await;
    }

    pub async fn is_listening(&self) -> bool {
        self.state.listener.lock().await.active.is_some()
    }

    /// The port in use while listening, otherwise the configured port.
    pub async fn port(&self) -> u16 {
        let listener_state = self.state.listener.lock().await;
        match &listener_state.active {
            Some(active) => active.local_addr.port(),
            None => listener_state.port,
        }
    }

    pub async fn local_addr(&self) -> Option<SocketAddr> {
        let listener_state = self.state.listener.lock().await;
        listener_state.active.as_ref().map(|active| active.local_addr)
    }

    pub async fn set_port(&self, port: u16) -> Result<(), PreconditionViolation> {
        let mut listener_state = self.state.listener.lock().await;
        let clients = self.state.connections.lock().await.len();
        guard::server_idle(listener_state.active.is_some(), clients)?;
        listener_state.port = port;
        Ok(())
    }

    pub async fn client_count(&self) -> usize {
        self.state.connections.lock().await.len()
    }

    pub async fn broadcast(&self, line: &str) {
        self.state.broadcast(line).await;
    }
}

struct RelayState {
    console: Console,
    bind: IpAddr,
    listener: Mutex<ListenerState>,
    connections: Mutex<HashMap<ConnectionId, ConnectionHandle>>,
    next_id: AtomicU64,
}

struct ListenerState {
    port: u16,
    active: Option<ActiveListener>,
}

struct ActiveListener {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl RelayState {
    fn new(config: ServerConfig, console: Console) -> Self {
        Self {
            console,
            bind: config.bind,
            listener: Mutex::new(ListenerState {
                port: config.port,
                active: None,
            }),
            connections: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    async fn register(&self, handle: ConnectionHandle) -> ConnectionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.connections.lock().await.insert(id, handle);
        id
    }

    async fn unregister(&self, id: ConnectionId) -> Option<ConnectionHandle> {
        self.connections.lock().await.remove(&id)
    }

    // Sends happen under the registry lock, so every recipient sees
    // broadcasts in the order they were issued.
    async fn broadcast(&self, line: &str) {
        let connections = self.connections.lock().await;
        for handle in connections.values() {
            handle.send(line);
        }
    }

    async fn broadcast_except(&self, sender: ConnectionId, line: &str) {
        let connections = self.connections.lock().await;
        for (_, handle) in connections.iter().filter(|(id, _)| **id != sender) {
            handle.send(line);
        }
    }

    async fn disconnect_all(&self) {
        let mut connections = self.connections.lock().await;
        for (id, handle) in connections.drain() {
            debug!(id, peer = ?handle.peer(), "forcing disconnect");
            handle.close();
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    state: Arc<RelayState>,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => admit_connection(stream, peer, &state).await,
                    Err(err) => warn!(error = ?err, "failed to accept connection"),
                }
            }
        }
    }
    debug!("accept loop finished");
}

// Registers the connection before its reader task exists, so once the accept
// loop has been joined every accepted connection is in the registry.
async fn admit_connection(stream: TcpStream, peer: SocketAddr, state: &Arc<RelayState>) {
    let (reader, writer) = stream.into_split();
    let (outbox, outbox_rx) = mpsc::unbounded_channel();
    tokio::spawn(run_writer(writer, outbox_rx));

    let handle = ConnectionHandle::new(Some(peer), outbox, Arc::new(Notify::new()));
    let session = ConnectionSession::open(handle, Arc::clone(state)).await;
    tokio::spawn(serve_connection(session, BufReader::new(reader)));
}

async fn serve_connection(mut session: ConnectionSession, reader: BufReader<OwnedReadHalf>) {
    if let Err(err) = session.read_until_closed(reader).await {
        warn!(peer = ?session.handle.peer(), error = ?err, "client connection failed");
    }
    session.finish().await;
}

/// Relay-side protocol state of one connection.
struct ConnectionSession {
    id: ConnectionId,
    handle: ConnectionHandle,
    metadata: ConnectionMetadata,
    state: Arc<RelayState>,
}

impl ConnectionSession {
    async fn open(handle: ConnectionHandle, state: Arc<RelayState>) -> Self {
        let id = state.register(handle.clone()).await;
        info!(id, peer = ?handle.peer(), "client connected");
        state
            .console
            .display("A new client is attempting to connect to the server.");
        Self {
            id,
            handle,
            metadata: ConnectionMetadata::default(),
            state,
        }
    }

    async fn read_until_closed<R>(&mut self, reader: R) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let handle = self.handle.clone();
        let mut lines = reader.lines();
        loop {
            select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        return Ok(());
                    };
                    if self.on_message(&line).await == Flow::Quit {
                        return Ok(());
                    }
                }
                _ = handle.closed().notified() => return Ok(()),
            }
        }
    }

    async fn on_message(&mut self, line: &str) -> Flow {
        let Some(request) = ClientRequest::parse(line) else {
            return Flow::Continue;
        };
        debug!(
            id = self.id,
            login_id = self.metadata.login_id().unwrap_or("<unidentified>"),
            line,
            "message received"
        );

        let Some(login_id) = self.metadata.login_id().map(str::to_string) else {
            return self.on_handshake(request).await;
        };

        match request {
            ClientRequest::Login { .. } => self.reject(
                "The '#login' command is only valid at handshake time. Terminating connection.",
            ),
            ClientRequest::Logoff | ClientRequest::Quit => {
                self.state
                    .broadcast(&format!("{login_id} has disconnected."))
                    .await;
                Flow::Quit
            }
            ClientRequest::Chat { text } => {
                self.state.broadcast(&format!("{login_id}: {text}")).await;
                Flow::Continue
            }
        }
    }

    async fn on_handshake(&mut self, request: ClientRequest) -> Flow {
        match request {
            ClientRequest::Login {
                login_id: Some(login_id),
            } => {
                self.metadata.set_info(LOGIN_ID_KEY, login_id.as_str());
                info!(id = self.id, %login_id, "client logged on");
                let notice = format!("{login_id} has logged on.");
                self.state.console.display(notice.as_str());
                self.state.broadcast_except(self.id, &notice).await;
                Flow::Continue
            }
            ClientRequest::Login { login_id: None } => {
                self.reject("No login ID was provided. Terminating connection.")
            }
            ClientRequest::Logoff | ClientRequest::Quit | ClientRequest::Chat { .. } => self.reject(
                "You must log in with '#login <loginID>' before sending anything else. \
                 Terminating connection.",
            ),
        }
    }

    fn reject(&self, reason: &str) -> Flow {
        debug!(id = self.id, reason, "closing connection");
        self.handle.send(reason);
        self.handle.close();
        Flow::Quit
    }

    async fn finish(self) {
        self.handle.close();
        self.state.unregister(self.id).await;
        match self.metadata.login_id() {
            Some(login_id) => {
                info!(id = self.id, %login_id, "client disconnected");
                self.state
                    .console
                    .display(format!("{login_id} has disconnected."));
            }
            None => {
                info!(id = self.id, "unidentified client disconnected");
                self.state
                    .console
                    .display("An unidentified client has disconnected.");
            }
        }
    }
}
