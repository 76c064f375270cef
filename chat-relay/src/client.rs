use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    command::ClientCommand,
    connection::write_line,
    console::{Console, Flow, Interpreter},
    error::TransportError,
    guard::{self, HOST_SETTING, PORT_SETTING},
};

pub const DEFAULT_HOST: &str = "localhost";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub login_id: String,
    pub host: String,
    pub port: u16,
}

/// Client side of the chat: where to connect, who we are, and the link to the
/// server while connected.
pub struct ClientSession {
    config: ClientConfig,
    link: Option<ServerLink>,
    console: Console,
}

impl ClientSession {
    pub fn new(config: ClientConfig, console: Console) -> Self {
        Self {
            config,
            link: None,
            console,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Whether a link to the server is open. A link the server closed is
    /// dropped here.
    pub fn is_connected(&mut self) -> bool {
        if self.link.as_ref().is_some_and(|link| !link.is_open()) {
            debug!("server link closed remotely");
            self.link = None;
        }
        self.link.is_some()
    }

    /// Tries to log in with the configured identity, as the client does on
    /// startup when asked to.
    pub async fn connect_at_startup(&mut self) {
        if let Err(err) = self.open_link().await {
            warn!(error = ?err, "initial connection failed");
            self.console
                .display("Cannot open connection. Awaiting command.");
        }
    }

    pub async fn dispatch(&mut self, command: ClientCommand) -> Flow {
        match command {
            ClientCommand::Login { login_id } => self.login(login_id).await,
            ClientCommand::Logoff => self.logoff().await,
            ClientCommand::Quit => {
                self.quit().await;
                return Flow::Quit;
            }
            ClientCommand::SetHost { host } => {
                match guard::client_idle(self.is_connected(), HOST_SETTING) {
                    Ok(()) => {
                        self.console
                            .display(format!("Done! Your host name is now set to '{host}'"));
                        self.config.host = host;
                    }
                    Err(violation) => self.console.display(violation.to_string()),
                }
            }
            ClientCommand::SetPort { port } => {
                match guard::client_idle(self.is_connected(), PORT_SETTING) {
                    Ok(()) => {
                        self.config.port = port;
                        self.console
                            .display(format!("Done! Your port is now set to {port}"));
                    }
                    Err(violation) => self.console.display(violation.to_string()),
                }
            }
            ClientCommand::GetHost => {
                let host = &self.config.host;
                self.console
                    .display(format!("Your current hostname is '{host}'."));
            }
            ClientCommand::GetPort => {
                let port = self.config.port;
                self.console.display(format!("Your current port is {port}."));
            }
            ClientCommand::Chat { text } => self.chat(&text).await,
        }
        Flow::Continue
    }

    async fn login(&mut self, login_id: Option<String>) {
        if self.is_connected() {
            self.console
                .display("You are already logged in. You can't login again.");
            return;
        }
        if let Some(login_id) = login_id {
            self.config.login_id = login_id;
        }
        if let Err(err) = self.open_link().await {
            warn!(error = ?err, "login failed");
            self.console.display("The server could not be reached.");
        }
    }

    async fn open_link(&mut self) -> Result<(), TransportError> {
        let ClientConfig {
            login_id,
            host,
            port,
        } = &self.config;
        let mut link = ServerLink::open(host, *port, self.console.clone()).await?;
        link.send(&format!("#login {login_id}")).await?;

        info!(%host, port, %login_id, "connected to server");
        self.console
            .display(format!("Connected to {host}:{port} as {login_id}."));
        self.link = Some(link);
        Ok(())
    }

    async fn logoff(&mut self) {
        let Some(mut link) = self.link.take() else {
            debug!("logoff without a connection");
            return;
        };
        if let Err(err) = link.send("#logoff").await {
            debug!(error = ?err, "could not notify server of logoff");
        }
        match link.close().await {
            Ok(()) => self.console.display("You have logged off."),
            Err(err) => {
                warn!(error = ?err, "failed to close connection");
                self.console.display("The connection could not be closed.");
            }
        }
    }

    async fn quit(&mut self) {
        let Some(mut link) = self.link.take() else {
            return;
        };
        if let Err(err) = link.send("#quit").await {
            debug!(error = ?err, "could not notify server of quit");
        }
        if let Err(err) = link.close().await {
            debug!(error = ?err, "failed to close connection on quit");
        }
    }

    async fn chat(&mut self, text: &str) {
        if !self.is_connected() {
            self.console.display(
                "You are not connected to the server. \
                 Enter '#login <loginID>', or '#login' to reuse your current login ID.",
            );
            return;
        }
        if let Some(link) = self.link.as_mut() {
            if let Err(err) = link.send(text).await {
                warn!(error = ?err, "failed to send chat message");
                self.console
                    .display("Could not send the message to the server.");
            }
        }
    }
}

impl Interpreter for ClientSession {
    async fn execute(&mut self, line: &str) -> Flow {
        match ClientCommand::parse(line) {
            Ok(Some(command)) => self.dispatch(command).await,
            Ok(None) => Flow::Continue,
            Err(err) => {
                self.console.display(err.to_string());
                Flow::Continue
            }
        }
    }
}

/// An open TCP link to the relay. Incoming lines are shown on the console by a
/// background task.
struct ServerLink {
    writer: OwnedWriteHalf,
    reader: JoinHandle<()>,
}

impl ServerLink {
    async fn open(host: &str, port: u16, console: Console) -> Result<Self, TransportError> {
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|source| TransportError::Connect {
                addr: format!("{host}:{port}"),
                source,
            })?;
        let (reader, writer) = stream.into_split();
        let reader = tokio::spawn(show_server_lines(BufReader::new(reader), console));
        Ok(Self { writer, reader })
    }

    fn is_open(&self) -> bool {
        !self.reader.is_finished()
    }

    async fn send(&mut self, line: &str) -> Result<(), TransportError> {
        write_line(&mut self.writer, line)
            .await
            .map_err(TransportError::Send)
    }

    async fn close(mut self) -> Result<(), TransportError> {
        self.reader.abort();
        self.writer.shutdown().await.map_err(TransportError::Close)
    }
}

async fn show_server_lines(reader: BufReader<OwnedReadHalf>, console: Console) {
    let mut lines = reader.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => console.display(line),
            Ok(None) => break,
            Err(err) => {
                warn!(error = ?err, "lost connection to server");
                break;
            }
        }
    }
    console.display("The server has closed the connection.");
}
