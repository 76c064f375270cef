use tracing::warn;

use crate::{
    command::AdminCommand,
    console::{Console, Flow, Interpreter},
    error::TransportError,
    relay::Relay,
};

/// Operator console bound to one relay.
pub struct AdminConsole {
    relay: Relay,
    console: Console,
}

impl AdminConsole {
    pub fn new(relay: Relay, console: Console) -> Self {
        Self { relay, console }
    }

    pub async fn dispatch(&mut self, command: AdminCommand) -> Flow {
        match command {
            AdminCommand::Quit => return Flow::Quit,
            AdminCommand::Stop => {
                if !self.relay.stop().await {
                    self.console
                        .display("The server is not listening for connections.");
                }
            }
            AdminCommand::Close => self.relay.close().await,
            AdminCommand::Start => self.start().await,
            AdminCommand::SetPort { port } => match self.relay.set_port(port).await {
                Ok(()) => self
                    .console
                    .display(format!("Done! Your port number is now set to {port}")),
                Err(violation) => self.console.display(violation.to_string()),
            },
            AdminCommand::GetPort => {
                let port = self.relay.port().await;
                self.console.display(format!("Your current port is {port}."));
            }
            AdminCommand::Broadcast { text } => {
                self.relay
                    .broadcast(&format!("SERVER MESSAGE > {text}"))
                    .await;
            }
        }
        Flow::Continue
    }

    async fn start(&mut self) {
        match self.relay.start().await {
            Ok(_) => {}
            Err(TransportError::AlreadyListening) => {
                let port = self.relay.port().await;
                self.console.display(format!(
                    "Server already listening for new connections on port {port}"
                ));
            }
            Err(err) => {
                warn!(error = ?err, "failed to start listening");
                self.console.display("ERROR - Could not listen for clients!");
            }
        }
    }
}

impl Interpreter for AdminConsole {
    async fn execute(&mut self, line: &str) -> Flow {
        match AdminCommand::parse(line) {
            Ok(Some(command)) => self.dispatch(command).await,
            Ok(None) => Flow::Continue,
            Err(err) => {
                self.console.display(err.to_string());
                Flow::Continue
            }
        }
    }
}
