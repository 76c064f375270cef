use std::io;

use thiserror::Error;

/// A console line that could not be turned into a directive.
///
/// The `Display` text is shown to the operator as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Make sure to also include your desired {what} at the end of your command: {usage}")]
    MissingArgument {
        what: &'static str,
        usage: &'static str,
    },
    #[error("'{value}' is not a number. Make sure the port is a number between 0 and 65535.")]
    NotANumber { value: String },
    #[error("'{line}' doesn't match any commands.")]
    UnknownDirective { line: String },
}

/// A reconfiguration directive issued while the guarded resource is busy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PreconditionViolation {
    #[error("Make sure to disconnect using the command '#logoff' before changing your {setting}.")]
    Connected { setting: &'static str },
    #[error(
        "Some clients are still connected to the server and you are still listening for connections. \
         Stop listening for new connections and disconnect all of your clients using the command '#close'."
    )]
    ListeningWithClients,
    #[error(
        "The server is still listening for connections. \
         Stop listening for new connections using the command '#stop'."
    )]
    Listening,
    #[error(
        "Some clients are still connected to the server. \
         Disconnect them all using the command '#close'."
    )]
    ClientsConnected,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("could not connect to {addr}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("could not send message")]
    Send(#[source] io::Error),
    #[error("could not close connection")]
    Close(#[source] io::Error),
    #[error("could not listen on port {port}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },
    #[error("the server is already listening")]
    AlreadyListening,
}
