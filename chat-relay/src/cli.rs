use std::net::{IpAddr, Ipv4Addr};

use clap::{Args, Parser, Subcommand};

use crate::{client::DEFAULT_HOST, relay::DEFAULT_PORT};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the relay and its operator console.
    Server(ServerArgs),
    /// Run a chat client console.
    Client(ClientArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// Port to listen on. Use 0 for an ephemeral port.
    #[arg(default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Interface address the relay binds to.
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,
}

#[derive(Args, Debug, Clone)]
pub struct ClientArgs {
    /// Login ID announced to the relay.
    #[arg(value_parser = parse_login_id)]
    pub login_id: String,

    /// Host running the relay.
    #[arg(default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port the relay listens on.
    #[arg(default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Log in right away instead of waiting for '#login'.
    #[arg(long)]
    pub connect: bool,
}

// The id travels as the single argument of '#login', so it must be one token.
fn parse_login_id(value: &str) -> Result<String, String> {
    if value.is_empty() {
        return Err("login ID must not be empty".into());
    }
    if value.chars().any(char::is_whitespace) {
        return Err(format!("login ID '{value}' must not contain whitespace"));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_defaults() {
        let cli = Cli::try_parse_from(["chat-relay", "client", "alice"]).expect("parse");
        let Command::Client(args) = cli.command else {
            panic!("expected client command");
        };
        assert_eq!(args.login_id, "alice");
        assert_eq!(args.host, "localhost");
        assert_eq!(args.port, 5555);
        assert!(!args.connect);
    }

    #[test]
    fn client_requires_login_id() {
        assert!(Cli::try_parse_from(["chat-relay", "client"]).is_err());
    }

    #[test]
    fn client_login_id_must_be_one_word() {
        assert!(Cli::try_parse_from(["chat-relay", "client", ""]).is_err());
        assert!(Cli::try_parse_from(["chat-relay", "client", "alice smith"]).is_err());
        assert!(Cli::try_parse_from(["chat-relay", "client", "alice\t"]).is_err());
    }

    #[test]
    fn client_rejects_non_numeric_port() {
        assert!(Cli::try_parse_from(["chat-relay", "client", "alice", "localhost", "abc"]).is_err());
    }

    #[test]
    fn server_port_is_optional() {
        let cli = Cli::try_parse_from(["chat-relay", "server"]).expect("parse");
        let Command::Server(args) = cli.command else {
            panic!("expected server command");
        };
        assert_eq!(args.port, 5555);

        let cli = Cli::try_parse_from(["chat-relay", "server", "6000", "--bind", "127.0.0.1"])
            .expect("parse");
        let Command::Server(args) = cli.command else {
            panic!("expected server command");
        };
        assert_eq!(args.port, 6000);
        assert_eq!(args.bind, IpAddr::V4(Ipv4Addr::LOCALHOST));
    }
}
