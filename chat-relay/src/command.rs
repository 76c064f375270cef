//! Console and wire line parsing.
//!
//! Every line, whether typed at a console or received from a client, goes
//! through [`classify`] first: a `#` prefix marks a directive whose first token
//! (lowercased) names it and whose second token is its argument; anything else
//! is chat payload carried verbatim. Each side then maps directive names onto
//! its own closed enum:
//!
//! - [`ClientCommand`] for the client console
//! - [`AdminCommand`] for the server operator console
//! - [`ClientRequest`] for lines the relay receives from a connection

use crate::error::CommandError;

const LINE_ENDINGS: &[char] = &['\n', '\r'];

/// A line split into directive or payload.
#[derive(Debug, PartialEq, Eq)]
pub enum Line<'a> {
    Empty,
    Payload(&'a str),
    Directive {
        name: String,
        argument: Option<&'a str>,
    },
}

pub fn classify(line: &str) -> Line<'_> {
    let line = line.trim_end_matches(LINE_ENDINGS);
    if line.trim().is_empty() {
        return Line::Empty;
    }
    if !line.starts_with('#') {
        return Line::Payload(line);
    }

    let mut tokens = line.split_whitespace();
    let name = tokens.next().unwrap_or_default().to_lowercase();
    Line::Directive {
        name,
        argument: tokens.next(),
    }
}

/// Commands accepted by the client console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    Login { login_id: Option<String> },
    Logoff,
    Quit,
    SetHost { host: String },
    SetPort { port: u16 },
    GetHost,
    GetPort,
    Chat { text: String },
}

impl ClientCommand {
    /// Parses one console line. Returns `Ok(None)` for blank input.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let (name, argument) = match classify(line) {
            Line::Empty => return Ok(None),
            Line::Payload(text) => {
                return Ok(Some(ClientCommand::Chat {
                    text: text.to_string(),
                }));
            }
            Line::Directive { name, argument } => (name, argument),
        };

        let command = match name.as_str() {
            "#login" => ClientCommand::Login {
                login_id: argument.map(str::to_string),
            },
            "#logoff" => ClientCommand::Logoff,
            "#quit" => ClientCommand::Quit,
            "#sethost" => ClientCommand::SetHost {
                host: require(argument, "host name", "#sethost <host>")?.to_string(),
            },
            "#setport" => ClientCommand::SetPort {
                port: parse_port(argument)?,
            },
            "#gethost" => ClientCommand::GetHost,
            "#getport" => ClientCommand::GetPort,
            _ => return Err(unknown(line)),
        };
        Ok(Some(command))
    }
}

/// Commands accepted by the server operator console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    Quit,
    Stop,
    Close,
    Start,
    SetPort { port: u16 },
    GetPort,
    Broadcast { text: String },
}

impl AdminCommand {
    /// Parses one console line. Returns `Ok(None)` for blank input.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let (name, argument) = match classify(line) {
            Line::Empty => return Ok(None),
            Line::Payload(text) => {
                return Ok(Some(AdminCommand::Broadcast {
                    text: text.to_string(),
                }));
            }
            Line::Directive { name, argument } => (name, argument),
        };

        let command = match name.as_str() {
            "#quit" => AdminCommand::Quit,
            "#stop" => AdminCommand::Stop,
            "#close" => AdminCommand::Close,
            "#start" => AdminCommand::Start,
            "#setport" => AdminCommand::SetPort {
                port: parse_port(argument)?,
            },
            "#getport" => AdminCommand::GetPort,
            _ => return Err(unknown(line)),
        };
        Ok(Some(command))
    }
}

/// Lines the relay receives from a client connection.
///
/// Unlike the consoles, the relay never rejects a directive name: anything it
/// does not route is chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientRequest {
    Login { login_id: Option<String> },
    Logoff,
    Quit,
    Chat { text: String },
}

impl ClientRequest {
    pub fn parse(line: &str) -> Option<Self> {
        let request = match classify(line) {
            Line::Empty => return None,
            Line::Directive { name, argument } if name == "#login" => ClientRequest::Login {
                login_id: argument.map(str::to_string),
            },
            Line::Directive { name, .. } if name == "#logoff" => ClientRequest::Logoff,
            Line::Directive { name, .. } if name == "#quit" => ClientRequest::Quit,
            Line::Directive { .. } | Line::Payload(_) => ClientRequest::Chat {
                text: line.trim_end_matches(LINE_ENDINGS).to_string(),
            },
        };
        Some(request)
    }
}

fn require<'a>(
    argument: Option<&'a str>,
    what: &'static str,
    usage: &'static str,
) -> Result<&'a str, CommandError> {
    argument.ok_or(CommandError::MissingArgument { what, usage })
}

fn parse_port(argument: Option<&str>) -> Result<u16, CommandError> {
    let value = require(argument, "port", "#setport <port>")?;
    value.parse().map_err(|_| CommandError::NotANumber {
        value: value.to_string(),
    })
}

fn unknown(line: &str) -> CommandError {
    CommandError::UnknownDirective {
        line: line.trim_end_matches(LINE_ENDINGS).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_splits_directive_and_argument() {
        assert_eq!(classify(""), Line::Empty);
        assert_eq!(classify("   \r\n"), Line::Empty);
        assert_eq!(classify("hello there\n"), Line::Payload("hello there"));
        assert_eq!(
            classify("#LOGIN  alice  extra"),
            Line::Directive {
                name: "#login".into(),
                argument: Some("alice"),
            }
        );
        assert_eq!(
            classify("#logoff"),
            Line::Directive {
                name: "#logoff".into(),
                argument: None,
            }
        );
    }

    #[test]
    fn client_commands_parse() {
        assert_eq!(ClientCommand::parse(""), Ok(None));
        assert!(matches!(
            ClientCommand::parse("#login"),
            Ok(Some(ClientCommand::Login { login_id: None }))
        ));
        assert!(matches!(
            ClientCommand::parse("#login bob"),
            Ok(Some(ClientCommand::Login { login_id: Some(id) })) if id == "bob"
        ));
        assert!(matches!(
            ClientCommand::parse("#SetHost example.org"),
            Ok(Some(ClientCommand::SetHost { host })) if host == "example.org"
        ));
        assert_eq!(
            ClientCommand::parse("#setport 6000"),
            Ok(Some(ClientCommand::SetPort { port: 6000 }))
        );
        assert_eq!(ClientCommand::parse("#gethost"), Ok(Some(ClientCommand::GetHost)));
        assert_eq!(ClientCommand::parse("#getport"), Ok(Some(ClientCommand::GetPort)));
        assert_eq!(ClientCommand::parse("#quit"), Ok(Some(ClientCommand::Quit)));
        assert_eq!(ClientCommand::parse("#logoff"), Ok(Some(ClientCommand::Logoff)));
    }

    #[test]
    fn chat_payload_is_kept_verbatim() {
        assert_eq!(
            ClientCommand::parse("  hi   there  \n"),
            Ok(Some(ClientCommand::Chat {
                text: "  hi   there  ".into()
            }))
        );
    }

    #[test]
    fn missing_port_and_bad_port_are_distinct() {
        let missing = ClientCommand::parse("#setport").unwrap_err();
        let not_a_number = ClientCommand::parse("#setport notanumber").unwrap_err();

        assert!(matches!(missing, CommandError::MissingArgument { what: "port", .. }));
        assert_eq!(
            not_a_number,
            CommandError::NotANumber {
                value: "notanumber".into()
            }
        );
        assert_ne!(missing.to_string(), not_a_number.to_string());
    }

    #[test]
    fn out_of_range_port_is_rejected() {
        assert!(matches!(
            AdminCommand::parse("#setport 70000"),
            Err(CommandError::NotANumber { .. })
        ));
    }

    #[test]
    fn missing_host_is_reported() {
        assert!(matches!(
            ClientCommand::parse("#sethost"),
            Err(CommandError::MissingArgument {
                what: "host name",
                ..
            })
        ));
    }

    #[test]
    fn unknown_directive_echoes_line() {
        let err = ClientCommand::parse("#dance now").unwrap_err();
        assert_eq!(err.to_string(), "'#dance now' doesn't match any commands.");
        // Server-only vocabulary is unknown on the client side.
        assert!(ClientCommand::parse("#start").is_err());
        // And client-only vocabulary is unknown to the operator.
        assert!(AdminCommand::parse("#sethost localhost").is_err());
    }

    #[test]
    fn admin_commands_parse() {
        assert_eq!(AdminCommand::parse("\n"), Ok(None));
        assert_eq!(AdminCommand::parse("#stop"), Ok(Some(AdminCommand::Stop)));
        assert_eq!(AdminCommand::parse("#CLOSE"), Ok(Some(AdminCommand::Close)));
        assert_eq!(AdminCommand::parse("#start"), Ok(Some(AdminCommand::Start)));
        assert_eq!(AdminCommand::parse("#getport"), Ok(Some(AdminCommand::GetPort)));
        assert_eq!(AdminCommand::parse("#quit"), Ok(Some(AdminCommand::Quit)));
        assert_eq!(
            AdminCommand::parse("#setport 7000"),
            Ok(Some(AdminCommand::SetPort { port: 7000 }))
        );
        assert_eq!(
            AdminCommand::parse("maintenance at noon"),
            Ok(Some(AdminCommand::Broadcast {
                text: "maintenance at noon".into()
            }))
        );
    }

    #[test]
    fn relay_routes_unknown_directives_as_chat() {
        assert_eq!(ClientRequest::parse(""), None);
        assert_eq!(
            ClientRequest::parse("#login alice\r\n"),
            Some(ClientRequest::Login {
                login_id: Some("alice".into())
            })
        );
        assert_eq!(
            ClientRequest::parse("#login"),
            Some(ClientRequest::Login { login_id: None })
        );
        assert_eq!(ClientRequest::parse("#quit"), Some(ClientRequest::Quit));
        assert_eq!(ClientRequest::parse("#Logoff"), Some(ClientRequest::Logoff));
        assert_eq!(
            ClientRequest::parse("#wave hi"),
            Some(ClientRequest::Chat {
                text: "#wave hi".into()
            })
        );
    }
}
