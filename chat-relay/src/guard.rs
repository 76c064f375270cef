//! Idle checks gating reconfiguration of host and port.
//!
//! Each violated precondition maps to its own [`PreconditionViolation`] so the
//! operator knows which one to fix first.

use crate::error::PreconditionViolation;

pub const HOST_SETTING: &str = "host name";
pub const PORT_SETTING: &str = "port number";

/// A client may only change where it connects while it is disconnected.
pub fn client_idle(connected: bool, setting: &'static str) -> Result<(), PreconditionViolation> {
    if connected {
        return Err(PreconditionViolation::Connected { setting });
    }
    Ok(())
}

/// The server may only change its port while it is neither listening nor
/// serving any client.
pub fn server_idle(listening: bool, clients: usize) -> Result<(), PreconditionViolation> {
    match (listening, clients) {
        (false, 0) => Ok(()),
        (true, 0) => Err(PreconditionViolation::Listening),
        (false, _) => Err(PreconditionViolation::ClientsConnected),
        (true, _) => Err(PreconditionViolation::ListeningWithClients),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_idle_only_when_stopped_and_empty() {
        assert_eq!(server_idle(false, 0), Ok(()));
        assert_eq!(server_idle(true, 0), Err(PreconditionViolation::Listening));
        assert_eq!(
            server_idle(false, 2),
            Err(PreconditionViolation::ClientsConnected)
        );
        assert_eq!(
            server_idle(true, 1),
            Err(PreconditionViolation::ListeningWithClients)
        );
    }

    #[test]
    fn server_diagnostics_are_distinct() {
        let messages = [
            PreconditionViolation::Listening.to_string(),
            PreconditionViolation::ClientsConnected.to_string(),
            PreconditionViolation::ListeningWithClients.to_string(),
        ];
        assert_ne!(messages[0], messages[1]);
        assert_ne!(messages[1], messages[2]);
        assert_ne!(messages[0], messages[2]);
    }

    #[test]
    fn client_idle_names_the_setting() {
        assert_eq!(client_idle(false, HOST_SETTING), Ok(()));
        let err = client_idle(true, PORT_SETTING).unwrap_err();
        assert!(err.to_string().contains("port number"));
    }
}
