//! FTP control-channel variant: USER/PASS login sequence.

use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::CredentialCheck;
use crate::command::Command;
use crate::protocols::{Outcome, ProtocolMachine, SideEffect};

/// Login progress for one control connection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FtpState {
    #[default]
    Unauthenticated,
    /// USER accepted, waiting for PASS.
    AwaitingPassword { user: String },
    Authenticated,
}

/// The (state, verb) transition table.
///
/// Every arm leaves the state unchanged unless the table calls for a
/// transition; a rejected credential clears the pending identity.
pub fn apply(
    state: FtpState,
    command: &Command,
    credentials: &dyn CredentialCheck,
) -> (FtpState, Outcome) {
    use FtpState::*;

    match (state, command.verb.as_str()) {
        (state, "USER") if command.arg.is_empty() => (
            state,
            Outcome::reply(501, "Syntax error in parameters or arguments."),
        ),
        (Unauthenticated | AwaitingPassword { .. }, "USER") => (
            AwaitingPassword {
                user: command.arg.clone(),
            },
            Outcome::reply(331, format!("User {} okay, need password.", command.arg)),
        ),
        (Authenticated, "USER") => (
            Authenticated,
            Outcome::reply(503, "Bad sequence of commands."),
        ),

        (Unauthenticated, "PASS") => (
            Unauthenticated,
            Outcome::reply(503, "Bad sequence of commands (send USER first)."),
        ),
        (AwaitingPassword { user }, "PASS") => {
            if credentials.check(&user, &command.arg) {
                info!(user = %user, "Login accepted");
                (Authenticated, Outcome::reply(230, "User logged in, proceed."))
            } else {
                warn!(user = %user, "Login rejected");
                (Unauthenticated, Outcome::reply(530, "Login incorrect."))
            }
        }
        (Authenticated, "PASS") => (
            Authenticated,
            Outcome::reply(503, "Bad sequence of commands."),
        ),

        (state, "SYST") => (state, Outcome::reply(215, "UNIX Type: L8")),

        (Authenticated, "PWD") => (
            Authenticated,
            Outcome::reply(257, "\"/\" is the current directory"),
        ),
        (state, "PWD") => (state, Outcome::reply(530, "Please login with USER and PASS.")),

        (state, "NOOP") => (state, Outcome::reply(200, "Command okay.")),

        (state, "QUIT") => (
            state,
            Outcome::with_effect(
                221,
                "Service closing control connection.",
                SideEffect::CloseConnection,
            ),
        ),

        (state, "") => (state, Outcome::reply(500, "Syntax error.")),
        (state, _) => (state, Outcome::reply(502, "Command not implemented.")),
    }
}

/// Per-connection FTP machine: owned state plus the shared credential
/// predicate and configurable banner.
pub struct FtpMachine {
    state: FtpState,
    credentials: Arc<dyn CredentialCheck>,
    banner: String,
}

impl FtpMachine {
    pub fn new(credentials: Arc<dyn CredentialCheck>, banner: String) -> Self {
        FtpMachine {
            state: FtpState::Unauthenticated,
            credentials,
            banner,
        }
    }
}

impl ProtocolMachine for FtpMachine {
    fn greeting(&self) -> Outcome {
        Outcome::reply(220, self.banner.clone())
    }

    fn on_command(&mut self, command: &Command) -> Outcome {
        let state = std::mem::take(&mut self.state);
        let (next, outcome) = apply(state, command, self.credentials.as_ref());
        self.state = next;
        outcome
    }

    fn on_payload(&mut self, _payload: &[u8]) -> Outcome {
        // The FTP variant never enters payload mode.
        Outcome::reply(502, "Command not implemented.")
    }
}
