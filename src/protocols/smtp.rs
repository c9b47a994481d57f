//! SMTP variant: envelope construction and message capture.

use tracing::info;

use crate::command::Command;
use crate::protocols::{Outcome, ProtocolMachine, SideEffect};

/// Envelope progress for one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpState {
    Init,
    Greeted,
    MailFrom,
    RcptTo,
    /// Bytes are routed to the payload accumulator; command dispatch is
    /// unreachable here by construction.
    DataCapture,
}

/// The envelope under construction. The accumulating body lives in the
/// session's payload buffer, not here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailEnvelope {
    pub sender: Option<String>,
    pub recipients: Vec<String>,
}

impl MailEnvelope {
    pub fn clear(&mut self) {
        self.sender = None;
        self.recipients.clear();
    }
}

/// The (state, verb) transition table.
///
/// Sequence is checked before argument syntax, so `MAIL` in the wrong
/// state answers 503 even with a malformed argument.
pub fn apply(
    state: SmtpState,
    envelope: &mut MailEnvelope,
    command: &Command,
) -> (SmtpState, Outcome) {
    use SmtpState::*;

    match (state, command.verb.as_str()) {
        (DataCapture, _) => (DataCapture, Outcome::reply(503, "Bad sequence of commands")),

        (Init | Greeted, "HELO" | "EHLO") => {
            let peer = if command.arg.is_empty() {
                "Client"
            } else {
                command.arg.as_str()
            };
            (
                Greeted,
                Outcome::reply(250, format!("Hello {peer}, pleased to meet you")),
            )
        }
        (state @ (MailFrom | RcptTo), "HELO" | "EHLO") => {
            (state, Outcome::reply(503, "Bad sequence of commands"))
        }

        (Greeted, "MAIL") => match strip_prefix_ci(&command.arg, "FROM:") {
            Some(path) => {
                envelope.sender = Some(path.trim().to_string());
                (MailFrom, Outcome::reply(250, "OK"))
            }
            None => (
                Greeted,
                Outcome::reply(501, "Syntax error in parameters or arguments"),
            ),
        },
        (state, "MAIL") => (state, Outcome::reply(503, "Bad sequence of commands")),

        (state @ (MailFrom | RcptTo), "RCPT") => match strip_prefix_ci(&command.arg, "TO:") {
            Some(path) => {
                envelope.recipients.push(path.trim().to_string());
                (RcptTo, Outcome::reply(250, "OK"))
            }
            None => (
                state,
                Outcome::reply(501, "Syntax error in parameters or arguments"),
            ),
        },
        (state, "RCPT") => (state, Outcome::reply(503, "Bad sequence of commands")),

        (RcptTo, "DATA") => (
            DataCapture,
            Outcome::with_effect(
                354,
                "End data with <CR><LF>.<CR><LF>",
                SideEffect::EnterPayloadMode,
            ),
        ),
        (state, "DATA") => (state, Outcome::reply(503, "Bad sequence of commands")),

        (state, "RSET") => {
            envelope.clear();
            let next = if state == Init { Init } else { Greeted };
            (next, Outcome::reply(250, "OK"))
        }

        (state, "NOOP") => (state, Outcome::reply(250, "OK")),

        (state, "QUIT") => (
            state,
            Outcome::with_effect(221, "Bye", SideEffect::CloseConnection),
        ),

        (state, "") => (state, Outcome::reply(500, "Syntax error.")),
        (state, _) => (state, Outcome::reply(502, "Command not implemented")),
    }
}

/// Case-insensitive prefix strip for `FROM:`/`TO:` arguments.
fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &s[prefix.len()..])
}

/// Per-connection SMTP machine: owned state, owned envelope, banner.
pub struct SmtpMachine {
    state: SmtpState,
    envelope: MailEnvelope,
    banner: String,
}

impl SmtpMachine {
    pub fn new(banner: String) -> Self {
        SmtpMachine {
            state: SmtpState::Init,
            envelope: MailEnvelope::default(),
            banner,
        }
    }
}

impl ProtocolMachine for SmtpMachine {
    fn greeting(&self) -> Outcome {
        Outcome::reply(220, self.banner.clone())
    }

    fn on_command(&mut self, command: &Command) -> Outcome {
        let (next, outcome) = apply(self.state, &mut self.envelope, command);
        self.state = next;
        outcome
    }

    fn on_payload(&mut self, payload: &[u8]) -> Outcome {
        info!(
            sender = %self.envelope.sender.as_deref().unwrap_or(""),
            recipients = %self.envelope.recipients.join(", "),
            bytes = payload.len(),
            "Message accepted"
        );

        // Back to Greeted so a second envelope can follow on the same
        // connection.
        self.envelope.clear();
        self.state = SmtpState::Greeted;
        Outcome::with_effect(
            250,
            "OK: Message accepted for delivery",
            SideEffect::ExitPayloadMode,
        )
    }
}
