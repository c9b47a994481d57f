//! Per-connection session wiring: decode, dispatch, encode.
//!
//! A `Session` owns one connection's buffer, decode mode, and protocol
//! machine, and performs no I/O. The transport feeds it raw bytes and
//! writes back whatever the resulting [`Reaction`] carries.

use tracing::trace;

use crate::command::Command;
use crate::decode::{DecodeMode, Decoded, Decoder};
use crate::protocols::{ProtocolMachine, SideEffect};
use crate::response;

/// What the transport must do after one batch of received bytes:
/// write `output` (possibly several replies, in order), then close if
/// `close` is set.
#[derive(Debug, Default)]
pub struct Reaction {
    pub output: Vec<u8>,
    pub close: bool,
}

/// One connection's session state.
pub struct Session<M> {
    machine: M,
    decoder: Decoder,
}

impl<M: ProtocolMachine> Session<M> {
    pub fn new(machine: M) -> Self {
        Session {
            machine,
            decoder: Decoder::new(),
        }
    }

    /// The greeting to write when the connection opens.
    pub fn greeting(&self) -> Vec<u8> {
        response::encode(&self.machine.greeting())
    }

    /// Bytes buffered waiting for a terminator. The transport applies
    /// its size policy against this; the session itself is uncapped.
    pub fn buffered(&self) -> usize {
        self.decoder.buffered()
    }

    /// Feed newly received bytes and dispatch every complete unit they
    /// finish, strictly in order. Dispatch stops at a closing command;
    /// anything buffered after it is discarded with the connection.
    pub fn receive(&mut self, bytes: &[u8]) -> Reaction {
        self.decoder.feed(bytes);

        let mut reaction = Reaction::default();
        while !reaction.close {
            let outcome = match self.decoder.decode() {
                Some(Decoded::Line(line)) => {
                    let line = String::from_utf8_lossy(&line);
                    let command = Command::parse(&line);
                    trace!(verb = %command.verb, "Dispatching command");
                    self.machine.on_command(&command)
                }
                Some(Decoded::Payload(payload)) => {
                    trace!(bytes = payload.len(), "Dispatching payload");
                    self.machine.on_payload(&payload)
                }
                None => break,
            };

            reaction.output.extend_from_slice(&response::encode(&outcome));
            match outcome.side_effect {
                SideEffect::None => {}
                SideEffect::CloseConnection => reaction.close = true,
                SideEffect::EnterPayloadMode => self.decoder.set_mode(DecodeMode::Payload),
                SideEffect::ExitPayloadMode => self.decoder.set_mode(DecodeMode::Line),
            }
        }
        reaction
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::auth::StaticCredentials;
    use crate::protocols::ftp::FtpMachine;
    use crate::protocols::smtp::SmtpMachine;

    fn ftp_session() -> Session<FtpMachine> {
        let credentials = Arc::new(StaticCredentials::new(
            [("admin".to_string(), "password".to_string())],
            true,
        ));
        Session::new(FtpMachine::new(credentials, "FTP test".to_string()))
    }

    fn smtp_session() -> Session<SmtpMachine> {
        Session::new(SmtpMachine::new("SMTP test".to_string()))
    }

    #[test]
    fn test_greeting() {
        assert_eq!(ftp_session().greeting(), b"220 FTP test\r\n");
    }

    #[test]
    fn test_login_flow() {
        let mut session = ftp_session();

        let reaction = session.receive(b"USER admin\r\n");
        assert_eq!(reaction.output, b"331 User admin okay, need password.\r\n");
        assert!(!reaction.close);

        let reaction = session.receive(b"PASS password\r\n");
        assert_eq!(reaction.output, b"230 User logged in, proceed.\r\n");
    }

    #[test]
    fn test_fragmented_command() {
        let mut session = ftp_session();

        assert!(session.receive(b"USER ad").output.is_empty());
        assert!(session.receive(b"min\r").output.is_empty());
        let reaction = session.receive(b"\n");
        assert_eq!(reaction.output, b"331 User admin okay, need password.\r\n");
    }

    #[test]
    fn test_pipelined_commands_one_read() {
        let mut session = ftp_session();

        let reaction = session.receive(b"USER admin\r\nPASS password\r\n");
        assert_eq!(
            reaction.output,
            b"331 User admin okay, need password.\r\n230 User logged in, proceed.\r\n".as_slice()
        );
    }

    #[test]
    fn test_quit_sets_close_after_reply() {
        let mut session = ftp_session();
        let reaction = session.receive(b"QUIT\r\n");
        assert_eq!(reaction.output, b"221 Service closing control connection.\r\n");
        assert!(reaction.close);
    }

    #[test]
    fn test_no_dispatch_after_close() {
        let mut session = ftp_session();
        let reaction = session.receive(b"QUIT\r\nUSER admin\r\n");
        assert_eq!(reaction.output, b"221 Service closing control connection.\r\n");
        assert!(reaction.close);
    }

    #[test]
    fn test_smtp_payload_round_trip() {
        let mut session = smtp_session();

        session.receive(b"EHLO x\r\n");
        session.receive(b"MAIL FROM:<a@x>\r\n");
        session.receive(b"RCPT TO:<b@x>\r\n");

        let reaction = session.receive(b"DATA\r\n");
        assert_eq!(reaction.output, b"354 End data with <CR><LF>.<CR><LF>\r\n");

        // Body arrives fragmented, terminator split across reads.
        assert!(session.receive(b"Subject: hi\r\n\r\nbody").output.is_empty());
        assert!(session.receive(b"\r\n.").output.is_empty());
        let reaction = session.receive(b"\r\n");
        assert_eq!(reaction.output, b"250 OK: Message accepted for delivery\r\n");

        // Back in line mode: a second envelope works.
        let reaction = session.receive(b"MAIL FROM:<c@x>\r\n");
        assert_eq!(reaction.output, b"250 OK\r\n");
    }

    #[test]
    fn test_data_and_body_in_one_read() {
        let mut session = smtp_session();
        session.receive(b"EHLO x\r\nMAIL FROM:<a@x>\r\nRCPT TO:<b@x>\r\n");

        let reaction = session.receive(b"DATA\r\nbody\r\n.\r\n");
        assert_eq!(
            reaction.output,
            b"354 End data with <CR><LF>.<CR><LF>\r\n250 OK: Message accepted for delivery\r\n"
                .as_slice()
        );
    }

    #[test]
    fn test_dotted_line_inside_body_does_not_terminate() {
        let mut session = smtp_session();
        session.receive(b"EHLO x\r\nMAIL FROM:<a@x>\r\nRCPT TO:<b@x>\r\nDATA\r\n");

        assert!(session.receive(b"before\r\n.\r\nafter").output.is_empty());
        let reaction = session.receive(b"\r\n.\r\n");
        assert_eq!(reaction.output, b"250 OK: Message accepted for delivery\r\n");
    }

    #[test]
    fn test_blank_line_rejected() {
        let mut session = ftp_session();
        let reaction = session.receive(b"\r\n");
        assert_eq!(reaction.output, b"500 Syntax error.\r\n");
        assert!(!reaction.close);
    }

    #[test]
    fn test_buffered_reflects_partial_line() {
        let mut session = ftp_session();
        session.receive(b"USER without terminator");
        assert_eq!(session.buffered(), 23);
    }
}
