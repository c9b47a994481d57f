//! Protocol variants sharing the per-connection session core.
//!
//! Each variant is a state machine behind the [`ProtocolMachine`] trait:
//! - `ftp`: FTP control channel (login sequence)
//! - `smtp`: SMTP envelope construction and message capture
//!
//! The machines are pure transforms over (state, command); the `Session`
//! owns decoding, reply encoding, and mode switching around them.

use crate::command::Command;

pub mod ftp;
pub mod smtp;

/// Instruction to the session beyond writing the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    /// Nothing beyond the reply.
    None,
    /// Close the connection after the reply is written.
    CloseConnection,
    /// Route subsequent bytes to the payload accumulator.
    EnterPayloadMode,
    /// Resume line decoding.
    ExitPayloadMode,
}

/// The structured result of dispatching one command or payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub code: u16,
    pub text: String,
    pub side_effect: SideEffect,
}

impl Outcome {
    /// A plain reply with no side effect.
    pub fn reply(code: u16, text: impl Into<String>) -> Self {
        Outcome {
            code,
            text: text.into(),
            side_effect: SideEffect::None,
        }
    }

    pub fn with_effect(code: u16, text: impl Into<String>, side_effect: SideEffect) -> Self {
        Outcome {
            code,
            text: text.into(),
            side_effect,
        }
    }
}

/// One protocol variant's state machine, driven by the session.
pub trait ProtocolMachine {
    /// Outcome sent when the connection opens, before any command.
    fn greeting(&self) -> Outcome;

    /// Dispatch one decoded command.
    fn on_command(&mut self, command: &Command) -> Outcome;

    /// Accept one captured payload (payload mode only).
    fn on_payload(&mut self, payload: &[u8]) -> Outcome;
}
