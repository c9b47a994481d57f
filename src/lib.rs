//! parlor: a session engine for line-oriented control protocols.
//!
//! Two protocol variants run over the same per-connection session core:
//! - FTP control channel (login sequence)
//! - SMTP (envelope construction and message capture)
//!
//! Features:
//! - CRLF line decoding tolerant of arbitrary TCP fragmentation
//! - Payload capture ended by a CRLF "." CRLF terminator that may itself
//!   be split across reads
//! - Explicit per-state command tables with pluggable credential checking
//! - Configuration via CLI arguments or TOML file

pub mod auth;
pub mod command;
pub mod config;
pub mod decode;
pub mod protocols;
pub mod response;
pub mod server;
pub mod session;
