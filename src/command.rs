//! Command parsing: one decoded line to a verb plus argument.
//!
//! Parsing never fails. Unrecognized or malformed verbs are a state
//! machine concern, not a parse error.

/// A single parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command verb, ASCII-uppercased. Empty for a blank line.
    pub verb: String,
    /// Remaining text after the verb, leading whitespace stripped.
    /// May be empty.
    pub arg: String,
}

impl Command {
    /// Parse one line into a command.
    ///
    /// Splits on the first run of whitespace; the verb is uppercased,
    /// the argument keeps its original case.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let mut parts = line.splitn(2, char::is_whitespace);
        let verb = parts.next().unwrap_or("").to_ascii_uppercase();
        let arg = parts.next().unwrap_or("").trim_start().to_string();
        Command { verb, arg }
    }
}
