//! Reply encoding: outcome to wire bytes.

use crate::protocols::Outcome;

/// Encode an outcome as `"<code> <text>\r\n"`.
///
/// Total function. A code outside the three-digit reply range is a
/// programming error, caught in debug builds only.
pub fn encode(outcome: &Outcome) -> Vec<u8> {
    debug_assert!(
        (100..=599).contains(&outcome.code),
        "reply code out of range: {}",
        outcome.code
    );
    format!("{:03} {}\r\n", outcome.code, outcome.text).into_bytes()
}
