//! Credential checking for the login-protocol variant.
//!
//! The state machine takes the acceptance policy as a trait object so
//! specific credentials are never hardcoded in protocol logic.

use std::collections::HashMap;

/// Credential acceptance predicate.
///
/// Read-only from every connection's perspective; implementations are
/// shared across connections behind an `Arc`.
pub trait CredentialCheck: Send + Sync {
    fn check(&self, identity: &str, secret: &str) -> bool;
}

/// Config-driven credential table: a fixed set of user/password pairs,
/// plus an optional anonymous identity accepted with any secret.
#[derive(Debug)]
pub struct StaticCredentials {
    users: HashMap<String, String>,
    allow_anonymous: bool,
}

impl StaticCredentials {
    pub fn new(
        users: impl IntoIterator<Item = (String, String)>,
        allow_anonymous: bool,
    ) -> Self {
        StaticCredentials {
            users: users.into_iter().collect(),
            allow_anonymous,
        }
    }
}

impl CredentialCheck for StaticCredentials {
    fn check(&self, identity: &str, secret: &str) -> bool {
        if self.allow_anonymous && identity == "anonymous" {
            return true;
        }
        self.users.get(identity).map(String::as_str) == Some(secret)
    }
}
