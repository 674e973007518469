//! Storage-scoping identity.
//!
//! # Invariants
//! - Account emails are trimmed and lowercased before they become keys.
//! - `Guest` and every account map to distinct slot keys.

use serde::{Deserialize, Serialize};

/// Slot key prefix shared by every entry list.
pub const ENTRIES_KEY_PREFIX: &str = "rough-entries-";
/// Slot key of the simulated credential registry.
pub const USERS_KEY: &str = "rough-users";
/// Slot key of the current session.
pub const SESSION_KEY: &str = "rough-session";
/// Slot key of persisted settings.
pub const SETTINGS_KEY: &str = "rough-settings";

const GUEST_SCOPE: &str = "guest";

/// Signed-in account as seen by the core.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub email: String,
}

impl User {
    pub fn new(email: &str) -> Self {
        Self {
            email: normalize_email(email),
        }
    }
}

/// Who the active entry list belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    Guest,
    Account(String),
}

impl Identity {
    pub fn account(email: &str) -> Self {
        Self::Account(normalize_email(email))
    }

    pub fn from_user(user: Option<&User>) -> Self {
        match user {
            Some(user) => Self::account(&user.email),
            None => Self::Guest,
        }
    }

    /// Slot key holding this identity's entry list.
    pub fn entries_key(&self) -> String {
        match self {
            Self::Guest => format!("{ENTRIES_KEY_PREFIX}{GUEST_SCOPE}"),
            Self::Account(email) => format!("{ENTRIES_KEY_PREFIX}{email}"),
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Self::Guest)
    }

    /// `guest` or `account`. Safe to log; never carries the email.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Guest => GUEST_SCOPE,
            Self::Account(_) => "account",
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::{Identity, User};

    #[test]
    fn entries_keys_are_scoped() {
        assert_eq!(Identity::Guest.entries_key(), "rough-entries-guest");
        assert_eq!(
            Identity::account(" Ana@Example.com ").entries_key(),
            "rough-entries-ana@example.com"
        );
    }

    #[test]
    fn identity_from_user_normalizes() {
        let user = User::new("Bo@Example.com");
        assert_eq!(
            Identity::from_user(Some(&user)),
            Identity::Account("bo@example.com".to_string())
        );
        assert!(Identity::from_user(None).is_guest());
    }

    #[test]
    fn kind_never_exposes_the_email() {
        assert_eq!(Identity::Guest.kind(), "guest");
        assert_eq!(Identity::account("ana@example.com").kind(), "account");
    }
}
