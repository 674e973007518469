//! Simulated account layer over local slots.
//!
//! # Responsibility
//! - Register and verify email/password accounts in the `rough-users` slot.
//! - Accept Google ID tokens by reading their `email` claim.
//! - Persist the session and migrate guest entries on every successful sign-in.
//!
//! # Invariants
//! - Failures are returned as [`AuthResponse`] values, never as `Err`.
//! - Passwords are stored as SHA-256 digests, never as plain text. A
//!   legacy plain-text or mixed-case registry record is rewritten under the
//!   normalized key with a digest on its first successful sign-in.
//! - Google tokens are decoded without signature verification; this layer
//!   is a local simulation, not an identity provider.

use crate::model::identity::{normalize_email, User, SESSION_KEY, USERS_KEY};
use crate::repo::entry_slots::{adopt_legacy_account_slot, migrate_guest_entries};
use crate::repo::kv_repo::{read_json, write_json, KvResult, KvStore, SlotRead};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Registry value for accounts created through Google sign-in.
pub const GOOGLE_AUTH_MARKER: &str = "__GOOGLE_AUTH__";
const DIGEST_PREFIX: &str = "sha256:";

pub const ERR_INVALID_CREDENTIALS: &str = "Invalid email or password.";
pub const ERR_ACCOUNT_EXISTS: &str = "An account with this email already exists.";
pub const ERR_INVALID_EMAIL: &str = "Please enter a valid email address.";
pub const ERR_EMPTY_PASSWORD: &str = "Password must not be empty.";
pub const ERR_GOOGLE_NO_CREDENTIAL: &str = "Google Sign-In failed: No credential returned.";
pub const ERR_GOOGLE_FAILED: &str = "An error occurred during Google Sign-In.";

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

type UserRegistry = BTreeMap<String, String>;

/// Outcome of a sign-in or sign-up attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResponse {
    pub user: Option<User>,
    pub error: Option<String>,
}

impl AuthResponse {
    fn ok(user: User) -> Self {
        Self {
            user: Some(user),
            error: None,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            user: None,
            error: Some(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.user.is_some()
    }
}

#[derive(Debug, Deserialize)]
struct GoogleClaims {
    email: String,
}

/// Account service over a slot store.
pub struct AuthService<S: KvStore> {
    kv: S,
}

impl<S: KvStore> AuthService<S> {
    pub fn new(kv: S) -> Self {
        Self { kv }
    }

    /// Returns the signed-in user from the session slot, if any.
    pub fn current_user(&self) -> KvResult<Option<User>> {
        Ok(read_json::<User, _>(&self.kv, SESSION_KEY)?.into_option())
    }

    pub fn sign_up(&self, email: &str, password: &str) -> AuthResponse {
        let email = normalize_email(email);
        if !EMAIL_RE.is_match(&email) {
            return AuthResponse::failed(ERR_INVALID_EMAIL);
        }
        if password.is_empty() {
            return AuthResponse::failed(ERR_EMPTY_PASSWORD);
        }

        self.guarded("sign_up", || {
            let mut users = self.load_users()?;
            if users.contains_key(&email) {
                return Ok(AuthResponse::failed(ERR_ACCOUNT_EXISTS));
            }
            users.insert(email.clone(), hash_password(password));
            write_json(&self.kv, USERS_KEY, &users)?;
            self.establish_session(&email)
        })
    }

    pub fn sign_in(&self, email: &str, password: &str) -> AuthResponse {
        let email = normalize_email(email);
        self.guarded("sign_in", || {
            let mut users = self.load_users()?;
            if let Some(stored) = users.get(&email) {
                if !verify_password(stored, password) {
                    return Ok(AuthResponse::failed(ERR_INVALID_CREDENTIALS));
                }
                if !stored.starts_with(DIGEST_PREFIX) {
                    users.insert(email.clone(), hash_password(password));
                    write_json(&self.kv, USERS_KEY, &users)?;
                }
                return self.establish_session(&email);
            }

            // Registries written before normalization may key the account
            // by its mixed-case spelling.
            let legacy = users
                .iter()
                .find(|(key, stored)| {
                    normalize_email(key) == email && verify_password(stored, password)
                })
                .map(|(key, _)| key.clone());
            let Some(legacy) = legacy else {
                return Ok(AuthResponse::failed(ERR_INVALID_CREDENTIALS));
            };

            users.remove(&legacy);
            users.insert(email.clone(), hash_password(password));
            write_json(&self.kv, USERS_KEY, &users)?;
            adopt_legacy_account_slot(&self.kv, &legacy, &email)?;
            info!("event=auth_legacy_account module=auth status=ok");
            self.establish_session(&email)
        })
    }

    /// Signs in with a Google ID token (JWT).
    pub fn sign_in_with_google(&self, credential: Option<&str>) -> AuthResponse {
        let Some(credential) = credential.map(str::trim).filter(|c| !c.is_empty()) else {
            return AuthResponse::failed(ERR_GOOGLE_NO_CREDENTIAL);
        };
        let Some(email) = decode_google_email(credential) else {
            warn!("event=auth_google module=auth status=error error_code=undecodable_credential");
            return AuthResponse::failed(ERR_GOOGLE_FAILED);
        };

        self.guarded("sign_in_google", || {
            let mut users = self.load_users()?;
            if !users.contains_key(&email) {
                users.insert(email.clone(), GOOGLE_AUTH_MARKER.to_string());
                write_json(&self.kv, USERS_KEY, &users)?;
            }
            self.establish_session(&email)
        })
    }

    pub fn sign_out(&self) -> KvResult<()> {
        self.kv.remove(SESSION_KEY)?;
        info!("event=auth_sign_out module=auth status=ok");
        Ok(())
    }

    fn establish_session(&self, email: &str) -> KvResult<AuthResponse> {
        if let Err(err) = migrate_guest_entries(&self.kv, email) {
            warn!("event=guest_migrate module=auth status=error error={err}");
        }
        let user = User::new(email);
        write_json(&self.kv, SESSION_KEY, &user)?;
        info!("event=auth_session module=auth status=ok");
        Ok(AuthResponse::ok(user))
    }

    fn load_users(&self) -> KvResult<UserRegistry> {
        match read_json::<UserRegistry, _>(&self.kv, USERS_KEY)? {
            SlotRead::Present(users) => Ok(users),
            SlotRead::Absent => Ok(UserRegistry::new()),
            SlotRead::Malformed(reason) => {
                warn!("event=users_load module=auth status=malformed error={reason}");
                Ok(UserRegistry::new())
            }
        }
    }

    fn guarded<F>(&self, operation: &'static str, run: F) -> AuthResponse
    where
        F: FnOnce() -> KvResult<AuthResponse>,
    {
        match run() {
            Ok(response) => response,
            Err(err) => {
                warn!("event=auth_{operation} module=auth status=error error={err}");
                AuthResponse::failed(format!("Account storage is unavailable: {err}"))
            }
        }
    }
}

fn hash_password(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    format!("{DIGEST_PREFIX}{}", hex::encode(digest))
}

fn verify_password(stored: &str, password: &str) -> bool {
    if stored == GOOGLE_AUTH_MARKER {
        return false;
    }
    match stored.strip_prefix(DIGEST_PREFIX) {
        Some(_) => stored == hash_password(password),
        // Registries written before hashing hold the raw password.
        None => stored == password,
    }
}

fn decode_google_email(credential: &str) -> Option<String> {
    let payload = credential.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: GoogleClaims = serde_json::from_slice(&bytes).ok()?;
    let email = normalize_email(&claims.email);
    EMAIL_RE.is_match(&email).then_some(email)
}
