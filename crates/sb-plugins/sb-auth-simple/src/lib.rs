//! # sb-auth-simple
//!
//! Argon2-based implementation of `IdentityProvider`.
//! Keeps accounts and sessions in memory; a session token maps to the
//! identity used for comment ownership checks.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use sb_core::error::{AppError, Result};
use sb_core::models::Identity;
use sb_core::traits::IdentityProvider;
use sha2::{Digest, Sha256};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Clone)]
struct Account {
    password_hash: String,
    identity: Identity,
}

#[derive(Default)]
pub struct SimpleIdentityProvider {
    /// Keyed by normalized e-mail.
    accounts: DashMap<String, Account>,
    /// Session token -> signed-in user.
    sessions: DashMap<String, Identity>,
}

/// Stable user id derived from the e-mail (16 hex chars).
fn user_id(email: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.as_bytes());
    let hash = hex::encode(hasher.finalize());
    hash[..16].to_string()
}

fn random_bytes<const N: usize>() -> Result<[u8; N]> {
    let mut bytes = [0u8; N];
    getrandom::getrandom(&mut bytes).map_err(|err| {
        log::error!("system randomness unavailable: {err}");
        AppError::Internal("could not create credentials".into())
    })?;
    Ok(bytes)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl SimpleIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Identity> {
        let email = normalize_email(email);
        if !email.contains('@') {
            return Err(AppError::validation("email is not valid"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let vacant = match self.accounts.entry(email.clone()) {
            Entry::Occupied(_) => return Err(AppError::conflict("an account with that email exists")),
            Entry::Vacant(vacant) => vacant,
        };

        let salt = SaltString::encode_b64(&random_bytes::<16>()?).map_err(|err| {
            log::error!("encoding salt failed: {err}");
            AppError::Internal("could not create credentials".into())
        })?;
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| {
                log::error!("hashing password failed: {err}");
                AppError::Internal("could not create credentials".into())
            })?
            .to_string();

        let identity = Identity {
            uid: user_id(&email),
            display_name: display_name
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
            email: Some(email.clone()),
            ..Default::default()
        };
        vacant.insert(Account {
            password_hash,
            identity: identity.clone(),
        });
        log::info!("registered user {}", identity.uid);
        Ok(identity)
    }
}

#[async_trait]
impl IdentityProvider for SimpleIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<(String, Identity)> {
        let invalid = || AppError::unauthorized("invalid email or password");
        let account = self
            .accounts
            .get(&normalize_email(email))
            .map(|entry| entry.value().clone())
            .ok_or_else(invalid)?;

        let parsed_hash = PasswordHash::new(&account.password_hash).map_err(|err| {
            log::error!("stored hash for {} is unreadable: {err}", account.identity.uid);
            invalid()
        })?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| invalid())?;

        let token = hex::encode(random_bytes::<32>()?);
        self.sessions.insert(token.clone(), account.identity.clone());
        log::debug!("session opened for {}", account.identity.uid);
        Ok((token, account.identity))
    }

    async fn sign_out(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    async fn identify(&self, token: &str) -> Option<Identity> {
        self.sessions.get(token).map(|entry| entry.value().clone())
    }
}
