//! Email/password accounts kept in `users.json`.
//!
//! Passwords are stored as Argon2 hashes; emails are stored lowercased and
//! matched case-insensitively.

use crate::{AccountError, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const MIN_PASSWORD_LEN: usize = 6;

const USERS_FILE: &str = "users.json";

/// Account record on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredAccount {
    name: String,
    email: String,
    password_hash: String,
}

/// Input of the signup form.
#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Signed-in identity returned by signup and login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Store backed by `users.json` inside `data_dir`.
    pub fn open(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(USERS_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates an account and signs it in.
    pub fn signup(&self, form: &SignupForm) -> Result<Profile> {
        let name = form.name.trim();
        if name.is_empty() {
            return Err(AccountError::MissingName);
        }
        let email = form.email.trim().to_lowercase();
        if email.is_empty() {
            return Err(AccountError::MissingEmail);
        }
        if form.password != form.confirm_password {
            return Err(AccountError::PasswordMismatch);
        }
        // Length in UTF-16 code units.
        if form.password.encode_utf16().count() < MIN_PASSWORD_LEN {
            return Err(AccountError::PasswordTooShort);
        }

        let mut accounts = self.load()?;
        if accounts.iter().any(|a| a.email.to_lowercase() == email) {
            return Err(AccountError::DuplicateEmail);
        }

        accounts.push(StoredAccount {
            name: name.to_string(),
            email: email.clone(),
            password_hash: hash_password(&form.password)?,
        });
        self.save(&accounts)?;
        info!(%email, "account created");

        Ok(Profile {
            name: name.to_string(),
            email,
        })
    }

    /// Checks `email` (case-insensitive) and `password` (exact).
    pub fn login(&self, email: &str, password: &str) -> Result<Profile> {
        let email = email.trim().to_lowercase();
        let accounts = self.load()?;
        let account = accounts
            .iter()
            .find(|a| a.email.to_lowercase() == email)
            .filter(|a| verify_password(password, &a.password_hash))
            .ok_or_else(|| {
                debug!(%email, "login rejected");
                AccountError::InvalidCredentials
            })?;

        Ok(Profile {
            name: account.name.clone(),
            email: account.email.clone(),
        })
    }

    /// Number of registered accounts.
    pub fn len(&self) -> Result<usize> {
        Ok(self.load()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn load(&self) -> Result<Vec<StoredAccount>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let json = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&json)?)
    }

    fn save(&self, accounts: &[StoredAccount]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(accounts)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AccountError::Hash(e.to_string()))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
