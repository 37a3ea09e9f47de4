//! Local account and preference storage for GlassChat.
//!
//! Both stores are small JSON files in the client's data directory.

pub mod background;
pub mod credentials;

pub use background::{BackgroundStore, DEFAULT_BACKGROUND, PREDEFINED_BACKGROUNDS};
pub use credentials::{CredentialStore, Profile, SignupForm, MIN_PASSWORD_LEN};

/// Errors surfaced by the account stores. Validation variants display the
/// message shown to the user.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("Please enter your name.")]
    MissingName,
    #[error("Please enter your email address.")]
    MissingEmail,
    #[error("Passwords do not match.")]
    PasswordMismatch,
    #[error("Password must be at least 6 characters long.")]
    PasswordTooShort,
    #[error("An account with this email already exists.")]
    DuplicateEmail,
    #[error("Invalid email or password.")]
    InvalidCredentials,
    #[error("unknown background: {0}")]
    UnknownBackground(String),
    #[error("unsupported image type: {0}")]
    UnsupportedImage(String),
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt store: {0}")]
    Serde(#[from] serde_json::Error),
}

impl AccountError {
    /// `true` for errors caused by user input rather than storage.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingName
                | Self::MissingEmail
                | Self::PasswordMismatch
                | Self::PasswordTooShort
                | Self::DuplicateEmail
                | Self::InvalidCredentials
                | Self::UnknownBackground(_)
                | Self::UnsupportedImage(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AccountError>;
