//! Errors of setting up and running an issuer.
//!
//! Request handling reports [`OAuthError`], whose codes are the wire contract with clients.
//! Everything a host may encounter besides that, loading configuration and seeding the store, is
//! collected in [`Error`].
//!
//! [`OAuthError`]: ../code_grant/error/struct.OAuthError.html
//! [`Error`]: enum.Error.html
use thiserror::Error;

use crate::primitives::registrar::RegistrationError;
use crate::primitives::store::StoreError;

/// Refused configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration is not valid json or has the wrong shape.
    #[error("configuration could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),

    /// A lifetime is zero or unreasonably long.
    #[error("{name} must be between 1 and {max} seconds, got {value}")]
    Lifetime {
        /// The configuration key.
        name: &'static str,
        /// The configured value.
        value: u64,
        /// The largest accepted value.
        max: u64,
    },

    /// Tokens would carry too little entropy.
    #[error("token_bytes must be at least {min}, got {value}")]
    TokenBytes {
        /// The configured value.
        value: usize,
        /// The smallest accepted value.
        min: usize,
    },

    /// Generated client ids would be too short or longer than the generated string.
    #[error("client_id_len must be between {min} and {max}, got {value}")]
    ClientIdLength {
        /// The configured value.
        value: usize,
        /// The smallest accepted value.
        min: usize,
        /// The largest accepted value.
        max: usize,
    },

    /// A seeded client has an empty id or secret.
    #[error("seeded client `{0}` needs a non-empty id and secret")]
    MissingCredentials(String),

    /// A seeded client is refused by registration rules.
    #[error("seeded client `{client_id}` is invalid: {source}")]
    Client {
        /// The seeded id.
        client_id: String,
        /// Why it was refused.
        #[source]
        source: RegistrationError,
    },

    /// A seeded user has an empty id, username or password.
    #[error("seeded user `{0}` needs a non-empty id, username and password")]
    User(String),
}

/// Any error of the issuer.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Seeding the store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result with the crate error.
pub type Result<T> = std::result::Result<T, Error>;
