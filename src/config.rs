//! Configuration of an issuer.
//!
//! Every value has a default, so an empty json object is a complete configuration:
//!
//! ```
//! use oxide_issuer::config::IssuerConfig;
//!
//! let config = IssuerConfig::from_json(r#"{ "token_lifetime_secs": 900 }"#).unwrap();
//! assert_eq!(config.token_lifetime_secs, 900);
//! assert_eq!(config.code_lifetime_secs, 600);
//! ```
use std::fmt;

use chrono::Duration;

use crate::code_grant::Settings;
use crate::error::ConfigError;
use crate::primitives::generator::{encoded_len, MIN_CLIENT_ID_LEN, MIN_TOKEN_BYTES};
use crate::primitives::registrar::{Client, ClientRegistration};
use crate::primitives::store::User;

/// Upper bound for every lifetime, one year.
pub const MAX_LIFETIME_SECS: u64 = 366 * 24 * 3600;

/// Lifetimes, credential sizes and the seeded registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerConfig {
    /// Authorization code lifetime in seconds (default: 10 minutes)
    #[serde(default = "default_code_lifetime")]
    pub code_lifetime_secs: u64,

    /// Access token lifetime in seconds (default: 1 hour)
    #[serde(default = "default_token_lifetime")]
    pub token_lifetime_secs: u64,

    /// Time the resource owner has for login and consent (default: 10 minutes)
    #[serde(default = "default_flow_lifetime")]
    pub flow_lifetime_secs: u64,

    /// Random bytes in codes, tokens and secrets (default and minimum: 32)
    #[serde(default = "default_token_bytes")]
    pub token_bytes: usize,

    /// Length of generated client ids (default: 16)
    #[serde(default = "default_client_id_len")]
    pub client_id_len: usize,

    /// Clients registered at startup
    #[serde(default)]
    pub clients: Vec<ClientSeed>,

    /// Resource owners who can log in
    #[serde(default)]
    pub users: Vec<UserSeed>,
}

/// A client registered at startup with fixed credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSeed {
    /// Fixed client id.
    pub client_id: String,

    /// Fixed client secret.
    pub client_secret: String,

    /// Registered redirect uris.
    pub redirect_uris: Vec<String>,

    /// Allowed grant types, `authorization_code` if empty.
    #[serde(default)]
    pub grant_types: Vec<String>,

    /// Allowed response types, `code` if empty.
    #[serde(default)]
    pub response_types: Vec<String>,

    /// Default scope.
    #[serde(default)]
    pub scope: String,

    /// Display name, the client id if empty.
    #[serde(default)]
    pub name: String,
}

/// A resource owner.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSeed {
    /// Stable user id.
    pub id: String,

    /// Login name.
    pub username: String,

    /// Plain text password.
    pub password: String,
}

fn default_code_lifetime() -> u64 {
    600
}

fn default_token_lifetime() -> u64 {
    3600
}

fn default_flow_lifetime() -> u64 {
    600
}

fn default_token_bytes() -> usize {
    MIN_TOKEN_BYTES
}

fn default_client_id_len() -> usize {
    16
}

impl Default for IssuerConfig {
    fn default() -> Self {
        IssuerConfig {
            code_lifetime_secs: default_code_lifetime(),
            token_lifetime_secs: default_token_lifetime(),
            flow_lifetime_secs: default_flow_lifetime(),
            token_bytes: default_token_bytes(),
            client_id_len: default_client_id_len(),
            clients: Vec::new(),
            users: Vec::new(),
        }
    }
}

impl IssuerConfig {
    /// Parse and validate a json configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: IssuerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value, including the seeded clients and users.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let lifetimes = [
            ("code_lifetime_secs", self.code_lifetime_secs),
            ("token_lifetime_secs", self.token_lifetime_secs),
            ("flow_lifetime_secs", self.flow_lifetime_secs),
        ];
        for &(name, value) in lifetimes.iter() {
            if value == 0 || value > MAX_LIFETIME_SECS {
                return Err(ConfigError::Lifetime {
                    name,
                    value,
                    max: MAX_LIFETIME_SECS,
                });
            }
        }

        if self.token_bytes < MIN_TOKEN_BYTES {
            return Err(ConfigError::TokenBytes {
                value: self.token_bytes,
                min: MIN_TOKEN_BYTES,
            });
        }

        let max_id_len = encoded_len(MIN_TOKEN_BYTES);
        if self.client_id_len < MIN_CLIENT_ID_LEN || self.client_id_len > max_id_len {
            return Err(ConfigError::ClientIdLength {
                value: self.client_id_len,
                min: MIN_CLIENT_ID_LEN,
                max: max_id_len,
            });
        }

        for seed in &self.clients {
            seed.to_client()?;
        }

        for seed in &self.users {
            if seed.id.is_empty() || seed.username.is_empty() || seed.password.is_empty() {
                return Err(ConfigError::User(seed.username.clone()));
            }
        }

        Ok(())
    }

    /// The runtime settings of these values.
    ///
    /// Only meaningful for a validated configuration.
    pub fn settings(&self) -> Settings {
        Settings {
            code_lifetime: Duration::seconds(self.code_lifetime_secs as i64),
            token_lifetime: Duration::seconds(self.token_lifetime_secs as i64),
            flow_lifetime: Duration::seconds(self.flow_lifetime_secs as i64),
            token_bytes: self.token_bytes,
            client_id_len: self.client_id_len,
        }
    }
}

impl ClientSeed {
    /// A client for the authorization code flow with a single redirect uri.
    pub fn new(client_id: &str, client_secret: &str, redirect_uri: &str) -> Self {
        ClientSeed {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_uris: vec![redirect_uri.to_string()],
            grant_types: Vec::new(),
            response_types: Vec::new(),
            scope: String::new(),
            name: String::new(),
        }
    }

    /// Validate the seed by the rules of dynamic registration.
    pub fn to_client(&self) -> Result<Client, ConfigError> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(ConfigError::MissingCredentials(self.client_id.clone()));
        }

        let name = if self.name.is_empty() {
            self.client_id.clone()
        } else {
            self.name.clone()
        };

        ClientRegistration {
            name,
            redirect_uris: self.redirect_uris.clone(),
            grant_types: self.grant_types.clone(),
            response_types: self.response_types.clone(),
            scope: self.scope.clone(),
        }
        .into_client(self.client_id.clone(), self.client_secret.clone())
        .map_err(|source| ConfigError::Client {
            client_id: self.client_id.clone(),
            source,
        })
    }
}

impl UserSeed {
    /// A user logging in with the given credentials.
    pub fn new(id: &str, username: &str, password: &str) -> Self {
        UserSeed {
            id: id.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

impl From<UserSeed> for User {
    fn from(seed: UserSeed) -> Self {
        User {
            id: seed.id,
            username: seed.username,
            password: seed.password,
        }
    }
}

impl fmt::Debug for ClientSeed {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ClientSeed")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<confidential>")
            .field("redirect_uris", &self.redirect_uris)
            .field("grant_types", &self.grant_types)
            .field("response_types", &self.response_types)
            .field("scope", &self.scope)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Debug for UserSeed {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("UserSeed")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
