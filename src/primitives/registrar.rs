//! Registrars administer the known clients.
//!
//! When an authorization request turns up, it is the registrar's duty to verify that the client
//! exists and that the presented redirect uri is one of those registered for it. At the token
//! endpoint it authenticates the client by its secret. Redirect uris are compared as exact
//! strings: no normalization, no wildcard and no prefix match takes place.
use std::fmt;

use ring::constant_time;
use thiserror::Error;
use tracing::info;
use url::Url;

use super::generator::{TagGenerator, MIN_CLIENT_ID_LEN, MIN_TOKEN_BYTES};
use super::scope::{ParseScopeErr, Scope};
use super::store::{Store, StoreError};

/// The grant type of the authorization code flow.
pub const AUTHORIZATION_CODE: &str = "authorization_code";

/// The response type of the authorization code flow.
pub const RESPONSE_TYPE_CODE: &str = "code";

/// A registered application permitted to request authorization.
///
/// Clients are immutable once registered.
#[derive(Clone, PartialEq, Eq)]
pub struct Client {
    /// The unique identifier of the client.
    pub client_id: String,

    /// The opaque secret the client authenticates with.
    pub client_secret: String,

    /// Registered redirect uris, kept verbatim.
    pub redirect_uris: Vec<String>,

    /// Grant types the client may use at the token endpoint.
    pub grant_types: Vec<String>,

    /// Response types the client may request at the authorization endpoint.
    pub response_types: Vec<String>,

    /// Space-delimited scope the client gets if a request names none.
    pub scope: String,

    /// Human readable name, shown to the resource owner on consent.
    pub name: String,
}

/// A request to register a new client.
///
/// Empty grant and response type lists select the authorization code flow.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClientRegistration {
    /// Display name of the client.
    pub name: String,

    /// Redirect uris, at least one.
    pub redirect_uris: Vec<String>,

    /// Requested grant types.
    pub grant_types: Vec<String>,

    /// Requested response types.
    pub response_types: Vec<String>,

    /// Default scope of the client.
    pub scope: String,
}

/// Credentials of a newly registered client.
#[derive(Clone, PartialEq, Eq)]
pub struct Registered {
    /// The generated client identifier.
    pub client_id: String,

    /// The generated client secret. It is not retrievable later.
    pub client_secret: String,
}

/// Reasons a registration is refused.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    /// No redirect uri was given.
    #[error("at least one redirect_uri is required")]
    NoRedirectUri,

    /// A redirect uri is not an absolute url.
    #[error("redirect_uri `{uri}` is invalid: {reason}")]
    InvalidRedirectUri {
        /// The offending uri.
        uri: String,
        /// Why it was refused.
        reason: String,
    },

    /// The default scope is malformed.
    #[error("scope is invalid: {0}")]
    InvalidScope(#[from] ParseScopeErr),

    /// A response type other than `code` was requested.
    #[error("response_type `{0}` is not supported, only `code` is")]
    UnsupportedResponseType(String),
}

/// Validates clients against their registration.
///
/// Implemented for every [`Store`], so validation always sees the current registry.
///
/// [`Store`]: ../store/trait.Store.html
pub trait Registrar {
    /// Find the registration of a client.
    fn client(&self, client_id: &str) -> Option<Client>;

    /// Whether a client with this id exists and its secret matches exactly.
    fn authenticate_client(&self, client_id: &str, secret: &str) -> bool {
        match self.client(client_id) {
            Some(client) => client.check_secret(secret),
            None => false,
        }
    }

    /// Whether the client exists and has registered exactly this redirect uri.
    fn is_redirect_uri_registered(&self, client_id: &str, uri: &str) -> bool {
        match self.client(client_id) {
            Some(client) => client.has_redirect_uri(uri),
            None => false,
        }
    }
}

impl<S: Store + ?Sized> Registrar for S {
    fn client(&self, client_id: &str) -> Option<Client> {
        self.get_client(client_id)
    }
}

impl Client {
    /// Compare the secret in constant time.
    pub fn check_secret(&self, secret: &str) -> bool {
        constant_time::verify_slices_are_equal(self.client_secret.as_bytes(), secret.as_bytes())
            .is_ok()
    }

    /// Exact string membership in the registered redirect uris.
    pub fn has_redirect_uri(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|registered| registered == uri)
    }

    /// Whether the client may use the grant type at the token endpoint.
    pub fn allows_grant_type(&self, grant_type: &str) -> bool {
        self.grant_types.iter().any(|allowed| allowed == grant_type)
    }

    /// Whether the client may request the response type.
    pub fn allows_response_type(&self, response_type: &str) -> bool {
        self.response_types.iter().any(|allowed| allowed == response_type)
    }
}

impl ClientRegistration {
    /// A registration for the authorization code flow with a single redirect uri.
    pub fn new(name: &str, redirect_uri: &str) -> Self {
        ClientRegistration {
            name: name.to_string(),
            redirect_uris: vec![redirect_uri.to_string()],
            ..ClientRegistration::default()
        }
    }

    /// Check the registration and turn it into a client with the given credentials.
    pub fn into_client(
        self, client_id: String, client_secret: String,
    ) -> Result<Client, RegistrationError> {
        if self.redirect_uris.is_empty() {
            return Err(RegistrationError::NoRedirectUri);
        }

        for uri in &self.redirect_uris {
            check_redirect_uri(uri)?;
        }

        self.scope.parse::<Scope>()?;

        let grant_types = if self.grant_types.is_empty() {
            vec![AUTHORIZATION_CODE.to_string()]
        } else {
            self.grant_types
        };

        if let Some(other) = self
            .response_types
            .iter()
            .find(|response_type| *response_type != RESPONSE_TYPE_CODE)
        {
            return Err(RegistrationError::UnsupportedResponseType(other.clone()));
        }

        let response_types = if self.response_types.is_empty() {
            vec![RESPONSE_TYPE_CODE.to_string()]
        } else {
            self.response_types
        };

        Ok(Client {
            client_id,
            client_secret,
            redirect_uris: self.redirect_uris,
            grant_types,
            response_types,
            scope: self.scope,
            name: self.name,
        })
    }
}

/// Redirect uris must be absolute and must not carry a fragment (RFC 6749, section 3.1.2).
fn check_redirect_uri(uri: &str) -> Result<(), RegistrationError> {
    let invalid = |reason: &str| RegistrationError::InvalidRedirectUri {
        uri: uri.to_string(),
        reason: reason.to_string(),
    };

    let parsed = Url::parse(uri).map_err(|err| invalid(&err.to_string()))?;
    if parsed.cannot_be_a_base() {
        return Err(invalid("not a hierarchical url"));
    }
    if parsed.fragment().is_some() {
        return Err(invalid("must not contain a fragment"));
    }
    Ok(())
}

/// Register a new client with generated credentials.
///
/// The client id is a prefix of `client_id_len` characters of a fresh opaque id, but never shorter
/// than `MIN_CLIENT_ID_LEN`. The secret is a full opaque id of at least 32 bytes.
pub fn register_client(
    store: &dyn Store, generator: &dyn TagGenerator, registration: ClientRegistration,
    client_id_len: usize, secret_bytes: usize,
) -> Result<Registered, RegistrationError> {
    let mut client_id = generator.opaque_id(MIN_TOKEN_BYTES);
    client_id.truncate(client_id_len.max(MIN_CLIENT_ID_LEN));
    let client_secret = generator.opaque_id(secret_bytes.max(MIN_TOKEN_BYTES));

    let client = registration.into_client(client_id.clone(), client_secret.clone())?;
    let name = client.name.clone();
    match store.put_client(client) {
        Ok(()) => (),
        Err(StoreError::ClientExists(_)) => panic!("Generated client id collides with an existing one"),
        Err(other) => panic!("Unexpected store failure registering a client: {}", other),
    }

    info!(client_id = %client_id, name = %name, "registered client");
    Ok(Registered {
        client_id,
        client_secret,
    })
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Client")
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

impl fmt::Debug for Registered {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Registered")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<confidential>")
            .finish()
    }
}
