use std::borrow::Cow;
use std::collections::HashMap;

use url::form_urlencoded;

use crate::code_grant::{accesstoken, authorization};

/// Parameters of a urlencoded query or form body, each key appearing at most once.
///
/// A key that appears twice is poisoned: it reads as absent and marks the whole parameter set as
/// malformed. Accepting either value would let components that parse the query from different
/// ends disagree about the request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NormalizedParameter {
    inner: HashMap<String, Option<String>>,
}

impl NormalizedParameter {
    /// Create an empty map.
    pub fn new() -> Self {
        NormalizedParameter::default()
    }

    /// Parse an `application/x-www-form-urlencoded` string.
    pub fn parse(query: &str) -> Self {
        form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect()
    }

    /// Insert a key-value-pair or mark the key as dead if already present.
    pub fn insert_or_poison(&mut self, key: String, val: String) {
        self.inner
            .entry(key)
            .and_modify(|existing| *existing = None)
            .or_insert(Some(val));
    }

    /// The value of a key that appeared exactly once.
    pub fn unique_value(&self, key: &str) -> Option<Cow<str>> {
        self.inner
            .get(key)
            .and_then(Option::as_deref)
            .map(Cow::Borrowed)
    }

    /// Whether no key appeared twice.
    pub fn is_unique(&self) -> bool {
        self.inner.values().all(Option::is_some)
    }
}

impl std::iter::FromIterator<(String, String)> for NormalizedParameter {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = (String, String)>,
    {
        let mut target = NormalizedParameter::default();
        iter.into_iter()
            .for_each(|(k, v)| target.insert_or_poison(k, v));
        target
    }
}

/// An authorization request as received at the authorization endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthorizationRequest {
    /// The requesting client.
    pub client_id: Option<String>,

    /// Where to send the user agent afterwards.
    pub redirect_uri: Option<String>,

    /// Must be `code`.
    pub response_type: Option<String>,

    /// Requested scope, the client default if absent.
    pub scope: Option<String>,

    /// Opaque client state, echoed back.
    pub state: Option<String>,

    /// Set when the query repeated a parameter.
    pub poisoned: bool,
}

impl AuthorizationRequest {
    /// A request for a code with the given client and redirect uri.
    pub fn new(client_id: &str, redirect_uri: &str) -> Self {
        AuthorizationRequest {
            client_id: Some(client_id.to_string()),
            redirect_uri: Some(redirect_uri.to_string()),
            response_type: Some("code".to_string()),
            ..AuthorizationRequest::default()
        }
    }

    /// Request a scope.
    pub fn with_scope(mut self, scope: &str) -> Self {
        self.scope = Some(scope.to_string());
        self
    }

    /// Attach client state.
    pub fn with_state(mut self, state: &str) -> Self {
        self.state = Some(state.to_string());
        self
    }

    /// Read the request from the query of the authorization url.
    pub fn from_query(query: &str) -> Self {
        let params = NormalizedParameter::parse(query);
        let get = |key| params.unique_value(key).map(Cow::into_owned);
        AuthorizationRequest {
            client_id: get("client_id"),
            redirect_uri: get("redirect_uri"),
            response_type: get("response_type"),
            scope: get("scope"),
            state: get("state"),
            poisoned: !params.is_unique(),
        }
    }
}

impl authorization::Request for AuthorizationRequest {
    fn valid(&self) -> bool {
        !self.poisoned
    }

    fn client_id(&self) -> Option<Cow<str>> {
        self.client_id.as_deref().map(Cow::Borrowed)
    }

    fn redirect_uri(&self) -> Option<Cow<str>> {
        self.redirect_uri.as_deref().map(Cow::Borrowed)
    }

    fn response_type(&self) -> Option<Cow<str>> {
        self.response_type.as_deref().map(Cow::Borrowed)
    }

    fn scope(&self) -> Option<Cow<str>> {
        self.scope.as_deref().map(Cow::Borrowed)
    }

    fn state(&self) -> Option<Cow<str>> {
        self.state.as_deref().map(Cow::Borrowed)
    }
}

/// An access token request as received at the token endpoint.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TokenRequest {
    /// Must be `authorization_code`.
    pub grant_type: Option<String>,

    /// The code to redeem.
    pub code: Option<String>,

    /// The redirect uri of the authorization request.
    pub redirect_uri: Option<String>,

    /// The authenticating client.
    pub client_id: Option<String>,

    /// Its secret.
    pub client_secret: Option<String>,

    /// Set when the form repeated a parameter.
    pub poisoned: bool,
}

impl TokenRequest {
    /// An `authorization_code` request with all parameters present.
    pub fn new(code: &str, redirect_uri: &str, client_id: &str, client_secret: &str) -> Self {
        TokenRequest {
            grant_type: Some("authorization_code".to_string()),
            code: Some(code.to_string()),
            redirect_uri: Some(redirect_uri.to_string()),
            client_id: Some(client_id.to_string()),
            client_secret: Some(client_secret.to_string()),
            poisoned: false,
        }
    }

    /// Read the request from a urlencoded form body.
    pub fn from_form(body: &str) -> Self {
        let params = NormalizedParameter::parse(body);
        let get = |key| params.unique_value(key).map(Cow::into_owned);
        TokenRequest {
            grant_type: get("grant_type"),
            code: get("code"),
            redirect_uri: get("redirect_uri"),
            client_id: get("client_id"),
            client_secret: get("client_secret"),
            poisoned: !params.is_unique(),
        }
    }
}

impl accesstoken::Request for TokenRequest {
    fn valid(&self) -> bool {
        !self.poisoned
    }

    fn grant_type(&self) -> Option<Cow<str>> {
        self.grant_type.as_deref().map(Cow::Borrowed)
    }

    fn code(&self) -> Option<Cow<str>> {
        self.code.as_deref().map(Cow::Borrowed)
    }

    fn redirect_uri(&self) -> Option<Cow<str>> {
        self.redirect_uri.as_deref().map(Cow::Borrowed)
    }

    fn client_id(&self) -> Option<Cow<str>> {
        self.client_id.as_deref().map(Cow::Borrowed)
    }

    fn client_secret(&self) -> Option<Cow<str>> {
        self.client_secret.as_deref().map(Cow::Borrowed)
    }
}

impl std::fmt::Debug for TokenRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("TokenRequest")
            .field("grant_type", &self.grant_type)
            .field("redirect_uri", &self.redirect_uri)
            .field("client_id", &self.client_id)
            .field("poisoned", &self.poisoned)
            .finish()
    }
}
