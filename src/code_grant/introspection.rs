//! Token introspection for resource servers.
//!
//! Reports whether an access token is active and, if so, to whom it was issued. The response
//! follows the shape of [RFC 7662]: an inactive token carries no further information, so it is
//! impossible to tell an unknown token from an expired one. Expired tokens are deleted when seen.
//!
//! [RFC 7662]: https://tools.ietf.org/html/rfc7662#section-2.2
use tracing::debug;

use crate::primitives::clock::Clock;
use crate::primitives::grant::AccessToken;
use crate::primitives::scope::Scope;
use crate::primitives::store::{Store, TokenStatus};

/// Required functionality to answer introspection requests.
pub trait Endpoint {
    /// The issued tokens.
    fn store(&self) -> &dyn Store;

    /// The current time, for expiry.
    fn clock(&self) -> &dyn Clock;
}

/// The result of introspecting a token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Introspection {
    /// Unknown, expired or empty token.
    Inactive,

    /// The token is live.
    Active(ActiveToken),
}

/// What an active token grants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveToken {
    /// The client the token was issued to.
    pub client_id: String,

    /// The resource owner who approved the grant.
    pub user_id: String,

    /// The granted scope, verbatim.
    pub scope: String,

    /// Expiry as seconds since the unix epoch.
    pub exp: i64,
}

/// Introspection Response
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntrospectionResponse {
    /// Whether the token is active.
    pub active: bool,

    /// The client the token was issued to.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub client_id: Option<String>,

    /// The resource owner.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user_id: Option<String>,

    /// The resource owner, under its registered claim name.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sub: Option<String>,

    /// The granted scope.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub scope: Option<String>,

    /// Expiry as seconds since the unix epoch.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub exp: Option<i64>,

    /// Always `Bearer` for active tokens.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub token_type: Option<String>,
}

impl From<AccessToken> for ActiveToken {
    fn from(token: AccessToken) -> Self {
        ActiveToken {
            client_id: token.client_id,
            user_id: token.owner_id,
            scope: token.scope,
            exp: token.until.timestamp(),
        }
    }
}

impl Introspection {
    /// Whether the token is active.
    pub fn is_active(&self) -> bool {
        match self {
            Introspection::Active(_) => true,
            Introspection::Inactive => false,
        }
    }

    /// Whether the token is active and its scope covers `required`.
    ///
    /// A granted scope that does not parse covers nothing.
    pub fn allows(&self, required: &Scope) -> bool {
        match self {
            Introspection::Active(active) => match active.scope.parse::<Scope>() {
                Ok(granted) => granted.privileged_to(required),
                Err(_) => false,
            },
            Introspection::Inactive => false,
        }
    }

    /// The serializable response body.
    pub fn response(&self) -> IntrospectionResponse {
        match self {
            Introspection::Inactive => IntrospectionResponse::default(),
            Introspection::Active(active) => IntrospectionResponse {
                active: true,
                client_id: Some(active.client_id.clone()),
                user_id: Some(active.user_id.clone()),
                sub: Some(active.user_id.clone()),
                scope: Some(active.scope.clone()),
                exp: Some(active.exp),
                token_type: Some("Bearer".to_owned()),
            },
        }
    }

    /// Convert the result into a json string, viable for being sent over a network with
    /// `application/json` encoding.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.response())
            .unwrap_or_else(|_| String::from(r#"{"active":false}"#))
    }
}

/// Look up a token and report whether it is active.
pub fn introspect(endpoint: &dyn Endpoint, token: &str) -> Introspection {
    if token.is_empty() {
        return Introspection::Inactive;
    }

    match endpoint.store().check_token(token, endpoint.clock().now()) {
        TokenStatus::Active(token) => Introspection::Active(token.into()),
        TokenStatus::Expired => {
            debug!("introspected token had expired and was removed");
            Introspection::Inactive
        }
        TokenStatus::Missing => Introspection::Inactive,
    }
}
