//! Provides the handling for access token requests.
//!
//! The token endpoint redeems an authorization code for a bearer token. Codes are single use:
//! lookup, validation and deletion happen under the lock of the code in the store, so out of any
//! number of concurrent requests for the same code at most one succeeds.
use std::borrow::Cow;

use chrono::Duration;
use tracing::{debug, info, warn};

use crate::code_grant::error::OAuthError;
use crate::code_grant::Settings;
use crate::primitives::clock::Clock;
use crate::primitives::generator::TagGenerator;
use crate::primitives::grant::{AccessToken, AuthorizationCode};
use crate::primitives::registrar::{Registrar, AUTHORIZATION_CODE};
use crate::primitives::store::{Redemption, Store, Verdict};

/// Token Response
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The access token issued by the authorization server.
    pub access_token: String,

    /// The type of the token issued, always `Bearer`.
    pub token_type: String,

    /// The lifetime in seconds of the access token.
    pub expires_in: i64,

    /// The scope of the access token.
    pub scope: String,
}

/// Interface required from a request to determine the handling in the backend.
pub trait Request {
    /// Received request might not be encoded correctly. If this is the case, no other attribute
    /// is queried and the request is answered with `invalid_request`.
    fn valid(&self) -> bool;

    /// The requested grant type, must be `authorization_code`.
    fn grant_type(&self) -> Option<Cow<str>>;

    /// The authorization code to redeem.
    fn code(&self) -> Option<Cow<str>>;

    /// The redirect uri of the authorization request that produced the code.
    fn redirect_uri(&self) -> Option<Cow<str>>;

    /// Identity of the authenticating client.
    fn client_id(&self) -> Option<Cow<str>>;

    /// The secret of the authenticating client.
    fn client_secret(&self) -> Option<Cow<str>>;
}

/// Required functionality to respond to access token requests.
pub trait Endpoint {
    /// Clients, codes and the issued tokens.
    fn store(&self) -> &dyn Store;

    /// Source of tokens.
    fn generator(&self) -> &dyn TagGenerator;

    /// The current time, for expiry.
    fn clock(&self) -> &dyn Clock;

    /// Lifetime of tokens.
    fn settings(&self) -> &Settings;
}

/// An issued access token together with its lifetime, ready for serialization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BearerToken {
    token: AccessToken,
    expires_in: Duration,
}

impl BearerToken {
    /// The opaque token string.
    pub fn access_token(&self) -> &str {
        &self.token.token
    }

    /// Always `Bearer`.
    pub fn token_type(&self) -> &'static str {
        "Bearer"
    }

    /// Seconds until the token expires, counted from issuance.
    pub fn expires_in(&self) -> i64 {
        self.expires_in.num_seconds()
    }

    /// The scope of the redeemed code, verbatim.
    pub fn scope(&self) -> &str {
        &self.token.scope
    }

    /// The stored token record.
    pub fn token(&self) -> &AccessToken {
        &self.token
    }

    /// The serializable response body.
    pub fn response(&self) -> TokenResponse {
        TokenResponse {
            access_token: self.token.token.clone(),
            token_type: self.token_type().to_owned(),
            expires_in: self.expires_in(),
            scope: self.token.scope.clone(),
        }
    }

    /// Convert the token into a json string, viable for being sent over a network with
    /// `application/json` encoding.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.response()).unwrap_or_else(|_| String::from("{}"))
    }
}

/// Redeem an authorization code for an access token.
///
/// Checks, in order: the request is well formed and names the `authorization_code` grant, the
/// client authenticates and may use that grant, the code exists, has not expired, was issued for
/// the same redirect uri and to the same client. An expired code is deleted on the spot. A code
/// refused for a redirect uri or client mismatch stays redeemable by the rightful request, a
/// missing redirect uri counts as a mismatch.
pub fn access_token(
    endpoint: &dyn Endpoint, request: &dyn Request,
) -> Result<BearerToken, OAuthError> {
    if !request.valid() {
        return Err(OAuthError::invalid_request("malformed request"));
    }

    match request.grant_type() {
        None => return Err(OAuthError::invalid_request("missing parameter grant_type")),
        Some(ref grant_type) if grant_type == AUTHORIZATION_CODE => (),
        Some(grant_type) => {
            debug!(grant_type = %grant_type, "unsupported grant type requested");
            return Err(OAuthError::unsupported_grant_type(
                "only authorization_code is supported",
            ));
        }
    }

    let client = match (request.client_id(), request.client_secret()) {
        (Some(client_id), Some(secret)) => {
            if endpoint.store().authenticate_client(&client_id, &secret) {
                endpoint.store().client(&client_id)
            } else {
                None
            }
        }
        _ => None,
    };

    let client = match client {
        Some(client) => client,
        None => {
            warn!(client_id = ?request.client_id(), "client authentication failed");
            return Err(OAuthError::invalid_client("client authentication failed"));
        }
    };

    if !client.allows_grant_type(AUTHORIZATION_CODE) {
        return Err(OAuthError::unsupported_grant_type(
            "authorization_code is not allowed for this client",
        ));
    }

    let code = request
        .code()
        .ok_or_else(|| OAuthError::invalid_request("missing parameter code"))?;
    let redirect_uri = request.redirect_uri();

    let now = endpoint.clock().now();
    let mut refusal = "";
    let redemption = endpoint.store().take_code(&code, &mut |stored: &AuthorizationCode| {
        if stored.is_expired(now) {
            refusal = "authorization code expired";
            Verdict::Discard
        } else if redirect_uri.as_deref() != Some(stored.redirect_uri.as_str()) {
            refusal = "redirect_uri does not match the authorization request";
            Verdict::Keep
        } else if stored.client_id != client.client_id {
            refusal = "authorization code was issued to another client";
            Verdict::Keep
        } else {
            Verdict::Redeem
        }
    });

    let grant = match redemption {
        Redemption::Redeemed(grant) => grant,
        Redemption::Missing => {
            warn!(client_id = %client.client_id, "unknown or already used authorization code");
            return Err(OAuthError::invalid_grant("unknown authorization code"));
        }
        Redemption::Rejected => {
            warn!(client_id = %client.client_id, reason = refusal, "authorization code refused");
            return Err(OAuthError::invalid_grant(refusal));
        }
    };

    let settings = endpoint.settings();
    let token = AccessToken {
        token: endpoint.generator().opaque_id(settings.id_bytes()),
        client_id: grant.client_id,
        owner_id: grant.owner_id,
        scope: grant.scope,
        until: now + settings.token_lifetime,
    };
    endpoint.store().put_token(token.clone());

    info!(client_id = %token.client_id, user_id = %token.owner_id, "access token issued");
    Ok(BearerToken {
        token,
        expires_in: settings.token_lifetime,
    })
}
