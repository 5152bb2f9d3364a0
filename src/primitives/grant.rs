//! Records of the credentials handed out by the issuer.
//!
//! Both an authorization code and an access token bind a client and a resource owner to a scope
//! until some point in time. Neither is ever modified after creation: a code is removed when it is
//! redeemed or found to be expired, a token when it is found to be expired.
use super::Time;

/// A single-use credential proving that a resource owner approved a client's request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizationCode {
    /// The opaque code itself, the key under which it is stored.
    pub code: String,

    /// Identifies the client to which the code was issued.
    pub client_id: String,

    /// Identifies the resource owner who approved the request.
    pub owner_id: String,

    /// The requested scope, verbatim.
    pub scope: String,

    /// The exact redirect uri presented when the code was issued.
    ///
    /// The token request must present the same string again.
    pub redirect_uri: String,

    /// Expiration date of the code (Utc).
    pub until: Time,
}

/// A credential a client presents to act on behalf of a resource owner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessToken {
    /// The opaque token itself, the key under which it is stored.
    pub token: String,

    /// Identifies the client to which the token was issued.
    pub client_id: String,

    /// Identifies the resource owner.
    pub owner_id: String,

    /// The granted scope, copied from the authorization code.
    pub scope: String,

    /// Expiration date of the token (Utc).
    pub until: Time,
}

impl AuthorizationCode {
    /// Whether the code can no longer be redeemed at `now`.
    pub fn is_expired(&self, now: Time) -> bool {
        self.until < now
    }
}

impl AccessToken {
    /// Whether the token is no longer active at `now`.
    pub fn is_expired(&self, now: Time) -> bool {
        self.until < now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn expiry_boundary() {
        let issued = Utc.timestamp_opt(1_000, 0).unwrap();
        let code = AuthorizationCode {
            code: "code".into(),
            client_id: "client".into(),
            owner_id: "owner".into(),
            scope: "read".into(),
            redirect_uri: "https://client.example/cb".into(),
            until: issued + Duration::minutes(10),
        };

        assert!(!code.is_expired(issued));
        assert!(!code.is_expired(issued + Duration::seconds(600)));
        assert!(code.is_expired(issued + Duration::seconds(601)));
    }
}
