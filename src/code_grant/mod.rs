//! Available backend algorithms.
//!
//! The backend codifies the authorization code grant of [RFC 6749] into types and functions. Each
//! submodule defines the `Request` it reads its parameters from and the `Endpoint` supplying the
//! primitives it operates on, and returns abstract results which the presentation layer turns
//! into redirects, pages or json bodies.
//!
//! * [`authorization`] drives an authorization request through login and consent to a code.
//! * [`accesstoken`] redeems a code for a bearer token, exactly once.
//! * [`introspection`] reports whether a token is active.
//!
//! For most purposes the [`Issuer`] bundles all of them over in-memory primitives.
//!
//! [RFC 6749]: https://tools.ietf.org/html/rfc6749
//! [`authorization`]: authorization/index.html
//! [`accesstoken`]: accesstoken/index.html
//! [`introspection`]: introspection/index.html
//! [`Issuer`]: ../endpoint/struct.Issuer.html
use chrono::Duration;

use crate::primitives::generator::MIN_TOKEN_BYTES;

pub mod accesstoken;
pub mod authorization;
pub mod error;
pub mod introspection;

/// Lifetimes and sizes of the credentials handed out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settings {
    /// How long an authorization code can be redeemed.
    pub code_lifetime: Duration,

    /// How long an access token stays active.
    pub token_lifetime: Duration,

    /// How long an authorization request may wait for login and consent.
    pub flow_lifetime: Duration,

    /// Random bytes in codes, tokens, flow ids and client secrets.
    pub token_bytes: usize,

    /// Characters in generated client identifiers.
    pub client_id_len: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            code_lifetime: Duration::minutes(10),
            token_lifetime: Duration::hours(1),
            flow_lifetime: Duration::minutes(10),
            token_bytes: MIN_TOKEN_BYTES,
            client_id_len: 16,
        }
    }
}

impl Settings {
    /// Random bytes per generated code, token and flow id, never fewer than `MIN_TOKEN_BYTES`.
    pub fn id_bytes(&self) -> usize {
        self.token_bytes.max(MIN_TOKEN_BYTES)
    }
}
