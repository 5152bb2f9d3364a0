//! Errors defined in [rfc6749].
//!
//! The error codes are the wire contract with OAuth-aware clients and are reproduced verbatim.
//!
//! [rfc6749]: https://tools.ietf.org/html/rfc6749#section-5.2
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::vec;

use thiserror::Error;

/// All error codes the issuer reports.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ErrorType {
    /// The request is missing a required parameter, includes an invalid parameter value, or is
    /// otherwise malformed.
    InvalidRequest,

    /// Client authentication failed, or the client is unknown.
    InvalidClient,

    /// The authorization code is unknown, expired, already used, was issued to another client or
    /// does not match the redirection uri used in the authorization request.
    InvalidGrant,

    /// The grant type is not supported by the issuer or not allowed for the client.
    UnsupportedGrantType,

    /// The resource owner denied the request.
    AccessDenied,
}

impl ErrorType {
    fn description(self) -> &'static str {
        match self {
            ErrorType::InvalidRequest => "invalid_request",
            ErrorType::InvalidClient => "invalid_client",
            ErrorType::InvalidGrant => "invalid_grant",
            ErrorType::UnsupportedGrantType => "unsupported_grant_type",
            ErrorType::AccessDenied => "access_denied",
        }
    }
}

impl AsRef<str> for ErrorType {
    fn as_ref(&self) -> &str {
        self.description()
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

/// An error code together with a human readable description.
///
/// Rendered into the query of an error redirect or into the json body of a token endpoint
/// response, see [`iter`] and [`to_json`].
///
/// [`iter`]: #method.iter
/// [`to_json`]: #method.to_json
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{error}: {description}")]
pub struct OAuthError {
    error: ErrorType,
    description: Cow<'static, str>,
}

impl OAuthError {
    /// Construct an error of the given kind.
    pub fn new<D: Into<Cow<'static, str>>>(error: ErrorType, description: D) -> Self {
        OAuthError {
            error,
            description: description.into(),
        }
    }

    /// Shorthand for `invalid_request`.
    pub fn invalid_request<D: Into<Cow<'static, str>>>(description: D) -> Self {
        OAuthError::new(ErrorType::InvalidRequest, description)
    }

    /// Shorthand for `invalid_client`.
    pub fn invalid_client<D: Into<Cow<'static, str>>>(description: D) -> Self {
        OAuthError::new(ErrorType::InvalidClient, description)
    }

    /// Shorthand for `invalid_grant`.
    pub fn invalid_grant<D: Into<Cow<'static, str>>>(description: D) -> Self {
        OAuthError::new(ErrorType::InvalidGrant, description)
    }

    /// Shorthand for `unsupported_grant_type`.
    pub fn unsupported_grant_type<D: Into<Cow<'static, str>>>(description: D) -> Self {
        OAuthError::new(ErrorType::UnsupportedGrantType, description)
    }

    /// Shorthand for `access_denied`.
    pub fn access_denied<D: Into<Cow<'static, str>>>(description: D) -> Self {
        OAuthError::new(ErrorType::AccessDenied, description)
    }

    /// Get the formal kind of error.
    pub fn kind(&self) -> ErrorType {
        self.error
    }

    /// The short text explanation.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Iterate over the key value pairs that describe this error.
    ///
    /// These pairs appear as part of a form urlencoded query component in a redirect, or as the
    /// members of a json error body.
    pub fn iter(&self) -> vec::IntoIter<(&'static str, Cow<'static, str>)> {
        self.into_iter()
    }

    /// Convert the error into a json string, viable for being sent over a network with
    /// `application/json` encoding.
    pub fn to_json(&self) -> String {
        let asmap = self
            .iter()
            .map(|(k, v)| (k, v.into_owned()))
            .collect::<BTreeMap<&'static str, String>>();
        serde_json::to_string(&asmap).unwrap_or_else(|_| String::from("{}"))
    }
}

/// The error as key-value pairs.
impl IntoIterator for OAuthError {
    type Item = (&'static str, Cow<'static, str>);
    type IntoIter = vec::IntoIter<(&'static str, Cow<'static, str>)>;

    fn into_iter(self) -> Self::IntoIter {
        vec![
            ("error", Cow::Borrowed(self.error.description())),
            ("error_description", self.description),
        ]
        .into_iter()
    }
}

impl IntoIterator for &'_ OAuthError {
    type Item = (&'static str, Cow<'static, str>);
    type IntoIter = vec::IntoIter<(&'static str, Cow<'static, str>)>;

    fn into_iter(self) -> Self::IntoIter {
        vec![
            ("error", Cow::Borrowed(self.error.description())),
            ("error_description", self.description.clone()),
        ]
        .into_iter()
    }
}
