//! # oxide-issuer
//!
//! The core of an OAuth 2.0 authorization server for the authorization code grant.
//!
//! ## About
//!
//! `oxide-issuer` registers clients, walks the resource owner through login and consent, issues
//! single-use authorization codes, exchanges them for opaque bearer tokens and answers token
//! introspection. It does not speak http itself: each step takes plain request values and returns
//! abstract results, which a web server turns into pages, redirects and json bodies.
//!
//! ## Layout
//!
//! The [`primitives`] hold the policies and state: a credential store, a generator for opaque
//! identifiers, client validation and the server side state of pending flows. The [`code_grant`]
//! backend runs the protocol over any set of primitives. The [`endpoint`] module offers the
//! [`Issuer`], which bundles both for in-memory use and can be built from a [`config`].
//!
//! Every flow step that reads and then changes state does so under the lock of the single entry
//! concerned. An authorization code is redeemed at most once even when presented concurrently.
//!
//! _WARNING_: Hosts MUST serve all endpoints over TLS, client secrets, codes and tokens travel in
//! plain form.
//!
//! [`primitives`]: primitives/index.html
//! [`code_grant`]: code_grant/index.html
//! [`endpoint`]: endpoint/index.html
//! [`Issuer`]: endpoint/struct.Issuer.html
//! [`config`]: config/index.html
#![warn(missing_docs)]

#[macro_use]
extern crate serde_derive;

pub mod code_grant;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod primitives;

pub use crate::endpoint::Issuer;
pub use crate::error::{Error, Result};
