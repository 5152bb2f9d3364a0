//! The issuer, bundling every flow over one set of primitives.
//!
//! An [`Issuer`] owns the in-memory store, the pending flows, a generator and a clock, and exposes
//! each step of the authorization code grant as a method. It is `Send + Sync`; share it between
//! request handlers through an `Arc`. Translating its results into http responses is left to the
//! host:
//!
//! * [`start_authorization`] answers the authorization endpoint with a login page for the flow,
//! * [`submit_login`] and [`submit_consent`] answer the forms of those pages, the latter with a
//!   redirect to the client,
//! * [`exchange_token`] and [`introspect`] produce json bodies for the token and introspection
//!   endpoints.
//!
//! ```
//! use oxide_issuer::endpoint::{AuthorizationRequest, Issuer, TokenRequest};
//! use oxide_issuer::code_grant::authorization::{Decision, Login};
//! use oxide_issuer::config::{ClientSeed, IssuerConfig, UserSeed};
//!
//! let mut config = IssuerConfig::default();
//! config.clients.push(ClientSeed::new("demo", "secret", "http://localhost/cb"));
//! config.users.push(UserSeed::new("user-1", "alice", "wonderland"));
//! let issuer = Issuer::from_config(config).unwrap();
//!
//! let request = AuthorizationRequest::new("demo", "http://localhost/cb").with_state("xyz");
//! let pending = issuer.start_authorization(&request).unwrap();
//! match issuer.submit_login(&pending.flow, "alice", "wonderland").unwrap() {
//!     Login::NeedsConsent { .. } => (),
//!     Login::Failed { .. } => unreachable!(),
//! }
//!
//! let redirect = issuer.submit_consent(&pending.flow, Decision::Approve).unwrap();
//! let code = redirect.code().unwrap();
//! let token = issuer
//!     .exchange_token(&TokenRequest::new(code, "http://localhost/cb", "demo", "secret"))
//!     .unwrap();
//! assert!(issuer.introspect(token.access_token()).is_active());
//! ```
//!
//! [`Issuer`]: struct.Issuer.html
//! [`start_authorization`]: struct.Issuer.html#method.start_authorization
//! [`submit_login`]: struct.Issuer.html#method.submit_login
//! [`submit_consent`]: struct.Issuer.html#method.submit_consent
//! [`exchange_token`]: struct.Issuer.html#method.exchange_token
//! [`introspect`]: struct.Issuer.html#method.introspect
mod query;

use std::fmt;

use tracing::{debug, info};

pub use self::query::{AuthorizationRequest, NormalizedParameter, TokenRequest};

use crate::code_grant::accesstoken::{self, BearerToken};
use crate::code_grant::authorization::{self, Decision, Login, Pending, Redirect};
use crate::code_grant::error::OAuthError;
use crate::code_grant::introspection::{self, Introspection};
use crate::code_grant::Settings;
use crate::config::IssuerConfig;
use crate::error::Error;
use crate::primitives::clock::{Clock, SystemClock};
use crate::primitives::flow::FlowMap;
use crate::primitives::generator::{RandomGenerator, TagGenerator};
use crate::primitives::registrar::{self, ClientRegistration, Registered};
use crate::primitives::store::{MemoryStore, Purged, Store, User};

/// An authorization server issuing codes and bearer tokens.
pub struct Issuer {
    store: MemoryStore,
    flows: FlowMap,
    generator: Box<dyn TagGenerator>,
    clock: Box<dyn Clock>,
    settings: Settings,
}

impl Issuer {
    /// An issuer with default lifetimes, random credentials and the system clock.
    pub fn new() -> Self {
        Issuer {
            store: MemoryStore::new(),
            flows: FlowMap::new(),
            generator: Box::new(RandomGenerator::new()),
            clock: Box::new(SystemClock),
            settings: Settings::default(),
        }
    }

    /// Build an issuer and seed its registry from a configuration.
    pub fn from_config(config: IssuerConfig) -> Result<Self, Error> {
        config.validate()?;
        let issuer = Issuer::new().with_settings(config.settings());

        for seed in &config.clients {
            issuer.store.put_client(seed.to_client()?)?;
        }

        let users = config.users.len();
        for seed in config.users {
            issuer.store.put_user(User::from(seed))?;
        }

        info!(clients = config.clients.len(), users, "issuer configured");
        Ok(issuer)
    }

    /// Replace the lifetimes and sizes.
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Replace the time source.
    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Replace the source of opaque identifiers.
    pub fn with_generator<G: TagGenerator + 'static>(mut self, generator: G) -> Self {
        self.generator = Box::new(generator);
        self
    }

    /// The underlying registry and credentials.
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// The active lifetimes and sizes.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Number of authorization requests waiting for login or consent.
    pub fn pending_flows(&self) -> usize {
        self.flows.len()
    }

    /// Validate an authorization request. The resource owner is to log in next.
    pub fn start_authorization(
        &self, request: &AuthorizationRequest,
    ) -> Result<Pending, OAuthError> {
        authorization::start(self, request)
    }

    /// Check the credentials of the resource owner for a pending flow.
    pub fn submit_login(
        &self, flow: &str, username: &str, password: &str,
    ) -> Result<Login, OAuthError> {
        authorization::login(self, flow, username, password)
    }

    /// Conclude a flow with the decision of the logged in resource owner.
    pub fn submit_consent(&self, flow: &str, decision: Decision) -> Result<Redirect, OAuthError> {
        authorization::consent(self, flow, decision)
    }

    /// Redeem an authorization code for an access token.
    pub fn exchange_token(&self, request: &TokenRequest) -> Result<BearerToken, OAuthError> {
        accesstoken::access_token(self, request)
    }

    /// Report whether an access token is active.
    pub fn introspect(&self, token: &str) -> Introspection {
        introspection::introspect(self, token)
    }

    /// Register a client with generated credentials.
    ///
    /// A refused registration is reported as `invalid_request`.
    pub fn register_client(
        &self, registration: ClientRegistration,
    ) -> Result<Registered, OAuthError> {
        registrar::register_client(
            &self.store,
            self.generator.as_ref(),
            registration,
            self.settings.client_id_len,
            self.settings.token_bytes,
        )
        .map_err(|err| OAuthError::invalid_request(err.to_string()))
    }

    /// Remove every expired code, token and flow.
    ///
    /// Expired entries are never honored even without a sweep, this only bounds memory.
    pub fn purge_expired(&self) -> Purged {
        let now = self.clock.now();
        let purged = self.store.purge_expired(now);
        let flows = self.flows.purge_expired(now);
        debug!(codes = purged.codes, tokens = purged.tokens, flows, "purged expired entries");
        purged
    }
}

impl Default for Issuer {
    fn default() -> Self {
        Issuer::new()
    }
}

impl authorization::Endpoint for Issuer {
    fn store(&self) -> &dyn Store {
        &self.store
    }

    fn flows(&self) -> &FlowMap {
        &self.flows
    }

    fn generator(&self) -> &dyn TagGenerator {
        self.generator.as_ref()
    }

    fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    fn settings(&self) -> &Settings {
        &self.settings
    }
}

impl accesstoken::Endpoint for Issuer {
    fn store(&self) -> &dyn Store {
        &self.store
    }

    fn generator(&self) -> &dyn TagGenerator {
        self.generator.as_ref()
    }

    fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    fn settings(&self) -> &Settings {
        &self.settings
    }
}

impl introspection::Endpoint for Issuer {
    fn store(&self) -> &dyn Store {
        &self.store
    }

    fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }
}

impl fmt::Debug for Issuer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Issuer")
            .field("store", &self.store)
            .field("flows", &self.flows.len())
            .field("settings", &self.settings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code_grant::error::ErrorType;
    use crate::config::{ClientSeed, UserSeed};
    use crate::primitives::clock::ManualClock;
    use chrono::Duration;
    use std::sync::Arc;

    fn assert_send_sync<T: Send + Sync + 'static>() {}

    #[test]
    fn shareable() {
        assert_send_sync::<Issuer>();
    }

    #[test]
    fn seeded_from_config() {
        let mut config = IssuerConfig::default();
        config.clients.push(ClientSeed::new("demo", "secret", "http://localhost/cb"));
        config.users.push(UserSeed::new("user-1", "alice", "wonderland"));

        let issuer = Issuer::from_config(config.clone()).unwrap();
        assert!(issuer.store().get_client("demo").is_some());
        assert!(issuer.store().find_user_by_username("alice").is_some());

        config.users.push(UserSeed::new("user-2", "alice", "other"));
        match Issuer::from_config(config) {
            Err(Error::Store(_)) => (),
            other => panic!("Expected a duplicate user to be refused, got {:?}", other),
        }
    }

    #[test]
    fn registration() {
        let issuer = Issuer::new();
        let registered = issuer
            .register_client(ClientRegistration::new("App", "https://app.example/cb"))
            .unwrap();
        assert_eq!(registered.client_id.len(), 16);

        let refused = issuer
            .register_client(ClientRegistration::new("App", "not a url"))
            .unwrap_err();
        assert_eq!(refused.kind(), ErrorType::InvalidRequest);
    }

    #[test]
    fn undersized_settings() {
        let mut config = IssuerConfig::default();
        config.clients.push(ClientSeed::new("demo", "secret", "http://localhost/cb"));
        let settings = Settings {
            token_bytes: 0,
            client_id_len: 0,
            ..Settings::default()
        };
        let issuer = Issuer::from_config(config).unwrap().with_settings(settings);

        let request = AuthorizationRequest::new("demo", "http://localhost/cb");
        let first = issuer.start_authorization(&request).unwrap();
        let second = issuer.start_authorization(&request).unwrap();
        assert_eq!(first.flow.len(), 43);
        assert_ne!(first.flow, second.flow);

        let registered = issuer
            .register_client(ClientRegistration::new("App", "https://app.example/cb"))
            .unwrap();
        assert_eq!(registered.client_id.len(), 8);
    }

    #[test]
    fn sweep() {
        let clock = Arc::new(ManualClock::starting_now());
        let mut config = IssuerConfig::default();
        config.clients.push(ClientSeed::new("demo", "secret", "http://localhost/cb"));
        let issuer = Issuer::from_config(config).unwrap().with_clock(clock.clone());

        issuer
            .start_authorization(&AuthorizationRequest::new("demo", "http://localhost/cb"))
            .unwrap();
        assert_eq!(issuer.pending_flows(), 1);

        clock.advance(Duration::minutes(11));
        issuer.purge_expired();
        assert_eq!(issuer.pending_flows(), 0);
    }
}
