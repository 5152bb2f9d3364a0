//! Shared setup of the integration tests.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use oxide_issuer::code_grant::authorization::{Decision, Login, Redirect};
use oxide_issuer::config::{ClientSeed, IssuerConfig, UserSeed};
use oxide_issuer::endpoint::{AuthorizationRequest, Issuer, TokenRequest};
use oxide_issuer::primitives::clock::ManualClock;
use oxide_issuer::primitives::generator::TagGenerator;

use chrono::{TimeZone, Utc};
use tracing_subscriber::EnvFilter;

pub mod defaults {
    pub const EXAMPLE_CLIENT_ID: &str = "demo-client";
    pub const EXAMPLE_SECRET: &str = "demo-secret";
    pub const EXAMPLE_REDIRECT_URI: &str = "http://localhost:8080/callback";
    pub const EXAMPLE_SCOPE: &str = "read";
    pub const EXAMPLE_STATE: &str = "xyz";
    pub const EXAMPLE_OWNER_ID: &str = "user-1";
    pub const EXAMPLE_USERNAME: &str = "alice";
    pub const EXAMPLE_PASSWORD: &str = "wonderland";
    pub const OTHER_CLIENT_ID: &str = "other-client";
    pub const OTHER_SECRET: &str = "other-secret";
    pub const START_TIMESTAMP: i64 = 1_600_000_000;
}

use self::defaults::*;

/// Predictable identifiers, distinct for every call.
#[derive(Default)]
pub struct TestGenerator {
    counter: AtomicUsize,
}

impl TagGenerator for TestGenerator {
    fn opaque_id(&self, _: usize) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("Tag{:08}", n)
    }
}

/// Log to the test output, filtered by `RUST_LOG`.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn config() -> IssuerConfig {
    let mut config = IssuerConfig::default();
    let mut demo = ClientSeed::new(EXAMPLE_CLIENT_ID, EXAMPLE_SECRET, EXAMPLE_REDIRECT_URI);
    demo.scope = EXAMPLE_SCOPE.to_string();
    demo.name = "Demo Client".to_string();
    config.clients.push(demo);
    config.clients.push(ClientSeed::new(OTHER_CLIENT_ID, OTHER_SECRET, EXAMPLE_REDIRECT_URI));
    config.users.push(UserSeed::new(EXAMPLE_OWNER_ID, EXAMPLE_USERNAME, EXAMPLE_PASSWORD));
    config
}

/// An issuer with the example registry and a clock under control of the test.
pub fn setup() -> (Issuer, Arc<ManualClock>) {
    init_logging();
    let clock = Arc::new(ManualClock::new(Utc.timestamp_opt(START_TIMESTAMP, 0).unwrap()));
    let issuer = Issuer::from_config(config())
        .expect("Example configuration is valid")
        .with_clock(clock.clone())
        .with_generator(TestGenerator::default());
    (issuer, clock)
}

pub fn example_request() -> AuthorizationRequest {
    AuthorizationRequest::new(EXAMPLE_CLIENT_ID, EXAMPLE_REDIRECT_URI)
        .with_scope(EXAMPLE_SCOPE)
        .with_state(EXAMPLE_STATE)
}

/// Walk the example request through login and consent.
pub fn authorize(issuer: &Issuer, decision: Decision) -> Redirect {
    let pending = issuer
        .start_authorization(&example_request())
        .expect("Example request is valid");
    match issuer.submit_login(&pending.flow, EXAMPLE_USERNAME, EXAMPLE_PASSWORD) {
        Ok(Login::NeedsConsent { .. }) => (),
        other => panic!("Expected the example user to log in, got {:?}", other),
    }
    issuer
        .submit_consent(&pending.flow, decision)
        .expect("Consent after login is accepted")
}

/// A code issued to the example client.
pub fn example_code(issuer: &Issuer) -> String {
    authorize(issuer, Decision::Approve)
        .code()
        .expect("Approval issues a code")
        .to_string()
}

pub fn example_exchange(code: &str) -> TokenRequest {
    TokenRequest::new(code, EXAMPLE_REDIRECT_URI, EXAMPLE_CLIENT_ID, EXAMPLE_SECRET)
}
