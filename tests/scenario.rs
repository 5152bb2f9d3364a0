//! The complete life of a grant, as a client and its user see it.
#[allow(dead_code)]
mod support;

use oxide_issuer::code_grant::authorization::{Decision, Login, Redirect};
use oxide_issuer::code_grant::error::ErrorType;
use oxide_issuer::endpoint::{AuthorizationRequest, TokenRequest};

use chrono::Duration;

use support::defaults::*;
use support::setup;

#[test]
fn demo_client_end_to_end() {
    let (issuer, clock) = setup();

    let request = AuthorizationRequest::from_query(
        "response_type=code&client_id=demo-client\
         &redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fcallback&scope=read&state=xyz",
    );
    let pending = issuer.start_authorization(&request).unwrap();
    assert_eq!(pending.params.client_id, EXAMPLE_CLIENT_ID);

    match issuer.submit_login(&pending.flow, EXAMPLE_USERNAME, "wrong").unwrap() {
        Login::Failed { .. } => (),
        other => panic!("Expected the wrong password to fail, got {:?}", other),
    }

    match issuer
        .submit_login(&pending.flow, EXAMPLE_USERNAME, EXAMPLE_PASSWORD)
        .unwrap()
    {
        Login::NeedsConsent { user_id, .. } => assert_eq!(user_id, EXAMPLE_OWNER_ID),
        other => panic!("Expected consent to be required, got {:?}", other),
    }

    let code = match issuer.submit_consent(&pending.flow, Decision::Approve).unwrap() {
        Redirect::WithCode { code, state, location } => {
            assert_eq!(state.as_deref(), Some("xyz"));
            assert_eq!(location.host_str(), Some("localhost"));
            assert_eq!(location.port(), Some(8080));
            assert_eq!(location.path(), "/callback");
            code
        }
        other => panic!("Expected a code, got {:?}", other),
    };

    let exchange = TokenRequest::new(&code, EXAMPLE_REDIRECT_URI, EXAMPLE_CLIENT_ID, EXAMPLE_SECRET);
    let token = issuer.exchange_token(&exchange).unwrap();
    assert_eq!(token.token_type(), "Bearer");
    assert_eq!(token.expires_in(), 3600);
    assert_eq!(token.scope(), "read");

    let replay = issuer.exchange_token(&exchange).unwrap_err();
    assert_eq!(replay.kind(), ErrorType::InvalidGrant);

    let active = issuer.introspect(token.access_token());
    assert!(active.is_active());
    let body: serde_json::Value = serde_json::from_str(&active.to_json()).unwrap();
    assert_eq!(body["active"], true);
    assert_eq!(body["client_id"], EXAMPLE_CLIENT_ID);
    assert_eq!(body["user_id"], EXAMPLE_OWNER_ID);
    assert_eq!(body["scope"], "read");

    clock.advance(Duration::seconds(3601));
    assert!(!issuer.introspect(token.access_token()).is_active());
}

#[test]
fn dynamic_registration_end_to_end() {
    let (issuer, _) = setup();
    let mut registration = oxide_issuer::primitives::registrar::ClientRegistration::new(
        "Dynamic",
        "https://dynamic.example/cb",
    );
    registration.scope = "profile".to_string();
    let registered = issuer.register_client(registration).unwrap();

    let request = AuthorizationRequest::new(&registered.client_id, "https://dynamic.example/cb");
    let pending = issuer.start_authorization(&request).unwrap();
    assert_eq!(pending.params.scope, "profile");
    issuer
        .submit_login(&pending.flow, EXAMPLE_USERNAME, EXAMPLE_PASSWORD)
        .unwrap();
    let redirect = issuer.submit_consent(&pending.flow, Decision::Approve).unwrap();

    let exchange = TokenRequest::new(
        redirect.code().unwrap(),
        "https://dynamic.example/cb",
        &registered.client_id,
        &registered.client_secret,
    );
    let token = issuer.exchange_token(&exchange).unwrap();
    assert_eq!(token.scope(), "profile");
}

#[test]
fn demo_at_cb_x() {
    use oxide_issuer::config::{ClientSeed, UserSeed};
    use oxide_issuer::primitives::clock::ManualClock;
    use oxide_issuer::Issuer;
    use std::sync::Arc;

    let mut config = oxide_issuer::config::IssuerConfig::default();
    config.clients.push(ClientSeed::new("demo", "secret", "http://cb/x"));
    config.users.push(UserSeed::new("u1", "demo-user", "pass"));
    let clock = Arc::new(ManualClock::starting_now());
    let issuer = Issuer::from_config(config).unwrap().with_clock(clock.clone());

    let pending = issuer
        .start_authorization(&AuthorizationRequest::new("demo", "http://cb/x"))
        .unwrap();
    assert!(matches!(
        issuer.submit_login(&pending.flow, "demo-user", "wrong").unwrap(),
        Login::Failed { .. }
    ));
    assert!(matches!(
        issuer.submit_login(&pending.flow, "demo-user", "pass").unwrap(),
        Login::NeedsConsent { .. }
    ));
    let redirect = issuer.submit_consent(&pending.flow, Decision::Approve).unwrap();
    let code = redirect.code().unwrap().to_string();

    let exchange = TokenRequest::new(&code, "http://cb/x", "demo", "secret");
    let token = issuer.exchange_token(&exchange).unwrap();
    assert_eq!(
        issuer.exchange_token(&exchange).unwrap_err().kind(),
        ErrorType::InvalidGrant
    );
    assert!(issuer.introspect(token.access_token()).is_active());

    clock.advance(Duration::seconds(3601));
    assert!(!issuer.introspect(token.access_token()).is_active());
}
