#[allow(dead_code)]
mod support;

use oxide_issuer::code_grant::introspection::{ActiveToken, Introspection, IntrospectionResponse};
use oxide_issuer::primitives::scope::Scope;
use oxide_issuer::primitives::store::Store;

use chrono::Duration;

use support::defaults::*;
use support::{example_code, example_exchange, setup};

#[test]
fn active_token_metadata() {
    let (issuer, _) = setup();
    let code = example_code(&issuer);
    let token = issuer.exchange_token(&example_exchange(&code)).unwrap();

    let result = issuer.introspect(token.access_token());
    assert_eq!(
        result,
        Introspection::Active(ActiveToken {
            client_id: EXAMPLE_CLIENT_ID.to_string(),
            user_id: EXAMPLE_OWNER_ID.to_string(),
            scope: EXAMPLE_SCOPE.to_string(),
            exp: START_TIMESTAMP + 3600,
        })
    );

    let read: Scope = "read".parse().unwrap();
    let write: Scope = "read write".parse().unwrap();
    assert!(result.allows(&read));
    assert!(!result.allows(&write));
}

#[test]
fn introspection_is_idempotent() {
    let (issuer, _) = setup();
    let code = example_code(&issuer);
    let token = issuer.exchange_token(&example_exchange(&code)).unwrap();

    let first = issuer.introspect(token.access_token());
    let second = issuer.introspect(token.access_token());
    assert_eq!(first, second);
    assert_eq!(issuer.store().token_count(), 1);
}

#[test]
fn unknown_token_is_inactive() {
    let (issuer, _) = setup();
    let result = issuer.introspect("no-such-token");
    assert!(!result.is_active());
    assert_eq!(result.to_json(), r#"{"active":false}"#);
    assert!(!issuer.introspect("").is_active());
}

#[test]
fn expired_token_is_inactive_and_removed() {
    let (issuer, clock) = setup();
    let code = example_code(&issuer);
    let token = issuer.exchange_token(&example_exchange(&code)).unwrap();

    clock.advance(Duration::seconds(3600));
    assert!(issuer.introspect(token.access_token()).is_active());

    clock.advance(Duration::seconds(1));
    assert_eq!(issuer.introspect(token.access_token()), Introspection::Inactive);
    assert!(issuer.store().get_token(token.access_token()).is_none());
}

#[test]
fn json_shape() {
    let (issuer, _) = setup();
    let code = example_code(&issuer);
    let token = issuer.exchange_token(&example_exchange(&code)).unwrap();

    let json = issuer.introspect(token.access_token()).to_json();
    let body: IntrospectionResponse = serde_json::from_str(&json).unwrap();
    assert!(body.active);
    assert_eq!(body.client_id.as_deref(), Some(EXAMPLE_CLIENT_ID));
    assert_eq!(body.user_id.as_deref(), Some(EXAMPLE_OWNER_ID));
    assert_eq!(body.scope.as_deref(), Some(EXAMPLE_SCOPE));
    assert_eq!(body.exp, Some(START_TIMESTAMP + 3600));
    assert_eq!(body.token_type.as_deref(), Some("Bearer"));
}
