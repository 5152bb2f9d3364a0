//! Provides the handling for authorization code requests.
//!
//! An authorization request is validated once in [`start`], then parked in the [`FlowMap`] while
//! the resource owner logs in through [`login`] and decides in [`consent`]. Only the opaque flow
//! id travels through the user agent, every parameter and the authenticated user stay on the
//! server.
//!
//! [`start`]: fn.start.html
//! [`login`]: fn.login.html
//! [`consent`]: fn.consent.html
//! [`FlowMap`]: ../../primitives/flow/struct.FlowMap.html
use std::borrow::Cow;

use tracing::{debug, info, warn};
use url::Url;

use crate::code_grant::error::OAuthError;
use crate::code_grant::Settings;
use crate::primitives::clock::Clock;
use crate::primitives::flow::{AuthorizationParams, FlowLookup, FlowMap, FlowSession, FlowState};
use crate::primitives::generator::TagGenerator;
use crate::primitives::grant::AuthorizationCode;
use crate::primitives::registrar::{Registrar, RESPONSE_TYPE_CODE};
use crate::primitives::scope::Scope;
use crate::primitives::store::Store;

/// Interface required from a request to determine the handling in the backend.
pub trait Request {
    /// Received request might not be encoded correctly. If this is the case, no other attribute
    /// is queried and the request is answered with `invalid_request`.
    fn valid(&self) -> bool;

    /// Identity of the client trying to gain an authorization code.
    fn client_id(&self) -> Option<Cow<str>>;

    /// Valid requests name one of the registered redirect urls of the client.
    fn redirect_uri(&self) -> Option<Cow<str>>;

    /// The method requested, valid requests return `code`.
    fn response_type(&self) -> Option<Cow<str>>;

    /// Optionally specifies the requested scope.
    fn scope(&self) -> Option<Cow<str>>;

    /// Optional parameter the client can use to identify the redirected user-agent.
    fn state(&self) -> Option<Cow<str>>;
}

/// Required functionality to respond to authorization code requests.
pub trait Endpoint {
    /// Clients, users and the issued codes.
    fn store(&self) -> &dyn Store;

    /// Pending authorization requests.
    fn flows(&self) -> &FlowMap;

    /// Source of flow ids and codes.
    fn generator(&self) -> &dyn TagGenerator;

    /// The current time, for expiry.
    fn clock(&self) -> &dyn Clock;

    /// Lifetimes of flows and codes.
    fn settings(&self) -> &Settings;
}

/// A validated request waiting for the resource owner to log in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pending {
    /// The opaque id to continue the flow with.
    pub flow: String,

    /// The validated parameters.
    pub params: AuthorizationParams,

    /// Name of the requesting client, to show to the resource owner.
    pub client_name: String,
}

/// Outcome of a login attempt on a pending flow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Login {
    /// The resource owner is authenticated and is asked for consent next.
    NeedsConsent {
        /// The flow to continue with.
        flow: String,

        /// The authenticated user.
        user_id: String,

        /// The parameters, for rendering the consent page.
        params: AuthorizationParams,
    },

    /// Username or password did not match. The flow still awaits a login.
    Failed {
        /// The flow to retry with.
        flow: String,

        /// The parameters, for rendering the login page again.
        params: AuthorizationParams,
    },
}

/// What the resource owner decided.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Issue a code to the client.
    Approve,

    /// Refuse the client.
    Deny,
}

/// Where the user agent is sent once the flow concluded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Redirect {
    /// The resource owner approved, an authorization code was issued.
    WithCode {
        /// The issued code.
        code: String,

        /// The state of the request, unchanged.
        state: Option<String>,

        /// The redirect uri with `code` and `state` appended to its query.
        location: Url,
    },

    /// The resource owner denied the request.
    WithError {
        /// Always `access_denied`.
        error: OAuthError,

        /// The state of the request, unchanged.
        state: Option<String>,

        /// The redirect uri with the error and `state` appended to its query.
        location: Url,
    },
}

impl Redirect {
    /// The url to send the user agent to.
    pub fn location(&self) -> &Url {
        match self {
            Redirect::WithCode { location, .. } => location,
            Redirect::WithError { location, .. } => location,
        }
    }

    /// The state echoed back to the client.
    pub fn state(&self) -> Option<&str> {
        match self {
            Redirect::WithCode { state, .. } => state.as_deref(),
            Redirect::WithError { state, .. } => state.as_deref(),
        }
    }

    /// The issued code, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            Redirect::WithCode { code, .. } => Some(code),
            Redirect::WithError { .. } => None,
        }
    }
}

fn required<'a>(value: Option<Cow<'a, str>>, name: &str) -> Result<Cow<'a, str>, OAuthError> {
    value
        .filter(|value| !value.is_empty())
        .ok_or_else(|| OAuthError::invalid_request(format!("missing parameter {}", name)))
}

/// Validate an authorization request and park it until the resource owner logs in.
///
/// Checks, in order: required parameters present and non-empty, the client exists, the redirect
/// uri is registered for it verbatim, the response type is `code` and allowed for it, and the
/// scope is well formed.
/// A request without scope receives the default scope of the client.
pub fn start(endpoint: &dyn Endpoint, request: &dyn Request) -> Result<Pending, OAuthError> {
    if !request.valid() {
        return Err(OAuthError::invalid_request("malformed request"));
    }

    let client_id = required(request.client_id(), "client_id")?;
    let redirect_uri = required(request.redirect_uri(), "redirect_uri")?;
    let response_type = required(request.response_type(), "response_type")?;

    let client = match endpoint.store().client(&client_id) {
        Some(client) => client,
        None => {
            warn!(client_id = %client_id, "authorization request by unknown client");
            return Err(OAuthError::invalid_client("unknown client"));
        }
    };

    if !endpoint.store().is_redirect_uri_registered(&client_id, &redirect_uri) {
        warn!(client_id = %client_id, "redirect_uri not registered");
        return Err(OAuthError::invalid_request(
            "redirect_uri is not registered for this client",
        ));
    }

    if response_type != RESPONSE_TYPE_CODE {
        debug!(response_type = %response_type, "unsupported response type requested");
        return Err(OAuthError::invalid_request("only response_type code is supported"));
    }

    if !client.allows_response_type(&response_type) {
        return Err(OAuthError::invalid_request(
            "response_type is not allowed for this client",
        ));
    }

    let scope = match request.scope() {
        Some(scope) => {
            if let Err(err) = scope.parse::<Scope>() {
                return Err(OAuthError::invalid_request(format!("invalid scope: {}", err)));
            }
            scope.into_owned()
        }
        None => client.scope.clone(),
    };

    let params = AuthorizationParams {
        client_id: client_id.into_owned(),
        redirect_uri: redirect_uri.into_owned(),
        response_type: response_type.into_owned(),
        scope,
        state: request.state().map(Cow::into_owned),
    };

    let settings = endpoint.settings();
    let flow = endpoint.generator().opaque_id(settings.id_bytes());
    endpoint.flows().insert(
        flow.clone(),
        FlowSession {
            params: params.clone(),
            state: FlowState::AwaitingLogin,
            until: endpoint.clock().now() + settings.flow_lifetime,
        },
    );

    debug!(client_id = %params.client_id, "authorization request awaiting login");
    Ok(Pending {
        flow,
        params,
        client_name: client.name,
    })
}

fn lost_flow<T>(lookup: FlowLookup<T>) -> Result<T, OAuthError> {
    match lookup {
        FlowLookup::Found(found) => Ok(found),
        FlowLookup::Missing => Err(OAuthError::invalid_request("unknown authorization flow")),
        FlowLookup::Expired => Err(OAuthError::invalid_request("authorization flow expired")),
    }
}

/// Authenticate the resource owner of a pending flow.
///
/// A wrong username or password leaves the flow waiting for another attempt. Logging in twice is
/// refused, the user bound to a flow never changes.
pub fn login(
    endpoint: &dyn Endpoint, flow: &str, username: &str, password: &str,
) -> Result<Login, OAuthError> {
    let user = endpoint
        .store()
        .find_user_by_username(username)
        .filter(|user| user.check_password(password));

    let now = endpoint.clock().now();
    let outcome = endpoint.flows().update(flow, now, |session| {
        if session.state != FlowState::AwaitingLogin {
            return Err(OAuthError::invalid_request("resource owner already logged in"));
        }

        Ok(match &user {
            Some(user) => {
                session.state = FlowState::AwaitingConsent {
                    user_id: user.id.clone(),
                };
                Login::NeedsConsent {
                    flow: flow.to_string(),
                    user_id: user.id.clone(),
                    params: session.params.clone(),
                }
            }
            None => Login::Failed {
                flow: flow.to_string(),
                params: session.params.clone(),
            },
        })
    });

    let login = lost_flow(outcome)??;
    match &login {
        Login::NeedsConsent { user_id, params, .. } => {
            info!(client_id = %params.client_id, user_id = %user_id, "resource owner logged in")
        }
        Login::Failed { params, .. } => {
            warn!(client_id = %params.client_id, "failed login attempt")
        }
    }
    Ok(login)
}

/// Conclude a flow with the decision of the logged in resource owner.
///
/// The flow is consumed either way. Approval issues an authorization code bound to the client,
/// the redirect uri, the scope and the user who logged in. Denial redirects with
/// `access_denied`. Consent before login is refused and keeps the flow.
pub fn consent(
    endpoint: &dyn Endpoint, flow: &str, decision: Decision,
) -> Result<Redirect, OAuthError> {
    let now = endpoint.clock().now();
    let finished = endpoint.flows().finish(flow, now, |session| {
        matches!(session.state, FlowState::AwaitingConsent { .. })
    });

    let session = match lost_flow(finished)? {
        Some(session) => session,
        None => return Err(OAuthError::invalid_request("resource owner has not logged in")),
    };

    let user_id = match session.state {
        FlowState::AwaitingConsent { user_id } => user_id,
        FlowState::AwaitingLogin => {
            return Err(OAuthError::invalid_request("resource owner has not logged in"))
        }
    };

    let params = session.params;
    let mut location = Url::parse(&params.redirect_uri)
        .map_err(|_| OAuthError::invalid_request("redirect_uri is not a valid url"))?;

    match decision {
        Decision::Deny => {
            let error = OAuthError::access_denied("the resource owner denied the request");
            {
                let mut query = location.query_pairs_mut();
                query.extend_pairs(error.iter());
                if let Some(state) = &params.state {
                    query.append_pair("state", state);
                }
            }

            info!(client_id = %params.client_id, user_id = %user_id, "authorization denied");
            Ok(Redirect::WithError {
                error,
                state: params.state,
                location,
            })
        }
        Decision::Approve => {
            let settings = endpoint.settings();
            let code = endpoint.generator().opaque_id(settings.id_bytes());
            {
                let mut query = location.query_pairs_mut();
                query.append_pair("code", &code);
                if let Some(state) = &params.state {
                    query.append_pair("state", state);
                }
            }

            endpoint.store().put_code(AuthorizationCode {
                code: code.clone(),
                client_id: params.client_id.clone(),
                owner_id: user_id.clone(),
                scope: params.scope,
                redirect_uri: params.redirect_uri,
                until: now + settings.code_lifetime,
            });

            info!(client_id = %params.client_id, user_id = %user_id, "authorization code issued");
            Ok(Redirect::WithCode {
                code,
                state: params.state,
                location,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::clock::ManualClock;
    use crate::primitives::generator::RandomGenerator;
    use crate::primitives::registrar::Client;
    use crate::primitives::store::{MemoryStore, User};
    use chrono::{Duration, TimeZone, Utc};

    const CLIENT_ID: &str = "Client";
    const REDIRECT: &str = "https://client.example/cb";

    struct TestEndpoint {
        store: MemoryStore,
        flows: FlowMap,
        generator: RandomGenerator,
        clock: ManualClock,
        settings: Settings,
    }

    impl Endpoint for TestEndpoint {
        fn store(&self) -> &dyn Store {
            &self.store
        }

        fn flows(&self) -> &FlowMap {
            &self.flows
        }

        fn generator(&self) -> &dyn TagGenerator {
            &self.generator
        }

        fn clock(&self) -> &dyn Clock {
            &self.clock
        }

        fn settings(&self) -> &Settings {
            &self.settings
        }
    }

    #[derive(Default)]
    struct Query {
        invalid: bool,
        client_id: Option<&'static str>,
        redirect_uri: Option<&'static str>,
        response_type: Option<&'static str>,
        scope: Option<&'static str>,
        state: Option<&'static str>,
    }

    impl Request for Query {
        fn valid(&self) -> bool {
            !self.invalid
        }

        fn client_id(&self) -> Option<Cow<str>> {
            self.client_id.map(Cow::Borrowed)
        }

        fn redirect_uri(&self) -> Option<Cow<str>> {
            self.redirect_uri.map(Cow::Borrowed)
        }

        fn response_type(&self) -> Option<Cow<str>> {
            self.response_type.map(Cow::Borrowed)
        }

        fn scope(&self) -> Option<Cow<str>> {
            self.scope.map(Cow::Borrowed)
        }

        fn state(&self) -> Option<Cow<str>> {
            self.state.map(Cow::Borrowed)
        }
    }

    fn query() -> Query {
        Query {
            client_id: Some(CLIENT_ID),
            redirect_uri: Some(REDIRECT),
            response_type: Some("code"),
            scope: Some("read"),
            state: Some("xyz"),
            ..Query::default()
        }
    }

    fn endpoint() -> TestEndpoint {
        let store = MemoryStore::new();
        store
            .put_client(Client {
                client_id: CLIENT_ID.into(),
                client_secret: "secret".into(),
                redirect_uris: vec![REDIRECT.into()],
                grant_types: vec!["authorization_code".into()],
                response_types: vec!["code".into()],
                scope: "default".into(),
                name: "Example".into(),
            })
            .unwrap();
        store
            .put_user(User {
                id: "user-1".into(),
                username: "alice".into(),
                password: "wonderland".into(),
            })
            .unwrap();

        TestEndpoint {
            store,
            flows: FlowMap::new(),
            generator: RandomGenerator::new(),
            clock: ManualClock::new(Utc.timestamp_opt(1_600_000_000, 0).unwrap()),
            settings: Settings::default(),
        }
    }

    fn kind_of<T: std::fmt::Debug>(result: Result<T, OAuthError>) -> String {
        result.expect_err("Expected the request to be refused").kind().to_string()
    }

    #[test]
    fn refused_requests() {
        let endpoint = endpoint();

        let malformed = Query { invalid: true, ..query() };
        assert_eq!(kind_of(start(&endpoint, &malformed)), "invalid_request");

        let missing = Query { client_id: None, ..query() };
        assert_eq!(kind_of(start(&endpoint, &missing)), "invalid_request");

        let missing = Query { redirect_uri: None, ..query() };
        assert_eq!(kind_of(start(&endpoint, &missing)), "invalid_request");

        let empty = Query { client_id: Some(""), ..query() };
        assert_eq!(kind_of(start(&endpoint, &empty)), "invalid_request");

        let empty = Query { response_type: Some(""), ..query() };
        assert_eq!(kind_of(start(&endpoint, &empty)), "invalid_request");

        let unknown = Query { client_id: Some("Nobody"), ..query() };
        assert_eq!(kind_of(start(&endpoint, &unknown)), "invalid_client");

        let trailing = Query { redirect_uri: Some("https://client.example/cb/"), ..query() };
        assert_eq!(kind_of(start(&endpoint, &trailing)), "invalid_request");

        let token = Query { response_type: Some("token"), ..query() };
        assert_eq!(kind_of(start(&endpoint, &token)), "invalid_request");

        let scope = Query { scope: Some("read \"all\""), ..query() };
        assert_eq!(kind_of(start(&endpoint, &scope)), "invalid_request");

        assert!(endpoint.flows.is_empty());
    }

    #[test]
    fn default_scope() {
        let endpoint = endpoint();
        let pending = start(&endpoint, &Query { scope: None, ..query() }).unwrap();
        assert_eq!(pending.params.scope, "default");
        assert_eq!(pending.client_name, "Example");
    }

    #[test]
    fn approve() {
        let endpoint = endpoint();
        let pending = start(&endpoint, &query()).unwrap();

        let failed = login(&endpoint, &pending.flow, "alice", "wonderland ").unwrap();
        assert!(matches!(failed, Login::Failed { .. }));

        match login(&endpoint, &pending.flow, "alice", "wonderland").unwrap() {
            Login::NeedsConsent { user_id, .. } => assert_eq!(user_id, "user-1"),
            other => panic!("Expected consent to be required, got {:?}", other),
        }

        let again = login(&endpoint, &pending.flow, "alice", "wonderland");
        assert_eq!(kind_of(again), "invalid_request");

        let redirect = consent(&endpoint, &pending.flow, Decision::Approve).unwrap();
        let code = redirect.code().expect("Approval issues a code").to_string();
        assert_eq!(redirect.state(), Some("xyz"));

        let pairs: Vec<(String, String)> = redirect.location().query_pairs().into_owned().collect();
        assert_eq!(pairs, vec![("code".to_string(), code.clone()), ("state".to_string(), "xyz".to_string())]);

        let stored = endpoint.store.get_code(&code).unwrap();
        assert_eq!(stored.owner_id, "user-1");
        assert_eq!(stored.client_id, CLIENT_ID);
        assert_eq!(stored.redirect_uri, REDIRECT);
        assert_eq!(stored.scope, "read");
        assert_eq!(stored.until, endpoint.clock.now() + Duration::minutes(10));

        // The flow is consumed.
        let replay = consent(&endpoint, &pending.flow, Decision::Approve);
        assert_eq!(kind_of(replay), "invalid_request");
    }

    #[test]
    fn deny() {
        let endpoint = endpoint();
        let pending = start(&endpoint, &query()).unwrap();
        login(&endpoint, &pending.flow, "alice", "wonderland").unwrap();

        let redirect = consent(&endpoint, &pending.flow, Decision::Deny).unwrap();
        assert_eq!(redirect.code(), None);
        let location = redirect.location();
        assert_eq!(location.path(), "/cb");
        let pairs: Vec<(String, String)> = location.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("error".to_string(), "access_denied".to_string()));
        assert!(pairs.contains(&("state".to_string(), "xyz".to_string())));
        assert_eq!(endpoint.store.code_count(), 0);
    }

    #[test]
    fn consent_requires_login() {
        let endpoint = endpoint();
        let pending = start(&endpoint, &query()).unwrap();

        let early = consent(&endpoint, &pending.flow, Decision::Approve);
        assert_eq!(kind_of(early), "invalid_request");
        assert_eq!(endpoint.flows.len(), 1);
        assert_eq!(endpoint.store.code_count(), 0);
    }

    #[test]
    fn abandoned_flow() {
        let endpoint = endpoint();
        let pending = start(&endpoint, &query()).unwrap();
        endpoint.clock.advance(Duration::minutes(10) + Duration::seconds(1));

        let late = login(&endpoint, &pending.flow, "alice", "wonderland");
        assert_eq!(kind_of(late), "invalid_request");
        assert!(endpoint.flows.is_empty());
    }

    #[test]
    fn only_code_response_type() {
        let endpoint = endpoint();
        let mut client = endpoint.store.get_client(CLIENT_ID).unwrap();
        client.client_id = "Implicit".into();
        client.response_types = vec!["token".into(), "code".into()];
        endpoint.store.put_client(client).unwrap();

        let token = Query { client_id: Some("Implicit"), response_type: Some("token"), ..query() };
        assert_eq!(kind_of(start(&endpoint, &token)), "invalid_request");
        assert!(endpoint.flows.is_empty());

        let code = Query { client_id: Some("Implicit"), ..query() };
        assert!(start(&endpoint, &code).is_ok());
    }

    #[test]
    fn undersized_settings_are_clamped() {
        let mut endpoint = endpoint();
        endpoint.settings.token_bytes = 0;

        let first = start(&endpoint, &query()).unwrap();
        let second = start(&endpoint, &query()).unwrap();
        assert_eq!(first.flow.len(), 43);
        assert_ne!(first.flow, second.flow);

        login(&endpoint, &first.flow, "alice", "wonderland").unwrap();
        let redirect = consent(&endpoint, &first.flow, Decision::Approve).unwrap();
        assert_eq!(redirect.code().map(str::len), Some(43));
    }
}
