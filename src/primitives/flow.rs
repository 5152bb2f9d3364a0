//! Server side state of authorization requests between their steps.
//!
//! An authorization request passes through a login and a consent step, usually separated by
//! browser round trips. Instead of trusting the browser to carry the parameters and the
//! authenticated user forward, the issuer keeps them here, keyed by an opaque flow id that is the
//! only thing handed to the presentation layer.
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::Time;

/// The parameters of a validated authorization request.
///
/// They are threaded unchanged through every step of the flow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizationParams {
    /// The requesting client.
    pub client_id: String,

    /// The exact redirect uri of the request, registered for the client.
    pub redirect_uri: String,

    /// The requested response type.
    pub response_type: String,

    /// The requested scope verbatim, or the client's default scope if none was requested.
    pub scope: String,

    /// Opaque value of the client, returned unchanged with the final redirect.
    pub state: Option<String>,
}

/// Where a flow currently stands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlowState {
    /// The request was validated, the resource owner has yet to log in.
    AwaitingLogin,

    /// The resource owner logged in and has yet to approve or deny.
    AwaitingConsent {
        /// The authenticated user, the only source of the owner id of the issued code.
        user_id: String,
    },
}

/// A pending authorization request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlowSession {
    /// The request parameters.
    pub params: AuthorizationParams,

    /// Current step.
    pub state: FlowState,

    /// The flow is abandoned after this point in time.
    pub until: Time,
}

/// Outcome of looking up a flow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlowLookup<T> {
    /// No flow with this id exists.
    Missing,

    /// The flow had expired and has been removed.
    Expired,

    /// The flow is live.
    Found(T),
}

/// In-memory map of pending flows.
#[derive(Debug, Default)]
pub struct FlowMap {
    flows: DashMap<String, FlowSession>,
}

impl FlowSession {
    /// Whether the flow was abandoned before `now`.
    pub fn is_expired(&self, now: Time) -> bool {
        self.until < now
    }
}

impl FlowMap {
    /// An empty map.
    pub fn new() -> Self {
        FlowMap::default()
    }

    /// Record a new flow under a freshly generated id.
    ///
    /// Panics if the id is already taken, the generator is broken in that case.
    pub fn insert(&self, flow_id: String, session: FlowSession) {
        match self.flows.entry(flow_id) {
            Entry::Occupied(_) => panic!("Generated flow id collides with an existing one"),
            Entry::Vacant(entry) => {
                entry.insert(session);
            }
        }
    }

    /// Inspect and possibly change a live flow while holding its lock.
    ///
    /// Expired flows are removed and never passed to `update`.
    pub fn update<T>(
        &self, flow_id: &str, now: Time, update: impl FnOnce(&mut FlowSession) -> T,
    ) -> FlowLookup<T> {
        // Drop expired flows first, the lock is released in between but an expired flow can not
        // become live again.
        if self
            .flows
            .remove_if(flow_id, |_, session| session.is_expired(now))
            .is_some()
        {
            return FlowLookup::Expired;
        }

        match self.flows.get_mut(flow_id) {
            Some(mut session) => FlowLookup::Found(update(session.value_mut())),
            None => FlowLookup::Missing,
        }
    }

    /// Remove a live flow if `finish` accepts it, all under its lock.
    ///
    /// Returns `Found(None)` when the flow exists but `finish` refused it, it then stays in place.
    pub fn finish(
        &self, flow_id: &str, now: Time, finish: impl FnOnce(&FlowSession) -> bool,
    ) -> FlowLookup<Option<FlowSession>> {
        let mut expired = false;
        let mut seen = false;
        let removed = self.flows.remove_if(flow_id, |_, session| {
            seen = true;
            if session.is_expired(now) {
                expired = true;
                true
            } else {
                finish(session)
            }
        });

        match (seen, expired, removed) {
            (false, _, _) => FlowLookup::Missing,
            (true, true, _) => FlowLookup::Expired,
            (true, false, removed) => FlowLookup::Found(removed.map(|(_, session)| session)),
        }
    }

    /// Remove all flows abandoned before `now`.
    pub fn purge_expired(&self, now: Time) -> usize {
        let mut purged = 0;
        self.flows.retain(|_, session| {
            let expired = session.is_expired(now);
            purged += expired as usize;
            !expired
        });
        purged
    }

    /// Number of pending flows.
    pub fn len(&self) -> usize {
        self.flows.len()
    }

    /// Whether no flow is pending.
    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}
