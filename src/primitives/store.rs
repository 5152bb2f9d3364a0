//! The credential store owns every client, user, authorization code and access token.
//!
//! Callers never see the underlying collections. Each operation works on a single key and is
//! atomic with respect to other operations on the same key, including the read-then-delete
//! sequences needed to redeem a code exactly once or to drop an expired token. Operations on
//! different keys proceed in parallel.
use std::fmt;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use ring::constant_time;
use thiserror::Error;

use super::grant::{AccessToken, AuthorizationCode};
use super::registrar::Client;
use super::Time;

/// A resource owner who can log in to approve requests.
///
/// Passwords are compared verbatim, there is no hashing. This registry is meant for
/// demonstrations and tests.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    /// Stable identifier, recorded in codes and tokens as the owner.
    pub id: String,

    /// The name used to log in.
    pub username: String,

    /// The password, compared in constant time.
    pub password: String,
}

/// Errors from seeding the store.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A client with this identifier is already registered.
    #[error("a client with id `{0}` is already registered")]
    ClientExists(String),

    /// A user with this username is already registered.
    #[error("a user named `{0}` is already registered")]
    UserExists(String),
}

/// Decision taken on an authorization code while it is locked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Leave the code in place, it may still be redeemed correctly.
    Keep,

    /// Delete the code without handing it out.
    Discard,

    /// Delete the code and hand it out to the caller.
    Redeem,
}

/// Result of [`Store::take_code`].
///
/// [`Store::take_code`]: trait.Store.html#tymethod.take_code
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Redemption {
    /// No such code exists.
    Missing,

    /// The code existed but the check did not redeem it.
    Rejected,

    /// The code was removed and is now owned by the caller.
    Redeemed(AuthorizationCode),
}

/// Result of [`Store::check_token`].
///
/// [`Store::check_token`]: trait.Store.html#tymethod.check_token
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenStatus {
    /// No such token exists.
    Missing,

    /// The token had expired and has been deleted.
    Expired,

    /// The token is live.
    Active(AccessToken),
}

/// Number of entries removed by a sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Purged {
    /// Expired authorization codes removed.
    pub codes: usize,

    /// Expired access tokens removed.
    pub tokens: usize,
}

/// Storage of all credentials.
///
/// Lookups report absence with `None`. Inserting an authorization code or access token under a
/// key which is already taken means the generator produced a collision, which is a broken
/// invariant of the issuer and panics.
pub trait Store: Send + Sync {
    /// Find a registered client.
    fn get_client(&self, client_id: &str) -> Option<Client>;

    /// Register a client. Clients are never replaced or removed.
    fn put_client(&self, client: Client) -> Result<(), StoreError>;

    /// Find an authorization code without consuming it.
    fn get_code(&self, code: &str) -> Option<AuthorizationCode>;

    /// Store a freshly issued authorization code.
    fn put_code(&self, code: AuthorizationCode);

    /// Unconditionally remove an authorization code.
    fn delete_code(&self, code: &str) -> Option<AuthorizationCode>;

    /// Inspect a code and decide its fate while no one else can touch it.
    ///
    /// `check` is called at most once, only if the code exists. Of two concurrent calls for the
    /// same code at most one can observe `Redeemed`.
    fn take_code(
        &self, code: &str, check: &mut dyn FnMut(&AuthorizationCode) -> Verdict,
    ) -> Redemption;

    /// Find an access token without checking its expiry.
    fn get_token(&self, token: &str) -> Option<AccessToken>;

    /// Store a freshly issued access token.
    fn put_token(&self, token: AccessToken);

    /// Unconditionally remove an access token.
    fn delete_token(&self, token: &str) -> Option<AccessToken>;

    /// Look up a token, deleting it if it expired before `now`.
    fn check_token(&self, token: &str, now: Time) -> TokenStatus;

    /// Add a user to the static registry.
    fn put_user(&self, user: User) -> Result<(), StoreError>;

    /// Find a user by the name they log in with.
    fn find_user_by_username(&self, username: &str) -> Option<User>;

    /// Remove all codes and tokens which expired before `now`.
    fn purge_expired(&self, now: Time) -> Purged;
}

/// An in-memory store backed by sharded concurrent hash maps.
///
/// Locks are held per shard and only for the duration of a single operation, so unrelated clients
/// and credentials do not serialize behind each other.
#[derive(Default)]
pub struct MemoryStore {
    clients: DashMap<String, Client>,
    users: DashMap<String, User>,
    codes: DashMap<String, AuthorizationCode>,
    tokens: DashMap<String, AccessToken>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Number of authorization codes currently held, expired or not.
    pub fn code_count(&self) -> usize {
        self.codes.len()
    }

    /// Number of access tokens currently held, expired or not.
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }
}

fn collision(kind: &str) -> ! {
    panic!("Generated {} collides with an existing one", kind)
}

impl Store for MemoryStore {
    fn get_client(&self, client_id: &str) -> Option<Client> {
        self.clients.get(client_id).map(|entry| entry.value().clone())
    }

    fn put_client(&self, client: Client) -> Result<(), StoreError> {
        match self.clients.entry(client.client_id.clone()) {
            Entry::Occupied(entry) => Err(StoreError::ClientExists(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(client);
                Ok(())
            }
        }
    }

    fn get_code(&self, code: &str) -> Option<AuthorizationCode> {
        self.codes.get(code).map(|entry| entry.value().clone())
    }

    fn put_code(&self, code: AuthorizationCode) {
        match self.codes.entry(code.code.clone()) {
            Entry::Occupied(_) => collision("authorization code"),
            Entry::Vacant(entry) => {
                entry.insert(code);
            }
        }
    }

    fn delete_code(&self, code: &str) -> Option<AuthorizationCode> {
        self.codes.remove(code).map(|(_, code)| code)
    }

    fn take_code(
        &self, code: &str, check: &mut dyn FnMut(&AuthorizationCode) -> Verdict,
    ) -> Redemption {
        let mut verdict = None;
        let removed = self.codes.remove_if(code, |_, stored| {
            let decided = check(stored);
            verdict = Some(decided);
            decided != Verdict::Keep
        });

        match (verdict, removed) {
            (None, _) => Redemption::Missing,
            (Some(Verdict::Redeem), Some((_, code))) => Redemption::Redeemed(code),
            (Some(_), _) => Redemption::Rejected,
        }
    }

    fn get_token(&self, token: &str) -> Option<AccessToken> {
        self.tokens.get(token).map(|entry| entry.value().clone())
    }

    fn put_token(&self, token: AccessToken) {
        match self.tokens.entry(token.token.clone()) {
            Entry::Occupied(_) => collision("access token"),
            Entry::Vacant(entry) => {
                entry.insert(token);
            }
        }
    }

    fn delete_token(&self, token: &str) -> Option<AccessToken> {
        self.tokens.remove(token).map(|(_, token)| token)
    }

    fn check_token(&self, token: &str, now: Time) -> TokenStatus {
        let mut live = None;
        let removed = self.tokens.remove_if(token, |_, stored| {
            if stored.is_expired(now) {
                true
            } else {
                live = Some(stored.clone());
                false
            }
        });

        match (removed, live) {
            (Some(_), _) => TokenStatus::Expired,
            (None, Some(token)) => TokenStatus::Active(token),
            (None, None) => TokenStatus::Missing,
        }
    }

    fn put_user(&self, user: User) -> Result<(), StoreError> {
        match self.users.entry(user.username.clone()) {
            Entry::Occupied(entry) => Err(StoreError::UserExists(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(user);
                Ok(())
            }
        }
    }

    fn find_user_by_username(&self, username: &str) -> Option<User> {
        self.users.get(username).map(|entry| entry.value().clone())
    }

    fn purge_expired(&self, now: Time) -> Purged {
        let mut purged = Purged::default();
        self.codes.retain(|_, code| {
            let expired = code.is_expired(now);
            purged.codes += expired as usize;
            !expired
        });
        self.tokens.retain(|_, token| {
            let expired = token.is_expired(now);
            purged.tokens += expired as usize;
            !expired
        });
        purged
    }
}

impl User {
    /// Compare the password in constant time.
    pub fn check_password(&self, password: &str) -> bool {
        constant_time::verify_slices_are_equal(self.password.as_bytes(), password.as_bytes())
            .is_ok()
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("clients", &self.clients.len())
            .field("users", &self.users.len())
            .field("codes", &self.codes.len())
            .field("tokens", &self.tokens.len())
            .finish()
    }
}

impl<'a, S: Store + ?Sized> Store for &'a S {
    fn get_client(&self, client_id: &str) -> Option<Client> {
        (**self).get_client(client_id)
    }

    fn put_client(&self, client: Client) -> Result<(), StoreError> {
        (**self).put_client(client)
    }

    fn get_code(&self, code: &str) -> Option<AuthorizationCode> {
        (**self).get_code(code)
    }

    fn put_code(&self, code: AuthorizationCode) {
        (**self).put_code(code)
    }

    fn delete_code(&self, code: &str) -> Option<AuthorizationCode> {
        (**self).delete_code(code)
    }

    fn take_code(
        &self, code: &str, check: &mut dyn FnMut(&AuthorizationCode) -> Verdict,
    ) -> Redemption {
        (**self).take_code(code, check)
    }

    fn get_token(&self, token: &str) -> Option<AccessToken> {
        (**self).get_token(token)
    }

    fn put_token(&self, token: AccessToken) {
        (**self).put_token(token)
    }

    fn delete_token(&self, token: &str) -> Option<AccessToken> {
        (**self).delete_token(token)
    }

    fn check_token(&self, token: &str, now: Time) -> TokenStatus {
        (**self).check_token(token, now)
    }

    fn put_user(&self, user: User) -> Result<(), StoreError> {
        (**self).put_user(user)
    }

    fn find_user_by_username(&self, username: &str) -> Option<User> {
        (**self).find_user_by_username(username)
    }

    fn purge_expired(&self, now: Time) -> Purged {
        (**self).purge_expired(now)
    }
}
