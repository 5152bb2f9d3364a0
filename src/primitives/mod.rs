//! A collection of primitives shared by the authorization and token endpoints.
//!
//! A primitive is the smallest independent unit of policy used by the issuer. The [`store`] keeps
//! clients, users, authorization codes and access tokens, the [`generator`] produces the opaque
//! strings naming them, the [`registrar`] validates clients against the store and the [`flow`]
//! map keeps the server side state of ongoing authorization requests. Time is read through a
//! [`clock`] so that expiry can be driven deterministically.
//!
//! ```
//! use oxide_issuer::primitives::{
//!     clock::SystemClock,
//!     generator::RandomGenerator,
//!     store::MemoryStore,
//! };
//!
//! let store = MemoryStore::new();
//! let generator = RandomGenerator::new();
//! let clock = SystemClock;
//! # let _ = (store, generator, clock);
//! ```
//!
//! [`store`]: store/index.html
//! [`generator`]: generator/index.html
//! [`registrar`]: registrar/index.html
//! [`flow`]: flow/index.html
//! [`clock`]: clock/index.html

use chrono::DateTime;
use chrono::Utc;

pub mod clock;
pub mod flow;
pub mod generator;
pub mod grant;
pub mod registrar;
pub mod scope;
pub mod store;

/// Point in time at which a credential stops being valid.
pub type Time = DateTime<Utc>;

/// Commonly used primitives for endpoints and hosts.
pub mod prelude {
    pub use super::clock::{Clock, ManualClock, SystemClock};
    pub use super::flow::{FlowMap, FlowSession, FlowState};
    pub use super::generator::{RandomGenerator, TagGenerator};
    pub use super::grant::{AccessToken, AuthorizationCode};
    pub use super::registrar::{Client, ClientRegistration, Registered, Registrar};
    pub use super::scope::Scope;
    pub use super::store::{MemoryStore, Store, User};
}
