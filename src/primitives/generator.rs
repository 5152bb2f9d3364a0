//! Generators produce the opaque strings naming codes, tokens, flows and clients.
//!
//! The issuer only stores grants keyed by these strings, so their sole requirement is that they
//! can not be guessed. `RandomGenerator` fills each identifier from the operating system's
//! cryptographically secure source and encodes it as unpadded url-safe base64, which yields
//! identifiers of a fixed length for a fixed byte count.
//!
//! Two different grants receiving the same identifier is not a handled case. With at least 32
//! bytes of entropy a collision is astronomically unlikely, and the [`Store`] treats one as a
//! broken invariant and panics.
//!
//! [`Store`]: ../store/trait.Store.html
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ring::rand::{SecureRandom, SystemRandom};

/// The minimum number of random bytes for codes, tokens and client secrets.
pub const MIN_TOKEN_BYTES: usize = 32;

/// The minimum number of characters in a generated client identifier.
pub const MIN_CLIENT_ID_LEN: usize = 8;

/// Produces unguessable opaque identifiers.
///
/// ## Requirements on implementations
///
/// Outputs MUST be indistinguishable from random strings. Knowing any number of previously
/// generated identifiers must not help in predicting another one.
pub trait TagGenerator: Send + Sync {
    /// Generate a new identifier carrying `byte_len` bytes of entropy.
    fn opaque_id(&self, byte_len: usize) -> String;
}

/// Generates identifiers from random bytes.
///
/// Each byte is drawn from `ring`'s `SystemRandom`. The generator never fails in a recoverable
/// way: if the system random source is unavailable no secure identifier can be produced and the
/// process panics.
pub struct RandomGenerator {
    random: SystemRandom,
}

impl RandomGenerator {
    /// Create a generator reading from the system random source.
    pub fn new() -> RandomGenerator {
        RandomGenerator {
            random: SystemRandom::new(),
        }
    }

    fn generate(&self, len: usize) -> String {
        let mut result = vec![0; len];
        self.random
            .fill(result.as_mut_slice())
            .expect("Failed to generate random token");
        URL_SAFE_NO_PAD.encode(&result)
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        RandomGenerator::new()
    }
}

/// The length of the encoded identifier for `byte_len` random bytes.
pub fn encoded_len(byte_len: usize) -> usize {
    (byte_len * 4 + 2) / 3
}

impl TagGenerator for RandomGenerator {
    fn opaque_id(&self, byte_len: usize) -> String {
        self.generate(byte_len)
    }
}

impl<'a, T: TagGenerator + ?Sized + 'a> TagGenerator for &'a T {
    fn opaque_id(&self, byte_len: usize) -> String {
        (**self).opaque_id(byte_len)
    }
}

impl<T: TagGenerator + ?Sized> TagGenerator for Box<T> {
    fn opaque_id(&self, byte_len: usize) -> String {
        (**self).opaque_id(byte_len)
    }
}

impl<T: TagGenerator + ?Sized> TagGenerator for Arc<T> {
    fn opaque_id(&self, byte_len: usize) -> String {
        (**self).opaque_id(byte_len)
    }
}
