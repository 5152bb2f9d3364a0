//! Syntax and comparison of scopes.
//!
//! The issuer threads the scope string of a request through the flow verbatim. This type is only
//! used to check that such a string is well formed, and to let resource servers compare the scope
//! of an introspected token against the scope a resource requires.
use std::collections::BTreeSet;
use std::{cmp, fmt, str};

use thiserror::Error;

/// Scope of a grant or resource, a set of scope-tokens separated by spaces.
///
/// Scopes are interpreted as a conjunction of scope tokens, i.e. a scope is fulfilled if all of
/// its scope tokens are fulfilled. This induces a partial ordering on scopes where scope `A` is
/// less or equal than scope `B` if all scope tokens of `A` are also found in `B`.
///
/// ```
/// # use oxide_issuer::primitives::scope::Scope;
/// let granted  = "profile email".parse::<Scope>().unwrap();
/// let required = "email".parse::<Scope>().unwrap();
/// let other    = "email admin".parse::<Scope>().unwrap();
///
/// assert!(required.allow_access(&granted));
/// assert!(!other.allow_access(&granted));
/// ```
///
/// Scope-tokens are restricted to the characters `%x21 / %x23-5B / %x5D-7E` of RFC 6749, in
/// particular `"` and `\` are not allowed.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Scope {
    tokens: BTreeSet<String>,
}

/// Error returned from parsing a scope string.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ParseScopeErr {
    /// A character was encountered which is not allowed to appear in scope strings.
    #[error("Encountered invalid character in scope: {0:?}")]
    InvalidCharacter(char),
}

impl Scope {
    fn invalid_scope_char(ch: char) -> bool {
        match ch {
            '\x21' => false,
            ch if ('\x23'..='\x5b').contains(&ch) => false,
            ch if ('\x5d'..='\x7e').contains(&ch) => false,
            ' ' => false,
            _ => true,
        }
    }

    /// Determines if this scope has enough privileges to access some resource requiring the scope
    /// on the right side. Equivalent to comparison via `>=`.
    pub fn privileged_to(&self, rhs: &Scope) -> bool {
        rhs <= self
    }

    /// Determines if a resource protected by this scope should allow access to a token with the
    /// grant on the right side. Equivalent to comparison via `<=`.
    pub fn allow_access(&self, rhs: &Scope) -> bool {
        self <= rhs
    }

    /// Iterate over the individual scope tokens, in lexical order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    /// Whether the scope has no tokens at all.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl str::FromStr for Scope {
    type Err = ParseScopeErr;

    fn from_str(string: &str) -> Result<Scope, ParseScopeErr> {
        if let Some(ch) = string.chars().find(|&ch| Scope::invalid_scope_char(ch)) {
            return Err(ParseScopeErr::InvalidCharacter(ch));
        }

        let tokens = string.split(' ').filter(|s| !s.is_empty());
        Ok(Scope {
            tokens: tokens.map(str::to_string).collect(),
        })
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_tuple("Scope").field(&self.tokens).finish()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let output = self.iter().collect::<Vec<_>>().join(" ");
        fmt.write_str(&output)
    }
}

impl PartialOrd for Scope {
    fn partial_cmp(&self, rhs: &Self) -> Option<cmp::Ordering> {
        let intersect_count = self.tokens.intersection(&rhs.tokens).count();
        if intersect_count == self.tokens.len() && intersect_count == rhs.tokens.len() {
            Some(cmp::Ordering::Equal)
        } else if intersect_count == self.tokens.len() {
            Some(cmp::Ordering::Less)
        } else if intersect_count == rhs.tokens.len() {
            Some(cmp::Ordering::Greater)
        } else {
            None
        }
    }
}
