//! Multi-pattern substring search with an Aho-Corasick automaton packed into a double array.
//!
//! ```
//! let ac = packed_corasick::compile(&["he", "she", "his", "hers"]).unwrap();
//! let found: Vec<(&[u8], usize)> = packed_corasick::scan(&ac, "ushers")
//!     .iter()
//!     .map(|m| (m.bytes(), m.start()))
//!     .collect();
//! assert_eq!(found, vec![(&b"he"[..], 2), (&b"she"[..], 1), (&b"hers"[..], 2)]);
//! ```
//!
//! Searching takes time linear in the length of the haystack, regardless of how many patterns
//! there are. Every occurrence is reported, including ones that overlap or nest inside others.

#[cfg(test)]
#[macro_use]
extern crate quickcheck;

mod automaton;
mod builder;
mod double_array;
mod error;

pub use crate::automaton::{Automaton, FindIter};
pub use crate::builder::Builder;
pub use crate::error::{BuildError, Result};

/// An occurrence of a pattern in a haystack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Match<'t> {
    /// The matched bytes, borrowed from the haystack.
    bytes: &'t [u8],
    /// The offset in the haystack where the match starts.
    start: usize,
}

impl<'t> Match<'t> {
    pub fn bytes(&self) -> &'t [u8] {
        self.bytes
    }

    pub fn start(&self) -> usize {
        self.start
    }

    /// The offset one past the last matched byte.
    pub fn end(&self) -> usize {
        self.start + self.bytes.len()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false, since empty patterns are rejected.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Compiles `patterns` into an [`Automaton`] with the default options.
///
/// # Errors
/// if any of the patterns is empty.
pub fn compile<I, P>(patterns: I) -> Result<Automaton>
where
    I: IntoIterator<Item = P>,
    P: AsRef<[u8]>,
{
    Automaton::new(patterns)
}

/// Returns every occurrence of every pattern of `ac` in `haystack`.
pub fn scan<'t, T: AsRef<[u8]> + ?Sized>(ac: &Automaton, haystack: &'t T) -> Vec<Match<'t>> {
    ac.find_all(haystack)
}
