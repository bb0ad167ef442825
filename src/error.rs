use thiserror::Error;

/// The result type of building an [`Automaton`](crate::Automaton).
pub type Result<T> = std::result::Result<T, BuildError>;

/// Errors returned while compiling a set of patterns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// A pattern had no bytes. `index` is its position in the input, before any sorting.
    #[error("invalid pattern: pattern #{index} is empty")]
    EmptyPattern { index: usize },
}
