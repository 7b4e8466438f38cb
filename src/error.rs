use std::io;

use thiserror::Error;

/// An error raised while building a [`BlockDef`](crate::block::BlockDef), before any
/// line is ever parsed.
///
/// These are the only errors that can surface from `BlockDef::builder().build()`,
/// matching the "construction-time errors abort setup" policy: a contradictory
/// or malformed definition is rejected outright rather than discovered lazily
/// while parsing a stream.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DefinitionError {
    /// `tail` was non-empty and `line_count` was also set. The two forms of
    /// termination are contradictory.
    #[error("block `{0}` has both a tail and a line_count")]
    TailWithLineCount(String),
    /// A catch-all (`Matcher::all_others`) matcher appeared somewhere other
    /// than the final position of `body`.
    #[error("block `{0}` has an all-others matcher that is not last in body")]
    AllOthersNotLast(String),
    /// A catch-all matcher appeared more than once in `body`.
    #[error("block `{0}` has more than one all-others matcher in body")]
    AllOthersDuplicated(String),
    /// A catch-all matcher was used, but `head` is empty, leaving the block
    /// with no way to anchor its start.
    #[error("block `{0}` has an all-others matcher but no head to anchor on")]
    AllOthersWithoutHead(String),
    /// `Matcher::pattern` was given a string that does not compile as a regex.
    #[error("invalid pattern in block `{block}`: {source}")]
    InvalidPattern {
        block: String,
        #[source]
        source: regex::Error,
    },
}

/// An error returned by the running engine: I/O from the underlying source,
/// or a fault propagated from a user action.
///
/// `MatchFailure` (a block attempt not recognizing its input) and
/// `StreamTruncation` (EOF inside an ending-conditioned block) are
/// deliberately *not* variants here. They are internal control flow, always
/// absorbed by the backtracking recognizer, and never surfaced to the caller
/// of [`parse_stream`](crate::parse_stream).
#[derive(Debug, Error)]
pub enum EngineError {
    /// The definition passed to `parse_stream`/`parse_file` failed validation.
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    /// An I/O error from the underlying line source.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// An error raised by a user action or the commit thunk it returned.
    #[error(transparent)]
    Action(#[from] ActionError),
}

/// An error raised by a user-supplied action or the commit thunk it returns.
///
/// Wraps an arbitrary boxed error so that callers can plug in whatever error
/// type their actions already use (`anyhow::Error`, a `thiserror` enum, ...).
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ActionError(#[from] pub Box<dyn std::error::Error + Send + Sync + 'static>);

impl ActionError {
    pub fn new<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        ActionError(Box::new(err))
    }
}

