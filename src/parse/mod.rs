//! The streaming side: the buffered, rewindable [`LineSource`] and the
//! recursive recognizer that walks it.

mod engine;
mod line_source;

pub(crate) use engine::run_root;
pub(crate) use line_source::LineSource;

/// One line of input, tagged with its global line number.
///
/// `gln` is 1-based and monotonic over the whole stream, assigned as lines
/// arrive, independent of which block, if any, ends up capturing the line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    pub gln: u64,
    pub text: String,
}
