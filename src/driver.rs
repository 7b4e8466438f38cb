//! Entry points: wire a line source and a top-level [`Nesting`] spec into
//! the engine.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::block::Nesting;
use crate::error::EngineError;
use crate::parse::{run_root, LineSource};

/// Parses `lines` against the top-level nesting spec `nested`.
///
/// `nested` is typically a single [`crate::block::BlockDef`] wrapped in
/// [`Nesting::One`], a [`Nesting::Choice`], or a [`Nesting::Sequence`],
/// whatever shape the caller's grammar needs at the top level. Internally
/// this plays the role of the user's definition hanging off an implicit,
/// action-less root block that can never itself fail.
pub fn parse_stream<I>(lines: I, nested: &Nesting) -> Result<(), EngineError>
where
    I: IntoIterator<Item = io::Result<String>>,
{
    let mut src = LineSource::new(lines.into_iter());
    run_root(nested, &mut src)?;
    Ok(())
}

/// Like [`parse_stream`], reading lines from `path` with OS line splitting.
pub fn parse_file(path: impl AsRef<Path>, nested: &Nesting) -> Result<(), EngineError> {
    let file = File::open(path)?;
    parse_lines(BufReader::new(file).lines(), nested)
}

/// Like [`parse_stream`], accepting any `BufRead`-style line iterator
/// (e.g. `std::io::BufRead::lines()`).
pub fn parse_lines<I>(lines: I, nested: &Nesting) -> Result<(), EngineError>
where
    I: IntoIterator<Item = io::Result<String>>,
{
    parse_stream(lines, nested)
}
