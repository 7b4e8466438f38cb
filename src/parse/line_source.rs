//! A lazy, buffered, cursor-based view over an external line stream.

use std::collections::VecDeque;
use std::io;

use super::Line;

/// An append-only buffered window over a lazy line stream, with a movable
/// cursor. Lines are pulled from the underlying iterator only as the cursor
/// needs them. `peek` is the one suspension point: it runs the iterator
/// until a line is available or it's exhausted.
///
/// The buffer only ever retains `[dropped, dropped + buffer.len())`;
/// `drop_consumed_prefix` advances `dropped` up to the cursor, which is
/// sound exactly when nothing upstream still needs to rewind behind it,
/// true right after a root-level commit, since by then every nested
/// attempt that could have needed an earlier line has already resolved.
pub(crate) struct LineSource<I> {
    lines: I,
    buffer: VecDeque<Line>,
    dropped: u64,
    cursor: usize,
    next_gln: u64,
    exhausted: bool,
}

impl<I: Iterator<Item = io::Result<String>>> LineSource<I> {
    pub(crate) fn new(lines: I) -> Self {
        LineSource {
            lines,
            buffer: VecDeque::new(),
            dropped: 0,
            cursor: 0,
            next_gln: 1,
            exhausted: false,
        }
    }

    /// `gLN` the cursor currently points at (the next line to be read).
    pub(crate) fn current_gln(&self) -> u64 {
        self.dropped + self.cursor as u64 + 1
    }

    fn fill_to_cursor(&mut self) -> io::Result<()> {
        while self.cursor >= self.buffer.len() && !self.exhausted {
            match self.lines.next() {
                Some(Ok(text)) => {
                    self.buffer.push_back(Line {
                        gln: self.next_gln,
                        text,
                    });
                    self.next_gln += 1;
                }
                Some(Err(err)) => return Err(err),
                None => self.exhausted = true,
            }
        }
        Ok(())
    }

    /// The line at the cursor, pulling from the underlying stream if
    /// necessary. `None` means EOF.
    pub(crate) fn peek(&mut self) -> io::Result<Option<Line>> {
        self.fill_to_cursor()?;
        Ok(self.buffer.get(self.cursor).cloned())
    }

    /// Moves the cursor past the line last returned by `peek`.
    pub(crate) fn advance(&mut self) {
        self.cursor += 1;
    }

    /// Rewinds the cursor to `gln`, which must lie within the retained
    /// buffer (true for any `gln` a still-live attempt could have started
    /// at, since `drop_consumed_prefix` only runs when no attempt is live).
    pub(crate) fn rewind_to(&mut self, gln: u64) {
        debug_assert!(gln >= self.dropped + 1, "rewind target already dropped");
        self.cursor = (gln - self.dropped - 1) as usize;
    }

    /// Discards every buffered line strictly before the cursor.
    pub(crate) fn drop_consumed_prefix(&mut self) {
        for _ in 0..self.cursor {
            self.buffer.pop_front();
        }
        self.dropped += self.cursor as u64;
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(lines: &[&str]) -> LineSource<std::vec::IntoIter<io::Result<String>>> {
        let owned: Vec<io::Result<String>> = lines.iter().map(|s| Ok(s.to_string())).collect();
        LineSource::new(owned.into_iter())
    }

    #[test]
    fn peek_is_idempotent_and_gln_is_one_based() {
        let mut src = source(&["a", "b"]);
        assert_eq!(src.current_gln(), 1);
        let first = src.peek().unwrap().unwrap();
        assert_eq!(first.gln, 1);
        assert_eq!(first.text, "a");
        // peeking again without advancing returns the same line
        assert_eq!(src.peek().unwrap().unwrap().gln, 1);
    }

    #[test]
    fn advance_moves_cursor_and_rewind_restores_it() {
        let mut src = source(&["a", "b", "c"]);
        src.peek().unwrap();
        src.advance();
        src.peek().unwrap();
        src.advance();
        assert_eq!(src.current_gln(), 3);
        src.rewind_to(1);
        assert_eq!(src.current_gln(), 1);
        assert_eq!(src.peek().unwrap().unwrap().text, "a");
    }

    #[test]
    fn drop_consumed_prefix_shrinks_buffer_but_preserves_cursor_semantics() {
        let mut src = source(&["a", "b", "c"]);
        src.peek().unwrap();
        src.advance();
        src.peek().unwrap();
        src.advance();
        src.drop_consumed_prefix();
        assert_eq!(src.current_gln(), 3);
        assert_eq!(src.buffer.len(), 1);
        assert_eq!(src.peek().unwrap().unwrap().text, "c");
    }

    #[test]
    fn peek_past_eof_returns_none_repeatedly() {
        let mut src = source(&["a"]);
        src.peek().unwrap();
        src.advance();
        assert!(src.peek().unwrap().is_none());
        assert!(src.peek().unwrap().is_none());
    }
}
