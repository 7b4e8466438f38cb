//! The recursive recognizer: one block attempt per [`try_block`] call, with
//! nested children given first refusal on every line before the block
//! tries to consume it itself.

use std::io;

use crate::block::{BlockDef, Nesting};
use crate::commit::Commit;
use crate::error::EngineError;
use crate::matcher::{match_any, HookCall, Matcher};

use super::{Line, LineSource};

type PResult<T> = Result<T, EngineError>;

/// Tail matcher lists of every currently in-progress ancestor with an
/// ending condition, outermost first. Consulted only by the `all_others`
/// catch-all (see [`ancestor_tail_claims`]), never by ordinary matchers,
/// and never written to, so it cannot pollute a sibling matcher's memo.
type AncestorTails<'a> = Vec<&'a [Matcher]>;

/// Runs the user's top-level nesting spec against `src` until EOF.
///
/// The root has no head/body/tail of its own and cannot fail: an unmatched
/// line is silently skipped, and a matched child's commit is invoked
/// immediately (root itself has nothing left to wait for, so there is no
/// reason to defer it) before dropping the now-unneeded buffer prefix.
pub(crate) fn run_root<I>(nested: &Nesting, src: &mut LineSource<I>) -> PResult<()>
where
    I: Iterator<Item = io::Result<String>>,
{
    let mut seq_index = 0usize;
    let ancestors: AncestorTails<'_> = Vec::new();
    loop {
        if src.peek()?.is_none() {
            break;
        }
        match try_nested(src, nested, &mut seq_index, &ancestors)? {
            Some(commit) => {
                commit.invoke()?;
            }
            None => {
                src.advance();
            }
        }
        src.drop_consumed_prefix();
    }
    Ok(())
}

/// Gives `nested`'s children a chance to claim the line at the cursor,
/// per spec.md §4.3. Returns `Ok(None)` if none did (or there is no
/// nesting), leaving the cursor untouched.
fn try_nested<I>(
    src: &mut LineSource<I>,
    nested: &Nesting,
    seq_index: &mut usize,
    ancestors: &AncestorTails<'_>,
) -> PResult<Option<Commit>>
where
    I: Iterator<Item = io::Result<String>>,
{
    match nested {
        Nesting::None => Ok(None),

        Nesting::One(child) => {
            if child.usable() {
                try_block(src, child, ancestors)
            } else {
                Ok(None)
            }
        }

        // Alternatives are independent and already sorted by priority at
        // build time; the first usable one that matches at the current
        // cursor wins.
        Nesting::Choice(defs) => {
            for def in defs {
                if def.usable_in_choice_set() {
                    if let Some(commit) = try_block(src, def, ancestors)? {
                        return Ok(Some(commit));
                    }
                }
            }
            Ok(None)
        }

        // Only the current member is ever attempted; it advances on
        // close, not on a fixed schedule, and never rewinds.
        Nesting::Sequence(defs) => {
            if *seq_index >= defs.len() {
                return Ok(None);
            }
            let def = &defs[*seq_index];
            if let Some(commit) = try_block(src, def, ancestors)? {
                *seq_index += 1;
                Ok(Some(commit))
            } else {
                Ok(None)
            }
        }
    }
}

/// Attempts to parse one occurrence of `def` starting at the current
/// cursor. On success, returns a deferred [`Commit`] and leaves the cursor
/// past the last line consumed. On failure, rewinds the cursor exactly to
/// where the attempt started and returns `Ok(None)`.
fn try_block<I>(src: &mut LineSource<I>, def: &BlockDef, ancestors: &AncestorTails<'_>) -> PResult<Option<Commit>>
where
    I: Iterator<Item = io::Result<String>>,
{
    let start_gln = src.current_gln();
    let has_ending = def.has_ending();
    let mut lln: u32 = 0;
    let mut captured: Vec<Line> = Vec::new();
    let mut children: Vec<Commit> = Vec::new();
    let mut hooks: Vec<HookCall> = Vec::new();
    let mut seq_index = 0usize;

    // Children see this block's tail added to the ancestor stack so an
    // `all_others` catch-all nested beneath it can decline a line this
    // block's own tail wants to close on.
    let mut extended;
    let child_ancestors: &AncestorTails<'_> = if !def.tail().is_empty() {
        extended = Vec::clone(ancestors);
        extended.push(def.tail());
        &extended
    } else {
        ancestors
    };

    loop {
        if let Some(commit) = try_nested(src, def.nested(), &mut seq_index, child_ancestors)? {
            children.push(commit);
            continue;
        }

        let line = match src.peek()? {
            Some(line) => line,
            None => {
                // EOF mid-attempt: an ending-conditioned block can never
                // close this way, and a fresh (head-unmatched) open-ended
                // block never got off the ground either. Only an
                // open-ended block that has already captured something
                // succeeds with what it has.
                if has_ending || lln == 0 {
                    src.rewind_to(start_gln);
                    return Ok(None);
                }
                break;
            }
        };

        if lln == 0 {
            let candidate = if !def.head().is_empty() {
                match_any(def.head(), line.gln, 1, &line.text)
            } else {
                match_any(def.body(), line.gln, 1, &line.text)
            };
            match candidate {
                Some(m) => {
                    if let Some(h) = m.deferred_hook() {
                        hooks.push(h);
                    }
                    captured.push(line);
                    lln = 1;
                    src.advance();
                }
                None => {
                    src.rewind_to(start_gln);
                    return Ok(None);
                }
            }
        } else {
            let candidate_lln = lln + 1;

            if !def.tail().is_empty() {
                if let Some(m) = match_any(def.tail(), line.gln, candidate_lln, &line.text) {
                    if let Some(h) = m.deferred_hook() {
                        hooks.push(h);
                    }
                    captured.push(line);
                    src.advance();
                    break;
                }
            }

            let body_match = match_any(def.body(), line.gln, candidate_lln, &line.text).filter(|m| {
                !m.is_all_others() || !ancestor_tail_claims(ancestors, line.gln, candidate_lln, &line.text)
            });

            match body_match {
                Some(m) => {
                    if let Some(h) = m.deferred_hook() {
                        hooks.push(h);
                    }
                    captured.push(line);
                    lln = candidate_lln;
                    src.advance();
                }
                None if has_ending && def.strict() => {
                    src.rewind_to(start_gln);
                    return Ok(None);
                }
                None if has_ending => {
                    // loose: tolerate the interleaved line, don't count it
                    src.advance();
                }
                None => break, // open-ended: this line doesn't belong, leave it unconsumed
            }
        }

        if let Some(n) = def.line_count() {
            if lln == n {
                break;
            }
        }
    }

    Ok(Some(Commit::new(def.clone(), captured, children, hooks)))
}

/// Conservative `try_ending` probe (spec.md §9 open question): only
/// ancestors are consulted, never siblings, and [`Matcher::probe`] never
/// touches memo state, so this can't shadow a result a real match on the
/// same line would later need.
fn ancestor_tail_claims(ancestors: &AncestorTails<'_>, gln: u64, lln: u32, text: &str) -> bool {
    ancestors.iter().any(|tail| tail.iter().any(|m| m.probe(gln, lln, text)))
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    fn source(lines: &[&str]) -> LineSource<std::vec::IntoIter<io::Result<String>>> {
        let owned: Vec<io::Result<String>> = lines.iter().map(|s| Ok(s.to_string())).collect();
        LineSource::new(owned.into_iter())
    }

    /// Invariant 2: a failed attempt leaves the cursor exactly where it
    /// started.
    #[test]
    fn failed_attempt_conserves_the_cursor() {
        let def = BlockDef::builder()
            .head(vec![Matcher::pattern("head").unwrap()])
            .tail(vec![Matcher::pattern("tail").unwrap()])
            .build()
            .unwrap();
        let mut src = source(&["nothing here", "more nothing"]);
        let start = src.current_gln();

        let ancestors: AncestorTails<'_> = Vec::new();
        let result = try_block(&mut src, &def, &ancestors).unwrap();

        assert!(result.is_none(), "a non-matching head must fail the attempt");
        assert_eq!(src.current_gln(), start);
    }

    /// Invariant 2, strict-interior case: a strict block that opens but
    /// then meets a non-matching interior line also rewinds all the way
    /// back to where the attempt started, not just to the interior line.
    #[test]
    fn strict_failure_mid_block_rewinds_to_attempt_start() {
        let def = BlockDef::builder()
            .head(vec![Matcher::pattern("head").unwrap()])
            .body(vec![Matcher::pattern("body").unwrap()])
            .tail(vec![Matcher::pattern("tail").unwrap()])
            .strict(true)
            .build()
            .unwrap();
        let mut src = source(&["<< head", "unrelated junk", "<< tail"]);
        let start = src.current_gln();

        let ancestors: AncestorTails<'_> = Vec::new();
        let result = try_block(&mut src, &def, &ancestors).unwrap();

        assert!(result.is_none());
        assert_eq!(src.current_gln(), start);
    }

    /// Invariant 1: no action fires for a block whose attempt failed. Checked
    /// here at the `Commit` layer by confirming a failed attempt never
    /// produces one to invoke in the first place.
    #[test]
    fn failed_attempt_never_yields_a_commit() {
        let def = BlockDef::builder()
            .head(vec![Matcher::pattern("head").unwrap()])
            .tail(vec![Matcher::pattern("tail").unwrap()])
            .action(|_, _| panic!("action must not run for a failed attempt"))
            .build()
            .unwrap();
        let mut src = source(&["does not match anything"]);

        let ancestors: AncestorTails<'_> = Vec::new();
        let result = try_block(&mut src, &def, &ancestors).unwrap();
        assert!(result.is_none());
    }

    /// A successful open-ended attempt consumes exactly its matched lines
    /// and leaves the first non-matching line for the next attempt.
    #[test]
    fn open_ended_block_leaves_the_unconsumed_line_at_the_cursor() {
        let def = BlockDef::builder()
            .body(vec![Matcher::pattern("^body").unwrap()])
            .build()
            .unwrap();
        let mut src = source(&["body1", "body2", "not body"]);

        let ancestors: AncestorTails<'_> = Vec::new();
        let result = try_block(&mut src, &def, &ancestors).unwrap();

        assert!(result.is_some());
        assert_eq!(src.current_gln(), 3, "cursor should sit on the unconsumed line");
    }
}
