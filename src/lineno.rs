//! Parsing for the `LineNo` matcher's set specification.
//!
//! Accepts a single integer, a list of integers, or a string like
//! `"3, 7-9, 12"` (comma-separated; `-` or `~` denotes an inclusive range;
//! reversed endpoints such as `"9-7"` are normalized to `7-9`).

use std::ops::RangeInclusive;

/// The value a caller can hand to [`Matcher::line_no`](crate::matcher::Matcher::line_no)
/// to describe a set of line numbers.
#[derive(Clone, Debug)]
pub enum LineNoSpec {
    Single(u64),
    List(Vec<u64>),
    Ranges(String),
}

impl From<u64> for LineNoSpec {
    fn from(n: u64) -> Self {
        LineNoSpec::Single(n)
    }
}

impl From<Vec<u64>> for LineNoSpec {
    fn from(v: Vec<u64>) -> Self {
        LineNoSpec::List(v)
    }
}

impl From<&str> for LineNoSpec {
    fn from(s: &str) -> Self {
        LineNoSpec::Ranges(s.to_owned())
    }
}

impl From<String> for LineNoSpec {
    fn from(s: String) -> Self {
        LineNoSpec::Ranges(s)
    }
}

/// A resolved, coalesced set of line numbers, backed by a sorted list of
/// inclusive ranges so membership is a binary search rather than a linear
/// scan over every declared number.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct LineNoSet {
    ranges: Vec<RangeInclusive<u64>>,
}

impl LineNoSet {
    pub(crate) fn from_spec(spec: &LineNoSpec) -> LineNoSet {
        let ranges = match spec {
            LineNoSpec::Single(n) => vec![*n..=*n],
            LineNoSpec::List(list) => list.iter().map(|&n| n..=n).collect(),
            // Unknown/malformed syntax yields an empty set (match never
            // succeeds), per spec. Individual malformed fragments inside an
            // otherwise well-formed comma list are discarded on their own,
            // rather than poisoning the whole list; see DESIGN.md for why
            // this departs from the "discard the whole list" reading.
            LineNoSpec::Ranges(s) => parse_ranges(s),
        };
        LineNoSet::coalesce(ranges)
    }

    fn coalesce(mut ranges: Vec<RangeInclusive<u64>>) -> LineNoSet {
        ranges.sort_by_key(|r| *r.start());
        let mut merged: Vec<RangeInclusive<u64>> = Vec::with_capacity(ranges.len());
        for r in ranges {
            match merged.last_mut() {
                Some(last) if r.start().saturating_sub(1) <= *last.end() => {
                    if r.end() > last.end() {
                        let start = *last.start();
                        *last = start..=*r.end();
                    }
                }
                _ => merged.push(r),
            }
        }
        LineNoSet { ranges: merged }
    }

    pub(crate) fn contains(&self, n: u64) -> bool {
        self.ranges
            .binary_search_by(|r| {
                if n < *r.start() {
                    std::cmp::Ordering::Greater
                } else if n > *r.end() {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }
}

fn parse_ranges(s: &str) -> Vec<RangeInclusive<u64>> {
    let mut ranges = Vec::new();
    for fragment in s.split(',') {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            continue;
        }
        if let Some(range) = parse_fragment(fragment) {
            ranges.push(range);
        }
        // else: malformed fragment, discarded on its own.
    }
    ranges
}

fn parse_fragment(fragment: &str) -> Option<RangeInclusive<u64>> {
    let sep_index = fragment
        .char_indices()
        .skip(1) // a leading '-' would be a sign, not a separator, but we don't support signed line numbers
        .find(|&(_, c)| c == '-' || c == '~')
        .map(|(i, _)| i);
    match sep_index {
        None => fragment.trim().parse::<u64>().ok().map(|n| n..=n),
        Some(i) => {
            let (a, b) = (fragment[..i].trim(), fragment[i + 1..].trim());
            let a: u64 = a.parse().ok()?;
            let b: u64 = b.parse().ok()?;
            Some(if a <= b { a..=b } else { b..=a })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_integer() {
        let set = LineNoSet::from_spec(&LineNoSpec::Single(5));
        assert!(set.contains(5));
        assert!(!set.contains(4));
        assert!(!set.contains(6));
    }

    #[test]
    fn list_of_integers() {
        let set = LineNoSet::from_spec(&LineNoSpec::List(vec![1, 3, 5]));
        assert!(set.contains(1));
        assert!(!set.contains(2));
        assert!(set.contains(3));
    }

    #[test]
    fn range_string_with_dash_and_tilde() {
        let set = LineNoSet::from_spec(&LineNoSpec::Ranges("3, 7-9, 12~14".to_owned()));
        for n in [3, 7, 8, 9, 12, 13, 14] {
            assert!(set.contains(n), "expected {n} to be in the set");
        }
        for n in [2, 4, 6, 10, 11, 15] {
            assert!(!set.contains(n), "expected {n} to be outside the set");
        }
    }

    #[test]
    fn reversed_range_is_normalized() {
        let set = LineNoSet::from_spec(&LineNoSpec::Ranges("9-7".to_owned()));
        assert!(set.contains(7));
        assert!(set.contains(8));
        assert!(set.contains(9));
    }

    #[test]
    fn unknown_syntax_yields_empty_set() {
        let set = LineNoSet::from_spec(&LineNoSpec::Ranges("banana".to_owned()));
        assert!(!set.contains(0));
        assert!(!set.contains(1));
    }

    #[test]
    fn malformed_fragment_does_not_poison_well_formed_siblings() {
        let set = LineNoSet::from_spec(&LineNoSpec::Ranges("3, bogus, 7".to_owned()));
        assert!(set.contains(3));
        assert!(set.contains(7));
        assert!(!set.contains(5));
    }
}
