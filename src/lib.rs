//! A streaming, nested, backtracking line-block parser.
//!
//! Lines arrive one at a time from any `Iterator<Item = io::Result<String>>`.
//! Callers declare the shape of what they're looking for as a tree of
//! [`BlockDef`]s (head/body/tail matchers, optional fixed length, optional
//! nested sub-blocks), and the engine recognizes occurrences of that shape
//! as the lines stream past, backtracking through failed attempts without
//! ever running a user action for a subtree that doesn't stick.
//!
//! ```no_run
//! use lineblock::{parse_stream, BlockDef, Matcher, Nesting};
//!
//! let block = BlockDef::builder()
//!     .head(vec![Matcher::pattern(r"^<< head").unwrap()])
//!     .body(vec![Matcher::pattern(r"^\s*body").unwrap()])
//!     .tail(vec![Matcher::pattern(r"^<< tail").unwrap()])
//!     .strict(true)
//!     .action(|lines, occurrence_index| {
//!         println!("block #{occurrence_index}: {} lines", lines.len());
//!         Ok(None)
//!     })
//!     .build()
//!     .unwrap();
//!
//! let lines = ["<< head", "   body", "<< tail"].map(|s| Ok(s.to_string()));
//! parse_stream(lines, &Nesting::One(block)).unwrap();
//! ```

mod block;
mod commit;
mod driver;
mod error;
mod lineno;
mod matcher;
mod parse;

pub use block::{BlockDef, BlockDefBuilder, Nesting};
pub use commit::{Action, ActionResult, ActionThunk};
pub use driver::{parse_file, parse_lines, parse_stream};
pub use error::{ActionError, DefinitionError, EngineError};
pub use lineno::LineNoSpec;
pub use matcher::{MatchCapture, Matcher, OnMatchHook, RegexCapture};
pub use parse::Line;
