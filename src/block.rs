//! The declarative block definition data model: [`BlockDef`], [`Nesting`],
//! and the action/commit-thunk types an action returns.

use std::cell::Cell;
use std::fmt::{self, Debug, Formatter};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;
use paste::paste;
use static_assertions::assert_not_impl_any;

use crate::commit::{Action, ActionResult, ActionThunk};
use crate::error::DefinitionError;
use crate::matcher::Matcher;
use crate::parse::Line;

/// How a parent composes its child block definitions.
///
/// - `None`: the block has no sub-blocks.
/// - `One`: a single optional child, attempted on every line before the
///   parent consumes it itself.
/// - `Choice`: priority-ordered alternatives; the first usable one that
///   matches at the current cursor wins. Alternatives are independent:
///   each has its own usage count, and a later alternative is only tried
///   once an earlier one fails at the current line.
/// - `Sequence`: a fixed, ordered list. Only the current member is
///   attempted; once it closes, the next line tries the following member.
#[derive(Clone)]
pub enum Nesting {
    None,
    One(BlockDef),
    Choice(Vec<BlockDef>),
    Sequence(Vec<BlockDef>),
}

impl Nesting {
    /// Alternatives in a choice-set are tried in priority order; this is
    /// computed once here (priorities are immutable after construction)
    /// rather than re-sorted on every line, which is equivalent to the
    /// per-attempt sort in spec because priority never changes after
    /// `BlockDef::builder().build()`.
    fn sorted(self) -> Nesting {
        match self {
            Nesting::Choice(mut defs) => {
                defs.sort_by_key(|d| d.priority());
                Nesting::Choice(defs)
            }
            other => other,
        }
    }
}

struct BlockDefInner {
    name: String,
    head: Vec<Matcher>,
    body: Vec<Matcher>,
    tail: Vec<Matcher>,
    line_count: Option<u32>,
    usage_limit: Option<u32>,
    strict: bool,
    priority: i32,
    action: Option<Action>,
    nested: Nesting,
    usage_count: Cell<u32>,
}

/// An immutable, declarative recipe for recognizing one kind of block.
///
/// Cheaply `Clone`-able (an `Rc` handle): the same `BlockDef` can be shared
/// between a parent's [`Nesting`] and the recursive parser without deep
/// copies. The only thing that changes after construction is `usage_count`,
/// tracked in a `Cell` alongside the otherwise-immutable fields.
#[derive(Clone)]
pub struct BlockDef(Rc<BlockDefInner>);

// `Rc` and `Cell` already forbid this, but pin it down explicitly, for the
// same reasoning as `Matcher`'s assertion in matcher.rs.
assert_not_impl_any!(BlockDef: Send, Sync);

static AUTO_NAME_COUNTER: AtomicU64 = AtomicU64::new(0);

impl BlockDef {
    /// Starts building a block definition. `name` defaults to an
    /// auto-generated label (`"Parser7"`, ...) if left unset.
    pub fn builder() -> BlockDefBuilder {
        BlockDefBuilder::default()
    }

    pub(crate) fn name(&self) -> &str {
        &self.0.name
    }
    pub(crate) fn head(&self) -> &[Matcher] {
        &self.0.head
    }
    pub(crate) fn body(&self) -> &[Matcher] {
        &self.0.body
    }
    pub(crate) fn tail(&self) -> &[Matcher] {
        &self.0.tail
    }
    pub(crate) fn line_count(&self) -> Option<u32> {
        self.0.line_count
    }
    pub(crate) fn strict(&self) -> bool {
        self.0.strict
    }
    pub(crate) fn priority(&self) -> i32 {
        self.0.priority
    }
    pub(crate) fn nested(&self) -> &Nesting {
        &self.0.nested
    }
    pub(crate) fn action(&self) -> Option<&Action> {
        self.0.action.as_ref()
    }

    pub(crate) fn has_ending(&self) -> bool {
        !self.0.tail.is_empty() || self.0.line_count.is_some()
    }

    pub(crate) fn usable(&self) -> bool {
        match self.0.usage_limit {
            Some(limit) => self.0.usage_count.get() < limit,
            None => true,
        }
    }

    pub(crate) fn usage_count(&self) -> u32 {
        self.0.usage_count.get()
    }

    pub(crate) fn increment_usage(&self) {
        self.0.usage_count.set(self.0.usage_count.get() + 1);
    }

    /// Runs `action`, if any, returning the commit thunk it hands back.
    pub(crate) fn run_action(&self, captured: &[Line], occurrence_index: u32) -> ActionResult<Option<ActionThunk>> {
        match &self.0.action {
            Some(action) => action(captured, occurrence_index),
            None => Ok(None),
        }
    }
}

impl Debug for BlockDef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockDef")
            .field("name", &self.0.name)
            .field("usage_count", &self.0.usage_count.get())
            .finish()
    }
}

/// Generates a field setter that consumes and returns `self`, plus a `push_`
/// variant for `Vec<Matcher>` fields that appends one matcher at a time.
/// Mirrors the repetitive-setter macro pattern used for the Python-callback
/// builder this crate descends from, generalized to this crate's fields.
macro_rules! vec_field {
    ($field:ident) => {
        paste! {
            #[doc = concat!("Sets the full `", stringify!($field), "` matcher list.")]
            pub fn $field(mut self, matchers: Vec<Matcher>) -> Self {
                self.$field = matchers;
                self
            }

            #[doc = concat!("Appends one matcher to `", stringify!($field), "`.")]
            pub fn [<push_ $field>](mut self, matcher: Matcher) -> Self {
                self.$field.push(matcher);
                self
            }
        }
    };
}

macro_rules! value_field {
    ($field:ident : $ty:ty) => {
        paste! {
            #[doc = concat!("Sets `", stringify!($field), "`.")]
            pub fn $field(mut self, $field: $ty) -> Self {
                self.$field = $field;
                self
            }
        }
    };
}

/// Builds a [`BlockDef`], validating the invariants from spec.md §3 at
/// [`BlockDefBuilder::build`] time.
pub struct BlockDefBuilder {
    name: Option<String>,
    head: Vec<Matcher>,
    body: Vec<Matcher>,
    tail: Vec<Matcher>,
    line_count: Option<u32>,
    usage_limit: Option<u32>,
    strict: bool,
    priority: i32,
    action: Option<Action>,
    nested: Nesting,
}

impl Default for BlockDefBuilder {
    fn default() -> Self {
        BlockDefBuilder {
            name: None,
            head: Vec::new(),
            body: Vec::new(),
            tail: Vec::new(),
            line_count: None,
            usage_limit: None,
            strict: false,
            priority: 1,
            action: None,
            nested: Nesting::None,
        }
    }
}

impl BlockDefBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    vec_field!(head);
    vec_field!(body);
    vec_field!(tail);

    value_field!(line_count: Option<u32>);
    value_field!(usage_limit: Option<u32>);
    value_field!(strict: bool);
    value_field!(priority: i32);
    value_field!(nested: Nesting);

    /// Sets the action, invoked once this block's own span closes. It
    /// receives the captured lines and the 1-based occurrence index, and
    /// may return a commit thunk. The engine runs the action (and, if it
    /// returns one, the thunk) only once every enclosing block also
    /// succeeds, so nothing the action observes is ever undone by a later
    /// failure higher up the tree.
    pub fn action(
        mut self,
        action: impl Fn(&[Line], u32) -> ActionResult<Option<ActionThunk>> + 'static,
    ) -> Self {
        self.action = Some(Rc::new(action));
        self
    }

    pub fn build(self) -> Result<BlockDef, DefinitionError> {
        let name = self
            .name
            .unwrap_or_else(|| format!("Parser{}", AUTO_NAME_COUNTER.fetch_add(1, Ordering::Relaxed)));

        if !self.tail.is_empty() && self.line_count.is_some() {
            return Err(DefinitionError::TailWithLineCount(name));
        }

        let all_others_count = self.body.iter().filter(|m| m.is_all_others()).count();
        if all_others_count > 1 {
            return Err(DefinitionError::AllOthersDuplicated(name));
        }
        if all_others_count == 1 {
            if !self.body.last().map(Matcher::is_all_others).unwrap_or(false) {
                return Err(DefinitionError::AllOthersNotLast(name));
            }
            if self.head.is_empty() {
                return Err(DefinitionError::AllOthersWithoutHead(name));
            }
        }

        let nested = self.nested.sorted();

        for m in self.head.iter().chain(self.body.iter()).chain(self.tail.iter()) {
            m.bind_owner(&name);
        }

        debug!(
            "built block `{name}` (head={}, body={}, tail={}, strict={})",
            self.head.len(),
            self.body.len(),
            self.tail.len(),
            self.strict
        );

        Ok(BlockDef(Rc::new(BlockDefInner {
            name,
            head: self.head,
            body: self.body,
            tail: self.tail,
            line_count: self.line_count,
            usage_limit: self.usage_limit,
            strict: self.strict,
            priority: self.priority,
            action: self.action,
            nested,
            usage_count: Cell::new(0),
        })))
    }
}

impl BlockDef {
    /// The usage limit to apply for this definition when it sits in a
    /// choice-set (defaults to 1, per spec.md §3) versus anywhere else (no
    /// implicit cap). A child's `BlockDef` is already built (and thus
    /// immutable) by the time its parent places it in a `Nesting`, so the
    /// default is applied here, at the call site that knows the nesting
    /// kind, rather than by mutating the child.
    pub(crate) fn effective_usage_limit(&self, in_choice_set: bool) -> Option<u32> {
        match self.0.usage_limit {
            Some(limit) => Some(limit),
            None if in_choice_set => Some(1),
            None => None,
        }
    }

    /// Whether this definition may still be attempted as a choice-set
    /// alternative (default usage limit 1, per spec.md §3).
    pub(crate) fn usable_in_choice_set(&self) -> bool {
        match self.effective_usage_limit(true) {
            Some(limit) => self.0.usage_count.get() < limit,
            None => true,
        }
    }
}
