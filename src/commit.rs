//! The commit-thunk machinery that defers a block's visible effects until
//! every enclosing block has also succeeded.
//!
//! A block's `action` runs only once its own span has closed, but a closed
//! block can still be discarded if an ancestor later fails and the whole
//! subtree backtracks. [`Commit`] is how a successful attempt's
//! consequences are staged without being applied: the engine builds one
//! `Commit` per successful block (carrying its children's `Commit`s, and
//! its own matchers' deferred hook calls, if any), and only calls
//! [`Commit::invoke`] once the outermost attempt in the backtracking
//! region is guaranteed to stick. The same deferral applies to
//! `on_match` hooks as to actions: a hook fired eagerly during a
//! provisional parse, before its attempt's fate is known, would be
//! observable even if that attempt is later rewound.

use log::debug;

use crate::block::BlockDef;
use crate::error::ActionError;
use crate::matcher::HookCall;
use crate::parse::Line;

pub type ActionResult<T> = Result<T, ActionError>;

/// A one-shot callback returned by an action, run as this block's share of
/// `Commit::invoke`. Boxed `FnOnce` because an action typically wants to
/// move captured data (e.g. an owned `String` built from the captured
/// lines) into it.
pub type ActionThunk = Box<dyn FnOnce() -> ActionResult<()>>;

/// A block definition's action: given the lines it captured and its
/// 1-based occurrence index, optionally returns a commit thunk.
pub type Action = std::rc::Rc<dyn Fn(&[Line], u32) -> ActionResult<Option<ActionThunk>>>;

/// A deferred, not-yet-applied success.
///
/// Built the moment a block's span closes (head/body/tail all matched, or
/// `line_count` lines were consumed), but not *invoked* until the engine
/// has decided this attempt will not be backtracked out of. Invocation is
/// post-order: children commit before the parent, in the order they were
/// captured, so nested blocks are visible to their parent's own action only
/// as already-applied facts.
pub struct Commit {
    def: BlockDef,
    captured: Vec<Line>,
    children: Vec<Commit>,
    hooks: Vec<HookCall>,
}

impl Commit {
    pub(crate) fn new(def: BlockDef, captured: Vec<Line>, children: Vec<Commit>, hooks: Vec<HookCall>) -> Commit {
        Commit {
            def,
            captured,
            children,
            hooks,
        }
    }

    /// Applies this commit and all of its children, post-order: every
    /// descendant's hooks, action, and thunk fire before this block's own.
    ///
    /// `occurrence_index` and the usage-count increment both happen here,
    /// at invoke time, rather than when this `Commit` was built, since a
    /// provisional success later discarded by an ancestor's backtrack must
    /// never have consumed an occurrence slot.
    pub(crate) fn invoke(self) -> ActionResult<()> {
        for child in self.children {
            child.invoke()?;
        }
        for hook in &self.hooks {
            hook.invoke();
        }
        let occurrence_index = self.def.usage_count() + 1;
        debug!(
            "committing `{}` occurrence {occurrence_index} ({} lines)",
            self.def.name(),
            self.captured.len()
        );
        let thunk = self.def.run_action(&self.captured, occurrence_index)?;
        self.def.increment_usage();
        if let Some(thunk) = thunk {
            thunk()?;
        }
        Ok(())
    }
}
