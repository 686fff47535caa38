//! Call-stack contexts used to make lookahead context sensitive.

use crate::atn::StateId;
use smallvec::SmallVec;
use std::sync::Arc;

/// One possible caller: where to resume, and the context of that caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextFrame {
    /// Follow state of the rule-call transition that entered the current rule
    pub return_state: StateId,
    /// Context of the caller; `None` when the caller's own context is unknown
    pub parent: Option<Arc<CallContext>>,
}

/// Immutable, structurally shared stack of return states.
///
/// A context with no frames is the empty stack (`$`): the outermost rule has
/// nothing to return to. A context with several frames stands for several
/// merged call sites; lookahead explores each of them. Contexts are only ever
/// built on top of existing ones, so a context can never contain itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CallContext {
    frames: SmallVec<[ContextFrame; 1]>,
}

impl CallContext {
    /// The empty stack
    #[must_use]
    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Push a return state on top of `parent`
    #[must_use]
    pub fn push(parent: Option<&Arc<Self>>, return_state: StateId) -> Arc<Self> {
        let mut frames = SmallVec::new();
        frames.push(ContextFrame {
            return_state,
            parent: parent.cloned(),
        });
        Arc::new(Self { frames })
    }

    /// Build a linear stack from return states listed outermost first.
    #[must_use]
    pub fn from_return_states<I>(return_states: I) -> Arc<Self>
    where
        I: IntoIterator<Item = StateId>,
    {
        return_states
            .into_iter()
            .fold(Self::empty(), |ctx, state| Self::push(Some(&ctx), state))
    }

    /// Union of the frames of two contexts; duplicate frames are kept once.
    #[must_use]
    pub fn merge(a: &Arc<Self>, b: &Arc<Self>) -> Arc<Self> {
        if a == b {
            return Arc::clone(a);
        }
        let mut frames = a.frames.clone();
        for frame in &b.frames {
            if !frames.contains(frame) {
                frames.push(frame.clone());
            }
        }
        frames.sort_by_key(|f| f.return_state);
        Arc::new(Self { frames })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[must_use]
    pub fn frames(&self) -> &[ContextFrame] {
        &self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_shares_parent() {
        let root = CallContext::empty();
        let a = CallContext::push(Some(&root), 4);
        let b = CallContext::push(Some(&a), 9);
        assert_eq!(b.frames()[0].return_state, 9);
        assert!(Arc::ptr_eq(b.frames()[0].parent.as_ref().unwrap(), &a));
        assert!(root.is_empty());

        let detached = CallContext::push(None, 3);
        assert_eq!(detached.frames().len(), 1);
        assert!(detached.frames()[0].parent.is_none());
    }

    #[test]
    fn test_structural_equality() {
        let a = CallContext::from_return_states([1, 2]);
        let b = CallContext::from_return_states([1, 2]);
        assert_eq!(a, b);
        assert_ne!(a, CallContext::from_return_states([2, 1]));
    }

    #[test]
    fn test_merge_deduplicates() {
        let a = CallContext::from_return_states([3]);
        let b = CallContext::from_return_states([7]);
        let merged = CallContext::merge(&a, &b);
        assert_eq!(merged.frames().len(), 2);
        let again = CallContext::merge(&merged, &a);
        assert_eq!(again.frames().len(), 2);
    }
}
