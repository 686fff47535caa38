use crate::atn::RuleIndex;
use crate::tree::ParseTree;
use hashbrown::{HashMap, HashSet};
use std::sync::Arc;

/// Key for memo entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct MemoKey {
    pub rule: RuleIndex,
    pub position: usize,
}

impl MemoKey {
    #[must_use]
    pub const fn new(rule: RuleIndex, position: usize) -> Self {
        Self { rule, position }
    }
}

/// Derivations found so far for one `(rule, position)` pair
#[derive(Debug, Default)]
struct MemoEntry {
    trees: Vec<Arc<ParseTree>>,
    seen: HashSet<Arc<ParseTree>, ahash::RandomState>,
}

/// Derivation table grown monotonically across fixpoint passes.
///
/// Entries only ever gain trees, and each entry holds at most `capacity`
/// distinct trees, so repeated passes reach a fixpoint.
#[derive(Debug)]
pub(super) struct MemoTable {
    entries: HashMap<MemoKey, MemoEntry, ahash::RandomState>,
    capacity: usize,
    dropped: usize,
}

impl MemoTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_hasher(ahash::RandomState::new()),
            capacity,
            dropped: 0,
        }
    }

    /// Current derivations of `key`
    pub fn get(&self, key: MemoKey) -> Vec<Arc<ParseTree>> {
        self.entries
            .get(&key)
            .map(|entry| entry.trees.clone())
            .unwrap_or_default()
    }

    /// Add derivations; returns how many were new
    pub fn extend(&mut self, key: MemoKey, trees: impl IntoIterator<Item = Arc<ParseTree>>) -> usize {
        let entry = self.entries.entry(key).or_default();
        let mut added = 0;
        for tree in trees {
            if entry.seen.contains(&tree) {
                continue;
            }
            if entry.trees.len() >= self.capacity {
                self.dropped += 1;
                continue;
            }
            entry.seen.insert(Arc::clone(&tree));
            entry.trees.push(tree);
            added += 1;
        }
        added
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Derivations discarded because an entry was full
    pub const fn dropped(&self) -> usize {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::TerminalNode;

    fn leaf(index: usize) -> Arc<ParseTree> {
        Arc::new(ParseTree::Token(TerminalNode {
            token_index: index,
            token_type: 1,
            state: None,
        }))
    }

    #[test]
    fn test_extend_deduplicates_and_caps() {
        let mut memo = MemoTable::new(2);
        let key = MemoKey::new(0, 0);
        assert_eq!(memo.extend(key, [leaf(0), leaf(0)]), 1);
        assert_eq!(memo.extend(key, [leaf(0), leaf(1), leaf(2)]), 1);
        assert_eq!(memo.get(key).len(), 2);
        assert_eq!(memo.dropped(), 1);
        assert!(memo.get(MemoKey::new(1, 0)).is_empty());
    }
}
