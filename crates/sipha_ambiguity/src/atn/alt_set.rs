//! Bitset of alternative numbers (1-based), as reported for conflicting decisions.

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

const WORD_BITS: usize = 64;

/// Set of alternative numbers.
///
/// Alternatives are numbered from 1, matching the order of the outgoing
/// transitions of a decision state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct AltSet {
    words: SmallVec<[u64; 1]>,
}

impl AltSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, alt: usize) {
        let (word, bit) = (alt / WORD_BITS, alt % WORD_BITS);
        if self.words.len() <= word {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1 << bit;
    }

    pub fn remove(&mut self, alt: usize) {
        let (word, bit) = (alt / WORD_BITS, alt % WORD_BITS);
        if let Some(w) = self.words.get_mut(word) {
            *w &= !(1 << bit);
        }
        // keep the representation canonical so derived equality holds
        while self.words.last() == Some(&0) {
            self.words.pop();
        }
    }

    #[must_use]
    pub fn contains(&self, alt: usize) -> bool {
        let (word, bit) = (alt / WORD_BITS, alt % WORD_BITS);
        self.words.get(word).is_some_and(|w| w & (1 << bit) != 0)
    }

    /// Number of alternatives in the set
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Lowest alternative in the set
    #[must_use]
    pub fn min_alt(&self) -> Option<usize> {
        self.iter().next()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            (0..WORD_BITS)
                .filter(move |bit| word & (1 << bit) != 0)
                .map(move |bit| i * WORD_BITS + bit)
        })
    }
}

impl FromIterator<usize> for AltSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = Self::new();
        for alt in iter {
            set.insert(alt);
        }
        set
    }
}

impl fmt::Display for AltSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let alts: Vec<String> = self.iter().map(|a| a.to_string()).collect();
        write!(f, "{{{}}}", alts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_beyond_first_word() {
        let mut set = AltSet::new();
        set.insert(1);
        set.insert(70);
        assert!(set.contains(70));
        assert!(!set.contains(69));
        assert_eq!(set.len(), 2);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![1, 70]);
    }

    #[test]
    fn test_remove_and_empty() {
        let mut set: AltSet = [2, 3].into_iter().collect();
        set.remove(2);
        assert_eq!(set.min_alt(), Some(3));
        set.remove(3);
        assert!(set.is_empty());
        assert_eq!(set.to_string(), "{}");
    }
}
