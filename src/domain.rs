use std::ops::{Deref, DerefMut};

use crate::puzzle::{Puzzle, SlotId, WordId};

/// The words still considered feasible for each slot. Each slot's options are kept in vocabulary
/// order, so filtering never reorders them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domains {
    options_by_slot: Vec<Vec<WordId>>,
}

/// A deep copy of every slot's options, taken with `Domains::snapshot`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainSnapshot {
    options_by_slot: Vec<Vec<WordId>>,
}

impl Domains {
    /// Give every slot its own copy of the full vocabulary.
    pub fn new(puzzle: &Puzzle) -> Domains {
        let all_words: Vec<WordId> = (0..puzzle.vocabulary().len()).collect();

        Domains {
            options_by_slot: (0..puzzle.slot_count()).map(|_| all_words.clone()).collect(),
        }
    }

    #[cfg(test)]
    pub(crate) fn from_options(options_by_slot: Vec<Vec<WordId>>) -> Domains {
        Domains { options_by_slot }
    }

    pub fn slot_count(&self) -> usize {
        self.options_by_slot.len()
    }

    pub fn options(&self, slot_id: SlotId) -> &[WordId] {
        &self.options_by_slot[slot_id]
    }

    pub fn option_count(&self, slot_id: SlotId) -> usize {
        self.options_by_slot[slot_id].len()
    }

    pub fn is_exhausted(&self, slot_id: SlotId) -> bool {
        self.options_by_slot[slot_id].is_empty()
    }

    /// The slot's only remaining option, if it has exactly one.
    pub fn single_option(&self, slot_id: SlotId) -> Option<WordId> {
        match self.options_by_slot[slot_id].as_slice() {
            &[word_id] => Some(word_id),
            _ => None,
        }
    }

    /// Keep only the options of `slot_id` for which `keep` returns true. Returns whether anything
    /// was removed.
    pub fn retain<F>(&mut self, slot_id: SlotId, keep: F) -> bool
    where
        F: FnMut(&WordId) -> bool,
    {
        let options = &mut self.options_by_slot[slot_id];
        let before = options.len();
        options.retain(keep);
        options.len() != before
    }

    /// Collapse the slot's options to a single word.
    pub fn set_single(&mut self, slot_id: SlotId, word_id: WordId) {
        let options = &mut self.options_by_slot[slot_id];
        options.clear();
        options.push(word_id);
    }

    pub fn snapshot(&self) -> DomainSnapshot {
        DomainSnapshot {
            options_by_slot: self.options_by_slot.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: DomainSnapshot) {
        self.options_by_slot = snapshot.options_by_slot;
    }

    /// Take a snapshot and hand out a guard for making speculative changes. The snapshot is
    /// restored when the guard is dropped, whichever way the caller leaves its scope.
    pub fn speculate(&mut self) -> Speculation<'_> {
        let snapshot = self.snapshot();
        Speculation {
            domains: self,
            snapshot: Some(snapshot),
        }
    }
}

/// Scoped access to `Domains` whose changes are rolled back on drop.
#[derive(Debug)]
pub struct Speculation<'a> {
    domains: &'a mut Domains,
    snapshot: Option<DomainSnapshot>,
}

impl Deref for Speculation<'_> {
    type Target = Domains;

    fn deref(&self) -> &Domains {
        self.domains
    }
}

impl DerefMut for Speculation<'_> {
    fn deref_mut(&mut self) -> &mut Domains {
        self.domains
    }
}

impl Drop for Speculation<'_> {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.domains.restore(snapshot);
        }
    }
}
