use std::collections::{HashSet, VecDeque};

use crate::domain::Domains;
use crate::puzzle::{Puzzle, SlotId};

/// An ordered pair of slots `(x, y)`: revising it makes `x` consistent with `y`.
pub type Arc = (SlotId, SlotId);

/// Propagation bottomed out: the named slot has no options left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArcConsistencyFailure {
    pub emptied_slot_id: SlotId,
}

pub type ArcConsistencyResult = Result<(), ArcConsistencyFailure>;

/// Remove every option whose length differs from its slot's length.
pub fn enforce_node_consistency(puzzle: &Puzzle, domains: &mut Domains) {
    for slot in puzzle.slots() {
        domains.retain(slot.id, |&word_id| puzzle.word(word_id).len() == slot.length);
    }
}

/// Make `x` arc consistent with `y`: drop each option of `x` whose letter at the crossing isn't
/// matched by any option of `y`. Returns whether `x` lost any options.
pub fn revise(puzzle: &Puzzle, domains: &mut Domains, x: SlotId, y: SlotId) -> bool {
    let Some((x_cell, y_cell)) = puzzle.overlap(x, y) else {
        return false;
    };

    let supported_glyphs: HashSet<char> = domains
        .options(y)
        .iter()
        .filter_map(|&word_id| puzzle.word(word_id).glyph(y_cell))
        .collect();

    domains.retain(x, |&word_id| {
        puzzle
            .word(word_id)
            .glyph(x_cell)
            .is_some_and(|glyph| supported_glyphs.contains(&glyph))
    })
}

/// Every ordered pair of distinct slots.
pub fn all_arcs(puzzle: &Puzzle) -> Vec<Arc> {
    let slot_count = puzzle.slot_count();
    (0..slot_count)
        .flat_map(|x| (0..slot_count).filter(move |&y| y != x).map(move |y| (x, y)))
        .collect()
}

/// Work list for `ac3`. An arc that is already waiting is not queued a second time.
#[derive(Debug, Default)]
struct ConsistencyQueue {
    queue: VecDeque<Arc>,
    queued: HashSet<Arc>,
}

impl ConsistencyQueue {
    fn with_initial_queue<Items>(items: Items) -> ConsistencyQueue
    where
        Items: IntoIterator<Item = Arc>,
    {
        let mut queue = ConsistencyQueue::default();
        for arc in items {
            queue.enqueue(arc);
        }
        queue
    }

    fn pop_front(&mut self) -> Option<Arc> {
        let arc = self.queue.pop_front()?;
        self.queued.remove(&arc);
        Some(arc)
    }

    fn enqueue(&mut self, arc: Arc) {
        if self.queued.insert(arc) {
            self.queue.push_back(arc);
        }
    }
}

/// AC-3 propagation. Starts from `arcs`, or from every ordered pair of distinct slots when `arcs`
/// is `None`, and revises until nothing changes. Fails as soon as any slot runs out of options,
/// including a covered slot that was already empty on entry.
pub fn ac3(
    puzzle: &Puzzle,
    domains: &mut Domains,
    arcs: Option<Vec<Arc>>,
) -> ArcConsistencyResult {
    // Isolated slots never appear in an arc, so they are checked up front.
    let already_empty = match &arcs {
        None => (0..puzzle.slot_count()).find(|&slot_id| domains.is_exhausted(slot_id)),
        Some(arcs) => arcs
            .iter()
            .flat_map(|&(x, y)| [x, y])
            .find(|&slot_id| domains.is_exhausted(slot_id)),
    };
    if let Some(emptied_slot_id) = already_empty {
        log::trace!("slot {emptied_slot_id} has no options");
        return Err(ArcConsistencyFailure { emptied_slot_id });
    }

    let mut queue = ConsistencyQueue::with_initial_queue(arcs.unwrap_or_else(|| all_arcs(puzzle)));

    while let Some((x, y)) = queue.pop_front() {
        if !revise(puzzle, domains, x, y) {
            continue;
        }

        if domains.is_exhausted(x) {
            log::trace!("arc ({x}, {y}) emptied slot {x}");
            return Err(ArcConsistencyFailure { emptied_slot_id: x });
        }

        // `x` shrank, so each of its other neighbors has to be rechecked against it.
        for &z in puzzle.neighbors(x) {
            if z != y {
                queue.enqueue((z, x));
            }
        }
    }

    Ok(())
}
