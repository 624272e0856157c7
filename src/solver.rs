use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};

use bit_set::BitSet;
use instant::{Duration, Instant};
use smallvec::SmallVec;

use crate::consistency::{ac3, enforce_node_consistency, Arc};
use crate::domain::Domains;
use crate::puzzle::{Puzzle, SlotId, WordId, MAX_SLOT_LENGTH};

/// A partial or complete mapping from slots to the words chosen for them.
pub type Assignment = BTreeMap<SlotId, WordId>;

/// Knobs for the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverOptions {
    /// Propagate each tentative choice to the other slots, promoting forced values, before
    /// recursing. With this off the search is plain backtracking.
    pub inference: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions { inference: true }
    }
}

/// A struct tracking statistics about the filling process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statistics {
    /// Calls to `backtrack`.
    pub states: u64,
    /// Branches that ran out of values.
    pub backtracks: u64,
    /// Tentative choices rejected by inference.
    pub inference_failures: u64,
    /// Slots assigned because inference left them a single option.
    pub forced_assignments: u64,
    pub duration: Duration,
}

/// Backtracking search over a puzzle, with node and arc consistency up front and optional
/// inference after each choice.
#[derive(Debug)]
pub struct Solver<'a> {
    puzzle: &'a Puzzle,
    domains: Domains,
    options: SolverOptions,
    statistics: Statistics,
}

impl<'a> Solver<'a> {
    pub fn new(puzzle: &'a Puzzle) -> Solver<'a> {
        Solver::with_options(puzzle, SolverOptions::default())
    }

    pub fn with_options(puzzle: &'a Puzzle, options: SolverOptions) -> Solver<'a> {
        Solver {
            puzzle,
            domains: Domains::new(puzzle),
            options,
            statistics: Statistics::default(),
        }
    }

    pub fn domains(&self) -> &Domains {
        &self.domains
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// Enforce node and arc consistency, then search. `None` means no assignment satisfies every
    /// constraint.
    pub fn solve(&mut self) -> Option<Assignment> {
        let start = Instant::now();
        self.domains = Domains::new(self.puzzle);
        self.statistics = Statistics::default();

        enforce_node_consistency(self.puzzle, &mut self.domains);

        let result = match ac3(self.puzzle, &mut self.domains, None) {
            Ok(()) => self.backtrack(&Assignment::new()),
            Err(failure) => {
                log::debug!(
                    "initial arc consistency emptied slot {}",
                    failure.emptied_slot_id
                );
                None
            }
        };

        self.statistics.duration = start.elapsed();
        log::debug!(
            "search {} after {:?}",
            if result.is_some() { "succeeded" } else { "failed" },
            self.statistics
        );

        result
    }

    /// Whether every slot has a word.
    pub fn assignment_complete(&self, assignment: &Assignment) -> bool {
        assignment.len() == self.puzzle.slot_count()
    }

    /// Check an assignment, possibly partial: no word used twice, every word fits its slot, and
    /// every pair of assigned crossing slots agrees on the shared letter.
    pub fn consistent(&self, assignment: &Assignment) -> bool {
        let mut used_words: HashSet<WordId> = HashSet::with_capacity(assignment.len());

        for (&slot_id, &word_id) in assignment {
            if !used_words.insert(word_id) {
                return false;
            }
            if self.puzzle.word(word_id).len() != self.puzzle.slot(slot_id).length {
                return false;
            }
        }

        for (&x, &x_word_id) in assignment {
            for &y in self.puzzle.neighbors(x) {
                let Some(&y_word_id) = assignment.get(&y) else {
                    continue;
                };
                let Some((x_cell, y_cell)) = self.puzzle.overlap(x, y) else {
                    continue;
                };
                let x_glyph = self.puzzle.word(x_word_id).glyph(x_cell);
                if x_glyph != self.puzzle.word(y_word_id).glyph(y_cell) {
                    return false;
                }
            }
        }

        true
    }

    /// The options of `slot_id`, least constraining first: each word is ranked by how many options
    /// it would rule out in the slot's unassigned neighbors. Ties keep vocabulary order.
    pub fn order_domain_values(&self, slot_id: SlotId, assignment: &Assignment) -> Vec<WordId> {
        let open_crossings: SmallVec<[(SlotId, usize, usize); MAX_SLOT_LENGTH]> = self
            .puzzle
            .neighbors(slot_id)
            .iter()
            .filter(|&&neighbor| !assignment.contains_key(&neighbor))
            .filter_map(|&neighbor| {
                let (cell, neighbor_cell) = self.puzzle.overlap(slot_id, neighbor)?;
                Some((neighbor, cell, neighbor_cell))
            })
            .collect();

        let mut ranked: Vec<(usize, WordId)> = self
            .domains
            .options(slot_id)
            .iter()
            .map(|&word_id| {
                let word = self.puzzle.word(word_id);
                let ruled_out: usize = open_crossings
                    .iter()
                    .map(|&(neighbor, cell, neighbor_cell)| {
                        self.domains
                            .options(neighbor)
                            .iter()
                            .filter(|&&other| {
                                self.puzzle.word(other).glyph(neighbor_cell) != word.glyph(cell)
                            })
                            .count()
                    })
                    .sum();
                (ruled_out, word_id)
            })
            .collect();

        ranked.sort_by_key(|&(ruled_out, _)| ruled_out);
        ranked.into_iter().map(|(_, word_id)| word_id).collect()
    }

    /// Choose the unassigned slot with the fewest remaining options, preferring the one with the
    /// most neighbors on a tie, then the lowest id. `None` if every slot is assigned.
    pub fn select_unassigned_variable(&self, assignment: &Assignment) -> Option<SlotId> {
        (0..self.puzzle.slot_count())
            .filter(|slot_id| !assignment.contains_key(slot_id))
            .min_by_key(|&slot_id| {
                (
                    self.domains.option_count(slot_id),
                    Reverse(self.puzzle.neighbors(slot_id).len()),
                )
            })
    }

    /// Propagate a tentative assignment: pin each assigned slot to its word, restore arc
    /// consistency along the arcs touching assigned slots, and add any slot left with exactly one
    /// option to the assignment. Returns `None` if some slot runs out of options. The domains are
    /// left exactly as they were.
    pub fn infer(&mut self, mut assignment: Assignment) -> Option<Assignment> {
        let puzzle = self.puzzle;
        let assigned: BitSet = assignment.keys().copied().collect();

        let mut domains = self.domains.speculate();
        for (&slot_id, &word_id) in &assignment {
            domains.set_single(slot_id, word_id);
        }

        // Arcs between two unassigned slots can't have been affected.
        let arcs: Vec<Arc> = assigned
            .iter()
            .flat_map(move |x| puzzle.neighbors(x).iter().flat_map(move |&y| [(y, x), (x, y)]))
            .collect();

        if let Err(failure) = ac3(puzzle, &mut domains, Some(arcs)) {
            log::trace!("inference emptied slot {}", failure.emptied_slot_id);
            self.statistics.inference_failures += 1;
            return None;
        }

        for slot_id in (0..puzzle.slot_count()).filter(|&slot_id| !assigned.contains(slot_id)) {
            if domains.is_exhausted(slot_id) {
                self.statistics.inference_failures += 1;
                return None;
            }
            if let Some(word_id) = domains.single_option(slot_id) {
                assignment.insert(slot_id, word_id);
                self.statistics.forced_assignments += 1;
            }
        }

        Some(assignment)
    }

    /// Depth-first search from a partial assignment. Each value tried gets its own extended copy
    /// of the assignment, and the first complete assignment found is returned.
    pub fn backtrack(&mut self, assignment: &Assignment) -> Option<Assignment> {
        self.statistics.states += 1;

        if self.assignment_complete(assignment) {
            return Some(assignment.clone());
        }

        let slot_id = self.select_unassigned_variable(assignment)?;
        log::trace!(
            "filling slot {} ({} options, {} assigned)",
            slot_id,
            self.domains.option_count(slot_id),
            assignment.len()
        );

        for word_id in self.order_domain_values(slot_id, assignment) {
            let mut extended = assignment.clone();
            extended.insert(slot_id, word_id);

            let extended = if self.options.inference {
                match self.infer(extended) {
                    Some(inferred) => inferred,
                    None => continue,
                }
            } else {
                extended
            };

            if !self.consistent(&extended) {
                continue;
            }

            if let Some(result) = self.backtrack(&extended) {
                return Some(result);
            }
        }

        self.statistics.backtracks += 1;
        None
    }
}

/// A solved puzzle along with how the search went.
#[derive(Debug, Clone)]
pub struct FillSuccess {
    pub statistics: Statistics,
    pub assignment: Assignment,
}

/// Search for a valid fill for the given puzzle with the default options.
pub fn find_fill(puzzle: &Puzzle) -> Option<FillSuccess> {
    find_fill_with_options(puzzle, SolverOptions::default())
}

/// Search for a valid fill for the given puzzle.
pub fn find_fill_with_options(puzzle: &Puzzle, options: SolverOptions) -> Option<FillSuccess> {
    let mut solver = Solver::with_options(puzzle, options);
    let assignment = solver.solve()?;

    Some(FillSuccess {
        statistics: solver.statistics,
        assignment,
    })
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::consistency::{ac3, enforce_node_consistency};
    use crate::puzzle::{Direction::*, GridEntry, Puzzle, Vocabulary};
    use crate::render_grid;

    use super::{find_fill, Assignment, Solver, SolverOptions};

    fn strings<'a>(puzzle: &'a Puzzle, assignment: &Assignment) -> Vec<(usize, &'a str)> {
        assignment
            .iter()
            .map(|(&slot_id, &word_id)| (slot_id, puzzle.word(word_id).string.as_str()))
            .collect()
    }

    fn assign(puzzle: &Puzzle, pairs: &[(usize, &str)]) -> Assignment {
        pairs
            .iter()
            .map(|&(slot_id, word)| (slot_id, puzzle.vocabulary().position(word).unwrap()))
            .collect()
    }

    /// ...
    /// .##
    /// .##
    /// .##
    fn crossing_puzzle(words: &[&str]) -> Puzzle {
        Puzzle::from_entries(
            Vocabulary::new(words),
            &[
                GridEntry { loc: (0, 0), len: 3, dir: Across },
                GridEntry { loc: (0, 0), len: 4, dir: Down },
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_single_slot() {
        let puzzle = Puzzle::from_entries(
            Vocabulary::new(["cat"]),
            &[GridEntry { loc: (0, 0), len: 3, dir: Across }],
        )
        .unwrap();

        let result = Solver::new(&puzzle).solve().expect("Failed to find a fill");

        assert_eq!(strings(&puzzle, &result), [(0, "cat")]);
    }

    #[test]
    fn test_crossing_without_shared_letter_has_no_solution() {
        let puzzle = Puzzle::from_entries(
            Vocabulary::new(["cat", "dog"]),
            &[
                GridEntry { loc: (0, 1), len: 3, dir: Across },
                GridEntry { loc: (1, 0), len: 3, dir: Down },
            ],
        )
        .unwrap();
        assert_eq!(puzzle.overlap(0, 1), Some((1, 1)));

        assert_eq!(Solver::new(&puzzle).solve(), None);
        assert!(find_fill(&puzzle).is_none());
    }

    #[test]
    fn test_crossing_with_shared_first_letter() {
        let puzzle = crossing_puzzle(&["cat", "cast"]);

        let result = Solver::new(&puzzle).solve().expect("Failed to find a fill");

        assert_eq!(strings(&puzzle, &result), [(0, "cat"), (1, "cast")]);
    }

    #[test]
    fn test_no_slots_is_trivially_complete() {
        let puzzle = Puzzle::from_template(Vocabulary::new(["cat"]), "#_#").unwrap();

        assert_eq!(Solver::new(&puzzle).solve(), Some(Assignment::new()));
    }

    #[test]
    fn test_missing_length_is_no_solution() {
        let puzzle = crossing_puzzle(&["cat", "dog"]);

        assert_eq!(Solver::new(&puzzle).solve(), None);
    }

    #[test]
    fn test_words_are_not_reused() {
        // Two parallel across slots that don't cross can't both take the only word.
        let puzzle = Puzzle::from_template(Vocabulary::new(["ab"]), "__\n##\n__").unwrap();
        assert_eq!(Solver::new(&puzzle).solve(), None);

        let puzzle = Puzzle::from_template(Vocabulary::new(["ab", "cd"]), "__\n##\n__").unwrap();
        let result = Solver::new(&puzzle).solve().expect("Failed to find a fill");
        assert_eq!(strings(&puzzle, &result), [(0, "ab"), (1, "cd")]);
    }

    #[test]
    fn test_structure_with_unique_fill() {
        let puzzle = Puzzle::from_template(
            Vocabulary::parse("one\ntwo\nthree\nfour\nfive\nsix\nseven\neight\nnine\nten\n"),
            "
            #___#
            #_##_
            #_##_
            #_##_
            #____
            ",
        )
        .unwrap();

        for inference in [true, false] {
            let mut solver = Solver::with_options(&puzzle, SolverOptions { inference });
            let result = solver.solve().expect("Failed to find a fill");

            assert_eq!(
                strings(&puzzle, &result),
                [(0, "SIX"), (1, "NINE"), (2, "SEVEN"), (3, "FIVE")]
            );
            assert_eq!(
                render_grid(&puzzle, &result),
                "█SIX█\n█E██F\n█V██I\n█E██V\n█NINE"
            );
        }
    }

    #[test]
    fn test_consistent() {
        let puzzle = crossing_puzzle(&["cat", "cow", "cast", "dust", "dog"]);
        let solver = Solver::new(&puzzle);

        assert!(solver.consistent(&Assignment::new()));
        assert!(solver.consistent(&assign(&puzzle, &[(0, "cat")])));
        assert!(solver.consistent(&assign(&puzzle, &[(0, "cow"), (1, "cast")])));

        // Disagreeing crossing.
        assert!(!solver.consistent(&assign(&puzzle, &[(0, "dog"), (1, "cast")])));
        // Wrong length.
        assert!(!solver.consistent(&assign(&puzzle, &[(0, "dust")])));
        // Repeated word.
        assert!(!solver.consistent(&assign(&puzzle, &[(0, "cat"), (1, "cat")])));
    }

    #[test]
    fn test_consistent_does_not_touch_domains() {
        let puzzle = crossing_puzzle(&["cat", "cast", "dog"]);
        let solver = Solver::new(&puzzle);
        let before = solver.domains().clone();

        solver.consistent(&assign(&puzzle, &[(0, "dog"), (1, "cast")]));

        assert_eq!(solver.domains(), &before);
    }

    #[test]
    fn test_order_domain_values_least_constraining_first() {
        let puzzle = crossing_puzzle(&["ace", "bat", "cat", "cast", "cube", "bust"]);
        let mut solver = Solver::new(&puzzle);
        enforce_node_consistency(&puzzle, &mut solver.domains);

        // Down options start with b, c, c: "cat" rules out one of them, "bat" two, "ace" all three.
        let ordered = solver.order_domain_values(0, &Assignment::new());
        let ordered: Vec<_> =
            ordered.iter().map(|&word_id| puzzle.word(word_id).string.as_str()).collect();
        assert_eq!(ordered, ["cat", "bat", "ace"]);

        // Assigned neighbors don't count, so everything ties and vocabulary order wins.
        let ordered = solver.order_domain_values(0, &assign(&puzzle, &[(1, "cube")]));
        let ordered: Vec<_> =
            ordered.iter().map(|&word_id| puzzle.word(word_id).string.as_str()).collect();
        assert_eq!(ordered, ["ace", "bat", "cat"]);
    }

    #[test]
    fn test_select_unassigned_variable() {
        // Row 0 across crosses both downs; the downs only cross it.
        //
        // ___
        // _#_
        // _#_
        let puzzle = Puzzle::from_template(
            Vocabulary::new(["abc", "abd", "bcd", "cab"]),
            "___\n_#_\n_#_",
        )
        .unwrap();
        let mut solver = Solver::new(&puzzle);
        enforce_node_consistency(&puzzle, &mut solver.domains);

        // All domains tie, so the across slot with two neighbors wins.
        assert_eq!(solver.select_unassigned_variable(&Assignment::new()), Some(0));

        // A strictly smaller domain beats a higher degree.
        solver.domains.retain(2, |&word_id| word_id == 0);
        assert_eq!(solver.select_unassigned_variable(&Assignment::new()), Some(2));
        assert_eq!(solver.select_unassigned_variable(&assign(&puzzle, &[(2, "abc")])), Some(0));

        let all = assign(&puzzle, &[(0, "abc"), (1, "abd"), (2, "bcd")]);
        assert_eq!(solver.select_unassigned_variable(&all), None);
    }

    #[test]
    fn test_infer_promotes_forced_values_and_restores_domains() {
        // ___
        // #_#
        // ___
        let puzzle = Puzzle::from_template(
            Vocabulary::new(["art", "cat", "dog", "ode", "ore", "red"]),
            "___\n#_#\n___",
        )
        .unwrap();
        let mut solver = Solver::new(&puzzle);
        enforce_node_consistency(&puzzle, &mut solver.domains);
        let before = solver.domains().clone();

        // Slots: 0 top, 1 bottom, 2 down. Pinning the bottom to "ode" forces "red" down.
        let inferred = solver.infer(assign(&puzzle, &[(1, "ode")])).expect("inference failed");
        assert_eq!(strings(&puzzle, &inferred), [(1, "ode"), (2, "red")]);
        assert_eq!(solver.domains(), &before);
        assert_eq!(solver.statistics().forced_assignments, 1);

        // Nothing going down ends in "a", so pinning the bottom to "cat" fails.
        assert_eq!(solver.infer(assign(&puzzle, &[(1, "cat")])), None);
        assert_eq!(solver.domains(), &before);
        assert_eq!(solver.statistics().inference_failures, 1);
    }

    #[test]
    fn test_statistics_are_recorded() {
        let puzzle = crossing_puzzle(&["cat", "cast", "dog"]);
        let result = find_fill(&puzzle).expect("Failed to find a fill");

        assert_eq!(result.assignment.len(), 2);
        assert!(result.statistics.states >= 1);
    }

    fn arb_puzzle() -> impl Strategy<Value = Puzzle> {
        (
            prop::collection::vec(any::<bool>(), 16),
            prop::collection::vec("[abc]{2,4}", 1..20),
        )
            .prop_map(|(cells, words)| {
                let template: String = cells
                    .chunks(4)
                    .map(|row| {
                        let line: String =
                            row.iter().map(|&open| if open { '_' } else { '#' }).collect();
                        line + "\n"
                    })
                    .collect();
                Puzzle::from_template(Vocabulary::new(words), &template).unwrap()
            })
    }

    proptest! {
        #[test]
        fn test_inference_agrees_with_plain_backtracking(puzzle in arb_puzzle()) {
            let with_inference =
                Solver::with_options(&puzzle, SolverOptions { inference: true }).solve();
            let without_inference =
                Solver::with_options(&puzzle, SolverOptions { inference: false }).solve();

            prop_assert_eq!(with_inference.is_some(), without_inference.is_some());

            let checker = Solver::new(&puzzle);
            for assignment in with_inference.iter().chain(without_inference.iter()) {
                prop_assert!(checker.assignment_complete(assignment));
                prop_assert!(checker.consistent(assignment));
            }
        }

        #[test]
        fn test_select_unassigned_variable_picks_minimum(
            puzzle in arb_puzzle(),
            assigned_mask in prop::collection::vec(any::<bool>(), 16),
        ) {
            let mut solver = Solver::new(&puzzle);
            enforce_node_consistency(&puzzle, &mut solver.domains);
            let _ = ac3(&puzzle, &mut solver.domains, None);

            let assignment: Assignment = (0..puzzle.slot_count())
                .filter(|&slot_id| assigned_mask[slot_id % assigned_mask.len()])
                .map(|slot_id| (slot_id, 0))
                .collect();

            let unassigned: Vec<usize> = (0..puzzle.slot_count())
                .filter(|slot_id| !assignment.contains_key(slot_id))
                .collect();

            match solver.select_unassigned_variable(&assignment) {
                None => prop_assert!(unassigned.is_empty()),
                Some(chosen) => {
                    prop_assert!(!assignment.contains_key(&chosen));
                    let chosen_key = (
                        solver.domains().option_count(chosen),
                        std::cmp::Reverse(puzzle.neighbors(chosen).len()),
                    );
                    for &slot_id in &unassigned {
                        let key = (
                            solver.domains().option_count(slot_id),
                            std::cmp::Reverse(puzzle.neighbors(slot_id).len()),
                        );
                        prop_assert!(chosen_key <= key);
                    }
                }
            }
        }
    }
}
