//! Fill crossword grids by treating them as a constraint satisfaction problem.
//!
//! A [`Puzzle`] describes the grid: which slots exist, where they cross, and which words may go in
//! them. A [`Solver`] enforces node and arc consistency over per-slot [`Domains`], then runs a
//! backtracking search ordered by the minimum-remaining-values and least-constraining-value
//! heuristics, with inference after every tentative choice.

pub mod consistency;
pub mod domain;
pub mod puzzle;
pub mod render;
pub mod solver;

pub use consistency::{
    ac3, all_arcs, enforce_node_consistency, revise, Arc, ArcConsistencyFailure,
    ArcConsistencyResult,
};
pub use domain::{DomainSnapshot, Domains, Speculation};
pub use puzzle::{
    Crossing, Direction, GridCoord, GridEntry, Puzzle, PuzzleError, SlotConfig, SlotId,
    Vocabulary, Word, WordId, MAX_SLOT_LENGTH,
};
pub use render::render_grid;
pub use solver::{
    find_fill, find_fill_with_options, Assignment, FillSuccess, Solver, SolverOptions,
    Statistics,
};
