//! Fill a crossword structure from a word list.
//!
//! ```sh
//! crossfill data/structure0.txt data/words0.txt
//! crossfill data/structure0.txt data/words0.txt output.txt
//! RUST_LOG=debug crossfill data/structure0.txt data/words0.txt --no-inference
//! ```
//!
//! The structure file marks fillable cells with `_` (or `.`) and blocks with `#`. The word list
//! has one word per line.

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use crossfill::{render_grid, Puzzle, Solver, SolverOptions};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Grid structure file.
    #[arg(value_name = "STRUCTURE")]
    structure: PathBuf,

    /// Word list file, one word per line.
    #[arg(value_name = "WORDS")]
    words: PathBuf,

    /// Write the filled grid to this file as well as printing it.
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Search with plain backtracking, without inference after each choice.
    #[arg(long)]
    no_inference: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let puzzle = match Puzzle::load(&args.structure, &args.words) {
        Ok(puzzle) => puzzle,
        Err(err) => {
            eprintln!("Failed to load puzzle: {err}");
            process::exit(1);
        }
    };
    log::info!(
        "loaded {}x{} grid with {} slots and {} words",
        puzzle.width(),
        puzzle.height(),
        puzzle.slot_count(),
        puzzle.vocabulary().len()
    );

    let mut solver = Solver::with_options(
        &puzzle,
        SolverOptions {
            inference: !args.no_inference,
        },
    );
    let result = solver.solve();
    log::info!("{:?}", solver.statistics());

    let Some(assignment) = result else {
        println!("No solution.");
        return;
    };

    let display_grid = render_grid(&puzzle, &assignment);
    println!("{display_grid}");

    if let Some(output) = &args.output {
        if let Err(err) = fs::write(output, display_grid + "\n") {
            eprintln!("Unable to write {}: {err}", output.display());
            process::exit(1);
        }
        log::info!("written grid to {}", output.display());
    }
}
