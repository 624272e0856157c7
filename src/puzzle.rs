use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::fs;
use std::io;
use std::path::Path;

use smallvec::SmallVec;

/// The expected maximum length for a single slot.
pub const MAX_SLOT_LENGTH: usize = 21;

/// An identifier for a given slot, based on its index in the puzzle's `slot_configs` field.
pub type SlotId = usize;

/// An identifier for a given word, based on its index in the (sorted, deduplicated) vocabulary.
pub type WordId = usize;

/// Zero-indexed x and y coords for a cell in the grid, where y = 0 in the top row.
pub type GridCoord = (usize, usize);

/// Direction that a slot is facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Across,
    Down,
}

/// Errors raised while building a puzzle from files, templates or explicit entries.
#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum PuzzleError {
    #[display("failed to read puzzle input: {_0}")]
    #[from]
    Io(io::Error),
    #[display("structure template has no rows")]
    EmptyTemplate,
    #[display("entry {entry} has zero length")]
    EmptyEntry { entry: usize },
    #[display("more than two entries cover cell {cell:?}")]
    CrowdedCell { cell: GridCoord },
    #[display("slots {first} and {second} share more than one cell")]
    ParallelOverlap { first: SlotId, second: SlotId },
}

/// A candidate word. Offsets into a word index `glyphs`, so multi-byte characters count once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub string: String,
    pub glyphs: SmallVec<[char; MAX_SLOT_LENGTH]>,
}

impl Word {
    fn new(string: &str) -> Word {
        Word {
            string: string.to_string(),
            glyphs: string.chars().collect(),
        }
    }

    /// Number of characters in the word.
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// The character at `cell_idx`, if the word is long enough to have one.
    pub fn glyph(&self, cell_idx: usize) -> Option<char> {
        self.glyphs.get(cell_idx).copied()
    }
}

/// The immutable set of words that may be placed in slots.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    words: Vec<Word>,
}

impl Vocabulary {
    /// Build a vocabulary from raw strings. Entries are trimmed, blanks are dropped, and the
    /// result is deduplicated and sorted so that word ids follow lexical order.
    pub fn new<I, S>(words: I) -> Vocabulary
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut strings: Vec<String> = words
            .into_iter()
            .map(|word| word.as_ref().trim().to_string())
            .filter(|word| !word.is_empty())
            .collect();
        strings.sort();
        strings.dedup();

        Vocabulary {
            words: strings.iter().map(|string| Word::new(string)).collect(),
        }
    }

    /// Parse a word-list file: one word per line, normalized to uppercase.
    pub fn parse(text: &str) -> Vocabulary {
        Vocabulary::new(text.lines().map(str::to_uppercase))
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn word(&self, word_id: WordId) -> &Word {
        &self.words[word_id]
    }

    /// Look up the id of a word by its exact string.
    pub fn position(&self, string: &str) -> Option<WordId> {
        self.words
            .binary_search_by(|word| word.string.as_str().cmp(string))
            .ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Word> {
        self.words.iter()
    }
}

/// A crossing between one slot and another, referencing the other slot's id and the location of
/// the intersection within the other slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crossing {
    pub other_slot_id: SlotId,
    pub other_slot_cell: usize,
}

/// The static facts about one slot in the grid.
#[derive(Clone)]
pub struct SlotConfig {
    pub id: SlotId,
    pub start_cell: GridCoord,
    pub direction: Direction,
    pub length: usize,
    /// One entry per cell of the slot: the slot crossing that cell, if any.
    pub crossings: SmallVec<[Option<Crossing>; MAX_SLOT_LENGTH]>,
    /// Distinct crossing slots, in the order their cells appear in this slot.
    pub neighbors: SmallVec<[SlotId; MAX_SLOT_LENGTH]>,
}

impl SlotConfig {
    /// The coords of the cell at `cell_idx` within this slot.
    pub fn cell(&self, cell_idx: usize) -> GridCoord {
        let (x, y) = self.start_cell;
        match self.direction {
            Direction::Across => (x + cell_idx, y),
            Direction::Down => (x, y + cell_idx),
        }
    }

    /// The coords of each cell of this slot, in order.
    pub fn cell_coords(&self) -> impl Iterator<Item = GridCoord> + '_ {
        (0..self.length).map(|cell_idx| self.cell(cell_idx))
    }
}

impl Debug for SlotConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotConfig")
            .field("id", &self.id)
            .field("start_cell", &self.start_cell)
            .field("direction", &self.direction)
            .field("length", &self.length)
            .field("neighbors", &self.neighbors)
            .finish()
    }
}

/// An across or down entry in the input to `Puzzle::from_entries`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridEntry {
    pub loc: GridCoord,
    pub len: usize,
    pub dir: Direction,
}

impl GridEntry {
    /// Generate the coords for each cell of this entry.
    fn cell_coords(&self) -> Vec<GridCoord> {
        (0..self.len)
            .map(|cell_idx| match self.dir {
                Direction::Across => (self.loc.0 + cell_idx, self.loc.1),
                Direction::Down => (self.loc.0, self.loc.1 + cell_idx),
            })
            .collect()
    }
}

/// Everything about a crossword that stays fixed while it is being filled: the grid shape, the
/// slots and how they cross, and the vocabulary.
pub struct Puzzle {
    width: usize,
    height: usize,
    /// Indexed as `open_cells[y][x]`.
    open_cells: Vec<Vec<bool>>,
    slot_configs: Vec<SlotConfig>,
    vocabulary: Vocabulary,
}

impl Debug for Puzzle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Puzzle")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("slot_configs", &self.slot_configs)
            .field("words", &format!("({} entries)", self.vocabulary.len()))
            .finish()
    }
}

impl Puzzle {
    /// Build a puzzle whose open cells are exactly the cells covered by `entries`.
    pub fn from_entries(
        vocabulary: Vocabulary,
        entries: &[GridEntry],
    ) -> Result<Puzzle, PuzzleError> {
        let width = entries
            .iter()
            .flat_map(GridEntry::cell_coords)
            .map(|(x, _)| x + 1)
            .max()
            .unwrap_or(0);
        let height = entries
            .iter()
            .flat_map(GridEntry::cell_coords)
            .map(|(_, y)| y + 1)
            .max()
            .unwrap_or(0);

        let mut open_cells = vec![vec![false; width]; height];
        for (x, y) in entries.iter().flat_map(GridEntry::cell_coords) {
            open_cells[y][x] = true;
        }

        Puzzle::build(vocabulary, entries, open_cells)
    }

    /// Build a puzzle from a structure template, with `_` or `.` representing fillable cells and
    /// anything else (conventionally `#`) representing blocks. Lines are trimmed and blank lines
    /// skipped; short rows are padded with blocks.
    pub fn from_template(vocabulary: Vocabulary, template: &str) -> Result<Puzzle, PuzzleError> {
        let rows: Vec<Vec<bool>> = template
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| line.chars().map(|c| c == '_' || c == '.').collect())
            .collect();

        if rows.is_empty() {
            return Err(PuzzleError::EmptyTemplate);
        }

        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let open_cells: Vec<Vec<bool>> = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, false);
                row
            })
            .collect();
        let height = open_cells.len();

        // Collect maximal runs of open cells longer than one cell, across first and then down.
        fn push_runs(
            entries: &mut Vec<GridEntry>,
            dir: Direction,
            cells: impl Iterator<Item = (GridCoord, bool)>,
        ) {
            let mut run: Option<(GridCoord, usize)> = None;
            for (loc, open) in cells.chain(std::iter::once(((0, 0), false))) {
                if open {
                    run = Some(match run {
                        Some((start, len)) => (start, len + 1),
                        None => (loc, 1),
                    });
                } else if let Some((start, len)) = run.take() {
                    if len > 1 {
                        entries.push(GridEntry { loc: start, len, dir });
                    }
                }
            }
        }

        let mut entries = vec![];
        for y in 0..height {
            push_runs(
                &mut entries,
                Direction::Across,
                (0..width).map(|x| ((x, y), open_cells[y][x])),
            );
        }
        for x in 0..width {
            push_runs(
                &mut entries,
                Direction::Down,
                (0..height).map(|y| ((x, y), open_cells[y][x])),
            );
        }

        Puzzle::build(vocabulary, &entries, open_cells)
    }

    /// Read a structure file and a word-list file.
    pub fn load(
        structure_path: impl AsRef<Path>,
        words_path: impl AsRef<Path>,
    ) -> Result<Puzzle, PuzzleError> {
        let template = fs::read_to_string(structure_path)?;
        let vocabulary = Vocabulary::parse(&fs::read_to_string(words_path)?);
        Puzzle::from_template(vocabulary, &template)
    }

    fn build(
        vocabulary: Vocabulary,
        entries: &[GridEntry],
        open_cells: Vec<Vec<bool>>,
    ) -> Result<Puzzle, PuzzleError> {
        // Build a map from cell location to (entry index, cell index within entry), which we can
        // then use to calculate crossings.
        let mut entries_by_loc: HashMap<GridCoord, SmallVec<[(usize, usize); 2]>> = HashMap::new();

        for (entry_idx, entry) in entries.iter().enumerate() {
            if entry.len == 0 {
                return Err(PuzzleError::EmptyEntry { entry: entry_idx });
            }

            for (cell_idx, loc) in entry.cell_coords().into_iter().enumerate() {
                let cell_entries = entries_by_loc.entry(loc).or_default();
                if cell_entries.len() == 2 {
                    return Err(PuzzleError::CrowdedCell { cell: loc });
                }
                cell_entries.push((entry_idx, cell_idx));
            }
        }

        let mut slot_configs = Vec::with_capacity(entries.len());
        for (entry_idx, entry) in entries.iter().enumerate() {
            let crossings: SmallVec<[Option<Crossing>; MAX_SLOT_LENGTH]> = entry
                .cell_coords()
                .iter()
                .map(|loc| {
                    entries_by_loc[loc]
                        .iter()
                        .find(|&&(other_entry_idx, _)| other_entry_idx != entry_idx)
                        .map(|&(other_slot_id, other_slot_cell)| Crossing {
                            other_slot_id,
                            other_slot_cell,
                        })
                })
                .collect();

            let mut neighbors: SmallVec<[SlotId; MAX_SLOT_LENGTH]> = SmallVec::new();
            for crossing in crossings.iter().flatten() {
                if neighbors.contains(&crossing.other_slot_id) {
                    return Err(PuzzleError::ParallelOverlap {
                        first: entry_idx.min(crossing.other_slot_id),
                        second: entry_idx.max(crossing.other_slot_id),
                    });
                }
                neighbors.push(crossing.other_slot_id);
            }

            slot_configs.push(SlotConfig {
                id: entry_idx,
                start_cell: entry.loc,
                direction: entry.dir,
                length: entry.len,
                crossings,
                neighbors,
            });
        }

        log::debug!(
            "built puzzle with {} slots and {} words",
            slot_configs.len(),
            vocabulary.len()
        );

        Ok(Puzzle {
            width: open_cells.first().map_or(0, Vec::len),
            height: open_cells.len(),
            open_cells,
            slot_configs,
            vocabulary,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Whether the cell at `(x, y)` can hold a letter. Cells outside the grid are blocked.
    pub fn is_open(&self, x: usize, y: usize) -> bool {
        self.open_cells
            .get(y)
            .and_then(|row| row.get(x))
            .copied()
            .unwrap_or(false)
    }

    pub fn slot_count(&self) -> usize {
        self.slot_configs.len()
    }

    pub fn slot(&self, slot_id: SlotId) -> &SlotConfig {
        &self.slot_configs[slot_id]
    }

    pub fn slots(&self) -> &[SlotConfig] {
        &self.slot_configs
    }

    /// The slots sharing a cell with `slot_id`.
    pub fn neighbors(&self, slot_id: SlotId) -> &[SlotId] {
        &self.slot_configs[slot_id].neighbors
    }

    /// The offsets `(a, b)` at which `first`'s character `a` must equal `second`'s character `b`,
    /// or `None` if the slots don't cross.
    pub fn overlap(&self, first: SlotId, second: SlotId) -> Option<(usize, usize)> {
        if first == second {
            return None;
        }

        self.slot_configs[first]
            .crossings
            .iter()
            .enumerate()
            .find_map(|(cell_idx, crossing)| match crossing {
                Some(crossing) if crossing.other_slot_id == second => {
                    Some((cell_idx, crossing.other_slot_cell))
                }
                _ => None,
            })
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn word(&self, word_id: WordId) -> &Word {
        self.vocabulary.word(word_id)
    }
}
