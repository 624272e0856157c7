use crate::puzzle::Puzzle;
use crate::solver::Assignment;

/// Drawn in place of blocked cells.
pub const BLOCK: char = '█';

/// Turn the given puzzle and (possibly partial) assignment into a rendered string. Open cells
/// without a letter are left blank.
pub fn render_grid(puzzle: &Puzzle, assignment: &Assignment) -> String {
    let mut grid: Vec<Vec<char>> = (0..puzzle.height())
        .map(|y| {
            (0..puzzle.width())
                .map(|x| if puzzle.is_open(x, y) { ' ' } else { BLOCK })
                .collect()
        })
        .collect();

    for (&slot_id, &word_id) in assignment {
        let slot = puzzle.slot(slot_id);
        let word = puzzle.word(word_id);

        for ((x, y), &glyph) in slot.cell_coords().zip(&word.glyphs) {
            grid[y][x] = glyph;
        }
    }

    grid.iter()
        .map(|row| row.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use crate::puzzle::{Puzzle, Vocabulary};
    use crate::solver::Assignment;

    use super::render_grid;

    #[test]
    fn test_render_partial_assignment() {
        let puzzle =
            Puzzle::from_template(Vocabulary::new(["cat", "cow"]), "___\n_##\n_##").unwrap();
        let cat = puzzle.vocabulary().position("cat").unwrap();

        let assignment: Assignment = [(0, cat)].into_iter().collect();

        assert_eq!(render_grid(&puzzle, &assignment), "cat\n ██\n ██");
        assert_eq!(render_grid(&puzzle, &Assignment::new()), "   \n ██\n ██");
    }

    #[test]
    fn test_render_crossing_words() {
        let puzzle =
            Puzzle::from_template(Vocabulary::new(["cat", "cow"]), "___\n_##\n_##").unwrap();
        let assignment: Assignment = [
            (0, puzzle.vocabulary().position("cat").unwrap()),
            (1, puzzle.vocabulary().position("cow").unwrap()),
        ]
        .into_iter()
        .collect();

        assert_eq!(render_grid(&puzzle, &assignment), "cat\no██\nw██");
    }
}
