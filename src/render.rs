//! Plain-text output for a filled grid: numbered clues in the usual crossword layout.

use std::collections::BTreeMap;

use crate::dictionary::Entry;
use crate::grid::{Direction, Grid, GridCoord};
use crate::placement::PlacementIndex;

/// A placed entry together with the number printed in its starting cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clue<'d> {
    pub number: usize,
    pub loc: GridCoord,
    pub dir: Direction,
    pub entry: &'d Entry,
}

/// Number every cell where a placement starts, in reading order. An across and a down entry
/// starting in the same cell share a number. Clues come back sorted by number, across first.
pub fn number_clues<'d>(grid: &Grid, placements: &PlacementIndex<'d>) -> Vec<Clue<'d>> {
    // Keyed by (y, x) so that iteration follows reading order.
    let mut starts: BTreeMap<(usize, usize), Vec<(Direction, &'d Entry)>> = BTreeMap::new();
    for (slot, entry) in placements.iter() {
        let (x, y) = slot.loc;
        debug_assert!(x < grid.width() && y < grid.height());
        starts.entry((y, x)).or_default().push((slot.dir, entry));
    }

    let mut clues = vec![];
    for (number, ((y, x), mut entries)) in starts.into_iter().enumerate() {
        entries.sort_by_key(|&(dir, _)| dir.index());
        clues.extend(entries.into_iter().map(|(dir, entry)| Clue {
            number: number + 1,
            loc: (x, y),
            dir,
            entry,
        }));
    }

    clues
}

/// Render clue lists, across then down, one `number. clue (length)` line per entry.
pub fn render_clues(clues: &[Clue]) -> String {
    let mut out = String::new();

    for (heading, dir) in [("Across", Direction::Across), ("Down", Direction::Down)] {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(heading);
        out.push('\n');

        for clue in clues.iter().filter(|clue| clue.dir == dir) {
            out.push_str(&format!(
                "{}. {} ({})\n",
                clue.number,
                clue.entry.clue,
                clue.entry.len()
            ));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use crate::dictionary::Dictionary;
    use crate::grid::Direction::{Across, Down};
    use crate::grid::{Grid, Slot};
    use crate::placement::PlacementIndex;
    use crate::render::{number_clues, render_clues};
    use crate::MAX_WORD_LENGTH;

    #[test]
    fn test_numbering_and_rendering() {
        let mut dictionary = Dictionary::new(MAX_WORD_LENGTH);
        dictionary.add("CAT", "small feline").unwrap();
        dictionary.add("COW", "it moos").unwrap();
        dictionary.add("TEN", "one more than nine").unwrap();
        dictionary.add("WON", "came first").unwrap();

        let cat = &dictionary.entries_of_length(3)[0];
        let cow = &dictionary.entries_of_length(3)[1];
        let ten = &dictionary.entries_of_length(3)[2];
        let won = &dictionary.entries_of_length(3)[3];

        let mut grid = Grid::new(3, 3).unwrap();
        let mut placements = PlacementIndex::new();
        for (slot, entry) in [
            (Slot::new((0, 0), Across), cat),
            (Slot::new((0, 0), Down), cow),
            (Slot::new((2, 0), Down), ten),
            (Slot::new((0, 2), Across), won),
        ] {
            grid.place(slot, &entry.glyphs).unwrap();
            placements.record(slot, entry);
        }
        assert_eq!(grid.to_string(), "CAT\nO.E\nWON");

        let clues = number_clues(&grid, &placements);
        let summary: Vec<_> = clues
            .iter()
            .map(|clue| (clue.number, clue.dir, clue.entry.word.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (1, Across, "CAT"),
                (1, Down, "COW"),
                (2, Down, "TEN"),
                (3, Across, "WON"),
            ]
        );

        assert_eq!(
            render_clues(&clues),
            "Across\n1. small feline (3)\n3. came first (3)\n\nDown\n1. it moos (3)\n2. one more than nine (3)\n"
        );
    }

    #[test]
    fn test_empty_index_renders_headings_only() {
        let grid = Grid::new(2, 2).unwrap();
        let placements = PlacementIndex::new();

        let clues = number_clues(&grid, &placements);
        assert!(clues.is_empty());
        assert_eq!(render_clues(&clues), "Across\n\nDown\n");
    }
}
