//! The cell matrix that words are written into, the slot analysis used to decide what can go where,
//! and the operation log that lets placements be rolled back.

use rand::Rng;
use smallvec::SmallVec;
use std::fmt;
use std::fmt::{Display, Formatter};

use crate::{Error, Result, CHECK_INVARIANTS, MAX_GRID_DIMENSION, MAX_WORD_LENGTH};

/// Zero-indexed x and y coords for a cell in the grid, where y = 0 in the top row.
pub type GridCoord = (usize, usize);

/// An identifier for a logged grid mutation. Ids increase monotonically for the life of a grid.
pub type OperationId = usize;

/// Direction that a word runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Across,
    Down,
}

impl Direction {
    pub fn perpendicular(self) -> Direction {
        match self {
            Direction::Across => Direction::Down,
            Direction::Down => Direction::Across,
        }
    }

    /// The component of `loc` that changes when moving in this direction.
    pub fn along(self, loc: GridCoord) -> usize {
        match self {
            Direction::Across => loc.0,
            Direction::Down => loc.1,
        }
    }

    /// `loc` with its component along this direction replaced by `pos`.
    pub fn with_along(self, loc: GridCoord, pos: usize) -> GridCoord {
        match self {
            Direction::Across => (pos, loc.1),
            Direction::Down => (loc.0, pos),
        }
    }

    /// The cell `distance` steps from `loc` in this direction.
    pub fn offset(self, loc: GridCoord, distance: usize) -> GridCoord {
        self.with_along(loc, self.along(loc) + distance)
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Direction::Across => 0,
            Direction::Down => 1,
        }
    }
}

/// A place where a word could start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    pub loc: GridCoord,
    pub dir: Direction,
}

impl Slot {
    pub fn new(loc: GridCoord, dir: Direction) -> Slot {
        Slot { loc, dir }
    }
}

/// The contents of a single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    Blank,
    Wall,
    Letter(char),
}

impl Cell {
    pub fn is_letter(self) -> bool {
        matches!(self, Cell::Letter(_))
    }

    pub fn from_char(c: char) -> Cell {
        match c {
            '#' => Cell::Wall,
            '.' => Cell::Blank,
            c => Cell::Letter(c),
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Cell::Blank => '.',
            Cell::Wall => '#',
            Cell::Letter(c) => c,
        }
    }
}

/// A requirement on any word placed in a slot: the cell `index` letters from the start already
/// holds `cell`. `Cell::Wall` constraints mark where the open run stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constraint {
    pub index: usize,
    pub cell: Cell,
}

/// Does a word with the given glyphs satisfy every constraint computed for a slot?
pub fn satisfies(constraints: &[Constraint], glyphs: &[char]) -> bool {
    constraints.iter().all(|constraint| {
        if glyphs.len() < constraint.index {
            true
        } else if glyphs.len() == constraint.index {
            // The word would end right before this cell, so it had better be a boundary.
            constraint.cell == Cell::Wall
        } else {
            constraint.cell == Cell::Letter(glyphs[constraint.index])
        }
    })
}

/// A run of cells written in one operation: a word plus up to two boundary walls.
type Span = SmallVec<[Cell; MAX_WORD_LENGTH + 2]>;

/// A logged mutation, holding whatever the span contained before it was overwritten.
#[derive(Debug, Clone)]
struct Operation {
    id: OperationId,
    start: GridCoord,
    dir: Direction,
    previous: Span,
}

/// The puzzle board.
#[derive(Debug, Clone)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
    unfilled: usize,
    operations: Vec<Operation>,
    last_operation_id: OperationId,
}

impl Grid {
    /// Create an all-blank grid.
    pub fn new(width: usize, height: usize) -> Result<Grid> {
        Grid::with_cells(width, height, vec![Cell::Blank; width * height])
    }

    /// Parse a grid from a template string, with `#` representing walls, `.` representing blank
    /// cells, and any other character representing a pre-set letter.
    pub fn from_template(template: &str) -> Result<Grid> {
        let rows: Vec<Vec<Cell>> = template
            .lines()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .map(|line| line.chars().map(Cell::from_char).collect())
            .collect();

        let width = rows.first().map_or(0, |row| row.len());
        if rows.iter().any(|row| row.len() != width) {
            return Err(Error::RaggedTemplate);
        }

        Grid::with_cells(width, rows.len(), rows.concat())
    }

    fn with_cells(width: usize, height: usize, cells: Vec<Cell>) -> Result<Grid> {
        let valid = 1..=MAX_GRID_DIMENSION;
        if !valid.contains(&width) || !valid.contains(&height) {
            return Err(Error::InvalidDimensions {
                width,
                height,
                max: MAX_GRID_DIMENSION,
            });
        }

        let unfilled = cells.iter().filter(|&&cell| cell == Cell::Blank).count();
        Ok(Grid {
            width,
            height,
            cells,
            unfilled,
            operations: vec![],
            last_operation_id: 0,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// How many cells are still blank?
    pub fn unfilled(&self) -> usize {
        self.unfilled
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, loc: GridCoord) -> Cell {
        self.cells[loc.1 * self.width + loc.0]
    }

    /// Number of cells along the given axis.
    pub fn axis_len(&self, dir: Direction) -> usize {
        match dir {
            Direction::Across => self.width,
            Direction::Down => self.height,
        }
    }

    /// The contents of every cell from the slot's start to the far edge of the grid.
    pub fn extract_run(&self, slot: Slot) -> Vec<Cell> {
        (slot.dir.along(slot.loc)..self.axis_len(slot.dir))
            .map(|pos| self.cell(slot.dir.with_along(slot.loc, pos)))
            .collect()
    }

    /// Word lengths that could be placed in this slot, based only on where the open run ends.
    pub fn admissible_lengths(&self, slot: Slot) -> Vec<usize> {
        let mut lengths = vec![];

        for (idx, cell) in self.extract_run(slot).into_iter().enumerate() {
            if cell == Cell::Wall {
                // Ending a word one cell short of the wall would put its closing wall right next
                // to this one.
                if lengths.len() > 1 {
                    lengths.remove(lengths.len() - 2);
                }
                break;
            }
            lengths.push(idx + 1);
        }

        lengths
    }

    /// The letters already present in this slot's open run, plus a trailing wall constraint
    /// marking the longest word the run can hold.
    pub fn constraints(&self, slot: Slot) -> Vec<Constraint> {
        let run = self.extract_run(slot);
        let stop = run
            .iter()
            .position(|&cell| cell == Cell::Wall)
            .unwrap_or(run.len());

        run[..stop]
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_letter())
            .map(|(index, &cell)| Constraint { index, cell })
            .chain(std::iter::once(Constraint {
                index: stop,
                cell: Cell::Wall,
            }))
            .collect()
    }

    /// Could `word` be written into this slot without clobbering anything?
    pub fn fits(&self, slot: Slot, word: &[char]) -> bool {
        let run = self.extract_run(slot);
        if word.is_empty() || run.len() < word.len() {
            return false;
        }

        // There must be room for a wall after the word...
        if run.len() > word.len() && run[word.len()].is_letter() {
            return false;
        }

        // ...and before it.
        let pos = slot.dir.along(slot.loc);
        if pos > 0 && self.cell(slot.dir.with_along(slot.loc, pos - 1)).is_letter() {
            return false;
        }

        word.iter()
            .zip(&run)
            .all(|(&c, &cell)| cell == Cell::Blank || cell == Cell::Letter(c))
    }

    /// Write `word` into the slot, closing it off with walls on any side that isn't a grid edge.
    /// Returns the id of the logged operation, which can later be passed to `undo`.
    pub fn place(&mut self, slot: Slot, word: &[char]) -> Result<OperationId> {
        self.check_unfilled()?;

        if !self.fits(slot, word) {
            return Err(Error::PlacementDoesNotFit {
                slot,
                word: word.iter().collect(),
            });
        }

        let pos = slot.dir.along(slot.loc);
        let mut start = slot.loc;
        let mut span = Span::new();

        if pos > 0 {
            start = slot.dir.with_along(slot.loc, pos - 1);
            span.push(Cell::Wall);
        }
        span.extend(word.iter().map(|&c| Cell::Letter(c)));
        if pos + word.len() < self.axis_len(slot.dir) {
            span.push(Cell::Wall);
        }

        let previous = self.write(start, slot.dir, &span);
        self.check_unfilled()?;

        self.last_operation_id += 1;
        self.operations.push(Operation {
            id: self.last_operation_id,
            start,
            dir: slot.dir,
            previous,
        });

        Ok(self.last_operation_id)
    }

    /// Roll back every operation from the most recent one down to and including `id`.
    pub fn undo(&mut self, id: OperationId) -> Result<()> {
        while let Some(operation) = self.operations.pop() {
            self.write(operation.start, operation.dir, &operation.previous);
            if operation.id == id {
                return Ok(());
            }
        }

        Err(Error::OperationNotFound(id))
    }

    /// Given a cell that a word in direction `dir` should cover, find where that word has to
    /// start. Letters behind the cell must be absorbed into the word; blanks behind it may
    /// randomly be absorbed too, so that runs of blanks aren't always claimed from the same end.
    pub fn backpedal<R: Rng + ?Sized>(
        &self,
        loc: GridCoord,
        dir: Direction,
        rng: &mut R,
    ) -> GridCoord {
        let cell_at = |pos: usize| self.cell(dir.with_along(loc, pos));
        let mut pos = dir.along(loc);

        while pos > 0 && cell_at(pos - 1).is_letter() {
            pos -= 1;
        }
        if pos == 0 || cell_at(pos - 1) == Cell::Wall {
            return dir.with_along(loc, pos);
        }

        // The previous cell is blank.
        while pos > 1 && cell_at(pos - 2) == Cell::Blank && rng.gen_bool(0.5) {
            pos -= 1;
        }
        if pos > 1 && cell_at(pos - 2) == Cell::Wall {
            // Don't leave a lone blank between the word and the wall behind it.
            pos -= 1;
        }

        dir.with_along(loc, pos)
    }

    /// Find the first blank cell at or after `loc` in reading order, wrapping around at the end
    /// of the grid.
    pub fn next_blank(&self, loc: GridCoord) -> Result<GridCoord> {
        let cell_count = self.cells.len();
        let start = loc.1 * self.width + loc.0;

        (0..cell_count)
            .map(|step| (start + step) % cell_count)
            .find(|&idx| self.cells[idx] == Cell::Blank)
            .map(|idx| (idx % self.width, idx / self.width))
            .ok_or(Error::GridScanExhausted)
    }

    /// Overwrite a span of cells, keeping `unfilled` in sync, and return what was there before.
    fn write(&mut self, start: GridCoord, dir: Direction, span: &[Cell]) -> Span {
        let mut previous = Span::with_capacity(span.len());

        for (offset, &cell) in span.iter().enumerate() {
            let (x, y) = dir.offset(start, offset);
            let old = std::mem::replace(&mut self.cells[y * self.width + x], cell);

            if cell == Cell::Blank {
                self.unfilled += 1;
            }
            if old == Cell::Blank {
                self.unfilled -= 1;
            }
            previous.push(old);
        }

        previous
    }

    fn check_unfilled(&self) -> Result<()> {
        if !CHECK_INVARIANTS {
            return Ok(());
        }

        let actual = self.cells.iter().filter(|&&cell| cell == Cell::Blank).count();
        if actual != self.unfilled {
            return Err(Error::UnfilledCountMismatch {
                recorded: self.unfilled,
                actual,
            });
        }
        Ok(())
    }
}

impl Display for Grid {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (y, row) in self.cells.chunks(self.width).enumerate() {
            if y > 0 {
                writeln!(f)?;
            }
            for cell in row {
                write!(f, "{}", cell.to_char())?;
            }
        }
        Ok(())
    }
}
