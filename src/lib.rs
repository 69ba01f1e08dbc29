//! Randomized crossword grid filling.
//!
//! A `Generator` takes a `Grid` (optionally pre-seeded with walls and letters) and a `Dictionary`
//! of word/clue entries, and keeps placing words until no blank cells remain. Every placement
//! also forces the crossing words it touches, and dead ends are escaped by rolling placements
//! back through the grid's operation log.

use thiserror::Error;

pub mod dictionary;
pub mod grid;
pub mod placement;
pub mod render;
pub mod search;

pub use dictionary::{Dictionary, Entry, WordId};
pub use grid::{satisfies, Cell, Constraint, Direction, Grid, GridCoord, OperationId, Slot};
pub use placement::{PlacementIndex, TrialMemory};
pub use render::{number_clues, render_clues, Clue};
pub use search::{Generator, GeneratorConfig, Statistics};

/// The maximum length for a single word.
pub const MAX_WORD_LENGTH: usize = 21;

/// The maximum width or height of a grid.
pub const MAX_GRID_DIMENSION: usize = 100;

/// Should we re-verify bookkeeping (such as the unfilled cell count) after every grid mutation?
pub const CHECK_INVARIANTS: bool = cfg!(debug_assertions);

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unfilled count is {recorded} but the grid has {actual} blank cells")]
    UnfilledCountMismatch { recorded: usize, actual: usize },

    #[error("no logged operation with id {0}")]
    OperationNotFound(OperationId),

    #[error("scanned the whole grid without finding a blank cell")]
    GridScanExhausted,

    #[error("{word:?} does not fit at {slot:?}")]
    PlacementDoesNotFit { slot: Slot, word: String },

    #[error("grid dimensions must be between 1 and {max}, got {width}x{height}")]
    InvalidDimensions {
        width: usize,
        height: usize,
        max: usize,
    },

    #[error("template rows have different lengths")]
    RaggedTemplate,

    #[error("invalid word {0:?}")]
    InvalidWord(String),

    #[error("{word:?} is longer than {max} letters")]
    WordTooLong { word: String, max: usize },

    #[error("no clue line after {0:?}")]
    MissingClue(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Does this error mean the search's bookkeeping has been corrupted, as opposed to bad input?
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Error::UnfilledCountMismatch { .. }
                | Error::OperationNotFound(_)
                | Error::GridScanExhausted
                | Error::PlacementDoesNotFit { .. }
        )
    }
}
