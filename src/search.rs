//! This module implements grid filling as a randomized recursive search: pick a blank cell, place
//! a word through it, then recursively fill every crossing slot that the new word forces. Failures
//! are rolled back through the grid's operation log, first one crossing at a time and then, if the
//! top level keeps failing, by undoing an escalating number of earlier placements.

use instant::{Duration, Instant};
use log::{debug, info, trace, warn};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use smallvec::SmallVec;

use crate::dictionary::{Dictionary, Entry};
use crate::grid::{satisfies, Cell, Direction, Grid, OperationId, Slot};
use crate::placement::{PlacementIndex, TrialMemory};
use crate::render::{number_clues, Clue};
use crate::{Result, MAX_WORD_LENGTH};

/// How many top-level fill attempts do we make before undoing earlier placements?
pub const DEFAULT_MAX_ATTEMPTS: usize = 100;

/// How many more placements do we undo after each consecutive failure episode?
pub const DEFAULT_ESCALATION_STEP: usize = 1;

/// How many times may the placement log be drained completely before we give up?
pub const DEFAULT_MAX_RESTARTS: usize = 50;

/// Tuning parameters for the search.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub max_attempts: usize,
    pub escalation_step: usize,
    pub max_restarts: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            escalation_step: DEFAULT_ESCALATION_STEP,
            max_restarts: DEFAULT_MAX_RESTARTS,
        }
    }
}

/// A struct tracking statistics about the filling process.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    pub placements: u64,
    pub rewinds: u64,
    pub failed_attempts: u64,
    pub failure_episodes: u64,
    pub restarts: u64,
    pub duration: Duration,
}

/// A word committed to the grid, in the order it was placed.
#[derive(Debug, Clone)]
struct Placement<'d> {
    id: OperationId,
    slot: Slot,
    entry: &'d Entry,
}

/// Where a single `fill_slot` call has got to.
enum FillState<'d> {
    ChoosingLength,
    ChoosingWord {
        candidates: Vec<&'d Entry>,
    },
    PlacingCrossings {
        id: OperationId,
        entry: &'d Entry,
        index: usize,
        /// Successful crossing fills so far, as (letter index, operation id) pairs.
        crossings: SmallVec<[(usize, OperationId); MAX_WORD_LENGTH]>,
    },
    Succeeded(OperationId),
    Failed,
}

/// Remove and return a random element, without preserving order.
fn take_random<T, R: Rng + ?Sized>(items: &mut Vec<T>, rng: &mut R) -> Option<T> {
    if items.is_empty() {
        None
    } else {
        let idx = rng.gen_range(0..items.len());
        Some(items.swap_remove(idx))
    }
}

/// Drives one generation run over a single grid.
pub struct Generator<'d, R: Rng> {
    dictionary: &'d Dictionary,
    config: GeneratorConfig,
    grid: Grid,
    placements: PlacementIndex<'d>,
    log: Vec<Placement<'d>>,
    rng: R,
    statistics: Statistics,
}

impl<'d> Generator<'d, SmallRng> {
    /// Build a generator using a `SmallRng`, seeded for reproducible output if a seed is given.
    pub fn with_seed(
        dictionary: &'d Dictionary,
        grid: Grid,
        config: GeneratorConfig,
        seed: Option<u64>,
    ) -> Generator<'d, SmallRng> {
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Generator::new(dictionary, grid, config, rng)
    }
}

impl<'d, R: Rng> Generator<'d, R> {
    pub fn new(
        dictionary: &'d Dictionary,
        grid: Grid,
        config: GeneratorConfig,
        rng: R,
    ) -> Generator<'d, R> {
        Generator {
            dictionary,
            config,
            grid,
            placements: PlacementIndex::new(),
            log: vec![],
            rng,
            statistics: Statistics::default(),
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn placements(&self) -> &PlacementIndex<'d> {
        &self.placements
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// The numbered clue list for whatever is currently on the grid.
    pub fn clues(&self) -> Vec<Clue<'d>> {
        number_clues(&self.grid, &self.placements)
    }

    /// Keep placing words until no blank cells remain. Returns `Ok(false)` if we run out of
    /// restarts, in which case the grid is back in the state it started in.
    pub fn solve(&mut self) -> Result<bool> {
        let start = Instant::now();
        let mut failures: usize = 0;
        let mut restarts: usize = 0;

        while self.grid.unfilled() > 0 {
            if self.attempt_top_level_fill()? {
                continue;
            }

            self.statistics.failure_episodes += 1;
            // A zero step would never drain the log, so the restart cap could never kick in.
            failures += self.config.escalation_step.max(1);
            info!(
                "failing to fill; undoing last {} placement(s) of {}",
                failures,
                self.log.len()
            );
            self.undo_last(failures)?;

            // Once everything has been undone there's no point escalating further.
            if self.log.is_empty() {
                failures = 0;
                restarts += 1;
                self.statistics.restarts += 1;

                if restarts > self.config.max_restarts {
                    warn!("giving up after {} restarts", self.config.max_restarts);
                    self.statistics.duration = start.elapsed();
                    return Ok(false);
                }
            }
        }

        self.statistics.duration = start.elapsed();
        Ok(true)
    }

    /// Make up to `max_attempts` tries at filling a slot through a random blank cell.
    fn attempt_top_level_fill(&mut self) -> Result<bool> {
        for _ in 0..self.config.max_attempts {
            let loc = (
                self.rng.gen_range(0..self.grid.width()),
                self.rng.gen_range(0..self.grid.height()),
            );
            let loc = self.grid.next_blank(loc)?;
            let dir = if self.rng.gen_bool(0.5) {
                Direction::Across
            } else {
                Direction::Down
            };
            let start = self.grid.backpedal(loc, dir, &mut self.rng);

            let mut trials = TrialMemory::new();
            if self.fill(Slot::new(start, dir), &mut trials)? {
                return Ok(true);
            }
            self.statistics.failed_attempts += 1;
        }

        Ok(false)
    }

    /// Try to place a word in the slot along with every crossing word it forces. On failure,
    /// nothing this call placed is left on the grid.
    pub fn fill(&mut self, slot: Slot, trials: &mut TrialMemory) -> Result<bool> {
        Ok(self.fill_slot(slot, trials)?.is_some())
    }

    /// Implementation of `fill`, returning the operation id of the word placed in `slot` so that
    /// the caller can rewind it (and everything placed after it) later.
    fn fill_slot(&mut self, slot: Slot, trials: &mut TrialMemory) -> Result<Option<OperationId>> {
        let dictionary = self.dictionary;
        let constraints = self.grid.constraints(slot);
        let mut lengths = self.grid.admissible_lengths(slot);
        let mut state = FillState::ChoosingLength;

        loop {
            state = match state {
                FillState::ChoosingLength => match take_random(&mut lengths, &mut self.rng) {
                    Some(length) => FillState::ChoosingWord {
                        candidates: dictionary
                            .entries_of_length(length)
                            .iter()
                            .filter(|entry| satisfies(&constraints, &entry.glyphs))
                            .collect(),
                    },
                    None => FillState::Failed,
                },

                FillState::ChoosingWord { mut candidates } => {
                    match take_random(&mut candidates, &mut self.rng) {
                        None => FillState::ChoosingLength,
                        Some(entry)
                            if self.placements.is_word_used(entry.word_id)
                                || trials.tried(slot, entry.word_id) =>
                        {
                            FillState::ChoosingWord { candidates }
                        }
                        Some(entry) => {
                            trials.mark_tried(slot, entry.word_id);
                            let id = self.commit(slot, entry)?;
                            FillState::PlacingCrossings {
                                id,
                                entry,
                                index: 0,
                                crossings: SmallVec::new(),
                            }
                        }
                    }
                }

                FillState::PlacingCrossings {
                    id,
                    entry,
                    index,
                    mut crossings,
                } => {
                    if index == entry.len() {
                        FillState::Succeeded(id)
                    } else if let Some(crossing) = self.forced_crossing(slot, index) {
                        match self.fill_slot(crossing, trials)? {
                            Some(crossing_id) => {
                                crossings.push((index, crossing_id));
                                FillState::PlacingCrossings {
                                    id,
                                    entry,
                                    index: index + 1,
                                    crossings,
                                }
                            }
                            // Give the most recent crossing a chance to pick a different word
                            // before abandoning this one.
                            None => match crossings.pop() {
                                Some((retry_index, crossing_id)) => {
                                    self.rewind(crossing_id)?;
                                    FillState::PlacingCrossings {
                                        id,
                                        entry,
                                        index: retry_index,
                                        crossings,
                                    }
                                }
                                None => {
                                    self.rewind(id)?;
                                    FillState::Failed
                                }
                            },
                        }
                    } else {
                        FillState::PlacingCrossings {
                            id,
                            entry,
                            index: index + 1,
                            crossings,
                        }
                    }
                }

                FillState::Succeeded(id) => return Ok(Some(id)),
                FillState::Failed => return Ok(None),
            };
        }
    }

    /// Find the slot crossing letter `index` of the word at `slot`, if it has to be filled right
    /// away. A crossing is forced when the letter already touches another letter (or a blank that
    /// something would eventually have to fill) along the crossing direction.
    fn forced_crossing(&mut self, slot: Slot, index: usize) -> Option<Slot> {
        let loc = slot.dir.offset(slot.loc, index);
        let dir = slot.dir.perpendicular();
        let start = self.grid.backpedal(loc, dir, &mut self.rng);
        let crossing = Slot::new(start, dir);

        if self.placements.at(crossing).is_some() {
            return None;
        }
        if dir.along(start) + 1 == self.grid.axis_len(dir) {
            return None;
        }

        let forced = start != loc || self.grid.cell(dir.offset(loc, 1)) != Cell::Wall;
        if forced {
            Some(crossing)
        } else {
            None
        }
    }

    /// Write an entry into the grid and record it everywhere.
    fn commit(&mut self, slot: Slot, entry: &'d Entry) -> Result<OperationId> {
        let id = self.grid.place(slot, &entry.glyphs)?;
        self.placements.record(slot, entry);
        self.log.push(Placement { id, slot, entry });
        self.statistics.placements += 1;

        debug!("placed {} at {:?} {:?} (op {})", entry.word, slot.loc, slot.dir, id);
        Ok(id)
    }

    /// Remove the placement with operation id `id` and every placement made after it.
    pub fn rewind(&mut self, id: OperationId) -> Result<()> {
        while let Some(placement) = self.log.pop() {
            self.placements.remove(placement.slot, placement.entry);
            trace!("rewound {} at {:?}", placement.entry.word, placement.slot);
            if placement.id == id {
                break;
            }
        }
        self.statistics.rewinds += 1;
        self.grid.undo(id)
    }

    /// Undo up to `count` of the most recent placements.
    fn undo_last(&mut self, count: usize) -> Result<()> {
        for _ in 0..count {
            let placement = match self.log.pop() {
                Some(placement) => placement,
                None => break,
            };
            self.grid.undo(placement.id)?;
            self.placements.remove(placement.slot, placement.entry);
            debug!("undid {} at {:?}", placement.entry.word, placement.slot);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::SmallRng;
    use std::collections::HashSet;

    use crate::dictionary::Dictionary;
    use crate::grid::Direction::{Across, Down};
    use crate::grid::{Cell, Grid, Slot};
    use crate::placement::TrialMemory;
    use crate::search::{Generator, GeneratorConfig};
    use crate::MAX_WORD_LENGTH;

    fn dictionary(words: &[&str]) -> Dictionary {
        let mut dictionary = Dictionary::new(MAX_WORD_LENGTH);
        for word in words {
            dictionary
                .add(word, &format!("clue for {}", word.to_lowercase()))
                .unwrap();
        }
        dictionary
    }

    fn generator<'d>(dictionary: &'d Dictionary, template: &str, seed: u64) -> Generator<'d, SmallRng> {
        Generator::with_seed(
            dictionary,
            Grid::from_template(template).unwrap(),
            GeneratorConfig::default(),
            Some(seed),
        )
    }

    /// Check that every placement is spelled out on the grid, bounded by walls or edges, and
    /// unique, and that the unfilled count is honest.
    fn assert_consistent(generator: &Generator<SmallRng>) {
        let grid = generator.grid();
        let mut words = HashSet::new();

        for (slot, entry) in generator.placements().iter() {
            assert!(words.insert(entry.word.clone()), "{} placed twice", entry.word);

            for (index, &glyph) in entry.glyphs.iter().enumerate() {
                assert_eq!(grid.cell(slot.dir.offset(slot.loc, index)), Cell::Letter(glyph));
            }

            let pos = slot.dir.along(slot.loc);
            if pos > 0 {
                assert_eq!(grid.cell(slot.dir.with_along(slot.loc, pos - 1)), Cell::Wall);
            }
            let end = pos + entry.len();
            if end < grid.axis_len(slot.dir) {
                assert_eq!(grid.cell(slot.dir.with_along(slot.loc, end)), Cell::Wall);
            }
        }

        let blanks = grid.cells().iter().filter(|&&cell| cell == Cell::Blank).count();
        assert_eq!(grid.unfilled(), blanks);
    }

    #[test]
    fn test_empty_dictionary_fails_gracefully() {
        let dictionary = dictionary(&[]);
        let mut generator = generator(&dictionary, ".", 1);

        assert!(!generator.solve().unwrap());
        assert_eq!(generator.grid().to_string(), ".");
        assert!(generator.placements().is_empty());
        assert!(generator.statistics().restarts > 0);
    }

    #[test]
    fn test_single_row() {
        let dictionary = dictionary(&["ABCDE"]);
        let mut generator = generator(&dictionary, ".....", 7);

        assert!(generator.solve().unwrap());
        assert_eq!(generator.grid().to_string(), "ABCDE");

        let entry = generator.placements().at(Slot::new((0, 0), Across)).unwrap();
        assert_eq!(entry.word, "ABCDE");
        assert_eq!(entry.clue, "clue for abcde");
        assert!(generator.placements().at(Slot::new((0, 0), Down)).is_none());
        assert_eq!(generator.placements().len(), 1);
    }

    #[test]
    fn test_wall_splits_row() {
        let dictionary = dictionary(&["AB", "CD"]);

        for seed in 0..8 {
            let mut generator = generator(&dictionary, "..#..", seed);

            assert!(generator.solve().unwrap());
            assert_eq!(generator.grid().cell((2, 0)), Cell::Wall);
            assert!(generator.placements().at(Slot::new((0, 0), Across)).is_some());
            assert!(generator.placements().at(Slot::new((3, 0), Across)).is_some());
            assert_eq!(generator.placements().len(), 2);
            assert_consistent(&generator);
        }
    }

    #[test]
    fn test_duplicate_words_are_never_reused() {
        let mut dictionary = Dictionary::new(MAX_WORD_LENGTH);
        dictionary.add("AB", "first two letters").unwrap();
        dictionary.add("AB", "able-bodied seaman").unwrap();

        let mut generator = Generator::with_seed(
            &dictionary,
            Grid::from_template("..#..").unwrap(),
            GeneratorConfig {
                max_attempts: 20,
                max_restarts: 3,
                ..GeneratorConfig::default()
            },
            Some(3),
        );

        assert!(!generator.solve().unwrap());
        assert_eq!(generator.grid().to_string(), "..#..");
        assert!(generator.placements().is_empty());
    }

    #[test]
    fn test_word_square() {
        let dictionary = dictionary(&["AB", "CD", "AC", "BD"]);

        for seed in 0..8 {
            let mut generator = generator(&dictionary, "..\n..", seed);

            assert!(generator.solve().unwrap());
            assert_eq!(generator.grid().unfilled(), 0);
            assert_eq!(generator.placements().len(), 4);
            assert_consistent(&generator);
        }
    }

    #[test]
    fn test_failed_fill_leaves_no_trace() {
        // AB fits the first row, but then nothing can go down from the A.
        let dictionary = dictionary(&["AB"]);
        let mut generator = generator(&dictionary, "..\n..", 11);
        let before = generator.grid().clone();

        let mut trials = TrialMemory::new();
        assert!(!generator.fill(Slot::new((0, 0), Across), &mut trials).unwrap());

        assert_eq!(generator.grid().cells(), before.cells());
        assert_eq!(generator.grid().unfilled(), before.unfilled());
        assert!(generator.placements().is_empty());
        assert_eq!(generator.statistics().placements, 1);
    }

    #[test]
    fn test_forced_crossings_are_filled() {
        // Whichever C word goes across, the other goes down and the ring closes.
        let dictionary = dictionary(&["CAT", "COW", "TEN", "WON"]);

        for seed in 0..8 {
            let mut generator = generator(
                &dictionary,
                "
                C..
                .#.
                ...
                ",
                seed,
            );

            let mut trials = TrialMemory::new();
            assert!(generator.fill(Slot::new((0, 0), Across), &mut trials).unwrap());

            // Both ends of the across word touch blanks below them, so both downs must be there.
            assert!(generator.placements().at(Slot::new((0, 0), Down)).is_some());
            assert!(generator.placements().at(Slot::new((2, 0), Down)).is_some());
            assert!(generator.placements().at(Slot::new((0, 2), Across)).is_some());
            assert_eq!(generator.placements().len(), 4);
            assert_eq!(generator.grid().unfilled(), 0);
            assert_consistent(&generator);
        }
    }

    #[test]
    fn test_failed_crossing_retries_earlier_crossing() {
        // CUP goes down happily (with PEG along the bottom), but then nothing fits T.G down the
        // right, so the down word through the C has to be picked again.
        let dictionary = dictionary(&["CAT", "COW", "CUP", "PEG", "WON", "TEN"]);
        let mut retried = false;

        for seed in 0..16 {
            let mut generator = generator(&dictionary, "CA.\n.#.\n...", seed);

            let mut trials = TrialMemory::new();
            assert!(generator.fill(Slot::new((0, 0), Across), &mut trials).unwrap());
            assert_eq!(generator.grid().to_string(), "CAT\nO#E\nWON");
            assert_eq!(generator.placements().at(Slot::new((0, 0), Down)).unwrap().word, "COW");
            assert_eq!(generator.placements().len(), 4);
            assert_consistent(&generator);

            let cup = dictionary.entries_of_length(3)[2].word_id;
            let peg = dictionary.entries_of_length(3)[3].word_id;
            assert!(!generator.placements().is_word_used(cup));
            assert!(!generator.placements().is_word_used(peg));

            if generator.statistics().rewinds > 0 {
                assert_eq!(generator.statistics().rewinds, 1);
                assert_eq!(generator.statistics().placements, 6);
                retried = true;
            } else {
                assert_eq!(generator.statistics().placements, 4);
            }
        }

        // CUP comes up first for about half of all seeds.
        assert!(retried);
    }

    #[test]
    fn test_exhausted_retries_restore_partly_filled_grid() {
        // Without TEN neither down word through the C can be completed, so after retrying both the
        // whole attempt is abandoned. SKY along the bottom was there first and must survive.
        let dictionary = dictionary(&["CAT", "COW", "CUP", "PEG", "WON", "SKY"]);
        let mut generator = generator(
            &dictionary,
            "
            CA.
            .#.
            ...
            ###
            ...
            ",
            9,
        );

        let sky = &dictionary.entries_of_length(3)[5];
        generator.commit(Slot::new((0, 4), Across), sky).unwrap();
        let before = generator.grid().clone();

        let mut trials = TrialMemory::new();
        assert!(!generator.fill(Slot::new((0, 0), Across), &mut trials).unwrap());

        assert_eq!(generator.grid().cells(), before.cells());
        assert_eq!(generator.grid().unfilled(), before.unfilled());
        assert_eq!(generator.grid().to_string(), "CA.\n.#.\n...\n###\nSKY");
        assert_eq!(generator.placements().len(), 1);
        assert_eq!(generator.placements().at(Slot::new((0, 4), Across)).unwrap().word, "SKY");
        assert!(!generator.placements().is_word_used(dictionary.entries_of_length(3)[0].word_id));

        // CUP and COW each rewound once, then CAT itself.
        assert_eq!(generator.statistics().rewinds, 3);
        assert!(trials.tried(Slot::new((0, 0), Down), dictionary.entries_of_length(3)[1].word_id));
        assert!(trials.tried(Slot::new((0, 0), Down), dictionary.entries_of_length(3)[2].word_id));
    }

    #[test]
    fn test_zero_escalation_step_still_terminates() {
        let dictionary = dictionary(&["AB"]);
        let mut generator = Generator::with_seed(
            &dictionary,
            Grid::from_template("..#..").unwrap(),
            GeneratorConfig {
                max_attempts: 5,
                escalation_step: 0,
                max_restarts: 2,
            },
            Some(4),
        );

        assert!(!generator.solve().unwrap());
        assert_eq!(generator.grid().to_string(), "..#..");
        assert!(generator.placements().is_empty());
        assert_eq!(generator.statistics().restarts, 3);
    }

    #[test]
    fn test_rewind_restores_index_and_grid() {
        let dictionary = dictionary(&["CAT", "COW", "TEN", "ONE"]);
        let mut generator = generator(&dictionary, "...\n.#.\n...", 2);
        let before = generator.grid().clone();

        let mut trials = TrialMemory::new();
        let first = generator.commit(Slot::new((0, 0), Across), &dictionary.entries_of_length(3)[0]);
        let first = first.unwrap();
        generator.fill(Slot::new((0, 0), Down), &mut trials).unwrap();

        generator.rewind(first).unwrap();
        assert_eq!(generator.grid().cells(), before.cells());
        assert!(generator.placements().is_empty());
        assert!(!generator.placements().is_word_used(dictionary.entries_of_length(3)[0].word_id));
    }

    #[test]
    fn test_larger_grids_fill_consistently() {
        let dictionary = dictionary(&[
            "AT", "TO", "OR", "RE", "ME", "WE", "AN", "IN", "ON", "IT", "IS", "AS", "BE", "NO", "SO",
            "ART", "RAT", "TAR", "EAT", "TEA", "ATE", "ONE", "EON", "NET", "TEN", "TOE", "NOT",
            "TON", "ORE", "ROE", "SIT", "ITS", "TIS", "SEA", "SET", "EST", "ANT", "TAN", "NAB",
            "STAR", "RATS", "ARTS", "TARS", "NOTE", "TONE", "ONES", "NEST", "SENT", "TENS",
            "REST", "ERST", "SEAT", "EATS", "TEAS", "EAST", "IRON", "NOIR", "ROTE", "TORE",
        ]);

        for seed in 0..4 {
            let mut generator = Generator::with_seed(
                &dictionary,
                Grid::new(4, 4).unwrap(),
                GeneratorConfig {
                    max_attempts: 20,
                    max_restarts: 5,
                    ..GeneratorConfig::default()
                },
                Some(seed),
            );

            assert!(generator.solve().unwrap());
            assert_eq!(generator.grid().unfilled(), 0);
            assert_consistent(&generator);
        }
    }
}
