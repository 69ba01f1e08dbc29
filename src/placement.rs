//! Bookkeeping for which words sit where on the grid, and which candidates have already been tried
//! during a fill attempt.

use bit_set::BitSet;
use std::collections::HashMap;

use crate::dictionary::{Entry, WordId};
use crate::grid::{GridCoord, Slot};

/// Records the entry committed to each slot, and which words are in use anywhere on the grid.
#[derive(Debug, Clone, Default)]
pub struct PlacementIndex<'d> {
    /// Indexed by `Direction::index`, so an across and a down entry can start at the same cell.
    entries: HashMap<GridCoord, [Option<&'d Entry>; 2]>,
    used_words: BitSet,
    count: usize,
}

impl<'d> PlacementIndex<'d> {
    pub fn new() -> PlacementIndex<'d> {
        PlacementIndex::default()
    }

    pub fn record(&mut self, slot: Slot, entry: &'d Entry) {
        self.used_words.insert(entry.word_id);

        let pair = self.entries.entry(slot.loc).or_insert([None, None]);
        if pair[slot.dir.index()].replace(entry).is_none() {
            self.count += 1;
        }
    }

    pub fn remove(&mut self, slot: Slot, entry: &'d Entry) {
        self.used_words.remove(entry.word_id);

        if let Some(pair) = self.entries.get_mut(&slot.loc) {
            if pair[slot.dir.index()].take().is_some() {
                self.count -= 1;
            }
            if pair.iter().all(|entry| entry.is_none()) {
                self.entries.remove(&slot.loc);
            }
        }
    }

    /// The entry that starts at this slot, if any.
    pub fn at(&self, slot: Slot) -> Option<&'d Entry> {
        self.entries
            .get(&slot.loc)
            .and_then(|pair| pair[slot.dir.index()])
    }

    pub fn is_word_used(&self, word_id: WordId) -> bool {
        self.used_words.contains(word_id)
    }

    /// Number of committed placements.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// All placements, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (Slot, &'d Entry)> + '_ {
        use crate::grid::Direction::{Across, Down};

        self.entries.iter().flat_map(|(&loc, pair)| {
            [Across, Down]
                .into_iter()
                .filter_map(move |dir| pair[dir.index()].map(|entry| (Slot::new(loc, dir), entry)))
        })
    }
}

/// The (slot, word) combinations already attempted during one top-level fill, including every
/// crossing fill nested inside it. A fresh one is needed for each top-level attempt.
#[derive(Debug, Clone, Default)]
pub struct TrialMemory {
    tried: HashMap<Slot, BitSet>,
}

impl TrialMemory {
    pub fn new() -> TrialMemory {
        TrialMemory::default()
    }

    pub fn tried(&self, slot: Slot, word_id: WordId) -> bool {
        self.tried
            .get(&slot)
            .map_or(false, |word_ids| word_ids.contains(word_id))
    }

    pub fn mark_tried(&mut self, slot: Slot, word_id: WordId) {
        self.tried.entry(slot).or_insert_with(BitSet::new).insert(word_id);
    }
}
