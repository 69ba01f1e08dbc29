//! Word/clue entries and the length-indexed dictionary that the search draws candidates from.

use log::warn;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::{Error, Result, MAX_WORD_LENGTH};

/// An identifier for a distinct word text. Entries that share a word (but not necessarily a clue)
/// share a `WordId`, which is what uniqueness on the grid is enforced against.
pub type WordId = usize;

/// A single dictionary entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub word: String,
    pub clue: String,
    pub word_id: WordId,
    pub glyphs: SmallVec<[char; MAX_WORD_LENGTH]>,
}

impl Entry {
    /// The length of the word in grid cells.
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

/// All known entries, bucketed by word length.
#[derive(Debug, Clone)]
pub struct Dictionary {
    max_length: usize,
    entries_by_length: Vec<Vec<Entry>>,
    word_ids: HashMap<String, WordId>,
}

/// Characters with a meaning of their own in templates and rendered grids.
fn is_reserved(c: char) -> bool {
    c == '#' || c == '.' || c.is_whitespace()
}

impl Dictionary {
    /// Create an empty dictionary accepting words of up to `max_length` letters (capped at
    /// `MAX_WORD_LENGTH`).
    pub fn new(max_length: usize) -> Dictionary {
        let max_length = max_length.min(MAX_WORD_LENGTH);
        Dictionary {
            max_length,
            entries_by_length: (0..=max_length).map(|_| vec![]).collect(),
            word_ids: HashMap::new(),
        }
    }

    /// Parse the alternating format used by word list files: a line holding the word, followed by
    /// a line holding its clue. Blank lines between entries are ignored. Words that are too long
    /// for this dictionary are skipped with a warning rather than failing the whole file.
    pub fn parse(text: &str, max_length: usize) -> Result<Dictionary> {
        let mut dictionary = Dictionary::new(max_length);
        let mut lines = text.lines().map(|line| line.trim_end());

        while let Some(word) = lines.next() {
            if word.is_empty() {
                continue;
            }
            let clue = lines
                .next()
                .ok_or_else(|| Error::MissingClue(word.to_string()))?;

            match dictionary.add(word, clue) {
                Ok(()) => {}
                Err(Error::WordTooLong { word, max }) => {
                    warn!("skipping {:?}: longer than {} letters", word, max);
                }
                Err(other) => return Err(other),
            }
        }

        Ok(dictionary)
    }

    /// Read and parse a word list file.
    pub fn load<P: AsRef<Path>>(path: P, max_length: usize) -> Result<Dictionary> {
        let text = fs::read_to_string(path)?;
        Dictionary::parse(&text, max_length)
    }

    /// Add a single entry.
    pub fn add(&mut self, word: &str, clue: &str) -> Result<()> {
        let glyphs: SmallVec<[char; MAX_WORD_LENGTH]> = word.chars().collect();

        if glyphs.is_empty() || glyphs.iter().any(|&c| is_reserved(c)) {
            return Err(Error::InvalidWord(word.to_string()));
        }
        if glyphs.len() > self.max_length {
            return Err(Error::WordTooLong {
                word: word.to_string(),
                max: self.max_length,
            });
        }

        let next_id = self.word_ids.len();
        let word_id = *self.word_ids.entry(word.to_string()).or_insert(next_id);

        self.entries_by_length[glyphs.len()].push(Entry {
            word: word.to_string(),
            clue: clue.to_string(),
            word_id,
            glyphs,
        });

        Ok(())
    }

    /// All entries whose word has exactly `length` letters. Lengths with no entries (including
    /// ones beyond the maximum) give an empty slice.
    pub fn entries_of_length(&self, length: usize) -> &[Entry] {
        self.entries_by_length
            .get(length)
            .map(|entries| entries.as_slice())
            .unwrap_or(&[])
    }

    /// The word lengths that have at least one entry, shortest first.
    pub fn lengths(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries_by_length
            .iter()
            .enumerate()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(length, _)| length)
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.entries_by_length.iter().map(|entries| entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct word texts, which is also the exclusive upper bound of every `WordId`.
    pub fn word_count(&self) -> usize {
        self.word_ids.len()
    }
}
