pub const STATES: usize = 12;

/// States below this have literal-predicting context; at or above it the
/// previous operation was a match and the literal model may use the byte
/// at the most recent match distance as a prediction.
const LITERAL_STATES: u8 = 7;

// One literal steps back toward the literal-biased states; matches
// converge quickly on the match-biased ones, with rep-matches keeping
// their own pair of states.
const NEXT_STATE_LITERAL: [u8; STATES] = [0, 0, 0, 0, 1, 2, 3, 4, 5, 6, 4, 5];
const NEXT_STATE_MATCH: [u8; STATES] = [7, 7, 7, 7, 8, 8, 8, 9, 9, 9, 8, 8];
const NEXT_STATE_REP: [u8; STATES] = [10, 10, 10, 10, 11, 11, 11, 11, 11, 11, 11, 11];

/// The 12-valued decoder state biasing every model lookup.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DecoderState(u8);

impl DecoderState {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }

    pub fn update_literal(&mut self) {
        self.0 = NEXT_STATE_LITERAL[self.0 as usize];
    }

    /// Transition for a match with a freshly coded distance (far or near).
    pub fn update_match(&mut self) {
        self.0 = NEXT_STATE_MATCH[self.0 as usize];
    }

    /// Transition for a match reusing a history distance.
    pub fn update_rep(&mut self) {
        self.0 = NEXT_STATE_REP[self.0 as usize];
    }

    pub fn after_match(&self) -> bool {
        self.0 >= LITERAL_STATES
    }
}

pub const MATCH_HISTORY_SIZE: usize = 8;

/// The 8 most recently used match distances, most recent first. Rep
/// paths promote their slot to the front; fresh distances push onto the
/// front, deduplicating instead of ever holding a distance twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchHistory {
    dists: [u32; MATCH_HISTORY_SIZE],
}

impl Default for MatchHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchHistory {
    pub fn new() -> Self {
        Self {
            dists: [1, 2, 3, 4, 5, 6, 7, 8],
        }
    }

    pub fn front(&self) -> u32 {
        self.dists[0]
    }

    pub fn get(&self, slot: usize) -> u32 {
        self.dists[slot]
    }

    /// Move `slot` to the front, returning its distance.
    pub fn promote(&mut self, slot: usize) -> u32 {
        let dist = self.dists[slot];
        for i in (1..=slot).rev() {
            self.dists[i] = self.dists[i - 1];
        }
        self.dists[0] = dist;
        dist
    }

    /// Push a fresh distance onto the front, evicting the oldest entry. A
    /// distance already present is promoted instead of duplicated.
    pub fn push(&mut self, dist: u32) {
        debug_assert!(dist > 0);
        match self.dists.iter().position(|&d| d == dist) {
            Some(slot) => {
                self.promote(slot);
            }
            None => {
                for i in (1..MATCH_HISTORY_SIZE).rev() {
                    self.dists[i] = self.dists[i - 1];
                }
                self.dists[0] = dist;
            }
        }
    }

    /// Invariant check used by tests: full and duplicate-free.
    pub(crate) fn is_well_formed(&self) -> bool {
        self.dists.iter().all(|&d| d > 0)
            && (0..MATCH_HISTORY_SIZE).all(|i| (0..i).all(|j| self.dists[i] != self.dists[j]))
    }
}
