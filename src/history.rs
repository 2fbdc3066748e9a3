//! Outcome classification and the rolling history buffer
//!
//! A draw is three six-sided dice. Sums of 11 and above are Tai (high),
//! 10 and below are Xiu (low). The buffer keeps the most recent outcomes
//! oldest-first and evicts from the front once full.

use std::collections::VecDeque;
use std::fmt;
use tracing::debug;

/// Default number of outcomes kept
pub const DEFAULT_CAPACITY: usize = 20;

/// Binary classification of a draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// High: sum >= 11
    Tai,
    /// Low: sum <= 10
    Xiu,
}

impl Outcome {
    /// Single-letter history code
    pub fn code(self) -> char {
        match self {
            Outcome::Tai => 't',
            Outcome::Xiu => 'x',
        }
    }

    /// Parse a history code (case-insensitive)
    pub fn from_code(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            't' => Some(Outcome::Tai),
            'x' => Some(Outcome::Xiu),
            _ => None,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Outcome::Tai => Outcome::Xiu,
            Outcome::Xiu => Outcome::Tai,
        }
    }

    /// Display label used on the wire
    pub fn label(self) -> &'static str {
        match self {
            Outcome::Tai => "Tài",
            Outcome::Xiu => "Xỉu",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify a three-dice sum
pub fn classify(sum: u8) -> Outcome {
    if sum >= 11 {
        Outcome::Tai
    } else {
        Outcome::Xiu
    }
}

/// Bounded FIFO of recent outcomes, oldest first
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    entries: VecDeque<Outcome>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an outcome, evicting the oldest when at capacity
    pub fn append(&mut self, outcome: Outcome) {
        if self.entries.len() >= self.capacity {
            if let Some(evicted) = self.entries.pop_front() {
                debug!(evicted = %evicted, "History full, evicted oldest outcome");
            }
        }
        self.entries.push_back(outcome);
        self.entries.make_contiguous();
    }

    /// Oldest-first view of the buffer
    ///
    /// `append` keeps the deque contiguous, so the front slice is the whole buffer.
    pub fn current(&self) -> &[Outcome] {
        self.entries.as_slices().0
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Dash-joined uppercase codes, e.g. `T-X-T`
    pub fn pattern(&self) -> String {
        render_pattern(self.entries.iter().copied())
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new()
    }
}

pub fn render_pattern(outcomes: impl IntoIterator<Item = Outcome>) -> String {
    outcomes
        .into_iter()
        .map(|o| o.code().to_ascii_uppercase().to_string())
        .collect::<Vec<_>>()
        .join("-")
}

/// Parse a compact code string such as `"ttxtx"`. Unknown characters are rejected.
pub fn parse_codes(codes: &str) -> Option<Vec<Outcome>> {
    codes.chars().map(Outcome::from_code).collect()
}
