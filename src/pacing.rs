//! Delay between word advances.

use serde::{Deserialize, Serialize};

/// Extra pauses added to the base pace, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Moving into a new paragraph.
    pub paragraph_ms: u64,
    /// After `.`, `!` or `?`.
    pub sentence_ms: u64,
    /// After `;` or `:`.
    pub clause_ms: u64,
    /// After `,`.
    pub comma_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            paragraph_ms: 1000,
            sentence_ms: 300,
            clause_ms: 200,
            comma_ms: 150,
        }
    }
}

impl PacingConfig {
    /// Pause for a word ending in `punctuation`; exact character match.
    pub fn punctuation_pause(&self, punctuation: Option<char>) -> u64 {
        match punctuation {
            Some('.' | '!' | '?') => self.sentence_ms,
            Some(';' | ':') => self.clause_ms,
            Some(',') => self.comma_ms,
            _ => 0,
        }
    }

    /// Delay before leaving a word.
    ///
    /// Crossing a paragraph adds the paragraph pause and nothing else; the
    /// two bonuses are never summed.
    pub fn delay(&self, base_pace_ms: u64, punctuation: Option<char>, crossed_paragraph: bool) -> u64 {
        let bonus = if crossed_paragraph {
            self.paragraph_ms
        } else {
            self.punctuation_pause(punctuation)
        };
        base_pace_ms + bonus
    }

    /// Delay for advancing a whole word group.
    ///
    /// `hops` holds the punctuation and paragraph flag of every hop in the
    /// group. Any paragraph crossing wins; otherwise the largest punctuation
    /// pause applies.
    pub fn group_delay(&self, base_pace_ms: u64, hops: &[(Option<char>, bool)]) -> u64 {
        if hops.iter().any(|&(_, crossed)| crossed) {
            return self.delay(base_pace_ms, None, true);
        }
        let pause = hops
            .iter()
            .map(|&(punctuation, _)| self.punctuation_pause(punctuation))
            .max()
            .unwrap_or(0);
        base_pace_ms + pause
    }
}

/// [`PacingConfig::delay`] with the default pauses.
pub fn delay(base_pace_ms: u64, punctuation: Option<char>, crossed_paragraph: bool) -> u64 {
    PacingConfig::default().delay(base_pace_ms, punctuation, crossed_paragraph)
}
