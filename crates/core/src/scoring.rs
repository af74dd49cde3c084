//! Mastery and XP policy.
//!
//! Pure functions that turn counters into display metrics. Nothing in here
//! holds state; the constants are fixed product rules, not configuration.

use crate::model::StudyStats;

/// XP granted for each correct answer in a study session.
pub const XP_PER_CORRECT_ANSWER: u32 = 10;

/// XP granted for saving a batch of generated flashcards.
pub const XP_FOR_SAVED_FLASHCARDS: u32 = 50;

/// XP granted for saving a generated mindmap.
pub const XP_FOR_SAVED_MINDMAP: u32 = 75;

/// XP needed to advance one level.
pub const XP_PER_LEVEL: u64 = 1_000;

/// Topics below this mastery percentage are areas to improve.
pub const MASTERY_TARGET: u8 = 70;

/// Mastery of a single topic, as a percentage in `0..=100`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMastery {
    pub name: String,
    pub mastery: u8,
}

impl TopicMastery {
    /// Pool the answer counters of every item in a topic.
    ///
    /// Returns `None` when none of the items has been studied yet.
    #[must_use]
    pub fn from_stats<'a>(
        name: impl Into<String>,
        stats: impl IntoIterator<Item = &'a StudyStats>,
    ) -> Option<Self> {
        let (correct, studied) = stats.into_iter().fold((0_u64, 0_u64), |(c, n), s| {
            (
                c + u64::from(s.times_correct()),
                n + u64::from(s.times_studied()),
            )
        });
        if studied == 0 {
            return None;
        }
        Some(Self {
            name: name.into(),
            mastery: u8::try_from(rounded_percent(correct, studied)).unwrap_or(100),
        })
    }

    #[must_use]
    pub fn needs_improvement(&self) -> bool {
        self.mastery < MASTERY_TARGET
    }
}

/// Accuracy as a percentage rounded half-up to the nearest integer.
///
/// An item that has never been studied reports 0.
///
/// ```
/// use tellect_core::scoring::accuracy;
/// assert_eq!(accuracy(3, 5), 60);
/// assert_eq!(accuracy(0, 0), 0);
/// ```
#[must_use]
pub fn accuracy(times_correct: u32, times_studied: u32) -> u32 {
    if times_studied == 0 {
        return 0;
    }
    let rounded = rounded_percent(u64::from(times_correct), u64::from(times_studied));
    u32::try_from(rounded).unwrap_or(u32::MAX)
}

/// Fraction of the current level already earned, in `[0, 1)`.
#[must_use]
pub fn level_progress(xp: u64) -> f64 {
    f64::from(xp_into_level(xp)) / f64::from(level_span())
}

/// XP still needed to reach the next level, in `1..=1000`.
#[must_use]
pub fn xp_to_next_level(xp: u64) -> u64 {
    XP_PER_LEVEL - xp % XP_PER_LEVEL
}

/// Level for an XP total; everyone starts at level 1.
#[must_use]
pub fn level_for_xp(xp: u64) -> u32 {
    u32::try_from(xp / XP_PER_LEVEL)
        .unwrap_or(u32::MAX - 1)
        .saturating_add(1)
}

/// Mean mastery across topics, or `None` when there are no topics.
#[must_use]
pub fn average_mastery(topics: &[TopicMastery]) -> Option<f64> {
    if topics.is_empty() {
        return None;
    }
    let sum: f64 = topics.iter().map(|t| f64::from(t.mastery)).sum();
    Some(sum / len_f64(topics.len()))
}

/// Mean per-item accuracy as a rounded percentage. Unstudied items count as 0.
#[must_use]
pub fn average_accuracy(stats: &[StudyStats]) -> u32 {
    if stats.is_empty() {
        return 0;
    }
    let sum: f64 = stats
        .iter()
        .filter(|s| s.times_studied() > 0)
        .map(|s| f64::from(s.times_correct()) / f64::from(s.times_studied()))
        .sum();
    let percent = (sum / len_f64(stats.len()) * 100.0).round();

    // percent is within 0..=100
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let out = percent as u32;
    out
}

// studied must be non-zero; u128 keeps pooled counters from overflowing
fn rounded_percent(correct: u64, studied: u64) -> u64 {
    let correct = u128::from(correct);
    let studied = u128::from(studied);
    u64::try_from((200 * correct + studied) / (2 * studied)).unwrap_or(u64::MAX)
}

fn xp_into_level(xp: u64) -> u32 {
    u32::try_from(xp % XP_PER_LEVEL).unwrap_or(0)
}

fn level_span() -> u32 {
    u32::try_from(XP_PER_LEVEL).unwrap_or(u32::MAX)
}

#[allow(clippy::cast_precision_loss)]
fn len_f64(len: usize) -> f64 {
    len as f64
}
