//! Mood scale recorded when a task is completed or a dog's mood changes.

use serde::{Deserialize, Serialize};

/// User sentiment on a five-point scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoodScore {
    VeryBad,
    Bad,
    /// Preselected value in mood pickers.
    #[default]
    Neutral,
    Good,
    VeryGood,
}

impl MoodScore {
    pub const ALL: [MoodScore; 5] = [
        Self::VeryBad,
        Self::Bad,
        Self::Neutral,
        Self::Good,
        Self::VeryGood,
    ];

    /// Persisted ordinal score, `1..=5`.
    pub fn score(self) -> i64 {
        match self {
            Self::VeryBad => 1,
            Self::Bad => 2,
            Self::Neutral => 3,
            Self::Good => 4,
            Self::VeryGood => 5,
        }
    }

    /// Maps a persisted score back to the enum.
    pub fn from_score(score: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|mood| mood.score() == score)
    }
}

#[cfg(test)]
mod tests {
    use super::MoodScore;

    #[test]
    fn scores_round_trip_and_reject_out_of_range() {
        for mood in MoodScore::ALL {
            assert_eq!(MoodScore::from_score(mood.score()), Some(mood));
        }
        assert_eq!(MoodScore::from_score(0), None);
        assert_eq!(MoodScore::from_score(6), None);
    }

    #[test]
    fn neutral_is_default() {
        assert_eq!(MoodScore::default(), MoodScore::Neutral);
        assert_eq!(MoodScore::Neutral.score(), 3);
    }
}
