//! Dog companion model.
//!
//! # Responsibility
//! - Define the dog record shared by the create and edit forms.
//! - Derive age from the birthday.
//!
//! # Invariants
//! - `current_mood` stays `None` until a mood is explicitly set.
//! - `is_deleted` is the source of truth for tombstone state.

use super::mood::MoodScore;
use super::NEW_RECORD_ID;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Store-generated dog identifier.
pub type DogId = i64;

/// Canonical dog record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dog {
    pub id: DogId,
    pub name: String,
    pub breed: String,
    /// Unix epoch milliseconds.
    pub birthday: i64,
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_bytes: Option<Vec<u8>>,
    /// Whole years, refreshed from `birthday` on every save.
    pub age: u32,
    pub current_mood: Option<f64>,
    pub is_deleted: bool,
}

impl Dog {
    /// Creates an unsaved dog with no mood recorded.
    pub fn new(name: impl Into<String>, breed: impl Into<String>, birthday: i64) -> Self {
        Self {
            id: NEW_RECORD_ID,
            name: name.into(),
            breed: breed.into(),
            birthday,
            notes: String::new(),
            image_bytes: None,
            age: 0,
            current_mood: None,
            is_deleted: false,
        }
    }

    pub fn is_new(&self) -> bool {
        self.id == NEW_RECORD_ID
    }

    /// Mood as a float where unset is NaN, for float-only surfaces.
    pub fn current_mood_or_nan(&self) -> f64 {
        self.current_mood.unwrap_or(f64::NAN)
    }

}

/// Stored mood value for a picked score.
pub fn mood_value(mood: MoodScore) -> f64 {
    // Scores are tiny integers, the cast is exact.
    mood.score() as f64
}

/// Whole years between `birthday_ms` and `now_ms`, clamped at zero.
///
/// Out-of-range timestamps yield `0`.
pub fn age_in_years(birthday_ms: i64, now_ms: i64) -> u32 {
    let (Some(birthday), Some(now)) = (
        DateTime::<Utc>::from_timestamp_millis(birthday_ms),
        DateTime::<Utc>::from_timestamp_millis(now_ms),
    ) else {
        return 0;
    };

    let mut years = now.year() - birthday.year();
    if (now.month(), now.day()) < (birthday.month(), birthday.day()) {
        years -= 1;
    }
    u32::try_from(years).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{age_in_years, mood_value, Dog};
    use crate::model::mood::MoodScore;
    use chrono::{TimeZone, Utc};

    fn ms(year: i32, month: u32, day: u32) -> i64 {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0)
            .single()
            .expect("valid date")
            .timestamp_millis()
    }

    #[test]
    fn age_counts_completed_years_only() {
        assert_eq!(age_in_years(ms(2020, 6, 15), ms(2024, 6, 14)), 3);
        assert_eq!(age_in_years(ms(2020, 6, 15), ms(2024, 6, 15)), 4);
        assert_eq!(age_in_years(ms(2020, 6, 15), ms(2020, 1, 1)), 0);
    }

    #[test]
    fn new_dog_has_unset_mood() {
        let mut dog = Dog::new("Rex", "Lab", 0);
        assert!(dog.current_mood.is_none());
        assert!(dog.current_mood_or_nan().is_nan());

        dog.current_mood = Some(mood_value(MoodScore::Good));
        assert_eq!(dog.current_mood, Some(4.0));
    }
}
