//! Todo domain model.
//!
//! # Responsibility
//! - Define the task record edited by the todo form and history screens.
//! - Keep completion and mood fields consistent.
//!
//! # Invariants
//! - `mood_score` is `Some` only while `is_completed` is `true`.
//! - `id == NEW_RECORD_ID` until the store assigns an id on insert.

use super::mood::MoodScore;
use super::NEW_RECORD_ID;
use serde::{Deserialize, Serialize};

/// Store-generated todo identifier.
pub type TodoId = i64;

/// Task urgency shown on the detail view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Canonical todo record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub is_completed: bool,
    /// Due instant in Unix epoch milliseconds.
    pub to_complete_by: i64,
    /// Set only on completion.
    pub mood_score: Option<MoodScore>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_bytes: Option<Vec<u8>>,
}

impl Todo {
    /// Creates an unsaved, active todo with medium priority.
    pub fn new(title: impl Into<String>, to_complete_by: i64) -> Self {
        Self {
            id: NEW_RECORD_ID,
            title: title.into(),
            description: String::new(),
            priority: Priority::default(),
            is_completed: false,
            to_complete_by,
            mood_score: None,
            latitude: None,
            longitude: None,
            image_bytes: None,
        }
    }

    pub fn is_new(&self) -> bool {
        self.id == NEW_RECORD_ID
    }

    /// Returns the todo coordinates when both components are present.
    pub fn location(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }

    /// Marks the todo completed with the selected mood.
    pub fn complete(&mut self, mood: MoodScore) {
        self.is_completed = true;
        self.mood_score = Some(mood);
    }

    /// Restores the completion/mood invariant before persistence.
    ///
    /// An active todo drops its mood, and a completed todo without a mood
    /// records the neutral default the mood picker preselects.
    pub fn normalize_completion(&mut self) {
        if self.is_completed {
            self.mood_score.get_or_insert(MoodScore::Neutral);
        } else {
            self.mood_score = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Priority, Todo};
    use crate::model::mood::MoodScore;

    #[test]
    fn new_todo_is_unsaved_and_active() {
        let todo = Todo::new("walk", 1_700_000_000_000);
        assert!(todo.is_new());
        assert!(!todo.is_completed);
        assert_eq!(todo.priority, Priority::Medium);
        assert_eq!(todo.mood_score, None);
    }

    #[test]
    fn normalize_completion_keeps_mood_only_on_completed() {
        let mut todo = Todo::new("feed", 0);
        todo.mood_score = Some(MoodScore::Good);
        todo.normalize_completion();
        assert_eq!(todo.mood_score, None);

        todo.is_completed = true;
        todo.normalize_completion();
        assert_eq!(todo.mood_score, Some(MoodScore::Neutral));

        todo.complete(MoodScore::VeryGood);
        todo.normalize_completion();
        assert_eq!(todo.mood_score, Some(MoodScore::VeryGood));
    }

    #[test]
    fn location_requires_both_coordinates() {
        let mut todo = Todo::new("vet", 0);
        todo.latitude = Some(51.5);
        assert_eq!(todo.location(), None);
        todo.longitude = Some(-0.12);
        assert_eq!(todo.location(), Some((51.5, -0.12)));
    }
}
