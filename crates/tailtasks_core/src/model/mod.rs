//! Domain model for todos, dogs, tags and moods.
//!
//! # Responsibility
//! - Define canonical records shared by repositories, view-models and FFI.
//! - Keep sentinel-id and mood invariants next to the data they guard.
//!
//! # Invariants
//! - Id `0` (`NEW_RECORD_ID`) means "not yet persisted"; stored rows never use it.
//! - Dogs are removed by soft-delete tombstones, not hard delete.

pub mod dog;
pub mod mood;
pub mod tag;
pub mod todo;

/// Reserved identifier for records that have not been persisted yet.
pub const NEW_RECORD_ID: i64 = 0;

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
