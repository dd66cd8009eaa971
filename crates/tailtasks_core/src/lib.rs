//! Core domain logic for TailTasks.
//! This crate is the single source of truth for business invariants.

pub mod config;
pub mod db;
pub mod geo;
pub mod logging;
pub mod model;
pub mod repo;
pub mod store;
pub mod validation;
pub mod viewmodel;

pub use config::CoreConfig;
pub use geo::{
    calculate_distance, format_date, format_distance, Coordinates, GeoLocationService,
    LocationProvider,
};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LogLevel,
};
pub use model::dog::{Dog, DogId};
pub use model::mood::MoodScore;
pub use model::tag::{Tag, TagId};
pub use model::todo::{Priority, Todo, TodoId};
pub use model::NEW_RECORD_ID;
pub use repo::{EntityRef, RepoError, RepoResult};
pub use store::live::{LiveQuery, Snapshot, Subscription};
pub use store::{Pending, Store, StoreError, StoreResult, Table};
pub use validation::{
    is_input_safe, validate_dog_input, validate_todo_input, ValidationError,
};
pub use viewmodel::dogs::DogViewModel;
pub use viewmodel::todos::TodosViewModel;
pub use viewmodel::{ViewModelError, ViewModelResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
