//! Flutter-facing bindings for the TailTasks core.

pub mod api;
