//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `tailtasks_core` linkage.
//! - Exercise one store round trip on an in-memory database.
//! - Keep output deterministic for quick local sanity checks.

use std::process::ExitCode;
use tailtasks_core::{calculate_distance, format_distance, Store, Todo, TodosViewModel};

fn main() -> ExitCode {
    println!("tailtasks_core ping={}", tailtasks_core::ping());
    println!("tailtasks_core version={}", tailtasks_core::core_version());

    match store_probe() {
        Ok(active) => {
            println!("tailtasks_core store=ok active_todos={active}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("tailtasks_core store=error error={err}");
            ExitCode::FAILURE
        }
    }
}

fn store_probe() -> Result<usize, Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .build()?;

    let active = runtime.block_on(async {
        let store = Store::open_in_memory()?;
        let location = std::sync::Arc::new(tailtasks_core::GeoLocationService::new());
        let todos = TodosViewModel::new(store, location);

        todos
            .create_or_update_todo(Todo::new("smoke probe", 0))?
            .wait()
            .await?;
        todos.load_active_tasks().wait().await?;
        Ok::<_, Box<dyn std::error::Error>>(
            todos
                .active_snapshot()
                .map_or(0, |snapshot| snapshot.items.len()),
        )
    })?;

    let zero = calculate_distance(0.0, 0.0, 0.0, 0.0);
    println!("tailtasks_core distance={}", format_distance(zero));
    Ok(active)
}
