//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level functions to Dart via FRB.
//! - Own the process-wide app session (store worker runtime, view-models,
//!   location service) between `app_start` and `app_stop`.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Commands wait for their store job, so a following list call observes
//!   the change.
//! - Calls made before `app_start` fail with a stable message.

use log::{info, warn};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tailtasks_core::db::open_db;
use tailtasks_core::{
    core_version as core_version_inner, format_date as format_date_inner,
    format_distance as format_distance_inner, init_logging as init_logging_inner,
    init_logging_from_config, ping as ping_inner, validate_dog_input as validate_dog_input_inner,
    validate_todo_input as validate_todo_input_inner, CoreConfig, Dog, DogViewModel,
    EntityRef, GeoLocationService, MoodScore, Priority, RepoError, Store, StoreError,
    StoreResult, Todo, TodosViewModel, ViewModelError, NEW_RECORD_ID,
};
use tokio::runtime::{Builder, Runtime};

const NOT_STARTED_MESSAGE: &str = "app session not started";

static SESSION: Mutex<Option<AppSession>> = Mutex::new(None);

/// Live objects for one started app.
///
/// Fields drop in declaration order; view-models must go before the runtime
/// so the store worker can exit.
struct AppSession {
    todos: TodosViewModel,
    dogs: DogViewModel,
    location: Arc<GeoLocationService>,
    db_path: PathBuf,
    _runtime: Runtime,
}

impl AppSession {
    fn start(db_path: PathBuf) -> Result<Self, String> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("tailtasks-store")
            .build()
            .map_err(|err| format!("runtime start failed: {err}"))?;
        let conn = open_db(&db_path).map_err(|err| format!("DB open failed: {err}"))?;
        let store = Store::start_on(conn, runtime.handle());

        let location = Arc::new(GeoLocationService::new());
        location.attach();

        Ok(Self {
            todos: TodosViewModel::new(store.clone(), location.clone()),
            dogs: DogViewModel::new(store),
            location,
            db_path,
            _runtime: runtime,
        })
    }
}

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Starts the app session: opens the store and attaches location updates.
///
/// `db_path` overrides `TAILTASKS_DB_PATH`. Calling again while a session
/// runs on the same path is a no-op.
///
/// # FFI contract
/// - Sync call; performs DB open and migrations.
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn app_start(db_path: Option<String>) -> String {
    let mut config = CoreConfig::from_env();
    if let Some(path) = db_path.map(|raw| raw.trim().to_string()) {
        if !path.is_empty() {
            config.db_path = PathBuf::from(path);
        }
    }
    if let Err(err) = init_logging_from_config(&config) {
        return err;
    }

    let mut session = lock_session();
    if let Some(active) = session.as_ref() {
        if active.db_path == config.db_path {
            return String::new();
        }
        return format!(
            "app session already started at `{}`",
            active.db_path.display()
        );
    }

    match AppSession::start(config.db_path) {
        Ok(started) => {
            *session = Some(started);
            info!("event=app_start module=ffi status=ok");
            String::new()
        }
        Err(err) => {
            warn!("event=app_start module=ffi status=error");
            err
        }
    }
}

/// Stops the session: detaches location and shuts the store worker down.
///
/// Returns `false` when no session was running.
#[flutter_rust_bridge::frb(sync)]
pub fn app_stop() -> bool {
    let Some(session) = lock_session().take() else {
        return false;
    };
    session.location.detach();
    drop(session);
    info!("event=app_stop module=ffi status=ok");
    true
}

/// Generic action response envelope for command flows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Id of the created or updated record.
    pub id: Option<i64>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>, id: Option<i64>) -> Self {
        Self {
            ok: true,
            id,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id: None,
            message: message.into(),
        }
    }
}

/// Todo row projected for list and detail screens.
#[derive(Debug, Clone, PartialEq)]
pub struct TodoItem {
    pub id: i64,
    pub title: String,
    pub description: String,
    /// `low|medium|high`.
    pub priority: String,
    pub is_completed: bool,
    pub to_complete_by: i64,
    /// `1..=5`, present only on completed todos.
    pub mood_score: Option<i32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Encoded banner photo, if one was picked.
    pub image_bytes: Option<Vec<u8>>,
    /// Distance from the last known fix, e.g. `1.50 kilometers`.
    pub distance_label: String,
}

/// Dog row projected for list and detail screens.
#[derive(Debug, Clone, PartialEq)]
pub struct DogItem {
    pub id: i64,
    pub name: String,
    pub breed: String,
    pub birthday: i64,
    pub notes: String,
    pub image_bytes: Option<Vec<u8>>,
    pub age: u32,
    /// NaN while no mood was recorded.
    pub current_mood: f64,
}

/// Todo list response envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct TodoListResponse {
    pub ok: bool,
    pub items: Vec<TodoItem>,
    pub message: String,
}

/// Dog list response envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct DogListResponse {
    pub ok: bool,
    pub items: Vec<DogItem>,
    pub message: String,
}

/// Tag title list response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagListResponse {
    pub ok: bool,
    pub items: Vec<String>,
    pub message: String,
}

/// Creates (`id == 0`) or updates a todo from the form.
///
/// Edits only replace the form fields; completion state and mood stay as
/// stored. `image_bytes`: `None` keeps the current photo, an empty buffer
/// removes it.
///
/// # FFI contract
/// - Sync call, waits for the store write.
/// - Never panics; returns the saved id on success.
#[flutter_rust_bridge::frb(sync)]
#[allow(clippy::too_many_arguments)]
pub fn todo_save(
    id: i64,
    title: String,
    description: String,
    priority: String,
    to_complete_by: i64,
    latitude: Option<f64>,
    longitude: Option<f64>,
    image_bytes: Option<Vec<u8>>,
) -> ActionResponse {
    let Some(priority) = Priority::parse(priority.trim().to_ascii_lowercase().as_str()) else {
        return ActionResponse::failure(format!(
            "todo_save failed: unsupported priority `{priority}`"
        ));
    };

    let result = with_session(|session| {
        let mut todo = stored_todo(session, id)?;
        todo.title = title;
        todo.description = description;
        todo.priority = priority;
        todo.to_complete_by = to_complete_by;
        todo.latitude = latitude;
        todo.longitude = longitude;
        apply_image(&mut todo.image_bytes, image_bytes);

        let pending = session.todos.create_or_update_todo(todo)?;
        Ok(pending.blocking_wait()?)
    });
    match result {
        Ok(saved_id) => ActionResponse::success("Todo saved.", Some(saved_id)),
        Err(err) => ActionResponse::failure(format!("todo_save failed: {err}")),
    }
}

/// Completes a todo with a `1..=5` mood score.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_complete(id: i64, mood_score: i32) -> ActionResponse {
    let Some(mood) = MoodScore::from_score(i64::from(mood_score)) else {
        return ActionResponse::failure(format!(
            "todo_complete failed: mood score `{mood_score}` outside 1..=5"
        ));
    };
    command_response("todo_complete", "Todo completed.", id, |session| {
        session.todos.complete_task(id, mood).blocking_wait()
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn todo_reopen(id: i64) -> ActionResponse {
    command_response("todo_reopen", "Todo reopened.", id, |session| {
        session.todos.reopen_task(id).blocking_wait()
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn todo_delete(id: i64) -> ActionResponse {
    command_response("todo_delete", "Todo deleted.", id, |session| {
        session.todos.delete_todo(id).blocking_wait()
    })
}

/// Lists todos still to be done, soonest due first.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_list_active() -> TodoListResponse {
    let (ok, items, message) = list_outcome(with_session(|session| {
        session.todos.load_active_tasks().blocking_wait()?;
        let items = session
            .todos
            .active_snapshot()
            .map(|snapshot| {
                snapshot
                    .items
                    .iter()
                    .map(|todo| to_todo_item(&session.todos, todo))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        Ok(items)
    }));
    TodoListResponse { ok, items, message }
}

/// Lists completed todos for the history screen.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_list_completed() -> TodoListResponse {
    let (ok, items, message) = list_outcome(with_session(|session| {
        session.todos.load_completed_tasks().blocking_wait()?;
        let items = session
            .todos
            .completed_snapshot()
            .map(|snapshot| {
                snapshot
                    .items
                    .iter()
                    .map(|todo| to_todo_item(&session.todos, todo))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        Ok(items)
    }));
    TodoListResponse { ok, items, message }
}

/// Creates a tag and links it to the todo. Returns the tag id.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_attach_tag(todo_id: i64, title: String) -> ActionResponse {
    let result = with_session(|session| {
        let pending = session.todos.attach_tag(todo_id, title.as_str())?;
        Ok(pending.blocking_wait()?)
    });
    match result {
        Ok(tag_id) => ActionResponse::success("Tag attached.", Some(tag_id)),
        Err(err) => ActionResponse::failure(format!("todo_attach_tag failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn todo_detach_tag(todo_id: i64, tag_id: i64) -> ActionResponse {
    command_response("todo_detach_tag", "Tag detached.", todo_id, |session| {
        session.todos.detach_tag(todo_id, tag_id).blocking_wait()
    })
}

/// Titles of the tags linked to one todo.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_tags(todo_id: i64) -> TagListResponse {
    let (ok, items, message) = list_outcome(with_session(|session| {
        let query = session.todos.tags_for_todo(todo_id);
        query.refresh().blocking_wait()?;
        Ok(query
            .latest()
            .map(|snapshot| {
                snapshot
                    .items
                    .iter()
                    .map(|tag| tag.title.clone())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default())
    }));
    TagListResponse { ok, items, message }
}

/// Creates (`id == 0`) or updates a dog from the form.
///
/// The recorded mood survives edits. `image_bytes` follows the same rules
/// as [`todo_save`].
#[flutter_rust_bridge::frb(sync)]
pub fn dog_save(
    id: i64,
    name: String,
    breed: String,
    birthday: i64,
    notes: String,
    image_bytes: Option<Vec<u8>>,
) -> ActionResponse {
    let result = with_session(|session| {
        let mut dog = stored_dog(session, id)?;
        dog.name = name;
        dog.breed = breed;
        dog.birthday = birthday;
        dog.notes = notes;
        apply_image(&mut dog.image_bytes, image_bytes);

        let pending = session.dogs.create_or_update_dog(dog)?;
        Ok(pending.blocking_wait()?)
    });
    match result {
        Ok(saved_id) => ActionResponse::success("Dog saved.", Some(saved_id)),
        Err(err) => ActionResponse::failure(format!("dog_save failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn dog_set_mood(id: i64, mood_score: i32) -> ActionResponse {
    let Some(mood) = MoodScore::from_score(i64::from(mood_score)) else {
        return ActionResponse::failure(format!(
            "dog_set_mood failed: mood score `{mood_score}` outside 1..=5"
        ));
    };
    command_response("dog_set_mood", "Dog mood updated.", id, |session| {
        session.dogs.set_dog_mood(id, mood).blocking_wait()
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn dog_delete(id: i64) -> ActionResponse {
    command_response("dog_delete", "Dog deleted.", id, |session| {
        session.dogs.delete_dog(id).blocking_wait()
    })
}

/// Lists non-deleted dogs by name.
#[flutter_rust_bridge::frb(sync)]
pub fn dog_list() -> DogListResponse {
    let (ok, items, message) = list_outcome(with_session(|session| {
        session.dogs.load_dogs().blocking_wait()?;
        Ok(session
            .dogs
            .dogs_snapshot()
            .map(|snapshot| snapshot.items.iter().map(to_dog_item).collect::<Vec<_>>())
            .unwrap_or_default())
    }));
    DogListResponse { ok, items, message }
}

/// Pushes a platform location fix. Returns `false` without a session.
#[flutter_rust_bridge::frb(sync)]
pub fn location_update(latitude: f64, longitude: f64) -> bool {
    with_session(|session| Ok(session.location.update_fix(latitude, longitude)))
        .unwrap_or(false)
}

/// Forgets the current fix, e.g. after permission was revoked.
#[flutter_rust_bridge::frb(sync)]
pub fn location_clear() {
    // Without a session there is no fix to clear.
    let _ = with_session(|session| {
        session.location.clear_fix();
        Ok(())
    });
}

#[flutter_rust_bridge::frb(sync)]
pub fn format_distance(meters: f32) -> String {
    format_distance_inner(meters)
}

/// `yyyy-MM-dd` (UTC) for an epoch milliseconds instant; empty when out of range.
#[flutter_rust_bridge::frb(sync)]
pub fn format_date(epoch_ms: i64) -> String {
    format_date_inner(epoch_ms).unwrap_or_default()
}

#[flutter_rust_bridge::frb(sync)]
pub fn validate_todo_input(title: String, description: String) -> bool {
    validate_todo_input_inner(&title, &description)
}

#[flutter_rust_bridge::frb(sync)]
pub fn validate_dog_input(name: String, breed: String, notes: String) -> bool {
    validate_dog_input_inner(&name, &breed, &notes)
}

fn lock_session() -> MutexGuard<'static, Option<AppSession>> {
    SESSION
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn with_session<R>(
    f: impl FnOnce(&AppSession) -> Result<R, ViewModelError>,
) -> Result<R, String> {
    let session = lock_session();
    let active = session
        .as_ref()
        .ok_or_else(|| NOT_STARTED_MESSAGE.to_string())?;
    f(active).map_err(|err| err.to_string())
}

fn command_response(
    operation: &str,
    message: &str,
    id: i64,
    f: impl FnOnce(&AppSession) -> StoreResult<()>,
) -> ActionResponse {
    match with_session(|session| Ok(f(session)?)) {
        Ok(()) => ActionResponse::success(message, Some(id)),
        Err(err) => ActionResponse::failure(format!("{operation} failed: {err}")),
    }
}

/// Starting point for a todo save: a blank draft or the stored row.
fn stored_todo(session: &AppSession, id: i64) -> Result<Todo, ViewModelError> {
    if id == NEW_RECORD_ID {
        return Ok(Todo::new(String::new(), 0));
    }
    session
        .todos
        .get_todo(id)
        .blocking_wait()?
        .ok_or_else(|| StoreError::Repo(RepoError::NotFound(EntityRef::Todo(id))).into())
}

fn stored_dog(session: &AppSession, id: i64) -> Result<Dog, ViewModelError> {
    if id == NEW_RECORD_ID {
        return Ok(Dog::new(String::new(), String::new(), 0));
    }
    session
        .dogs
        .get_dog(id)
        .blocking_wait()?
        .ok_or_else(|| StoreError::Repo(RepoError::NotFound(EntityRef::Dog(id))).into())
}

fn apply_image(current: &mut Option<Vec<u8>>, picked: Option<Vec<u8>>) {
    match picked {
        None => {}
        Some(bytes) if bytes.is_empty() => *current = None,
        Some(bytes) => *current = Some(bytes),
    }
}

fn list_outcome<T>(result: Result<Vec<T>, String>) -> (bool, Vec<T>, String) {
    match result {
        Ok(items) if items.is_empty() => (true, items, "No items.".to_string()),
        Ok(items) => {
            let message = format!("Found {} item(s).", items.len());
            (true, items, message)
        }
        Err(message) => (false, Vec::new(), message),
    }
}

fn to_todo_item(todos: &TodosViewModel, todo: &Todo) -> TodoItem {
    TodoItem {
        id: todo.id,
        title: todo.title.clone(),
        description: todo.description.clone(),
        priority: todo.priority.as_str().to_string(),
        is_completed: todo.is_completed,
        to_complete_by: todo.to_complete_by,
        // Scores are 1..=5.
        mood_score: todo.mood_score.map(|mood| mood.score() as i32),
        latitude: todo.latitude,
        longitude: todo.longitude,
        image_bytes: todo.image_bytes.clone(),
        distance_label: todos.distance_label(todo),
    }
}

fn to_dog_item(dog: &Dog) -> DogItem {
    DogItem {
        id: dog.id,
        name: dog.name.clone(),
        breed: dog.breed.clone(),
        birthday: dog.birthday,
        notes: dog.notes.clone(),
        image_bytes: dog.image_bytes.clone(),
        age: dog.age,
        current_mood: dog.current_mood_or_nan(),
    }
}
