//! Todo list, history and detail state.
//!
//! # Responsibility
//! - Publish active and completed task lists as independent live queries.
//! - Route todo and tag commands to the store worker.
//! - Derive distance labels from the injected location provider.
//!
//! # Invariants
//! - `active_tasks` only ever holds todos with `is_completed == false`,
//!   `completed_tasks` only todos with `is_completed == true`.
//! - Completion and mood are written by a single statement, so no snapshot
//!   shows one without the other.

use super::ViewModelResult;
use crate::geo::{calculate_distance, format_distance, LocationProvider};
use crate::model::mood::MoodScore;
use crate::model::tag::{Tag, TagId};
use crate::model::todo::{Todo, TodoId};
use crate::repo::tag_repo::{SqliteTagRepository, TagRepository};
use crate::repo::todo_repo::{SqliteTodoRepository, TodoListQuery, TodoRepository};
use crate::store::live::{LiveQuery, Snapshot, Subscription};
use crate::store::{Pending, Store, Table};
use crate::validation::{check_tag_title, check_todo_input, ValidationError};
use log::debug;
use std::sync::Arc;

const TODO_TABLES: &[Table] = &[Table::Todos];
const TODO_WRITE_TABLES: &[Table] = &[Table::Todos, Table::TodoTags];
const TAG_TABLES: &[Table] = &[Table::Tags];
const TAG_LINK_TABLES: &[Table] = &[Table::Tags, Table::TodoTags];

/// Label shown when either side of a distance is unknown.
pub const UNKNOWN_DISTANCE_LABEL: &str = "distance unavailable";

/// State holder for the todo screens.
pub struct TodosViewModel {
    store: Store,
    location: Arc<dyn LocationProvider>,
    active: LiveQuery<Todo>,
    completed: LiveQuery<Todo>,
    tags: LiveQuery<Tag>,
}

impl TodosViewModel {
    pub fn new(store: Store, location: Arc<dyn LocationProvider>) -> Self {
        let active = store.live(TODO_TABLES, |conn| {
            SqliteTodoRepository::try_new(conn)?.list_todos(&TodoListQuery::active())
        });
        let completed = store.live(TODO_TABLES, |conn| {
            SqliteTodoRepository::try_new(conn)?.list_todos(&TodoListQuery::completed())
        });
        let tags = store.live(TAG_TABLES, |conn| {
            SqliteTagRepository::try_new(conn)?.list_tags()
        });

        Self {
            store,
            location,
            active,
            completed,
            tags,
        }
    }

    /// Todos still to be done, soonest due first.
    pub fn active_tasks(&self) -> Subscription<Todo> {
        self.active.subscribe()
    }

    /// Completed todos for the history screen.
    pub fn completed_tasks(&self) -> Subscription<Todo> {
        self.completed.subscribe()
    }

    pub fn active_snapshot(&self) -> Option<Arc<Snapshot<Todo>>> {
        self.active.latest()
    }

    pub fn completed_snapshot(&self) -> Option<Arc<Snapshot<Todo>>> {
        self.completed.latest()
    }

    /// Re-queries active todos; resolves once the list reflects every
    /// command issued before this call.
    pub fn load_active_tasks(&self) -> Pending<u64> {
        self.active.refresh()
    }

    /// Re-queries completed todos.
    ///
    /// Resolves with the snapshot version once the completed list reflects
    /// every command issued before this call.
    pub fn load_completed_tasks(&self) -> Pending<u64> {
        self.completed.refresh()
    }

    /// Saves the form draft: inserts when `todo.id` is the sentinel,
    /// otherwise overwrites the stored row.
    pub fn create_or_update_todo(&self, mut todo: Todo) -> ViewModelResult<Pending<TodoId>> {
        check_todo_input(&todo.title, &todo.description)?;
        todo.normalize_completion();

        let is_new = todo.is_new();
        debug!(
            "event=todo_save module=viewmodel status=enqueued is_new={is_new} todo_id={}",
            todo.id
        );
        Ok(self.store.write(TODO_TABLES, move |conn| {
            let repo = SqliteTodoRepository::try_new(conn)?;
            if todo.is_new() {
                repo.insert_todo(&todo)
            } else {
                repo.update_todo(&todo)?;
                Ok(todo.id)
            }
        }))
    }

    /// Overwrites an existing todo, e.g. after a completion toggle.
    pub fn update_task(&self, mut todo: Todo) -> ViewModelResult<Pending<()>> {
        if todo.is_new() {
            return Err(ValidationError::MissingId("todo").into());
        }
        check_todo_input(&todo.title, &todo.description)?;
        todo.normalize_completion();

        Ok(self.store.write(TODO_TABLES, move |conn| {
            SqliteTodoRepository::try_new(conn)?.update_todo(&todo)
        }))
    }

    /// Marks a todo completed with the mood picked in the completion dialog.
    pub fn complete_task(&self, id: TodoId, mood: MoodScore) -> Pending<()> {
        self.store.write(TODO_TABLES, move |conn| {
            SqliteTodoRepository::try_new(conn)?.complete_todo(id, mood)
        })
    }

    /// Moves a completed todo back to the active list.
    pub fn reopen_task(&self, id: TodoId) -> Pending<()> {
        self.store.write(TODO_TABLES, move |conn| {
            SqliteTodoRepository::try_new(conn)?.reopen_todo(id)
        })
    }

    /// Removes a todo and its tag links.
    pub fn delete_todo(&self, id: TodoId) -> Pending<()> {
        self.store.write(TODO_WRITE_TABLES, move |conn| {
            SqliteTodoRepository::try_new(conn)?.delete_todo(id)
        })
    }

    pub fn get_todo(&self, id: TodoId) -> Pending<Option<Todo>> {
        self.store
            .read(move |conn| SqliteTodoRepository::try_new(conn)?.get_todo(id))
    }

    /// Live list of the tags linked to one todo.
    ///
    /// The returned handle keeps the query registered until dropped.
    pub fn tags_for_todo(&self, todo_id: TodoId) -> LiveQuery<Tag> {
        self.store.live(TAG_LINK_TABLES, move |conn| {
            SqliteTagRepository::try_new(conn)?.tags_for_todo(todo_id)
        })
    }

    /// Creates a tag titled `title` and links it to `todo_id`.
    ///
    /// Both rows are written in one transaction; a missing todo rolls the
    /// new tag back and fails with a constraint violation.
    pub fn attach_tag(&self, todo_id: TodoId, title: &str) -> ViewModelResult<Pending<TagId>> {
        check_tag_title(title)?;
        let title = title.to_string();

        Ok(self.store.write(TAG_LINK_TABLES, move |conn| {
            let repo = SqliteTagRepository::try_new(conn)?;
            let tag_id = repo.insert_tag(&title)?;
            repo.attach_tag(todo_id, tag_id)?;
            Ok(tag_id)
        }))
    }

    /// Links an existing tag to `todo_id`. Linking twice is a no-op.
    pub fn link_tag(&self, todo_id: TodoId, tag_id: TagId) -> Pending<()> {
        self.store.write(TAG_LINK_TABLES, move |conn| {
            SqliteTagRepository::try_new(conn)?.attach_tag(todo_id, tag_id)
        })
    }

    pub fn detach_tag(&self, todo_id: TodoId, tag_id: TagId) -> Pending<()> {
        self.store.write(TAG_LINK_TABLES, move |conn| {
            SqliteTagRepository::try_new(conn)?.detach_tag(todo_id, tag_id)
        })
    }

    /// Every tag, for the tag picker.
    pub fn all_tags(&self) -> Subscription<Tag> {
        self.tags.subscribe()
    }

    /// Meters between the device and the todo's location.
    ///
    /// `None` when the todo has no location or no valid fix is known.
    pub fn distance_to(&self, todo: &Todo) -> Option<f32> {
        let (latitude, longitude) = todo.location()?;
        let fix = self.location.last_known().filter(|fix| fix.is_valid())?;
        Some(calculate_distance(
            fix.latitude,
            fix.longitude,
            latitude,
            longitude,
        ))
    }

    pub fn distance_label(&self, todo: &Todo) -> String {
        self.distance_to(todo)
            .map(format_distance)
            .unwrap_or_else(|| UNKNOWN_DISTANCE_LABEL.to_string())
    }
}
