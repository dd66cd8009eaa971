//! Todo repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD and completion APIs over the `todos` table.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Write paths validate title/description before SQL mutations.
//! - Completion writes `is_completed` and `mood_score` in one statement.
//! - Listing order is `to_complete_by ASC, id ASC`.

use super::{
    bool_to_int, ensure_connection_ready, int_to_bool, EntityRef, RepoError, RepoResult,
    TableShape,
};
use crate::model::mood::MoodScore;
use crate::model::todo::{Priority, Todo, TodoId};
use crate::validation::check_todo_input;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const TODO_SELECT_SQL: &str = "SELECT
    id,
    title,
    description,
    priority,
    is_completed,
    to_complete_by,
    mood_score,
    latitude,
    longitude,
    image_bytes
FROM todos";

const TODO_SHAPE: TableShape = (
    "todos",
    &[
        "id",
        "title",
        "description",
        "priority",
        "is_completed",
        "to_complete_by",
        "mood_score",
        "latitude",
        "longitude",
        "image_bytes",
        "updated_at",
    ],
);

/// Query options for listing todos.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TodoListQuery {
    /// `Some(flag)` keeps only todos whose `is_completed == flag`.
    pub completed: Option<bool>,
}

impl TodoListQuery {
    pub fn active() -> Self {
        Self {
            completed: Some(false),
        }
    }

    pub fn completed() -> Self {
        Self {
            completed: Some(true),
        }
    }
}

/// Repository interface for todo persistence.
pub trait TodoRepository {
    /// Inserts `todo` ignoring its `id` and returns the generated id.
    fn insert_todo(&self, todo: &Todo) -> RepoResult<TodoId>;
    /// Overwrites every field of the row identified by `todo.id`.
    fn update_todo(&self, todo: &Todo) -> RepoResult<()>;
    /// Marks a todo completed together with its mood.
    fn complete_todo(&self, id: TodoId, mood: MoodScore) -> RepoResult<()>;
    /// Marks a todo active again and clears its mood.
    fn reopen_todo(&self, id: TodoId) -> RepoResult<()>;
    /// Removes a todo row; tag links cascade.
    fn delete_todo(&self, id: TodoId) -> RepoResult<()>;
    fn get_todo(&self, id: TodoId) -> RepoResult<Option<Todo>>;
    fn list_todos(&self, query: &TodoListQuery) -> RepoResult<Vec<Todo>>;
}

/// SQLite-backed todo repository.
pub struct SqliteTodoRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTodoRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &[TODO_SHAPE])?;
        Ok(Self { conn })
    }
}

impl TodoRepository for SqliteTodoRepository<'_> {
    fn insert_todo(&self, todo: &Todo) -> RepoResult<TodoId> {
        check_todo_input(&todo.title, &todo.description)?;

        self.conn.execute(
            "INSERT INTO todos (
                title,
                description,
                priority,
                is_completed,
                to_complete_by,
                mood_score,
                latitude,
                longitude,
                image_bytes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                todo.title.as_str(),
                todo.description.as_str(),
                todo.priority.as_str(),
                bool_to_int(todo.is_completed),
                todo.to_complete_by,
                todo.mood_score.map(MoodScore::score),
                todo.latitude,
                todo.longitude,
                todo.image_bytes.as_deref(),
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn update_todo(&self, todo: &Todo) -> RepoResult<()> {
        check_todo_input(&todo.title, &todo.description)?;

        let changed = self.conn.execute(
            "UPDATE todos
             SET
                title = ?1,
                description = ?2,
                priority = ?3,
                is_completed = ?4,
                to_complete_by = ?5,
                mood_score = ?6,
                latitude = ?7,
                longitude = ?8,
                image_bytes = ?9,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?10;",
            params![
                todo.title.as_str(),
                todo.description.as_str(),
                todo.priority.as_str(),
                bool_to_int(todo.is_completed),
                todo.to_complete_by,
                todo.mood_score.map(MoodScore::score),
                todo.latitude,
                todo.longitude,
                todo.image_bytes.as_deref(),
                todo.id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Todo(todo.id)));
        }

        Ok(())
    }

    fn complete_todo(&self, id: TodoId, mood: MoodScore) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE todos
             SET
                is_completed = 1,
                mood_score = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id, mood.score()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Todo(id)));
        }

        Ok(())
    }

    fn reopen_todo(&self, id: TodoId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE todos
             SET
                is_completed = 0,
                mood_score = NULL,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            [id],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Todo(id)));
        }

        Ok(())
    }

    fn delete_todo(&self, id: TodoId) -> RepoResult<()> {
        let changed = self.conn.execute("DELETE FROM todos WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Todo(id)));
        }
        Ok(())
    }

    fn get_todo(&self, id: TodoId) -> RepoResult<Option<Todo>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TODO_SELECT_SQL} WHERE id = ?1;"))?;

        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_todo_row(row)?));
        }

        Ok(None)
    }

    fn list_todos(&self, query: &TodoListQuery) -> RepoResult<Vec<Todo>> {
        let mut sql = format!("{TODO_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(completed) = query.completed {
            sql.push_str(" AND is_completed = ?");
            bind_values.push(Value::Integer(bool_to_int(completed)));
        }

        sql.push_str(" ORDER BY to_complete_by ASC, id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut todos = Vec::new();
        while let Some(row) = rows.next()? {
            todos.push(parse_todo_row(row)?);
        }

        Ok(todos)
    }
}

fn parse_todo_row(row: &Row<'_>) -> RepoResult<Todo> {
    let priority_text: String = row.get("priority")?;
    let priority = Priority::parse(&priority_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid priority `{priority_text}` in todos.priority"
        ))
    })?;

    let mood_score = match row.get::<_, Option<i64>>("mood_score")? {
        Some(score) => Some(MoodScore::from_score(score).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid mood score `{score}` in todos.mood_score"))
        })?),
        None => None,
    };

    Ok(Todo {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        priority,
        is_completed: int_to_bool("todos", "is_completed", row.get("is_completed")?)?,
        to_complete_by: row.get("to_complete_by")?,
        mood_score,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        image_bytes: row.get("image_bytes")?,
    })
}
