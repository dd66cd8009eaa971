//! Tag repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Own `tags` rows and the `todo_tags` association table.
//!
//! # Invariants
//! - Linking a missing todo or tag fails with `ConstraintViolation`.
//! - Linking an already linked pair is a no-op.
//! - Tag listing order is `title COLLATE NOCASE ASC, id ASC`.

use super::{ensure_connection_ready, EntityRef, RepoError, RepoResult, TableShape};
use crate::model::tag::{Tag, TagId};
use crate::model::todo::TodoId;
use crate::validation::check_tag_title;
use rusqlite::{params, Connection, Row};

const TAG_SHAPES: &[TableShape] = &[
    ("tags", &["id", "title"]),
    ("todo_tags", &["todo_id", "tag_id"]),
];

/// Repository interface for tags and todo-tag links.
pub trait TagRepository {
    /// Creates one tag and returns its generated id.
    fn insert_tag(&self, title: &str) -> RepoResult<TagId>;
    fn get_tag(&self, id: TagId) -> RepoResult<Option<Tag>>;
    fn list_tags(&self) -> RepoResult<Vec<Tag>>;
    /// Links `tag_id` to `todo_id`.
    fn attach_tag(&self, todo_id: TodoId, tag_id: TagId) -> RepoResult<()>;
    /// Removes one link. Returns `NotFound` when the pair was not linked.
    fn detach_tag(&self, todo_id: TodoId, tag_id: TagId) -> RepoResult<()>;
    /// Lists tags linked to one todo.
    fn tags_for_todo(&self, todo_id: TodoId) -> RepoResult<Vec<Tag>>;
}

/// SQLite-backed tag repository.
pub struct SqliteTagRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTagRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, TAG_SHAPES)?;
        Ok(Self { conn })
    }
}

impl TagRepository for SqliteTagRepository<'_> {
    fn insert_tag(&self, title: &str) -> RepoResult<TagId> {
        check_tag_title(title)?;
        self.conn
            .execute("INSERT INTO tags (title) VALUES (?1);", [title.trim()])?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_tag(&self, id: TagId) -> RepoResult<Option<Tag>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, title FROM tags WHERE id = ?1;")?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_tag_row(row)?));
        }
        Ok(None)
    }

    fn list_tags(&self) -> RepoResult<Vec<Tag>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, title FROM tags ORDER BY title COLLATE NOCASE ASC, id ASC;")?;
        let mut rows = stmt.query([])?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            tags.push(parse_tag_row(row)?);
        }
        Ok(tags)
    }

    fn attach_tag(&self, todo_id: TodoId, tag_id: TagId) -> RepoResult<()> {
        // Duplicate links are ignored; foreign keys are still enforced.
        self.conn.execute(
            "INSERT INTO todo_tags (todo_id, tag_id)
             VALUES (?1, ?2)
             ON CONFLICT (todo_id, tag_id) DO NOTHING;",
            params![todo_id, tag_id],
        )?;
        Ok(())
    }

    fn detach_tag(&self, todo_id: TodoId, tag_id: TagId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM todo_tags WHERE todo_id = ?1 AND tag_id = ?2;",
            params![todo_id, tag_id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Tag(tag_id)));
        }
        Ok(())
    }

    fn tags_for_todo(&self, todo_id: TodoId) -> RepoResult<Vec<Tag>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.id, t.title
             FROM todo_tags tt
             INNER JOIN tags t ON t.id = tt.tag_id
             WHERE tt.todo_id = ?1
             ORDER BY t.title COLLATE NOCASE ASC, t.id ASC;",
        )?;
        let mut rows = stmt.query([todo_id])?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            tags.push(parse_tag_row(row)?);
        }
        Ok(tags)
    }
}

fn parse_tag_row(row: &Row<'_>) -> RepoResult<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        title: row.get(1)?,
    })
}
