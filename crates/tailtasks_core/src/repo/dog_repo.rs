//! Dog repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/update/soft-delete APIs over the `dogs` table.
//!
//! # Invariants
//! - Deleted dogs are tombstoned with `is_deleted = 1`, never removed.
//! - Unset or NaN moods are persisted as SQL `NULL`.
//! - Listing order is `name COLLATE NOCASE ASC, id ASC`.

use super::{
    bool_to_int, ensure_connection_ready, int_to_bool, EntityRef, RepoError, RepoResult,
    TableShape,
};
use crate::model::dog::{Dog, DogId};
use crate::validation::check_dog_input;
use rusqlite::{params, Connection, Row};

const DOG_SELECT_SQL: &str = "SELECT
    id,
    name,
    breed,
    birthday,
    notes,
    image_bytes,
    age,
    current_mood,
    is_deleted
FROM dogs";

const DOG_SHAPE: TableShape = (
    "dogs",
    &[
        "id",
        "name",
        "breed",
        "birthday",
        "notes",
        "image_bytes",
        "age",
        "current_mood",
        "is_deleted",
        "updated_at",
    ],
);

/// Repository interface for dog persistence.
pub trait DogRepository {
    /// Inserts `dog` ignoring its `id` and returns the generated id.
    fn insert_dog(&self, dog: &Dog) -> RepoResult<DogId>;
    /// Overwrites every field of the active row identified by `dog.id`.
    fn update_dog(&self, dog: &Dog) -> RepoResult<()>;
    /// Records the dog's current mood.
    fn set_dog_mood(&self, id: DogId, mood: f64) -> RepoResult<()>;
    /// Tombstones a dog. Idempotent for already deleted rows.
    fn soft_delete_dog(&self, id: DogId) -> RepoResult<()>;
    fn get_dog(&self, id: DogId, include_deleted: bool) -> RepoResult<Option<Dog>>;
    fn list_dogs(&self, include_deleted: bool) -> RepoResult<Vec<Dog>>;
}

/// SQLite-backed dog repository.
pub struct SqliteDogRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDogRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &[DOG_SHAPE])?;
        Ok(Self { conn })
    }
}

impl DogRepository for SqliteDogRepository<'_> {
    fn insert_dog(&self, dog: &Dog) -> RepoResult<DogId> {
        check_dog_input(&dog.name, &dog.breed, &dog.notes)?;

        self.conn.execute(
            "INSERT INTO dogs (
                name,
                breed,
                birthday,
                notes,
                image_bytes,
                age,
                current_mood,
                is_deleted
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                dog.name.as_str(),
                dog.breed.as_str(),
                dog.birthday,
                dog.notes.as_str(),
                dog.image_bytes.as_deref(),
                dog.age,
                mood_to_db(dog.current_mood),
                bool_to_int(dog.is_deleted),
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn update_dog(&self, dog: &Dog) -> RepoResult<()> {
        check_dog_input(&dog.name, &dog.breed, &dog.notes)?;

        let changed = self.conn.execute(
            "UPDATE dogs
             SET
                name = ?1,
                breed = ?2,
                birthday = ?3,
                notes = ?4,
                image_bytes = ?5,
                age = ?6,
                current_mood = ?7,
                is_deleted = ?8,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?9
               AND is_deleted = 0;",
            params![
                dog.name.as_str(),
                dog.breed.as_str(),
                dog.birthday,
                dog.notes.as_str(),
                dog.image_bytes.as_deref(),
                dog.age,
                mood_to_db(dog.current_mood),
                bool_to_int(dog.is_deleted),
                dog.id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Dog(dog.id)));
        }

        Ok(())
    }

    fn set_dog_mood(&self, id: DogId, mood: f64) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE dogs
             SET
                current_mood = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND is_deleted = 0;",
            params![id, mood_to_db(Some(mood))],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Dog(id)));
        }

        Ok(())
    }

    fn soft_delete_dog(&self, id: DogId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE dogs
             SET
                is_deleted = 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            [id],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Dog(id)));
        }

        Ok(())
    }

    fn get_dog(&self, id: DogId, include_deleted: bool) -> RepoResult<Option<Dog>> {
        let mut stmt = self.conn.prepare(&format!(
            "{DOG_SELECT_SQL}
             WHERE id = ?1
               AND (?2 = 1 OR is_deleted = 0);"
        ))?;

        let mut rows = stmt.query(params![id, bool_to_int(include_deleted)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_dog_row(row)?));
        }

        Ok(None)
    }

    fn list_dogs(&self, include_deleted: bool) -> RepoResult<Vec<Dog>> {
        let mut stmt = self.conn.prepare(&format!(
            "{DOG_SELECT_SQL}
             WHERE (?1 = 1 OR is_deleted = 0)
             ORDER BY name COLLATE NOCASE ASC, id ASC;"
        ))?;

        let mut rows = stmt.query([bool_to_int(include_deleted)])?;
        let mut dogs = Vec::new();
        while let Some(row) = rows.next()? {
            dogs.push(parse_dog_row(row)?);
        }

        Ok(dogs)
    }
}

fn parse_dog_row(row: &Row<'_>) -> RepoResult<Dog> {
    let age: i64 = row.get("age")?;
    let age = u32::try_from(age)
        .map_err(|_| RepoError::InvalidData(format!("invalid age `{age}` in dogs.age")))?;

    Ok(Dog {
        id: row.get("id")?,
        name: row.get("name")?,
        breed: row.get("breed")?,
        birthday: row.get("birthday")?,
        notes: row.get("notes")?,
        image_bytes: row.get("image_bytes")?,
        age,
        current_mood: row.get("current_mood")?,
        is_deleted: int_to_bool("dogs", "is_deleted", row.get("is_deleted")?)?,
    })
}

fn mood_to_db(mood: Option<f64>) -> Option<f64> {
    mood.filter(|value| !value.is_nan())
}
