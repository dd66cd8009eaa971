//! Dog companion list and form state.

use super::ViewModelResult;
use crate::model::dog::{age_in_years, mood_value, Dog, DogId};
use crate::model::mood::MoodScore;
use crate::model::now_epoch_ms;
use crate::repo::dog_repo::{DogRepository, SqliteDogRepository};
use crate::store::live::{LiveQuery, Snapshot, Subscription};
use crate::store::{Pending, Store, Table};
use crate::validation::check_dog_input;
use log::debug;
use std::sync::Arc;

const DOG_TABLES: &[Table] = &[Table::Dogs];

/// State holder for the dog screens. Only non-deleted dogs are listed.
pub struct DogViewModel {
    store: Store,
    dogs: LiveQuery<Dog>,
}

impl DogViewModel {
    pub fn new(store: Store) -> Self {
        let dogs = store.live(DOG_TABLES, |conn| {
            SqliteDogRepository::try_new(conn)?.list_dogs(false)
        });
        Self { store, dogs }
    }

    pub fn dogs(&self) -> Subscription<Dog> {
        self.dogs.subscribe()
    }

    pub fn dogs_snapshot(&self) -> Option<Arc<Snapshot<Dog>>> {
        self.dogs.latest()
    }

    /// Re-queries the dog list.
    pub fn load_dogs(&self) -> Pending<u64> {
        self.dogs.refresh()
    }

    /// Saves the form draft: inserts when `dog.id` is the sentinel,
    /// otherwise overwrites the stored row. `age` is recomputed from
    /// `birthday` on every save.
    pub fn create_or_update_dog(&self, mut dog: Dog) -> ViewModelResult<Pending<DogId>> {
        check_dog_input(&dog.name, &dog.breed, &dog.notes)?;
        dog.age = age_in_years(dog.birthday, now_epoch_ms());

        debug!(
            "event=dog_save module=viewmodel status=enqueued is_new={} dog_id={}",
            dog.is_new(),
            dog.id
        );
        Ok(self.store.write(DOG_TABLES, move |conn| {
            let repo = SqliteDogRepository::try_new(conn)?;
            if dog.is_new() {
                repo.insert_dog(&dog)
            } else {
                repo.update_dog(&dog)?;
                Ok(dog.id)
            }
        }))
    }

    /// Tombstones a dog; it disappears from [`DogViewModel::dogs`].
    pub fn delete_dog(&self, id: DogId) -> Pending<()> {
        self.store.write(DOG_TABLES, move |conn| {
            SqliteDogRepository::try_new(conn)?.soft_delete_dog(id)
        })
    }

    pub fn set_dog_mood(&self, id: DogId, mood: MoodScore) -> Pending<()> {
        let mood = mood_value(mood);
        self.store.write(DOG_TABLES, move |conn| {
            SqliteDogRepository::try_new(conn)?.set_dog_mood(id, mood)
        })
    }

    /// Looks up an active dog.
    pub fn get_dog(&self, id: DogId) -> Pending<Option<Dog>> {
        self.store
            .read(move |conn| SqliteDogRepository::try_new(conn)?.get_dog(id, false))
    }
}
