use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tailtasks_core::viewmodel::todos::UNKNOWN_DISTANCE_LABEL;
use tailtasks_core::{
    GeoLocationService, MoodScore, Snapshot, Store, Subscription, Todo, TodosViewModel,
    ValidationError, ViewModelError,
};
use tokio::time::timeout;

fn view_model() -> (TodosViewModel, Arc<GeoLocationService>) {
    let store = Store::open_in_memory().unwrap();
    let location = Arc::new(GeoLocationService::new());
    (TodosViewModel::new(store, location.clone()), location)
}

async fn next_snapshot<T>(subscription: &mut Subscription<T>) -> Arc<Snapshot<T>> {
    timeout(Duration::from_secs(5), subscription.next())
        .await
        .expect("snapshot should arrive in time")
        .expect("store should still be running")
}

/// Reads the newest snapshot after every queued publish has been delivered.
async fn settled<T>(subscription: &mut Subscription<T>) -> Arc<Snapshot<T>> {
    let first = next_snapshot(subscription).await;
    subscription.latest_pending().unwrap_or(first)
}

#[tokio::test]
async fn creating_with_sentinel_id_inserts_fresh_row() {
    let (vm, _) = view_model();

    let first = vm
        .create_or_update_todo(Todo::new("Walk", 100))
        .unwrap()
        .wait()
        .await
        .unwrap();
    let second = vm
        .create_or_update_todo(Todo::new("Feed", 200))
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert!(first > 0);
    assert_ne!(first, second);

    let stored = vm.get_todo(first).wait().await.unwrap().unwrap();
    assert_eq!(stored.title, "Walk");
}

#[tokio::test]
async fn saving_existing_id_updates_in_place() {
    let (vm, _) = view_model();
    let mut active = vm.active_tasks();

    let mut todo = Todo::new("Draft", 100);
    todo.id = vm
        .create_or_update_todo(todo.clone())
        .unwrap()
        .wait()
        .await
        .unwrap();
    todo.title = "Final".to_string();
    let saved_id = vm
        .create_or_update_todo(todo.clone())
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert_eq!(saved_id, todo.id);
    vm.load_completed_tasks().wait().await.unwrap();

    let snapshot = settled(&mut active).await;
    let matching: Vec<_> = snapshot
        .items
        .iter()
        .filter(|item| item.id == todo.id)
        .collect();
    assert_eq!(matching.len(), 1);
    assert_eq!(matching[0].title, "Final");
}

#[tokio::test]
async fn active_and_completed_partition_all_todos() {
    let (vm, _) = view_model();
    let mut active = vm.active_tasks();
    let mut completed = vm.completed_tasks();

    let mut ids = Vec::new();
    for (title, due) in [("a", 3), ("b", 1), ("c", 2), ("d", 4)] {
        ids.push(
            vm.create_or_update_todo(Todo::new(title, due))
                .unwrap()
                .wait()
                .await
                .unwrap(),
        );
    }
    vm.complete_task(ids[1], MoodScore::Good).wait().await.unwrap();
    vm.complete_task(ids[3], MoodScore::Bad).wait().await.unwrap();
    let version = vm.load_completed_tasks().wait().await.unwrap();

    let active = settled(&mut active).await;
    let completed = settled(&mut completed).await;
    assert_eq!(completed.version, version);
    assert!(active.items.iter().all(|todo| !todo.is_completed));
    assert!(completed.items.iter().all(|todo| todo.is_completed));

    let union: HashSet<_> = active
        .items
        .iter()
        .chain(completed.items.iter())
        .map(|todo| todo.id)
        .collect();
    assert_eq!(union, ids.iter().copied().collect::<HashSet<_>>());
    assert_eq!(active.items.len() + completed.items.len(), ids.len());

    let active_order: Vec<_> = active.items.iter().map(|todo| todo.id).collect();
    assert_eq!(active_order, vec![ids[2], ids[0]]);
}

#[tokio::test]
async fn completion_never_shows_without_mood() {
    let (vm, _) = view_model();
    let mut completed = vm.completed_tasks();
    next_snapshot(&mut completed).await;

    let id = vm
        .create_or_update_todo(Todo::new("Bath", 0))
        .unwrap()
        .wait()
        .await
        .unwrap();
    vm.complete_task(id, MoodScore::VeryGood)
        .wait()
        .await
        .unwrap();
    vm.load_completed_tasks().wait().await.unwrap();

    while let Some(snapshot) = completed.try_next() {
        for todo in &snapshot.items {
            assert!(todo.is_completed);
            assert!(todo.mood_score.is_some());
        }
    }
    let done = vm.get_todo(id).wait().await.unwrap().unwrap();
    assert_eq!(done.mood_score, Some(MoodScore::VeryGood));
}

#[tokio::test]
async fn toggling_completion_via_update_normalizes_mood() {
    let (vm, _) = view_model();

    let mut todo = Todo::new("Brush", 0);
    todo.id = vm
        .create_or_update_todo(todo.clone())
        .unwrap()
        .wait()
        .await
        .unwrap();

    todo.is_completed = true;
    vm.update_task(todo.clone()).unwrap().wait().await.unwrap();
    let done = vm.get_todo(todo.id).wait().await.unwrap().unwrap();
    assert_eq!(done.mood_score, Some(MoodScore::Neutral));

    vm.reopen_task(todo.id).wait().await.unwrap();
    let reopened = vm.get_todo(todo.id).wait().await.unwrap().unwrap();
    assert!(!reopened.is_completed);
    assert_eq!(reopened.mood_score, None);
}

#[tokio::test]
async fn invalid_input_is_rejected_without_touching_store() {
    let (vm, _) = view_model();
    let mut active = vm.active_tasks();
    next_snapshot(&mut active).await;

    let err = vm
        .create_or_update_todo(Todo::new("", 0))
        .err()
        .expect("blank title must be rejected");
    assert!(matches!(
        err,
        ViewModelError::Validation(ValidationError::Blank("title"))
    ));

    let mut unsafe_todo = Todo::new("Walk", 0);
    unsafe_todo.description = "1; DELETE FROM todos".to_string();
    assert!(vm.create_or_update_todo(unsafe_todo).is_err());

    let err = vm
        .update_task(Todo::new("never saved", 0))
        .err()
        .expect("unsaved todo cannot be updated");
    assert!(matches!(
        err,
        ViewModelError::Validation(ValidationError::MissingId("todo"))
    ));

    assert_eq!(vm.load_completed_tasks().wait().await.unwrap(), 0);
    assert!(active.try_next().is_none());
}

#[tokio::test]
async fn updating_missing_todo_reports_not_found() {
    let (vm, _) = view_model();
    let mut ghost = Todo::new("ghost", 0);
    ghost.id = 77;

    let err: ViewModelError = vm
        .update_task(ghost)
        .unwrap()
        .wait()
        .await
        .unwrap_err()
        .into();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn tags_attach_detach_and_stream() {
    let (vm, _) = view_model();
    let todo_id = vm
        .create_or_update_todo(Todo::new("Vet", 0))
        .unwrap()
        .wait()
        .await
        .unwrap();

    let todo_tags = vm.tags_for_todo(todo_id);
    let mut stream = todo_tags.subscribe();
    let initial = next_snapshot(&mut stream).await;
    assert!(initial.items.is_empty());

    let health = vm.attach_tag(todo_id, "health").unwrap().wait().await.unwrap();
    let tagged = next_snapshot(&mut stream).await;
    assert_eq!(tagged.items.len(), 1);
    assert_eq!(tagged.items[0].id, health);

    vm.detach_tag(todo_id, health).wait().await.unwrap();
    let untagged = next_snapshot(&mut stream).await;
    assert!(untagged.items.is_empty());

    vm.link_tag(todo_id, health).wait().await.unwrap();
    vm.link_tag(todo_id, health).wait().await.unwrap();
    let relinked = next_snapshot(&mut stream).await;
    assert_eq!(relinked.items.len(), 1);

    let mut all = vm.all_tags();
    let tags = settled(&mut all).await;
    assert_eq!(tags.items.len(), 1);
}

#[tokio::test]
async fn tagging_missing_todo_is_constraint_violation_and_creates_nothing() {
    let (vm, _) = view_model();

    let err: ViewModelError = vm
        .attach_tag(9_999, "orphan")
        .unwrap()
        .wait()
        .await
        .unwrap_err()
        .into();
    assert!(err.is_constraint_violation());

    let mut all = vm.all_tags();
    let tags = next_snapshot(&mut all).await;
    assert!(tags.items.is_empty());
}

#[tokio::test]
async fn deleting_todo_removes_it_from_streams() {
    let (vm, _) = view_model();
    let mut active = vm.active_tasks();

    let id = vm
        .create_or_update_todo(Todo::new("Groom", 0))
        .unwrap()
        .wait()
        .await
        .unwrap();
    vm.delete_todo(id).wait().await.unwrap();
    vm.load_completed_tasks().wait().await.unwrap();

    let snapshot = settled(&mut active).await;
    assert!(snapshot.items.is_empty());
    assert!(vm.get_todo(id).wait().await.unwrap().is_none());
}

#[tokio::test]
async fn distance_uses_injected_location() {
    let (vm, location) = view_model();
    let mut todo = Todo::new("Park", 0);
    todo.latitude = Some(48.8584);
    todo.longitude = Some(2.2945);

    assert_eq!(vm.distance_to(&todo), None);
    assert_eq!(vm.distance_label(&todo), UNKNOWN_DISTANCE_LABEL);

    location.attach();
    location.update_fix(48.8584, 2.2945);
    assert_eq!(vm.distance_to(&todo), Some(0.0));
    assert_eq!(vm.distance_label(&todo), "0 meters");

    location.update_fix(51.5007, -0.1246);
    assert!(vm.distance_label(&todo).ends_with("kilometers"));

    let unplaced = Todo::new("Indoors", 0);
    assert_eq!(vm.distance_to(&unplaced), None);
}
