use tailtasks_core::db::open_db_in_memory;
use tailtasks_core::repo::tag_repo::{SqliteTagRepository, TagRepository};
use tailtasks_core::repo::todo_repo::{SqliteTodoRepository, TodoRepository};
use tailtasks_core::{EntityRef, RepoError, Todo};

#[test]
fn attach_and_list_tags_for_todo() {
    let conn = open_db_in_memory().unwrap();
    let todos = SqliteTodoRepository::try_new(&conn).unwrap();
    let tags = SqliteTagRepository::try_new(&conn).unwrap();

    let todo_id = todos.insert_todo(&Todo::new("groom", 0)).unwrap();
    let outdoor = tags.insert_tag("outdoor").unwrap();
    let chores = tags.insert_tag("  Chores ").unwrap();
    tags.insert_tag("unused").unwrap();

    tags.attach_tag(todo_id, outdoor).unwrap();
    tags.attach_tag(todo_id, chores).unwrap();
    tags.attach_tag(todo_id, chores).unwrap();

    let titles: Vec<_> = tags
        .tags_for_todo(todo_id)
        .unwrap()
        .into_iter()
        .map(|tag| tag.title)
        .collect();
    assert_eq!(titles, vec!["Chores", "outdoor"]);
}

#[test]
fn tag_titles_are_not_unique() {
    let conn = open_db_in_memory().unwrap();
    let tags = SqliteTagRepository::try_new(&conn).unwrap();

    let first = tags.insert_tag("walk").unwrap();
    let second = tags.insert_tag("walk").unwrap();
    assert_ne!(first, second);
    assert_eq!(tags.list_tags().unwrap().len(), 2);
}

#[test]
fn attaching_to_missing_todo_is_a_constraint_violation() {
    let conn = open_db_in_memory().unwrap();
    let tags = SqliteTagRepository::try_new(&conn).unwrap();

    let tag_id = tags.insert_tag("orphan").unwrap();
    let err = tags.attach_tag(12_345, tag_id).unwrap_err();
    assert!(matches!(err, RepoError::ConstraintViolation(_)));
}

#[test]
fn detach_removes_link_and_reports_missing_link() {
    let conn = open_db_in_memory().unwrap();
    let todos = SqliteTodoRepository::try_new(&conn).unwrap();
    let tags = SqliteTagRepository::try_new(&conn).unwrap();

    let todo_id = todos.insert_todo(&Todo::new("bath", 0)).unwrap();
    let tag_id = tags.insert_tag("weekly").unwrap();
    tags.attach_tag(todo_id, tag_id).unwrap();

    tags.detach_tag(todo_id, tag_id).unwrap();
    assert!(tags.tags_for_todo(todo_id).unwrap().is_empty());
    assert!(tags.get_tag(tag_id).unwrap().is_some());

    assert!(matches!(
        tags.detach_tag(todo_id, tag_id).unwrap_err(),
        RepoError::NotFound(EntityRef::Tag(_))
    ));
}

#[test]
fn blank_tag_title_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let tags = SqliteTagRepository::try_new(&conn).unwrap();
    assert!(matches!(
        tags.insert_tag(" ").unwrap_err(),
        RepoError::Validation(_)
    ));
}
