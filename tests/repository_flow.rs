//! End-to-end flows through SQLite storage, the request adapter and the
//! timer repository.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::{TimeZone, Utc};
use serde_json::json;
use tempfile::TempDir;
use timo_lib::{
    api::{Method, Request, RequestAdapter, DEFAULT_BASE_URL},
    dashboard::Dashboard,
    db::{default_db_path, SqliteStore},
    error::{RequestError, SaveError, ValidationError},
    timers::{CategoryChoice, Notifier, Signal, TimerDraft, TimerRepository},
    AppState,
};

fn create_test_state() -> (AppState, TempDir) {
    let temp_dir = tempfile::tempdir().expect("failed to create temporary test directory");
    let state = AppState::open(temp_dir.path()).expect("failed to open app state");
    (state, temp_dir)
}

fn draft(name: &str, date: &str, category: CategoryChoice) -> TimerDraft {
    TimerDraft {
        name: name.into(),
        date: date.into(),
        hour: "9".into(),
        minute: "30".into(),
        meridiem: "AM".into(),
        category,
    }
}

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap()
}

#[tokio::test]
async fn timers_survive_reopening_the_store() {
    let (state, temp_dir) = create_test_state();
    let repo = &state.repository;

    let created = repo
        .save_timer_in(&draft("Launch", "2099-03-01", CategoryChoice::None), None, now(), &Utc)
        .await
        .expect("save should succeed");
    assert_eq!(created.target_date, "2099-03-01T09:30:00.000Z");
    assert!(default_db_path(temp_dir.path()).exists());

    drop(state);
    let reopened = AppState::open(temp_dir.path()).unwrap();
    let timers = reopened.repository.read_timers().await;
    assert_eq!(timers, vec![created]);
}

#[tokio::test]
async fn edit_flow_preserves_identity_and_persists_new_category() {
    let (state, _temp_dir) = create_test_state();
    let repo = &state.repository;

    let categories_changed = Arc::new(AtomicUsize::new(0));
    let counter = categories_changed.clone();
    let _sub = repo.subscribe(Signal::CategoriesUpdated, move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let original = repo
        .save_timer_in(&draft("Trip", "2099-06-01", CategoryChoice::None), None, now(), &Utc)
        .await
        .unwrap();

    let later = now() + chrono::Duration::hours(1);
    let mut edit = TimerDraft::from_timer(&original, &Utc);
    edit.name = "  Summer trip ".into();
    edit.category = CategoryChoice::New("Travel".into());

    let edited = repo
        .save_timer_in(&edit, Some(&original), later, &Utc)
        .await
        .unwrap();

    assert_eq!(edited.id, original.id);
    assert_eq!(edited.name, "Summer trip");
    assert_eq!(edited.category, "Travel");
    assert_eq!(edited.created_at, original.created_at);
    assert_eq!(edited.updated_at, Some(later));

    assert_eq!(repo.read_timers().await, vec![edited]);
    assert_eq!(repo.read_categories().await, vec!["Travel".to_string()]);
    assert_eq!(categories_changed.load(Ordering::SeqCst), 1);

    // Same label in another case reuses the stored one without a write.
    repo.save_timer_in(
        &draft("Another", "2099-07-01", CategoryChoice::New("travel".into())),
        None,
        now(),
        &Utc,
    )
    .await
    .unwrap();
    assert_eq!(repo.read_categories().await, vec!["Travel".to_string()]);
    assert_eq!(categories_changed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rejected_forms_leave_storage_untouched() {
    let (state, _temp_dir) = create_test_state();
    let repo = &state.repository;

    let err = repo
        .save_timer_in(&draft("Old", "2020-01-01", CategoryChoice::None), None, now(), &Utc)
        .await
        .unwrap_err();
    assert!(matches!(err, SaveError::Validation(ValidationError::PastDate)));
    assert!(repo.read_timers().await.is_empty());
}

#[tokio::test]
async fn delete_removes_only_known_ids() {
    let (state, _temp_dir) = create_test_state();
    let repo = &state.repository;

    let timer = repo
        .save_timer_in(&draft("Gone", "2099-01-01", CategoryChoice::None), None, now(), &Utc)
        .await
        .unwrap();

    let writes = Arc::new(AtomicUsize::new(0));
    let counter = writes.clone();
    let _sub = repo.subscribe(Signal::TimersUpdated, move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    assert!(!repo.delete_timer("missing").await.unwrap());
    assert_eq!(writes.load(Ordering::SeqCst), 0);

    assert!(repo.delete_timer(&timer.id).await.unwrap());
    assert_eq!(writes.load(Ordering::SeqCst), 1);
    assert!(repo.read_timers().await.is_empty());
}

#[tokio::test]
async fn adapter_accepts_wrapped_and_string_payloads() {
    let temp_dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteStore::new(default_db_path(temp_dir.path())));
    let client = RequestAdapter::new(store, DEFAULT_BASE_URL);

    client
        .put("/categories", json!({ "items": ["Work", "Home"] }))
        .await
        .unwrap();
    assert_eq!(client.get("/categories").await.unwrap(), json!(["Work", "Home"]));

    client
        .put("sqlite://local/categories/", json!("[\"Solo\"]"))
        .await
        .unwrap();
    assert_eq!(client.get("/categories").await.unwrap(), json!(["Solo"]));

    let response = client
        .handle(Request {
            method: Method::Delete,
            url: "/categories".into(),
            body: None,
        })
        .await
        .unwrap();
    assert_eq!(response.status, 404);
    assert_eq!(response.data, json!({ "message": "Not Found" }));

    let err = client.get("/settings").await.unwrap_err();
    assert!(matches!(err, RequestError::Status { status: 404, .. }));
}

#[tokio::test]
async fn unusable_storage_degrades_reads_and_fails_writes() {
    let temp_dir = tempfile::tempdir().unwrap();
    let blocker = temp_dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"").unwrap();

    let store = Arc::new(SqliteStore::new(default_db_path(&blocker)));
    let repo = TimerRepository::new(RequestAdapter::new(store, DEFAULT_BASE_URL), Notifier::new());

    assert!(repo.read_timers().await.is_empty());
    assert!(repo.read_categories().await.is_empty());

    let err = repo
        .save_timer_in(&draft("Nope", "2099-01-01", CategoryChoice::None), None, now(), &Utc)
        .await
        .unwrap_err();
    assert!(matches!(err, SaveError::Request(_)));
    assert_eq!(err.to_string(), "Unable to save timer. Please try again.");
}

#[tokio::test]
async fn dashboard_follows_repository_writes() {
    let (state, _temp_dir) = create_test_state();
    let repo = &state.repository;
    let dashboard = Dashboard::open(repo.clone()).await;
    assert!(dashboard.timers().is_empty());

    for (name, date) in [("Later", "2099-09-01"), ("Sooner", "2099-02-01")] {
        repo.save_timer_in(&draft(name, date, CategoryChoice::None), None, now(), &Utc)
            .await
            .unwrap();
    }

    tokio::time::timeout(Duration::from_secs(5), async {
        while dashboard.timers().len() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("dashboard never caught up");

    let names: Vec<String> = dashboard.timers().into_iter().map(|t| t.name).collect();
    assert_eq!(names, ["Sooner", "Later"]);
}
