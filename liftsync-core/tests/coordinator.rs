//! End-to-end behaviour of the coordinator against the in-memory store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use liftsync_core::{
    dispatch, snapshot_channel, CollectionPath, CustomExercise, Exercise, ExercisePicker,
    MemoryIdentity, MemoryStore, NewExerciseHandoff, Query, RemoteStore, ReorderList,
    SyncCoordinator, SyncError, TemplateExercise, TrainingPlan, WorkoutSet,
};

const USER: &str = "u1";

fn setup() -> (SyncCoordinator, MemoryStore) {
    let store = MemoryStore::new();
    let coordinator = SyncCoordinator::new(
        Arc::new(store.clone()),
        Arc::new(MemoryIdentity::signed_in(USER)),
    );
    (coordinator, store)
}

async fn seed_exercises(coordinator: &SyncCoordinator, plan_id: &str, n: i32) {
    for i in 0..n {
        coordinator
            .create_exercise(
                plan_id,
                &Exercise::new(format!("E{}", i))
                    .with_id(format!("e{}", i))
                    .with_order(i),
            )
            .await
            .unwrap();
    }
}

#[tokio::test(start_paused = true)]
async fn test_callback_fires_once_when_store_answers() {
    let (coordinator, _store) = setup();
    let calls = Arc::new(AtomicUsize::new(0));

    let seen = Arc::clone(&calls);
    let c = coordinator.clone();
    let plan = TrainingPlan::new("Pull");
    let plan_id = plan.id.clone();
    dispatch(async move { c.save_plan(&plan).await }, move |success, id| {
        assert!(success);
        assert_eq!(id, Some(plan_id));
        seen.fetch_add(1, Ordering::SeqCst);
    })
    .await
    .unwrap();

    // Outlive the fallback timer; it must not answer a second time.
    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_callback_fires_once_when_timer_answers() {
    let (coordinator, store) = setup();
    store.set_online(false);
    let calls = Arc::new(AtomicUsize::new(0));

    let seen = Arc::clone(&calls);
    let c = coordinator.clone();
    let handle = dispatch(
        async move { c.save_plan(&TrainingPlan::new("Legs")).await },
        move |success, id| {
            assert!(success);
            assert!(id.is_some());
            seen.fetch_add(1, Ordering::SeqCst);
        },
    );
    handle.await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // The queued write lands later; nobody is told again.
    store.set_online(true);
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let plans = store
        .get(&Query::new(CollectionPath::training_plans(USER)))
        .await
        .unwrap();
    assert_eq!(plans.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_fallback_answers_after_configured_delay() {
    let (coordinator, store) = setup();
    store.set_online(false);

    let started = tokio::time::Instant::now();
    let ack = coordinator
        .create_set("p1", "e1", &WorkoutSet::new(1, 5, 100.0))
        .await
        .unwrap();
    assert!(!ack.confirmed);
    let waited = started.elapsed();
    assert!(waited >= Duration::from_millis(1000));
    assert!(waited < Duration::from_millis(1100));
}

#[tokio::test]
async fn test_blank_id_never_reaches_store() {
    let (coordinator, store) = setup();

    let err = coordinator.delete_set("p1", "e1", "").await.unwrap_err();
    assert_eq!(err, SyncError::Validation("Set ID is empty.".to_string()));
    let err = coordinator.delete_exercise("p1", "").await.unwrap_err();
    assert_eq!(err, SyncError::Validation("Exercise ID is empty.".to_string()));
    let err = coordinator.delete_plan("").await.unwrap_err();
    assert_eq!(err, SyncError::Validation("Plan ID is empty.".to_string()));

    assert_eq!(store.mutation_calls(), 0);
}

#[tokio::test]
async fn test_create_then_read_roundtrip() {
    let (coordinator, _store) = setup();
    let exercise = Exercise::new("Romanian Deadlift")
        .with_muscle_group("Hamstrings")
        .with_description("Hinge with soft knees")
        .with_order(0);

    let id = coordinator
        .create_exercise("p1", &exercise)
        .await
        .unwrap()
        .id
        .unwrap();

    let read = coordinator.get_exercises("p1").await.unwrap();
    assert_eq!(read, vec![exercise.with_id(id)]);
}

#[tokio::test(start_paused = true)]
async fn test_offline_create_is_readable_before_ack() {
    let (coordinator, store) = setup();
    store.set_online(false);
    let exercise = Exercise::new("Walking Lunge").with_order(0);

    let ack = coordinator.create_exercise("p1", &exercise).await.unwrap();
    assert!(!ack.confirmed);
    let id = ack.id.unwrap();

    let read = coordinator.get_exercises("p1").await.unwrap();
    assert_eq!(read, vec![exercise.with_id(id)]);
}

#[tokio::test(start_paused = true)]
async fn test_offline_reorder_keeps_new_order() {
    let (coordinator, store) = setup();
    seed_exercises(&coordinator, "p1", 3).await;
    store.set_online(false);

    let now = Instant::now();
    let mut list = ReorderList::new(80.0, Duration::from_millis(100)).unwrap();
    list.on_remote(coordinator.get_exercises("p1").await.unwrap(), now);
    list.drag_start(2);
    list.drag_move(-160.0);
    let changed = list.drag_end(now);

    let outcomes = coordinator.commit_order("p1", &changed).await;
    assert!(outcomes.iter().all(|o| matches!(o, Ok(ack) if !ack.confirmed)));

    let ids: Vec<String> = coordinator
        .get_exercises("p1")
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(ids, vec!["e2", "e0", "e1"]);
}

#[tokio::test(start_paused = true)]
async fn test_offline_plan_delete_clears_tree_locally() {
    let (coordinator, store) = setup();
    coordinator
        .save_plan(&TrainingPlan::new("Push").with_id("p1"))
        .await
        .unwrap();
    seed_exercises(&coordinator, "p1", 2).await;
    coordinator
        .create_set("p1", "e0", &WorkoutSet::new(1, 5, 100.0))
        .await
        .unwrap();
    store.set_online(false);

    let ack = coordinator.delete_plan("p1").await.unwrap();
    assert!(!ack.confirmed);

    assert!(coordinator.get_exercises("p1").await.unwrap().is_empty());
    assert!(coordinator.get_sets("p1", "e0").await.unwrap().is_empty());
    let plans = store
        .get(&Query::new(CollectionPath::training_plans(USER)))
        .await
        .unwrap();
    assert!(plans.is_empty());
}

#[tokio::test]
async fn test_subscription_sees_initial_and_changes() {
    let (coordinator, _store) = setup();
    let (handler, mut rx) = snapshot_channel::<Exercise>();
    let _sub = coordinator.subscribe_exercises("p1", handler);

    assert!(rx.recv().await.unwrap().items.is_empty());

    coordinator
        .create_exercise("p1", &Exercise::new("Squat").with_order(0))
        .await
        .unwrap();
    let snapshot = rx.recv().await.unwrap();
    assert_eq!(snapshot.items.len(), 1);
    assert_eq!(snapshot.items[0].name, "Squat");
}

#[tokio::test]
async fn test_subscription_error_delivers_empty_once() {
    let (coordinator, store) = setup();
    store.fail_subscriptions(Some("permission denied"));

    let (handler, mut rx) = snapshot_channel::<TrainingPlan>();
    let _sub = coordinator.subscribe_plans(handler);

    let snapshot = rx.recv().await.unwrap();
    assert!(snapshot.items.is_empty());
    assert!(matches!(snapshot.error, Some(SyncError::Subscription(_))));
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_drag_commit_updates_only_moved_exercises() {
    let (coordinator, store) = setup();
    seed_exercises(&coordinator, "p1", 5).await;
    let writes_before = store.mutation_calls();

    let now = Instant::now();
    let mut list = ReorderList::new(80.0, Duration::from_millis(100)).unwrap();
    list.on_remote(coordinator.get_exercises("p1").await.unwrap(), now);

    list.drag_start(2);
    list.drag_move(-160.0);
    let changed = list.drag_end(now);
    let outcomes = coordinator.commit_order("p1", &changed).await;

    assert_eq!(outcomes.len(), 3);
    assert_eq!(store.mutation_calls() - writes_before, 3);

    let ids: Vec<String> = coordinator
        .get_exercises("p1")
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(ids, vec!["e2", "e0", "e1", "e3", "e4"]);
}

#[tokio::test]
async fn test_zero_net_drag_writes_nothing() {
    let (coordinator, store) = setup();
    seed_exercises(&coordinator, "p1", 3).await;
    let writes_before = store.mutation_calls();

    let now = Instant::now();
    let mut list = ReorderList::new(80.0, Duration::from_millis(100)).unwrap();
    list.on_remote(coordinator.get_exercises("p1").await.unwrap(), now);
    list.drag_start(0);
    list.drag_move(85.0);
    list.drag_move(-85.0);
    let changed = list.drag_end(now);

    assert!(coordinator.commit_order("p1", &changed).await.is_empty());
    assert_eq!(store.mutation_calls(), writes_before);
}

#[tokio::test]
async fn test_delete_middle_set_renumbers_tail_only() {
    let (coordinator, store) = setup();
    for n in 1..=3 {
        coordinator
            .create_set(
                "p1",
                "e1",
                &WorkoutSet::new(n, 8, 60.0).with_id(format!("s{}", n)),
            )
            .await
            .unwrap();
    }
    let sets = coordinator.get_sets("p1", "e1").await.unwrap();
    let writes_before = store.mutation_calls();

    let remaining = coordinator
        .delete_set_and_renumber("p1", "e1", &sets, "s2")
        .await
        .unwrap();

    // One delete plus one renumber.
    assert_eq!(store.mutation_calls() - writes_before, 2);
    let numbers: Vec<(String, i32)> = remaining
        .into_iter()
        .map(|s| (s.id, s.set_number))
        .collect();
    assert_eq!(
        numbers,
        vec![("s1".to_string(), 1), ("s3".to_string(), 2)]
    );

    let stored: Vec<i32> = coordinator
        .get_sets("p1", "e1")
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.set_number)
        .collect();
    assert_eq!(stored, vec![1, 2]);
}

#[tokio::test]
async fn test_picker_flow_attaches_selected_definitions() {
    let (coordinator, _store) = setup();
    coordinator
        .seed_template_exercise(&TemplateExercise::new("Deadlift").with_id("t1"))
        .await
        .unwrap();

    let handoff = NewExerciseHandoff::new();
    let custom_id = coordinator
        .create_custom_exercise(&CustomExercise::new("Cable Pull-Through"))
        .await
        .unwrap()
        .id
        .unwrap();
    handoff.publish(custom_id.as_str());

    let (custom_handler, mut custom_rx) = snapshot_channel::<CustomExercise>();
    let (template_handler, mut template_rx) = snapshot_channel::<TemplateExercise>();
    let _custom = coordinator.subscribe_custom_exercises(custom_handler);
    let _templates = coordinator.subscribe_template_exercises(template_handler);

    let mut picker = ExercisePicker::new();
    picker.set_custom(custom_rx.recv().await.unwrap().items);
    picker.set_templates(template_rx.recv().await.unwrap().items);
    assert_eq!(picker.accept_handoff(&handoff), Some(custom_id));
    picker.toggle("t1");

    let outcomes = coordinator
        .add_definitions_to_plan("p1", &picker.selected())
        .await
        .unwrap();
    assert_eq!(outcomes.len(), 2);

    let names: Vec<String> = coordinator
        .get_exercises("p1")
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec!["Cable Pull-Through", "Deadlift"]);
}
