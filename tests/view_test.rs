//! Integration tests for the session view contract and key bindings.

use std::sync::Arc;
use std::time::Duration;

use mastery_session::cache::QueryCache;
use mastery_session::client::InMemoryBackend;
use mastery_session::client::memory::{new_item, preview};
use mastery_session::config::SessionConfig;
use mastery_session::model::{Grade, ItemId, SchedulerState};
use mastery_session::rating::StarFill;
use mastery_session::session::{LaunchRequest, Phase, StudySession, SubmitOutcome, Update};
use mastery_session::view::{Action, Dispatched, Key, key_action};

type Session = Box<StudySession<InMemoryBackend>>;

fn launch(backend: InMemoryBackend, queue: &str) -> Session {
    StudySession::launch(
        Arc::new(backend),
        Arc::new(QueryCache::new()),
        LaunchRequest::new(queue),
        &SessionConfig::default(),
    )
    .into_session()
    .expect("session should start")
}

fn deck() -> InMemoryBackend {
    let mut learning = new_item("b", "Mean value theorem");
    learning.scheduler_state = SchedulerState::Learning;
    learning.current_step = Some(1);

    InMemoryBackend::new()
        .with_item(new_item("a", "Two Sum"))
        .with_preview(&ItemId::new("a"), preview(["1m", "6m", "10m", "4d"]))
        .with_item(learning)
        .with_preview(&ItemId::new("b"), preview(["1m", "10m", "1d", "3d"]))
}

#[tokio::test(start_paused = true)]
async fn grade_slots_show_placeholder_until_preview_arrives() {
    let backend = deck().with_preview_delay(&ItemId::new("a"), Duration::from_secs(1));
    let mut session = launch(backend, "a");
    session.wait_until_ready().await;

    let view = session.view();
    assert!(view.grades.iter().all(|slot| slot.interval == "..."));
    assert_eq!(
        view.grades.iter().map(|s| s.shortcut).collect::<String>(),
        "1234"
    );
    assert_eq!(view.grades[3].label, "Easy");

    assert_eq!(session.next_update().await, Some(Update::PreviewReady));
    let intervals: Vec<String> = session
        .view()
        .grades
        .into_iter()
        .map(|slot| slot.interval)
        .collect();
    assert_eq!(intervals, vec!["1m", "6m", "10m", "4d"]);
}

#[tokio::test]
async fn failed_preview_shows_error_marker() {
    let mut session = launch(deck().fail_preview(&ItemId::new("a")), "a");
    session.wait_until_ready().await;
    assert_eq!(session.next_update().await, Some(Update::PreviewFailed));
    assert!(session.view().grades.iter().all(|slot| slot.interval == "?"));
}

#[tokio::test]
async fn badge_shows_state_and_learning_step() {
    let mut session = launch(deck(), "a,b");
    session.wait_until_ready().await;
    assert_eq!(session.view().badge().as_deref(), Some("NEW"));

    session.dispatch(Action::Reveal).await.unwrap();
    session.dispatch(Action::SelectGrade(Grade::Good)).await.unwrap();
    session.dispatch(Action::Submit).await.unwrap();
    session.wait_until_ready().await;

    assert_eq!(session.view().badge().as_deref(), Some("LEARNING · Step 2"));
    assert_eq!(session.view().progress.to_string(), "2 / 2");
}

#[tokio::test]
async fn key_map_follows_phase() {
    let mut session = launch(deck(), "a");
    assert_eq!(key_action(&session.view(), Key::Space), None);
    assert_eq!(key_action(&session.view(), Key::Escape), Some(Action::Exit));

    session.wait_until_ready().await;
    let view = session.view();
    assert_eq!(view.phase, Phase::Answering);
    assert_eq!(key_action(&view, Key::Space), Some(Action::Reveal));
    assert_eq!(key_action(&view, Key::Char('3')), None);
    assert_eq!(key_action(&view, Key::Enter), None);

    session.reveal().unwrap();
    let view = session.view();
    assert!(view.grades_enabled());
    assert!(!view.submit_enabled);
    assert_eq!(key_action(&view, Key::Enter), None);
    assert_eq!(
        key_action(&view, Key::Char('3')),
        Some(Action::SelectGrade(Grade::Good))
    );
    assert_eq!(key_action(&view, Key::Char('5')), None);
    assert_eq!(key_action(&view, Key::Backspace), Some(Action::Back));

    session.select_grade(Grade::Good).unwrap();
    let view = session.view();
    assert!(view.submit_enabled);
    assert!(view.grades[2].selected);
    assert_eq!(key_action(&view, Key::Enter), Some(Action::Submit));
}

#[tokio::test]
async fn reload_key_only_after_load_failure() {
    let backend = deck().fail_item(&ItemId::new("a"));
    let mut session = launch(backend, "a");
    assert_eq!(key_action(&session.view(), Key::Char('r')), None);

    assert_eq!(session.wait_until_ready().await, Some(Update::ItemFailed));
    let view = session.view();
    assert!(view.load_error.is_some());
    assert_eq!(key_action(&view, Key::Char('r')), Some(Action::Reload));
}

#[tokio::test]
async fn error_log_visible_only_for_failing_grades() {
    let mut session = launch(deck(), "a");
    session.wait_until_ready().await;
    session.dispatch(Action::Reveal).await.unwrap();

    assert!(!session.view().error_log_visible);
    session.dispatch(Action::SelectGrade(Grade::Hard)).await.unwrap();
    assert!(session.view().error_log_visible);
    session.dispatch(Action::SelectGrade(Grade::Easy)).await.unwrap();
    assert!(!session.view().error_log_visible);
}

#[tokio::test]
async fn stars_follow_clicks() {
    let mut session = launch(deck(), "a");
    session.wait_until_ready().await;
    session.dispatch(Action::Reveal).await.unwrap();

    assert_eq!(session.view().stars[2], StarFill::Half);
    session.dispatch(Action::ClickStar(3)).await.unwrap();
    assert_eq!(session.view().difficulty.value(), 6);
    assert_eq!(session.view().stars[2], StarFill::Full);
    assert!(session.dispatch(Action::ClickStar(9)).await.is_err());
}

#[tokio::test]
async fn dispatch_reports_submit_and_exit() {
    let mut session = launch(deck(), "a,b");
    session.wait_until_ready().await;
    session.dispatch(Action::SetAnswer("hash map".to_string())).await.unwrap();
    session.dispatch(Action::Reveal).await.unwrap();
    assert_eq!(session.view().answer, "hash map");

    assert_eq!(
        session.dispatch(Action::Submit).await.unwrap(),
        Dispatched::Submitted(SubmitOutcome::NotReady)
    );
    session.dispatch(Action::SelectGrade(Grade::Good)).await.unwrap();
    assert_eq!(
        session.dispatch(Action::Submit).await.unwrap(),
        Dispatched::Submitted(SubmitOutcome::Advanced { position: 1 })
    );

    match session.dispatch(Action::Exit).await.unwrap() {
        Dispatched::Exited(destination) => assert_eq!(destination.as_str(), "/"),
        other => panic!("expected exit, got {other:?}"),
    }
    assert_eq!(session.view().phase, Phase::Exited);
    assert_eq!(key_action(&session.view(), Key::Escape), None);
}
