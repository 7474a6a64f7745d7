mod fixture;

use fixture::{wait_for, FakeClassifier, FakeLoader, FakeRenderer};
use image_lens_lib::error::AppError;
use image_lens_lib::models::image_types::ImageRef;
use image_lens_lib::models::session_types::{SessionEvent, UserIntent};
use image_lens_lib::session::runtime::SessionRuntime;
use image_lens_lib::session::{IdentifyOutcome, Phase, Session};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};

fn history_of(session: &Session) -> Vec<String> {
    session.history().iter().map(|e| e.image.to_string()).collect()
}

#[tokio::test]
async fn load_select_identify_shows_formatted_results() {
    let classifier = Arc::new(FakeClassifier::tabby());
    let mut session = Session::default();

    session.load(&FakeLoader::ok(classifier)).await.unwrap();
    session.select_from_text("http://x/cat.jpg");
    assert_eq!(history_of(&session), vec!["http://x/cat.jpg"]);

    let outcome = session.identify(&FakeRenderer::ok()).await.unwrap();

    assert_eq!(outcome, IdentifyOutcome::Applied);
    let view = session.view();
    assert_eq!(view.results.len(), 1);
    assert_eq!(view.results[0].label, "tabby");
    assert_eq!(view.results[0].confidence_percent, "87.00%");
}

#[tokio::test]
async fn two_selections_before_identify_leave_results_empty() {
    let classifier = Arc::new(FakeClassifier::tabby());
    let mut session = Session::default();
    session.load(&FakeLoader::ok(classifier)).await.unwrap();

    session.select_from_text("a");
    session.select_from_text("b");

    assert!(session.results().is_empty());
    assert_eq!(history_of(&session), vec!["b", "a"]);
}

#[tokio::test]
async fn throwing_classifier_keeps_session_usable() {
    let mut session = Session::default();
    session
        .load(&FakeLoader::ok(Arc::new(FakeClassifier::failing("cross-origin image"))))
        .await
        .unwrap();
    session.select_from_text("http://x/cat.jpg");

    let outcome = session.identify(&FakeRenderer::ok()).await.unwrap();

    assert!(matches!(outcome, IdentifyOutcome::Failed(AppError::Classification(_))));
    assert!(session.results().is_empty());
    assert_eq!(session.phase(), Phase::Unclassified);

    session.select_from_text("http://x/dog.jpg");
    assert_eq!(session.phase(), Phase::Unclassified);
    assert!(session.can_identify());
}

#[tokio::test]
async fn reselect_most_recent_prepends_copy() {
    let mut session = Session::default();
    session.select_from_text("a");
    session.select_from_text("b");

    let image = session.reselect(0).unwrap();

    assert_eq!(image, ImageRef::url("b"));
    assert_eq!(session.current(), Some(&ImageRef::url("b")));
    assert_eq!(history_of(&session), vec!["b", "b", "a"]);
}

#[tokio::test]
async fn same_reference_twice_gives_two_entries() {
    let mut session = Session::default();
    session.select_from_text("http://x/cat.jpg");
    session.select_from_text("http://x/cat.jpg");

    assert_eq!(session.history().len(), 2);
    assert_eq!(session.current(), Some(&ImageRef::url("http://x/cat.jpg")));
}

#[tokio::test]
async fn history_counts_every_present_selection() {
    let mut session = Session::default();
    session.select_from_text("a");
    session.select_from_files(&[]);
    session.select_from_files(&[PathBuf::from("/pics/b.png")]);
    session.select_from_text("");
    session.reselect(1).unwrap();

    assert_eq!(history_of(&session), vec!["a", "blob:0/b.png", "a"]);
    let seqs: Vec<u64> = session.history().iter().map(|e| e.seq).collect();
    assert_eq!(seqs, vec![2, 1, 0]);
}

#[tokio::test]
async fn results_only_follow_a_successful_identify() {
    let classifier = Arc::new(FakeClassifier::tabby());
    let mut session = Session::default();
    session.load(&FakeLoader::ok(classifier)).await.unwrap();

    for (i, image) in ["a", "b", "c"].iter().enumerate() {
        session.select_from_text(image);
        assert!(session.results().is_empty());
        if i % 2 == 0 {
            session.identify(&FakeRenderer::ok()).await.unwrap();
            assert!(!session.results().is_empty());
        }
    }
    session.select_from_text("d");
    assert!(session.results().is_empty());
}

#[tokio::test]
async fn runtime_discards_result_for_superseded_image() {
    let gate = Arc::new(Semaphore::new(0));
    let classifier = Arc::new(FakeClassifier::gated(gate.clone()));
    let runtime = SessionRuntime::new(
        Session::default(),
        Arc::new(FakeLoader::ok(classifier.clone())),
        Arc::new(FakeRenderer::ok()),
    );
    let mut events = runtime.subscribe();
    let (tx, rx) = mpsc::channel(8);
    let handle = tokio::spawn(runtime.run(rx));

    wait_for(&mut events, |e| *e == SessionEvent::ModelReady).await;
    tx.send(UserIntent::TextChanged("a".into())).await.unwrap();
    tx.send(UserIntent::IdentifyClicked).await.unwrap();
    wait_for(&mut events, |e| {
        matches!(e, SessionEvent::ClassificationStarted { image } if image == "a")
    })
    .await;

    tx.send(UserIntent::TextChanged("b".into())).await.unwrap();
    wait_for(&mut events, |e| {
        matches!(e, SessionEvent::CurrentImageChanged { image: Some(image) } if image == "b")
    })
    .await;

    gate.add_permits(1);
    let discarded = wait_for(&mut events, |e| {
        matches!(e, SessionEvent::StaleResultDiscarded { .. })
    })
    .await;
    tx.send(UserIntent::Shutdown).await.unwrap();

    assert_eq!(
        discarded,
        SessionEvent::StaleResultDiscarded {
            image: "a".to_string()
        }
    );
    let session = handle.await.unwrap();
    assert!(session.results().is_empty());
    assert_eq!(session.current(), Some(&ImageRef::url("b")));
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn runtime_reload_retries_failed_load() {
    let runtime = SessionRuntime::new(
        Session::default(),
        Arc::new(FakeLoader::failing("network unreachable")),
        Arc::new(FakeRenderer::ok()),
    );
    let mut events = runtime.subscribe();
    let mut view = runtime.view();
    let (tx, rx) = mpsc::channel(8);
    let handle = tokio::spawn(runtime.run(rx));

    wait_for(&mut events, |e| matches!(e, SessionEvent::ModelLoadFailed { .. })).await;
    view.wait_for(|v| !v.is_loading && v.error.is_some())
        .await
        .unwrap();
    assert!(!view.borrow().model_ready);

    tx.send(UserIntent::ReloadModel).await.unwrap();
    wait_for(&mut events, |e| *e == SessionEvent::ModelLoading).await;
    wait_for(&mut events, |e| matches!(e, SessionEvent::ModelLoadFailed { .. })).await;
    drop(tx);

    let session = handle.await.unwrap();
    assert!(!session.is_model_ready());
    assert!(!session.is_loading());
}

#[tokio::test]
async fn runtime_rejects_bad_history_index() {
    let classifier = Arc::new(FakeClassifier::tabby());
    let runtime = SessionRuntime::new(
        Session::default(),
        Arc::new(FakeLoader::ok(classifier)),
        Arc::new(FakeRenderer::ok()),
    );
    let mut events = runtime.subscribe();
    let (tx, rx) = mpsc::channel(8);
    let handle = tokio::spawn(runtime.run(rx));

    tx.send(UserIntent::HistoryItemClicked(0)).await.unwrap();
    let rejected = wait_for(&mut events, |e| matches!(e, SessionEvent::IntentRejected { .. })).await;
    drop(tx);

    assert_eq!(
        rejected,
        SessionEvent::IntentRejected {
            reason: AppError::HistoryIndexOutOfRange { index: 0, len: 0 }.to_string()
        }
    );
    let session = handle.await.unwrap();
    assert!(session.history().is_empty());
}
