use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use quiz_core::model::{
    Difficulty, Direction, PendingResult, QuestionDraft, QuestionFilter, QuizResult, SessionId,
    SessionOutcome, SessionStatus, TimeRemaining, UserId,
};
use quiz_core::time::{fixed_clock, fixed_now};
use services::{AppServices, QuizEngine, QuizError, StartRequest};
use storage::repository::{
    InMemoryRepository, QuestionRepository, ResultRepository, Storage, StorageError,
};

async fn single_question_engine() -> (QuizEngine, InMemoryRepository) {
    let repo = InMemoryRepository::new();
    let question = QuestionDraft::new(
        "Mathematics",
        "Algebra",
        Difficulty::Easy,
        "What is 2 + 2?",
        ["4", "3", "5", "22"],
        "4",
    )
    .validate()
    .unwrap();
    repo.insert_question(question).await.unwrap();
    let engine = QuizEngine::new(fixed_clock(), Arc::new(repo.clone()), Arc::new(repo.clone()));
    (engine, repo)
}

#[tokio::test]
async fn correct_single_answer_scores_full_marks() {
    let (engine, repo) = single_question_engine().await;
    let mut session = engine
        .start(StartRequest::new(QuestionFilter::any(), 1))
        .await
        .unwrap();
    let qid = session.current_question().id();
    assert!(engine.record_answer(&mut session, qid, "4").unwrap());

    let result = engine.submit(&mut session).await.unwrap();
    assert_eq!(result.score(), 1);
    assert_eq!(result.total(), 1);
    assert_eq!(result.percentage(), 100.0);
    assert_eq!(result.outcome(), SessionOutcome::Submitted);
    assert_eq!(session.status(), SessionStatus::Submitted);
    assert_eq!(
        repo.get_result_for_session(session.id()).await.unwrap(),
        Some(result)
    );
}

#[tokio::test]
async fn wrong_single_answer_scores_zero() {
    let (engine, _repo) = single_question_engine().await;
    let mut session = engine
        .start(StartRequest::new(QuestionFilter::any(), 1))
        .await
        .unwrap();
    let qid = session.current_question().id();
    engine.record_answer(&mut session, qid, "3").unwrap();

    let result = engine.submit(&mut session).await.unwrap();
    assert_eq!(result.score(), 0);
    assert_eq!(result.percentage(), 0.0);
}

#[tokio::test]
async fn unknown_subject_has_no_questions() {
    let services = AppServices::in_memory(fixed_clock()).await.unwrap();
    let err = services
        .engine()
        .start(StartRequest::new(
            QuestionFilter::any().with_subject("Geography"),
            5,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, QuizError::NoQuestionsAvailable));
}

#[tokio::test]
async fn navigation_clamps_and_closed_session_rejects_changes() {
    let services = AppServices::in_memory(fixed_clock()).await.unwrap();
    let engine = services.engine();
    let mut session = engine
        .start(StartRequest::new(QuestionFilter::any(), 3))
        .await
        .unwrap();

    assert_eq!(engine.advance(&mut session, Direction::Previous).unwrap(), 0);
    assert_eq!(engine.advance(&mut session, Direction::Next).unwrap(), 1);
    assert_eq!(engine.advance(&mut session, Direction::Next).unwrap(), 2);
    assert_eq!(engine.advance(&mut session, Direction::Next).unwrap(), 2);

    let view = engine.snapshot(&session);
    assert!(view.is_last());
    assert_eq!(view.progress.total, 3);

    let qid = session.current_question().id();
    let err = engine
        .record_answer(&mut session, qid, "not a listed choice")
        .unwrap_err();
    assert!(matches!(err, QuizError::InvalidChoice { .. }));

    engine.submit(&mut session).await.unwrap();
    let err = engine
        .advance(&mut session, Direction::Previous)
        .unwrap_err();
    assert!(matches!(err, QuizError::SessionClosed { .. }));
    let err = engine.clear_answers(&mut session).unwrap_err();
    assert!(matches!(err, QuizError::SessionClosed { .. }));
}

#[tokio::test]
async fn second_submit_fails_and_stores_nothing_new() {
    let services = AppServices::in_memory(fixed_clock()).await.unwrap();
    let engine = services.engine();
    let mut session = engine
        .start(StartRequest::new(QuestionFilter::any(), 4).with_user(UserId::new("mei")))
        .await
        .unwrap();

    let first = engine.submit(&mut session).await.unwrap();
    assert_eq!(first.score(), 0);
    assert_eq!(first.total(), 4);

    let err = engine.submit(&mut session).await.unwrap_err();
    assert!(matches!(
        err,
        QuizError::SessionClosed {
            status: SessionStatus::Submitted
        }
    ));

    let board = services.leaderboard();
    assert_eq!(board.top(10).await.unwrap().len(), 1);
    let mei = UserId::new("mei").unwrap();
    assert_eq!(board.history(&mei, 10).await.unwrap(), vec![first]);
}

#[tokio::test]
async fn exhausted_budget_expires_the_session() {
    let storage = Storage::in_memory();
    storage::seed::seed_if_empty(
        storage.questions.as_ref(),
        storage::seed::default_catalog(),
    )
    .await
    .unwrap();
    let services = AppServices::from_storage(&storage, fixed_clock());
    let engine = services.engine();

    let mut session = engine
        .start(
            StartRequest::new(QuestionFilter::any().with_subject("Anime"), 2)
                .with_time_budget(Duration::minutes(5)),
        )
        .await
        .unwrap();
    let first = session.current_question().clone();
    engine
        .record_answer(&mut session, first.id(), first.answer())
        .unwrap();

    let mut clock = engine.clock();
    clock.advance(Duration::minutes(6));
    let late = (*engine).clone().with_clock(clock);
    assert_eq!(
        late.time_remaining(&session),
        TimeRemaining::Limited(Duration::zero())
    );

    let result = late
        .enforce_deadline(&mut session)
        .await
        .unwrap()
        .expect("deadline should force a submit");
    assert_eq!(result.outcome(), SessionOutcome::Expired);
    assert_eq!(session.status(), SessionStatus::Expired);
    assert_eq!(result.score(), 1);
    assert_eq!(result.percentage(), 50.0);
    assert_eq!(result.elapsed(), Duration::minutes(6));

    assert!(late.enforce_deadline(&mut session).await.unwrap().is_none());
    assert_eq!(
        services
            .leaderboard()
            .result_for_session(session.id())
            .await
            .unwrap(),
        Some(result)
    );
}

/// Result store that fails a configured number of appends before delegating.
struct FlakyResults {
    inner: InMemoryRepository,
    failures_left: AtomicUsize,
    attempts: AtomicUsize,
}

impl FlakyResults {
    fn new(inner: InMemoryRepository, failures: usize) -> Self {
        Self {
            inner,
            failures_left: AtomicUsize::new(failures),
            attempts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ResultRepository for FlakyResults {
    async fn append_result(&self, result: &PendingResult) -> Result<QuizResult, StorageError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures_left.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_left.store(remaining - 1, Ordering::SeqCst);
            return Err(StorageError::Connection("database is locked".into()));
        }
        self.inner.append_result(result).await
    }

    async fn get_result_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Option<QuizResult>, StorageError> {
        self.inner.get_result_for_session(session_id).await
    }

    async fn top_results(&self, limit: u32) -> Result<Vec<QuizResult>, StorageError> {
        self.inner.top_results(limit).await
    }

    async fn list_results_for_user(
        &self,
        user: &UserId,
        limit: u32,
    ) -> Result<Vec<QuizResult>, StorageError> {
        self.inner.list_results_for_user(user, limit).await
    }
}

#[tokio::test]
async fn failed_persistence_keeps_session_open_for_retry() {
    let (_engine, repo) = single_question_engine().await;
    let results = Arc::new(FlakyResults::new(repo.clone(), 1));
    let engine = QuizEngine::new(fixed_clock(), Arc::new(repo.clone()), results.clone());

    let mut session = engine
        .start(StartRequest::new(QuestionFilter::any(), 1))
        .await
        .unwrap();
    let qid = session.current_question().id();
    engine.record_answer(&mut session, qid, "4").unwrap();

    let err = engine.submit(&mut session).await.unwrap_err();
    assert!(matches!(err, QuizError::Persistence(_)));
    assert_eq!(session.status(), SessionStatus::InProgress);
    assert_eq!(session.answer_for(qid), Some("4"));
    assert!(repo.get_result_for_session(session.id()).await.unwrap().is_none());

    let result = engine.submit(&mut session).await.unwrap();
    assert_eq!(result.percentage(), 100.0);
    assert_eq!(session.status(), SessionStatus::Submitted);
    assert_eq!(results.attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn retry_after_unacknowledged_write_returns_stored_row() {
    let (engine, repo) = single_question_engine().await;
    let mut session = engine
        .start(StartRequest::new(QuestionFilter::any(), 1))
        .await
        .unwrap();

    // The store accepted the row but the caller never saw the acknowledgement.
    let pending = session.grade(fixed_now(), false).unwrap();
    let stored = repo.append_result(&pending).await.unwrap();

    let retried = engine.submit(&mut session).await.unwrap();
    assert_eq!(retried, stored);
    assert_eq!(repo.top_results(10).await.unwrap().len(), 1);
}
