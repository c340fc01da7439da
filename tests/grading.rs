mod common;

use uuid::Uuid;

use examforge::ai::TaskType;
use examforge::database::models::QuestionType;
use examforge::database::queries;
use examforge::error::CoreError;
use examforge::exam::grading::SubmittedAnswer;

use common::{test_app, TestApp};

struct ExamFixture {
    exam_id: Uuid,
    mcq_id: Uuid,
    essay_id: Uuid,
}

/// One 5-point multiple-choice question and one 5-point essay question.
async fn seed_exam(app: &TestApp) -> ExamFixture {
    let exam = queries::exams::create_exam(&app.pool, "Midterm", None, 60)
        .await
        .unwrap();
    let mcq = queries::exams::add_question(
        &app.pool,
        exam.id,
        0,
        "Which organelle produces ATP?",
        QuestionType::MultipleChoice,
        Some(r#"{"a":"nucleus","b":"mitochondria"}"#),
        Some("b"),
        5.0,
        None,
    )
    .await
    .unwrap();
    let essay = queries::exams::add_question(
        &app.pool,
        exam.id,
        1,
        "Explain cellular respiration.",
        QuestionType::Essay,
        None,
        None,
        5.0,
        None,
    )
    .await
    .unwrap();

    ExamFixture {
        exam_id: exam.id,
        mcq_id: mcq.id,
        essay_id: essay.id,
    }
}

fn choice(question_id: Uuid, key: &str) -> SubmittedAnswer {
    SubmittedAnswer {
        question_id,
        content: None,
        selected_choice_key: Some(key.to_string()),
    }
}

fn essay(question_id: Uuid, text: &str) -> SubmittedAnswer {
    SubmittedAnswer {
        question_id,
        content: Some(text.to_string()),
        selected_choice_key: None,
    }
}

#[tokio::test]
async fn start_attempt_requires_existing_exam() {
    let app = test_app().await;
    let result = app.grading.start_attempt(Uuid::new_v4(), Uuid::new_v4()).await;
    assert!(matches!(result, Err(CoreError::NotFound(_))));
}

#[tokio::test]
async fn second_active_attempt_is_rejected() {
    let app = test_app().await;
    let fixture = seed_exam(&app).await;
    let user_id = Uuid::new_v4();

    app.grading
        .start_attempt(user_id, fixture.exam_id)
        .await
        .unwrap();
    let second = app.grading.start_attempt(user_id, fixture.exam_id).await;
    assert!(matches!(second, Err(CoreError::Conflict(_))));
}

#[tokio::test]
async fn mixed_exam_is_graded_and_scored() {
    let app = test_app().await;
    let fixture = seed_exam(&app).await;
    let user_id = Uuid::new_v4();

    app.llm
        .queue_reply(TaskType::GradeAnswer, "Solid explanation.\nAwarded Points: 4")
        .await;

    let attempt = app
        .grading
        .start_attempt(user_id, fixture.exam_id)
        .await
        .unwrap();
    let result = app
        .grading
        .submit_answers(
            attempt.id,
            vec![
                choice(fixture.mcq_id, "b"),
                essay(fixture.essay_id, "Respiration breaks down glucose."),
            ],
        )
        .await
        .unwrap();

    assert_eq!(result.points_earned, 9.0);
    assert_eq!(result.points_possible, 10.0);
    assert_eq!(result.percent_score, 90.0);
    assert_eq!(result.attempt.score, Some(9.0));

    let answers = queries::attempts::list_answers(&app.pool, attempt.id)
        .await
        .unwrap();
    assert_eq!(answers.len(), 2);
    let essay_row = answers
        .iter()
        .find(|a| a.question_id == fixture.essay_id)
        .unwrap();
    assert_eq!(essay_row.points_awarded, 4.0);
    assert_eq!(essay_row.feedback, "Solid explanation.");
}

#[tokio::test]
async fn wrong_choice_and_missing_answer_score_zero() {
    let app = test_app().await;
    let fixture = seed_exam(&app).await;

    let attempt = app
        .grading
        .start_attempt(Uuid::new_v4(), fixture.exam_id)
        .await
        .unwrap();
    // Only the MCQ is answered, and wrongly; the essay is skipped.
    let result = app
        .grading
        .submit_answers(attempt.id, vec![choice(fixture.mcq_id, "a")])
        .await
        .unwrap();

    assert_eq!(result.points_earned, 0.0);
    assert_eq!(result.percent_score, 0.0);
    assert_eq!(result.answers.len(), 2);
    for answer in &result.answers {
        assert_eq!(answer.points_awarded, 0.0);
        assert!(!answer.feedback.is_empty());
    }
}

#[tokio::test]
async fn grading_failure_scores_zero_but_completes_the_attempt() {
    let app = test_app().await;
    let fixture = seed_exam(&app).await;
    app.llm.fail_task(TaskType::GradeAnswer).await;

    let attempt = app
        .grading
        .start_attempt(Uuid::new_v4(), fixture.exam_id)
        .await
        .unwrap();
    let result = app
        .grading
        .submit_answers(
            attempt.id,
            vec![
                choice(fixture.mcq_id, "b"),
                essay(fixture.essay_id, "An honest try."),
            ],
        )
        .await
        .unwrap();

    // MCQ grading is local and unaffected; the essay scores zero with an
    // explanation rather than failing the submission.
    assert_eq!(result.points_earned, 5.0);
    let essay_row = result
        .answers
        .iter()
        .find(|a| a.question_id == fixture.essay_id)
        .unwrap();
    assert_eq!(essay_row.points_awarded, 0.0);
    assert!(essay_row.feedback.contains("manual review"));
}

#[tokio::test]
async fn model_cannot_award_more_than_question_points() {
    let app = test_app().await;
    let fixture = seed_exam(&app).await;
    app.llm
        .queue_reply(TaskType::GradeAnswer, "Stellar!\nAwarded Points: 50")
        .await;

    let attempt = app
        .grading
        .start_attempt(Uuid::new_v4(), fixture.exam_id)
        .await
        .unwrap();
    let result = app
        .grading
        .submit_answers(attempt.id, vec![essay(fixture.essay_id, "Answer.")])
        .await
        .unwrap();

    let essay_row = result
        .answers
        .iter()
        .find(|a| a.question_id == fixture.essay_id)
        .unwrap();
    assert_eq!(essay_row.points_awarded, 5.0);
}

#[tokio::test]
async fn resubmission_conflicts() {
    let app = test_app().await;
    let fixture = seed_exam(&app).await;

    let attempt = app
        .grading
        .start_attempt(Uuid::new_v4(), fixture.exam_id)
        .await
        .unwrap();
    app.grading
        .submit_answers(attempt.id, vec![choice(fixture.mcq_id, "b")])
        .await
        .unwrap();

    let again = app
        .grading
        .submit_answers(attempt.id, vec![choice(fixture.mcq_id, "b")])
        .await;
    assert!(matches!(again, Err(CoreError::Conflict(_))));
}

#[tokio::test]
async fn answers_for_foreign_questions_are_rejected_before_grading() {
    let app = test_app().await;
    let fixture = seed_exam(&app).await;

    let attempt = app
        .grading
        .start_attempt(Uuid::new_v4(), fixture.exam_id)
        .await
        .unwrap();
    let result = app
        .grading
        .submit_answers(attempt.id, vec![choice(Uuid::new_v4(), "b")])
        .await;
    assert!(matches!(result, Err(CoreError::Validation(_))));

    // The attempt is still open after the rejected submission.
    let attempt = queries::attempts::get_attempt(&app.pool, attempt.id)
        .await
        .unwrap()
        .unwrap();
    assert!(attempt.score.is_none());
}

#[tokio::test]
async fn completion_awards_exam_points() {
    let app = test_app().await;
    let fixture = seed_exam(&app).await;
    let user_id = Uuid::new_v4();

    let attempt = app
        .grading
        .start_attempt(user_id, fixture.exam_id)
        .await
        .unwrap();
    app.grading
        .submit_answers(attempt.id, vec![choice(fixture.mcq_id, "b")])
        .await
        .unwrap();

    let profile = app.ledger.profile(user_id).await.unwrap().unwrap();
    assert_eq!(profile.total_points, 25);
    assert_eq!(profile.mock_exams_completed, 1);
    // The averaged score is the raw points the attempt earned.
    assert_eq!(profile.average_mock_exam_score, Some(5.0));
}

#[tokio::test]
async fn stored_score_is_sum_of_awarded_points() {
    let app = test_app().await;
    let fixture = seed_exam(&app).await;

    app.llm
        .queue_reply(TaskType::GradeAnswer, "Partial credit.\nAwarded Points: 4")
        .await;

    let attempt = app
        .grading
        .start_attempt(Uuid::new_v4(), fixture.exam_id)
        .await
        .unwrap();
    // Wrong MCQ (0 of 5) plus a 4-of-5 essay: 4 points of 10 possible.
    let result = app
        .grading
        .submit_answers(
            attempt.id,
            vec![
                choice(fixture.mcq_id, "a"),
                essay(fixture.essay_id, "Mostly right."),
            ],
        )
        .await
        .unwrap();

    assert_eq!(result.points_earned, 4.0);
    assert_eq!(result.percent_score, 40.0);

    let stored = queries::attempts::get_attempt(&app.pool, attempt.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.score, Some(4.0));
}

#[tokio::test]
async fn duplicate_answers_for_one_question_are_rejected() {
    let app = test_app().await;
    let fixture = seed_exam(&app).await;

    let attempt = app
        .grading
        .start_attempt(Uuid::new_v4(), fixture.exam_id)
        .await
        .unwrap();
    let result = app
        .grading
        .submit_answers(
            attempt.id,
            vec![choice(fixture.mcq_id, "a"), choice(fixture.mcq_id, "b")],
        )
        .await;

    match result {
        Err(CoreError::Validation(message)) => {
            assert!(message.contains(&fixture.mcq_id.to_string()));
        }
        other => panic!("expected validation error, got {:?}", other.map(|r| r.points_earned)),
    }
}

#[tokio::test]
async fn racing_submissions_complete_exactly_once() {
    let app = test_app().await;
    let fixture = seed_exam(&app).await;

    let attempt = app
        .grading
        .start_attempt(Uuid::new_v4(), fixture.exam_id)
        .await
        .unwrap();

    let (first, second) = tokio::join!(
        app.grading
            .submit_answers(attempt.id, vec![choice(fixture.mcq_id, "b")]),
        app.grading
            .submit_answers(attempt.id, vec![choice(fixture.mcq_id, "b")]),
    );

    // Exactly one submission wins; the loser sees a conflict, never a
    // database constraint error.
    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    let loser = outcomes.iter().find(|r| r.is_err()).unwrap();
    assert!(matches!(loser, Err(CoreError::Conflict(_))));

    let answers = queries::attempts::list_answers(&app.pool, attempt.id)
        .await
        .unwrap();
    assert_eq!(answers.len(), 2);
}

#[tokio::test]
async fn racing_attempt_starts_yield_one_active_attempt() {
    let app = test_app().await;
    let fixture = seed_exam(&app).await;
    let user_id = Uuid::new_v4();

    let (first, second) = tokio::join!(
        app.grading.start_attempt(user_id, fixture.exam_id),
        app.grading.start_attempt(user_id, fixture.exam_id),
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    let loser = outcomes.iter().find(|r| r.is_err()).unwrap();
    assert!(matches!(loser, Err(CoreError::Conflict(_))));
}

#[tokio::test]
async fn active_attempt_uniqueness_is_enforced_by_the_schema() {
    let app = test_app().await;
    let fixture = seed_exam(&app).await;
    let user_id = Uuid::new_v4();

    // Bypass the engine's pre-check and insert directly: the partial
    // unique index still refuses a second active attempt.
    queries::attempts::insert_attempt(&app.pool, user_id, fixture.exam_id)
        .await
        .unwrap();
    let second = queries::attempts::insert_attempt(&app.pool, user_id, fixture.exam_id).await;
    match second {
        Err(sqlx::Error::Database(err)) => {
            assert!(matches!(err.kind(), sqlx::error::ErrorKind::UniqueViolation));
        }
        other => panic!("expected unique violation, got {:?}", other.map(|a| a.id)),
    }
}

#[tokio::test]
async fn completed_attempt_frees_the_uniqueness_slot() {
    let app = test_app().await;
    let fixture = seed_exam(&app).await;
    let user_id = Uuid::new_v4();

    let attempt = app
        .grading
        .start_attempt(user_id, fixture.exam_id)
        .await
        .unwrap();
    app.grading
        .submit_answers(attempt.id, vec![choice(fixture.mcq_id, "b")])
        .await
        .unwrap();

    // The partial index only covers active attempts.
    app.grading
        .start_attempt(user_id, fixture.exam_id)
        .await
        .unwrap();
}

#[tokio::test]
async fn dropping_the_active_index_permits_concurrent_attempts() {
    let app = test_app().await;
    let fixture = seed_exam(&app).await;
    let user_id = Uuid::new_v4();

    examforge::database::apply_attempt_policy(&app.pool, true)
        .await
        .unwrap();
    let config = examforge::config::Config {
        allow_concurrent_attempts: true,
        ..common::test_config()
    };
    let grading = examforge::exam::grading::GradingEngine::new(
        app.pool.clone(),
        app.llm.clone(),
        app.ledger.clone(),
        &config,
    );

    grading.start_attempt(user_id, fixture.exam_id).await.unwrap();
    grading.start_attempt(user_id, fixture.exam_id).await.unwrap();
}
