mod common;

use chrono::Utc;
use uuid::Uuid;

use examforge::database::queries;
use examforge::progress::events::ActivityEvent;

use common::test_app;

#[tokio::test]
async fn replayed_event_awards_nothing() {
    let app = test_app().await;
    let user_id = Uuid::new_v4();
    let material_id = Uuid::new_v4();
    let event = ActivityEvent::MaterialUploaded {
        material_id,
        user_id,
    };

    assert!(app.ledger.record(event).await.unwrap());
    assert!(!app.ledger.record(event).await.unwrap());
    assert!(!app.ledger.record(event).await.unwrap());

    let profile = app.ledger.profile(user_id).await.unwrap().unwrap();
    assert_eq!(profile.total_points, 10);
    assert_eq!(profile.study_materials_uploaded_count, 1);

    let events = queries::activity::count_events(&app.pool, user_id, "material_uploaded")
        .await
        .unwrap();
    assert_eq!(events, 1);
}

#[tokio::test]
async fn distinct_sources_each_award() {
    let app = test_app().await;
    let user_id = Uuid::new_v4();

    for _ in 0..3 {
        let awarded = app
            .ledger
            .record(ActivityEvent::MaterialUploaded {
                material_id: Uuid::new_v4(),
                user_id,
            })
            .await
            .unwrap();
        assert!(awarded);
    }

    let profile = app.ledger.profile(user_id).await.unwrap().unwrap();
    assert_eq!(profile.total_points, 30);
    assert_eq!(profile.study_materials_uploaded_count, 3);
}

#[tokio::test]
async fn exam_completions_recompute_count_and_average() {
    let app = test_app().await;
    let user_id = Uuid::new_v4();
    let exam = queries::exams::create_exam(&app.pool, "Quiz", None, 30)
        .await
        .unwrap();

    for score in [80.0, 60.0, 100.0] {
        let attempt = queries::attempts::insert_attempt(&app.pool, user_id, exam.id)
            .await
            .unwrap();
        queries::attempts::complete_attempt(&app.pool, attempt.id, score, Utc::now())
            .await
            .unwrap();
        app.ledger
            .record(ActivityEvent::ExamCompleted {
                attempt_id: attempt.id,
                user_id,
                score,
            })
            .await
            .unwrap();
    }

    let profile = app.ledger.profile(user_id).await.unwrap().unwrap();
    assert_eq!(profile.mock_exams_completed, 3);
    assert_eq!(profile.average_mock_exam_score, Some(80.0));
    assert_eq!(profile.total_points, 75);
}

#[tokio::test]
async fn average_is_rounded_to_two_decimals() {
    let app = test_app().await;
    let user_id = Uuid::new_v4();
    let exam = queries::exams::create_exam(&app.pool, "Quiz", None, 30)
        .await
        .unwrap();

    for score in [100.0, 100.0, 50.0] {
        let attempt = queries::attempts::insert_attempt(&app.pool, user_id, exam.id)
            .await
            .unwrap();
        queries::attempts::complete_attempt(&app.pool, attempt.id, score, Utc::now())
            .await
            .unwrap();
        app.ledger
            .record(ActivityEvent::ExamCompleted {
                attempt_id: attempt.id,
                user_id,
                score,
            })
            .await
            .unwrap();
    }

    let profile = app.ledger.profile(user_id).await.unwrap().unwrap();
    assert_eq!(profile.average_mock_exam_score, Some(83.33));
}

#[tokio::test]
async fn upload_and_exam_points_accumulate_independently() {
    let app = test_app().await;
    let user_id = Uuid::new_v4();
    let exam = queries::exams::create_exam(&app.pool, "Quiz", None, 30)
        .await
        .unwrap();

    app.ledger
        .record(ActivityEvent::MaterialUploaded {
            material_id: Uuid::new_v4(),
            user_id,
        })
        .await
        .unwrap();

    let attempt = queries::attempts::insert_attempt(&app.pool, user_id, exam.id)
        .await
        .unwrap();
    queries::attempts::complete_attempt(&app.pool, attempt.id, 90.0, Utc::now())
        .await
        .unwrap();
    app.ledger
        .record(ActivityEvent::ExamCompleted {
            attempt_id: attempt.id,
            user_id,
            score: 90.0,
        })
        .await
        .unwrap();

    let profile = app.ledger.profile(user_id).await.unwrap().unwrap();
    assert_eq!(profile.total_points, 35);
    assert_eq!(profile.study_materials_uploaded_count, 1);
    assert_eq!(profile.mock_exams_completed, 1);
}
