//! Application workflow against the SQLite store and a scripted employer API.

mod common;

use common::{
    complete_profile, create_user, memory_db, posting, shared_db, ScriptedSource, SubmitBehavior,
};
use job_portal_core::ports::DatabaseService;
use job_portal_core::{
    ApplicationError, ApplicationForm, ApplicationStatus, ApplicationWorkflow, Job, ProfileDraft,
    ProfileService, SubmissionOutcome, SyncEngine,
};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

struct Fixture {
    db: Arc<api_lib::adapters::DbAdapter>,
    source: Arc<ScriptedSource>,
    workflow: Arc<ApplicationWorkflow>,
    job: Job,
}

async fn fixture() -> Fixture {
    fixture_on(memory_db().await).await
}

async fn fixture_on(db: Arc<api_lib::adapters::DbAdapter>) -> Fixture {
    let source = ScriptedSource::serving(vec![posting(
        "1001",
        "Sous Chef",
        &["Cooking", "Food Safety"],
        &["Food Handler Certification"],
    )]);
    SyncEngine::new(
        db.clone(),
        source.clone(),
        chrono::Duration::seconds(900),
        Duration::from_secs(1),
    )
    .sync(true)
    .await
    .unwrap();
    let job = db.list_jobs().await.unwrap().remove(0);
    let workflow = Arc::new(ApplicationWorkflow::new(
        db.clone(),
        source.clone(),
        Duration::from_millis(100),
    ));
    Fixture {
        db,
        source,
        workflow,
        job,
    }
}

#[tokio::test]
async fn accepted_submission_records_the_remote_id() {
    let f = fixture().await;
    let user = create_user(&f.db, "ana").await;
    complete_profile(f.db.clone(), &user, &["Cooking"], &["Food Handler Certification"]).await;

    let submission = f
        .workflow
        .submit_application(
            user.user_id,
            f.job.id,
            ApplicationForm {
                resume_link: None,
                cover_letter: Some("  I love kitchens.  ".to_string()),
            },
        )
        .await
        .unwrap();

    assert_eq!(submission.outcome, SubmissionOutcome::Submitted);
    let stored = f.db.get_application(submission.application.id).await.unwrap();
    assert_eq!(stored.status, ApplicationStatus::Submitted);
    assert_eq!(stored.remote_application_id.as_deref(), Some("remote-1001-0"));
    assert_eq!(stored.resume_link, "https://example.com/resume.pdf");
    assert_eq!(stored.skills, vec!["Cooking"]);
    assert_eq!(stored.cover_letter.as_deref(), Some("I love kitchens."));
}

#[tokio::test]
async fn remote_timeout_still_saves_locally() {
    let f = fixture().await;
    f.source.set_submit(SubmitBehavior::Hang);
    let user = create_user(&f.db, "ana").await;
    complete_profile(f.db.clone(), &user, &["Cooking"], &["Food Handler Certification"]).await;

    let submission = f
        .workflow
        .submit_application(user.user_id, f.job.id, ApplicationForm::default())
        .await
        .unwrap();

    let SubmissionOutcome::SavedLocally { warning } = submission.outcome else {
        panic!("expected a partial success");
    };
    assert!(warning.starts_with("Application saved locally but API error"));

    let stored = f.db.get_application(submission.application.id).await.unwrap();
    assert_eq!(stored.status, ApplicationStatus::Submitted);
    assert_eq!(stored.remote_application_id, None);
}

#[tokio::test]
async fn remote_rejection_still_saves_locally() {
    let f = fixture().await;
    f.source.set_submit(SubmitBehavior::Reject);
    let user = create_user(&f.db, "ana").await;
    complete_profile(f.db.clone(), &user, &["Cooking"], &["Food Handler Certification"]).await;

    let submission = f
        .workflow
        .submit_application(user.user_id, f.job.id, ApplicationForm::default())
        .await
        .unwrap();

    assert!(matches!(
        submission.outcome,
        SubmissionOutcome::SavedLocally { .. }
    ));
    assert_eq!(
        f.db.list_applications_for_user(user.user_id).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn incomplete_profile_is_refused() {
    let f = fixture().await;
    let user = create_user(&f.db, "ana").await;
    complete_profile(f.db.clone(), &user, &["Cooking"], &[]).await;

    let err = f
        .workflow
        .submit_application(user.user_id, f.job.id, ApplicationForm::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ApplicationError::ProfileIncomplete));
    assert_eq!(f.source.submissions.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_job_is_reported() {
    let f = fixture().await;
    let user = create_user(&f.db, "ana").await;
    complete_profile(f.db.clone(), &user, &["Cooking"], &["Food Handler Certification"]).await;

    let missing = Uuid::new_v4();
    let err = f
        .workflow
        .submit_application(user.user_id, missing, ApplicationForm::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ApplicationError::JobNotFound(id) if id == missing));
}

#[tokio::test]
async fn concurrent_duplicate_submits_store_one_application() {
    let f = fixture_on(shared_db().await).await;
    let user = create_user(&f.db, "ana").await;
    complete_profile(f.db.clone(), &user, &["Cooking"], &["Food Handler Certification"]).await;

    let (user_id, job_id) = (user.user_id, f.job.id);
    let attempts = (0..4).map(|_| {
        let workflow = f.workflow.clone();
        tokio::spawn(async move {
            workflow
                .submit_application(user_id, job_id, ApplicationForm::default())
                .await
        })
    });
    let results = futures::future::join_all(attempts).await;

    let successes = results
        .iter()
        .filter(|r| matches!(r, Ok(Ok(_))))
        .count();
    let duplicates = results
        .iter()
        .filter(|r| matches!(r, Ok(Err(ApplicationError::DuplicateApplication))))
        .count();
    assert_eq!((successes, duplicates), (1, 3));
    assert_eq!(
        f.db.list_applications_for_user(user.user_id).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn withdraw_is_one_way_and_owner_only() {
    let f = fixture().await;
    let owner = create_user(&f.db, "ana").await;
    let stranger = create_user(&f.db, "ben").await;
    complete_profile(f.db.clone(), &owner, &["Cooking"], &["Food Handler Certification"]).await;

    let application = f
        .workflow
        .submit_application(owner.user_id, f.job.id, ApplicationForm::default())
        .await
        .unwrap()
        .application;

    let err = f
        .workflow
        .withdraw_application(stranger.user_id, application.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ApplicationError::NotOwner));

    let withdrawn = f
        .workflow
        .withdraw_application(owner.user_id, application.id)
        .await
        .unwrap();
    assert_eq!(withdrawn.status, ApplicationStatus::Withdrawn);

    let err = f
        .workflow
        .withdraw_application(owner.user_id, application.id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ApplicationError::InvalidState(ApplicationStatus::Withdrawn)
    ));
}

#[tokio::test]
async fn withdrawn_application_allows_reapplying() {
    let f = fixture().await;
    let user = create_user(&f.db, "ana").await;
    complete_profile(f.db.clone(), &user, &["Cooking"], &["Food Handler Certification"]).await;

    let first = f
        .workflow
        .submit_application(user.user_id, f.job.id, ApplicationForm::default())
        .await
        .unwrap()
        .application;
    f.workflow
        .withdraw_application(user.user_id, first.id)
        .await
        .unwrap();

    f.workflow
        .submit_application(user.user_id, f.job.id, ApplicationForm::default())
        .await
        .unwrap();

    let all = f.workflow.list_applications(user.user_id).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].status, ApplicationStatus::Submitted, "newest first");
    assert_eq!(all[1].status, ApplicationStatus::Withdrawn);
}

#[tokio::test]
async fn incomplete_profile_wins_over_an_active_application() {
    let f = fixture().await;
    let user = create_user(&f.db, "ana").await;
    complete_profile(f.db.clone(), &user, &["Cooking"], &["Food Handler Certification"]).await;
    f.workflow
        .submit_application(user.user_id, f.job.id, ApplicationForm::default())
        .await
        .unwrap();

    // Dropping every certification makes the profile incomplete again.
    complete_profile(f.db.clone(), &user, &["Cooking"], &[]).await;
    let err = f
        .workflow
        .submit_application(user.user_id, f.job.id, ApplicationForm::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ApplicationError::ProfileIncomplete));
}

#[tokio::test]
async fn profile_edits_leave_past_applications_alone() {
    let f = fixture().await;
    let user = create_user(&f.db, "ana").await;
    complete_profile(f.db.clone(), &user, &["Cooking"], &["Food Handler Certification"]).await;
    let application = f
        .workflow
        .submit_application(user.user_id, f.job.id, ApplicationForm::default())
        .await
        .unwrap()
        .application;

    ProfileService::new(f.db.clone())
        .upsert(
            user.user_id,
            ProfileDraft {
                headline: None,
                summary: None,
                experience: Some("Ten years running a pastry section".to_string()),
                resume_link: Some("https://example.com/new-resume.pdf".to_string()),
                skills: vec!["Baking".to_string(), "Plating".to_string()],
                certifications: vec!["ServSafe Manager".to_string()],
            },
        )
        .await
        .unwrap();

    let stored = f.db.get_application(application.id).await.unwrap();
    assert_eq!(stored.skills, vec!["Cooking"]);
    assert_eq!(stored.certifications, vec!["Food Handler Certification"]);
    assert_eq!(stored.resume_link, "https://example.com/resume.pdf");
}

#[tokio::test]
async fn lost_remote_id_still_reports_a_submission() {
    let f = fixture().await;
    let user = create_user(&f.db, "ana").await;
    complete_profile(f.db.clone(), &user, &["Cooking"], &["Food Handler Certification"]).await;
    sqlx::query(
        "CREATE TRIGGER refuse_remote_id BEFORE UPDATE OF remote_application_id ON applications \
         BEGIN SELECT RAISE(ABORT, 'store unavailable'); END",
    )
    .execute(f.db.pool())
    .await
    .unwrap();

    let submission = f
        .workflow
        .submit_application(user.user_id, f.job.id, ApplicationForm::default())
        .await
        .unwrap();

    assert_eq!(submission.outcome, SubmissionOutcome::Submitted);
    assert_eq!(
        submission.application.remote_application_id.as_deref(),
        Some("remote-1001-0")
    );
    let stored = f.db.get_application(submission.application.id).await.unwrap();
    assert_eq!(stored.status, ApplicationStatus::Submitted);
    assert_eq!(stored.remote_application_id, None);

    // A retry is a duplicate of the stored application, not a second one.
    let err = f
        .workflow
        .submit_application(user.user_id, f.job.id, ApplicationForm::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ApplicationError::DuplicateApplication));
}

#[tokio::test]
async fn corrupt_snapshot_column_is_an_error() {
    let f = fixture().await;
    let user = create_user(&f.db, "ana").await;
    complete_profile(f.db.clone(), &user, &["Cooking"], &["Food Handler Certification"]).await;
    let application = f
        .workflow
        .submit_application(user.user_id, f.job.id, ApplicationForm::default())
        .await
        .unwrap()
        .application;

    sqlx::query("UPDATE applications SET skills = 'Cooking' WHERE id = ?")
        .bind(application.id)
        .execute(f.db.pool())
        .await
        .unwrap();

    let err = f.db.get_application(application.id).await.unwrap_err();
    assert!(matches!(err, job_portal_core::PortError::Unexpected(msg) if msg.contains("skills")));
}
