mod common;

use common::*;
use db::models::plagiarism_submission::SubmissionStatus;
use db::models::{PlagiarismSubmission, PlagiarismWebhook};
use plagiarism::client::Method;
use plagiarism::content::{ModuleSettings, ModuleState};
use plagiarism::error::{ClientError, PlagiarismError};
use plagiarism::generation::ReportGenerationMode;
use plagiarism::lifecycle::{NewSubmission, SubmittedContent};
use plagiarism::scheduler::{BatchScheduler, PassSummary, WebhookHealth};
use sea_orm::EntityTrait;
use serde_json::json;
use util::config::PlagiarismConfig;

fn scheduler(h: &Harness) -> BatchScheduler {
    BatchScheduler::new(h.lifecycle.clone())
}

fn summary(selected: usize, advanced: usize, skipped: usize, failed: usize) -> PassSummary {
    PassSummary {
        selected,
        advanced,
        skipped,
        failed,
    }
}

#[tokio::test]
async fn submission_travels_from_queue_to_score() {
    let h = harness(ReportGenerationMode::Immediate).await;
    let s = scheduler(&h);
    let queued = h.queue_file("file-1").await;
    h.script_send("remote-1");
    h.client
        .reply(Method::Get, "/submissions/remote-1", 200, json!({"status": "COMPLETE"}))
        .reply(Method::Put, "/submissions/remote-1/similarity", 202, json!({}))
        .reply(
            Method::Get,
            "/submissions/remote-1/similarity",
            200,
            json!({"status": "COMPLETE", "overall_match_percentage": 12.5}),
        );

    assert_eq!(s.run_send_phase(NOW).await.unwrap(), summary(1, 1, 0, 0));
    let m = h.reload(queued.id).await;
    assert_eq!(m.status, SubmissionStatus::Uploaded);
    assert_eq!(m.submitted_at, Some(NOW));

    // Still inside the upload grace period.
    assert_eq!(s.run_report_phase(NOW + 60).await.unwrap(), summary(1, 0, 1, 0));
    assert_eq!(h.client.count(Method::Get, "/submissions/remote-1"), 0);

    assert_eq!(s.run_report_phase(NOW + 120).await.unwrap(), summary(1, 1, 0, 0));
    let m = h.reload(queued.id).await;
    assert_eq!(m.status, SubmissionStatus::Requested);
    assert_eq!(m.requested_at, Some(NOW + 120));

    // Still inside the request grace period.
    assert_eq!(s.run_report_phase(NOW + 200).await.unwrap(), summary(1, 0, 1, 0));

    assert_eq!(s.run_report_phase(NOW + 420).await.unwrap(), summary(1, 1, 0, 0));
    let m = h.reload(queued.id).await;
    assert_eq!(m.status, SubmissionStatus::Complete);
    assert_eq!(m.overall_score, Some(12.5));
    assert!(!m.to_generate);

    assert_eq!(s.run_report_phase(NOW + 10_000).await.unwrap(), summary(0, 0, 0, 0));
    assert_eq!(h.client.count(Method::Post, "/submissions"), 1);
}

#[tokio::test]
async fn passes_are_bounded_by_the_batch_size() {
    let config = PlagiarismConfig {
        batch_size: 2,
        ..test_config()
    };
    let h = harness_with(ReportGenerationMode::Immediate, config).await;
    let s = scheduler(&h);
    for identifier in ["file-1", "file-2", "file-3"] {
        h.queue_file(identifier).await;
    }
    h.client.reply(Method::Post, "/submissions", 451, json!({"code": "EULA_NOT_ACCEPTED"}));

    assert_eq!(s.run_send_phase(NOW).await.unwrap(), summary(2, 2, 0, 0));
    assert_eq!(h.client.count(Method::Post, "/submissions"), 2);

    // Licence-blocked rows wait for the submitter.
    assert_eq!(s.run_send_phase(NOW).await.unwrap(), summary(1, 1, 0, 0));
    assert_eq!(s.run_send_phase(NOW + 1_000).await.unwrap(), summary(0, 0, 0, 0));
}

async fn queue_draft(h: &Harness, item_ref: i64, text: &str) -> i64 {
    h.source.texts.lock().unwrap().insert(item_ref, text.into());
    h.source.drafts.lock().unwrap().insert(item_ref);
    h.lifecycle
        .queue_submission(NewSubmission {
            owner_module_ref: MODULE,
            user_ref: USER,
            group_ref: None,
            submitter_ref: USER,
            content_category: "assignment".into(),
            content: SubmittedContent::Text {
                text: text.into(),
                item_ref: Some(item_ref),
            },
        })
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn drafts_step_aside_for_sendable_submissions() {
    let config = PlagiarismConfig {
        batch_size: 2,
        ..test_config()
    };
    let h = harness_with(ReportGenerationMode::Immediate, config).await;
    let s = scheduler(&h);
    let first = queue_draft(&h, 1, "first draft").await;
    let second = queue_draft(&h, 2, "second draft").await;
    let file = h.queue_file("file-1").await;
    h.script_send("remote-1");
    h.script_send("remote-2");

    assert_eq!(s.run_send_phase(NOW).await.unwrap(), summary(2, 0, 2, 0));
    assert_eq!(h.client.count(Method::Post, "/submissions"), 0);
    for id in [first, second] {
        let m = h.reload(id).await;
        assert_eq!(m.status, SubmissionStatus::Queued);
        assert_eq!(m.send_attempts, 0);
        assert_eq!(m.next_retry_not_before, NOW + 100);
        assert!(m.external_id.is_none());
    }

    // The drafts wait out their interval, so the file gets the batch.
    assert_eq!(s.run_send_phase(NOW + 1).await.unwrap(), summary(1, 1, 0, 0));
    assert_eq!(h.reload(file.id).await.status, SubmissionStatus::Uploaded);

    // Drafts never spend the send budget.
    for at in [NOW + 100, NOW + 200, NOW + 300, NOW + 400] {
        assert_eq!(s.run_send_phase(at).await.unwrap(), summary(2, 0, 2, 0));
    }
    assert_eq!(h.reload(first).await.send_attempts, 0);
    assert_eq!(h.client.count(Method::Post, "/submissions"), 1);

    h.source.drafts.lock().unwrap().remove(&1);
    assert_eq!(s.run_send_phase(NOW + 500).await.unwrap(), summary(2, 1, 1, 0));
    let sent = h.reload(first).await;
    assert_eq!(sent.status, SubmissionStatus::Uploaded);
    assert_eq!(sent.external_id.as_deref(), Some("remote-2"));
    assert_eq!(h.reload(second).await.status, SubmissionStatus::Queued);
}

#[tokio::test]
async fn empty_submissions_are_never_retried() {
    let h = harness(ReportGenerationMode::Immediate).await;
    let s = scheduler(&h);
    let queued = h.queue_file("file-d").await;
    h.script_send("remote-d");
    h.host.remove_file("file-d");

    assert_eq!(s.run_send_phase(NOW).await.unwrap(), summary(1, 1, 0, 0));
    let m = h.reload(queued.id).await;
    assert_eq!(m.status, SubmissionStatus::EmptyDeleted);
    assert_eq!(m.send_attempts, 3);

    assert_eq!(s.run_send_phase(NOW + 1_000_000).await.unwrap().selected, 0);
    assert_eq!(s.run_report_phase(NOW + 1_000_000).await.unwrap().selected, 0);
}

#[tokio::test]
async fn unreachable_service_is_retried_after_the_backoff() {
    let h = harness(ReportGenerationMode::Immediate).await;
    let s = scheduler(&h);
    let queued = h.queue_file("file-1").await;
    h.client
        .on(Method::Post, "/submissions", Reply::Down("timed out".into()))
        .reply(Method::Post, "/submissions", 201, json!({"id": "remote-1"}));
    h.client.reply(Method::Put, "/submissions/remote-1/original", 202, json!({}));

    assert_eq!(s.run_send_phase(NOW).await.unwrap(), summary(1, 0, 0, 1));
    let m = h.reload(queued.id).await;
    assert_eq!(m.status, SubmissionStatus::Queued);
    assert_eq!(m.send_attempts, 1);

    assert_eq!(s.run_send_phase(NOW + 50).await.unwrap().selected, 0);
    assert_eq!(s.run_send_phase(NOW + 100).await.unwrap(), summary(1, 1, 0, 0));
    assert_eq!(h.reload(queued.id).await.status, SubmissionStatus::Uploaded);
}

#[tokio::test]
async fn deleted_module_aborts_queued_work() {
    let h = harness(ReportGenerationMode::Immediate).await;
    let s = scheduler(&h);
    let queued = h.queue_file("file-1").await;
    h.host.set_module(MODULE, ModuleState::Gone);

    assert_eq!(s.run_send_phase(NOW).await.unwrap(), summary(1, 1, 0, 0));
    let m = h.reload(queued.id).await;
    assert_eq!(m.status, SubmissionStatus::Error);
    assert!(h.client.calls().is_empty());
}

#[tokio::test]
async fn modules_pending_deletion_are_left_alone() {
    let h = harness(ReportGenerationMode::Immediate).await;
    let s = scheduler(&h);
    let queued = h.queue_file("file-1").await;
    h.script_send("remote-1");
    s.run_send_phase(NOW).await.unwrap();

    h.host.set_module(
        MODULE,
        ModuleState::PendingDeletion(ModuleSettings {
            report_gen_mode: ReportGenerationMode::Immediate,
            module_instance_ref: INSTANCE,
        }),
    );
    assert_eq!(s.run_report_phase(NOW + 1_000).await.unwrap(), summary(1, 0, 1, 0));
    assert_eq!(h.reload(queued.id).await.status, SubmissionStatus::Uploaded);
    assert_eq!(h.client.count(Method::Get, "/submissions/remote-1"), 0);
}

#[tokio::test]
async fn reports_are_regenerated_at_the_due_date() {
    let h = harness(ReportGenerationMode::ImmediateAndDueDate).await;
    let s = scheduler(&h);
    let due = NOW + 3_600;
    h.source.set_due_date(due);
    let queued = h.queue_file("file-1").await;
    h.script_send("remote-1");
    h.client
        .reply(Method::Get, "/submissions/remote-1", 200, json!({"status": "COMPLETE"}))
        .reply(Method::Put, "/submissions/remote-1/similarity", 202, json!({}))
        .reply(
            Method::Get,
            "/submissions/remote-1/similarity",
            200,
            json!({"status": "COMPLETE", "overall_match_percentage": 3.0}),
        );

    s.run_send_phase(NOW).await.unwrap();
    s.run_report_phase(NOW + 120).await.unwrap();
    s.run_report_phase(NOW + 420).await.unwrap();

    let m = h.reload(queued.id).await;
    assert_eq!(m.status, SubmissionStatus::Complete);
    assert!(m.to_generate);
    assert_eq!(m.generation_time, due);

    assert_eq!(s.run_report_phase(NOW + 1_000).await.unwrap().selected, 0);

    assert_eq!(s.run_report_phase(due).await.unwrap(), summary(1, 1, 0, 0));
    let m = h.reload(queued.id).await;
    assert_eq!(m.status, SubmissionStatus::Requested);
    assert_eq!(m.requested_at, Some(due));
    assert_eq!(h.client.count(Method::Put, "/submissions/remote-1/similarity"), 2);

    s.run_report_phase(due + 300).await.unwrap();
    let m = h.reload(queued.id).await;
    assert_eq!(m.status, SubmissionStatus::Complete);
    assert!(!m.to_generate);
}

#[tokio::test]
async fn regeneration_is_skipped_when_the_last_report_is_recent_enough() {
    let h = harness(ReportGenerationMode::ImmediateAndDueDate).await;
    let s = scheduler(&h);
    let due = NOW + 3_600;
    h.source.set_due_date(due);
    let queued = h.queue_file("file-1").await;
    h.script_send("remote-1");
    h.client
        .reply(Method::Get, "/submissions/remote-1", 200, json!({"status": "COMPLETE"}))
        .reply(Method::Put, "/submissions/remote-1/similarity", 202, json!({}))
        .reply(
            Method::Get,
            "/submissions/remote-1/similarity",
            200,
            json!({"status": "COMPLETE", "overall_match_percentage": 3.0}),
        );
    s.run_send_phase(NOW).await.unwrap();
    s.run_report_phase(NOW + 120).await.unwrap();
    s.run_report_phase(NOW + 420).await.unwrap();

    // The due date moved before the last request.
    h.source.set_due_date(NOW + 100);
    assert_eq!(s.run_report_phase(due).await.unwrap(), summary(1, 1, 0, 0));

    let m = h.reload(queued.id).await;
    assert_eq!(m.status, SubmissionStatus::Complete);
    assert!(!m.to_generate);
    assert_eq!(h.client.count(Method::Put, "/submissions/remote-1/similarity"), 1);
}

#[tokio::test]
async fn report_phase_failures_are_counted_and_backed_off() {
    let h = harness(ReportGenerationMode::Immediate).await;
    let s = scheduler(&h);
    let queued = h.queue_file("file-1").await;
    h.script_send("remote-1");
    h.client
        .reply(Method::Get, "/submissions/remote-1", 200, json!({"status": "COMPLETE"}))
        .reply(Method::Put, "/submissions/remote-1/similarity", 202, json!({}))
        .on(
            Method::Get,
            "/submissions/remote-1/similarity",
            Reply::Down("connection reset".into()),
        );
    s.run_send_phase(NOW).await.unwrap();
    s.run_report_phase(NOW + 120).await.unwrap();

    assert_eq!(s.run_report_phase(NOW + 420).await.unwrap(), summary(1, 0, 0, 1));
    let m = h.reload(queued.id).await;
    assert_eq!(m.status, SubmissionStatus::Requested);
    assert_eq!(m.report_attempts, 1);
    assert_eq!(m.next_retry_not_before, NOW + 430);

    assert_eq!(s.run_report_phase(NOW + 425).await.unwrap().selected, 0);
}

#[tokio::test]
async fn webhook_is_registered_once_and_then_left_alone() {
    let h = harness(ReportGenerationMode::Immediate).await;
    let s = scheduler(&h);
    h.client.reply(Method::Post, "/webhooks", 201, json!({"id": "wh-1"}));

    let health = s.ensure_webhook().await.unwrap();
    assert_eq!(
        health,
        WebhookHealth::Registered {
            external_id: "wh-1".into()
        }
    );
    let stored = PlagiarismWebhook::current(&h.db).await.unwrap().unwrap();
    assert_eq!(stored.secret, "shared-secret");
    assert_eq!(stored.url, h.config.webhook_url);

    h.client.reply(
        Method::Get,
        "/webhooks",
        200,
        json!([{
            "id": "wh-1",
            "url": h.config.webhook_url,
            "event_types": ["SUBMISSION_COMPLETE"],
        }]),
    );
    let health = s.ensure_webhook().await.unwrap();
    assert_eq!(
        health,
        WebhookHealth::Healthy {
            external_id: "wh-1".into()
        }
    );
    assert_eq!(h.client.count(Method::Post, "/webhooks"), 1);
}

#[tokio::test]
async fn misdirected_webhook_is_replaced() {
    let h = harness(ReportGenerationMode::Immediate).await;
    let s = scheduler(&h);
    PlagiarismWebhook::replace(&h.db, "wh-old", "https://old.test/hook", "old-secret")
        .await
        .unwrap();
    h.client
        .reply(
            Method::Get,
            "/webhooks",
            200,
            json!([{"id": "wh-old", "url": "https://old.test/hook"}]),
        )
        .reply(Method::Delete, "/webhooks/wh-old", 204, json!(null))
        .reply(Method::Post, "/webhooks", 201, json!({"id": "wh-new"}));

    let health = s.ensure_webhook().await.unwrap();
    assert_eq!(
        health,
        WebhookHealth::Registered {
            external_id: "wh-new".into()
        }
    );
    assert_eq!(h.client.count(Method::Delete, "/webhooks/wh-old"), 1);
    assert_eq!(PlagiarismWebhook::find().all(&h.db).await.unwrap().len(), 1);
    let stored = PlagiarismWebhook::current(&h.db).await.unwrap().unwrap();
    assert_eq!(stored.external_id, "wh-new");
    assert_eq!(stored.url, h.config.webhook_url);
}

#[tokio::test]
async fn forgotten_webhook_is_registered_again_with_a_fresh_secret() {
    let config = PlagiarismConfig {
        webhook_secret: None,
        ..test_config()
    };
    let h = harness_with(ReportGenerationMode::Immediate, config).await;
    let s = scheduler(&h);
    PlagiarismWebhook::replace(&h.db, "wh-lost", &h.config.webhook_url, "old-secret")
        .await
        .unwrap();
    h.client
        .reply(Method::Get, "/webhooks", 200, json!([]))
        .reply(Method::Post, "/webhooks", 201, json!({"id": "wh-2"}));

    s.ensure_webhook().await.unwrap();

    let stored = PlagiarismWebhook::current(&h.db).await.unwrap().unwrap();
    assert_eq!(stored.external_id, "wh-2");
    assert_eq!(stored.secret.len(), 64);
    assert_ne!(stored.secret, "old-secret");
    assert_eq!(h.client.count(Method::Delete, "/webhooks/wh-lost"), 0);
}

#[tokio::test]
async fn failed_webhook_listing_keeps_the_stored_registration() {
    let h = harness(ReportGenerationMode::Immediate).await;
    let s = scheduler(&h);
    PlagiarismWebhook::replace(&h.db, "wh-1", &h.config.webhook_url, "shared-secret")
        .await
        .unwrap();
    h.client
        .reply(Method::Get, "/webhooks", 503, json!({"code": "SERVICE_UNAVAILABLE"}))
        .reply(Method::Post, "/webhooks", 201, json!({"id": "wh-leaked"}));

    for _ in 0..3 {
        let err = s.ensure_webhook().await.unwrap_err();
        assert!(matches!(
            err,
            PlagiarismError::Client(ClientError::Rejected { status: 503, .. })
        ));
    }

    assert_eq!(h.client.count(Method::Get, "/webhooks"), 3);
    assert_eq!(h.client.count(Method::Post, "/webhooks"), 0);
    assert_eq!(h.client.count(Method::Delete, "/webhooks/wh-1"), 0);
    let stored = PlagiarismWebhook::current(&h.db).await.unwrap().unwrap();
    assert_eq!(stored.external_id, "wh-1");
    assert_eq!(PlagiarismWebhook::find().all(&h.db).await.unwrap().len(), 1);
}

#[tokio::test]
async fn rejected_webhook_registration_is_an_error() {
    let h = harness(ReportGenerationMode::Immediate).await;
    let s = scheduler(&h);
    h.client.reply(Method::Post, "/webhooks", 400, json!({"code": "INVALID_URL"}));

    assert!(s.ensure_webhook().await.is_err());
    assert!(PlagiarismWebhook::current(&h.db).await.unwrap().is_none());
}

#[tokio::test]
async fn tick_runs_every_job_and_caches_metadata() {
    let h = harness(ReportGenerationMode::Immediate).await;
    let s = scheduler(&h);
    let queued = h.queue_file("file-1").await;
    h.script_send("remote-1");
    h.client
        .reply(Method::Post, "/webhooks", 201, json!({"id": "wh-1"}))
        .reply(
            Method::Get,
            "/webhooks",
            200,
            json!([{"id": "wh-1", "url": h.config.webhook_url}]),
        )
        .reply(
            Method::Get,
            "/eula/latest",
            200,
            json!({"version": "v1beta", "url": "https://similarity.test/eula/v1beta"}),
        )
        .reply(Method::Get, "/features-enabled", 200, json!({"similarity": {"enabled": true}}));

    assert!(s.service_metadata().await.is_none());
    s.tick(NOW).await;

    assert_eq!(h.reload(queued.id).await.status, SubmissionStatus::Uploaded);
    assert!(PlagiarismWebhook::current(&h.db).await.unwrap().is_some());
    let metadata = s.service_metadata().await.unwrap();
    assert_eq!(metadata.eula_version.as_deref(), Some("v1beta"));
    assert_eq!(metadata.features["similarity"]["enabled"], json!(true));
    assert_eq!(metadata.fetched_at, NOW);

    s.tick(NOW + 60).await;
    assert_eq!(h.client.count(Method::Get, "/eula/latest"), 1);
    assert_eq!(h.client.count(Method::Post, "/webhooks"), 1);

    s.tick(NOW + 24 * 60 * 60).await;
    assert_eq!(h.client.count(Method::Get, "/eula/latest"), 2);
}

#[tokio::test]
async fn tick_survives_an_unreachable_service() {
    let h = harness(ReportGenerationMode::Immediate).await;
    let s = scheduler(&h);
    let queued = h.queue_file("file-1").await;
    for (method, endpoint) in [
        (Method::Post, "/webhooks"),
        (Method::Get, "/eula/latest"),
        (Method::Post, "/submissions"),
    ] {
        h.client.on(method, endpoint, Reply::Down("no route to host".into()));
    }

    s.tick(NOW).await;

    assert!(s.service_metadata().await.is_none());
    let m = h.reload(queued.id).await;
    assert_eq!(m.status, SubmissionStatus::Queued);
    assert_eq!(m.send_attempts, 1);
    assert_eq!(
        PlagiarismSubmission::find().all(&h.db).await.unwrap().len(),
        1
    );
}
