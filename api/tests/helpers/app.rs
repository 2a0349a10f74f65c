use super::ScriptedClient;
use api::host::{FsContentSource, FsHost};
use api::routes::routes;
use api::state::AppState;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Utc;
use db::models::PlagiarismSubmission;
use db::models::plagiarism_submission::{ContentType, Model, NewSubmission, SubmissionStatus};
use db::test_utils::setup_test_db;
use plagiarism::SubmissionLifecycleManager;
use plagiarism::client::ReportingApi;
use plagiarism::content::ContentRegistry;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use util::config::PlagiarismConfig;
use util::paths::{module_dir, submission_file_dir};
use util::test_helpers::setup_test_storage_root;

pub const MODULE: i64 = 10;
pub const USER: i64 = 7;
pub const SECRET: &str = "route-secret";

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub client: Arc<ScriptedClient>,
    pub root: PathBuf,
    _storage: TempDir,
}

/// Router over an in-memory database, a scripted remote service and a
/// temporary storage root holding module `MODULE`.
pub async fn make_test_app() -> TestApp {
    let db = setup_test_db().await;
    let (storage, root) = setup_test_storage_root();
    std::fs::create_dir_all(module_dir(&root, MODULE)).unwrap();

    let client = Arc::new(ScriptedClient::default());
    let config = Arc::new(PlagiarismConfig {
        webhook_secret: Some(SECRET.into()),
        remote_logging: false,
        ..PlagiarismConfig::default()
    });
    let registry = ContentRegistry::new()
        .register("assignment", Arc::new(FsContentSource::new(&root, "assignment")));
    let lifecycle = Arc::new(SubmissionLifecycleManager::new(
        db,
        ReportingApi::new(client.clone()),
        Arc::new(FsHost::new(&root)),
        registry,
        config,
    ));

    let state = AppState::new(lifecycle);
    let app = Router::new().nest("/api", routes(state.clone()));

    TestApp {
        app,
        state,
        client,
        root,
        _storage: storage,
    }
}

impl TestApp {
    /// Sends one request and returns the status and decoded JSON body.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub fn add_file(&self, identifier: &str, filename: &str, bytes: &[u8]) {
        let dir = submission_file_dir(&self.root, identifier);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(filename), bytes).unwrap();
    }

    /// Inserts a file submission and forces it into `status`.
    ///
    /// Uploaded and processing rows are scheduled for immediate generation,
    /// as an upload in a module with default settings would leave them.
    pub async fn seed(&self, status: SubmissionStatus, external_id: Option<&str>) -> Model {
        let db = self.state.db();
        let queued = PlagiarismSubmission::create_queued(
            db,
            NewSubmission {
                owner_module_ref: MODULE,
                user_ref: USER,
                group_ref: None,
                submitter_ref: USER,
                content_identifier: format!("seed-{}", external_id.unwrap_or("none")),
                content_item_ref: None,
                content_type: ContentType::File,
                content_category: "assignment".into(),
                quiz_answer_key: None,
                filename: Some("essay.docx".into()),
            },
        )
        .await
        .unwrap();

        let now = Utc::now().timestamp();
        let awaiting_report =
            matches!(status, SubmissionStatus::Uploaded | SubmissionStatus::Processing);
        let next = Model {
            status,
            external_id: external_id.map(str::to_string),
            submitted_at: external_id.map(|_| now),
            to_generate: awaiting_report,
            generation_time: if awaiting_report { now } else { 0 },
            ..queued.clone()
        };
        assert!(
            PlagiarismSubmission::compare_and_swap(db, SubmissionStatus::Queued, &next)
                .await
                .unwrap()
        );
        next
    }
}
