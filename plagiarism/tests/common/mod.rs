#![allow(dead_code)]

use async_trait::async_trait;
use db::models::plagiarism_submission::Model;
use db::test_utils::setup_test_db;
use plagiarism::client::{ApiRequest, Envelope, Method, ReportingApi, ReportingClient};
use plagiarism::content::{
    ContentRegistry, ContentSource, HostPlatform, ItemLookup, ModuleSettings, ModuleState,
    StoredFile,
};
use plagiarism::error::{ClientError, PlagiarismError};
use plagiarism::generation::ReportGenerationMode;
use plagiarism::lifecycle::{NewSubmission, SubmissionLifecycleManager, SubmittedContent};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use util::config::{PlagiarismConfig, RetrySettings};

pub const NOW: i64 = 1_700_000_000;
pub const MODULE: i64 = 10;
pub const INSTANCE: i64 = 100;
pub const USER: i64 = 7;

// ─── Scripted remote service ────────────────────────────────────────

#[derive(Clone)]
pub enum Reply {
    Status(u16, Value),
    Down(String),
}

/// Answers calls from per-route queues; the last reply of a queue repeats.
#[derive(Default)]
pub struct ScriptedClient {
    routes: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<ApiRequest>>,
}

impl ScriptedClient {
    pub fn on(&self, method: Method, endpoint: &str, reply: Reply) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .entry(key(method, endpoint))
            .or_default()
            .push_back(reply);
        self
    }

    pub fn reply(&self, method: Method, endpoint: &str, status: u16, body: Value) -> &Self {
        self.on(method, endpoint, Reply::Status(status, body))
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: Method, endpoint: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == method && c.endpoint == endpoint)
            .count()
    }
}

fn key(method: Method, endpoint: &str) -> String {
    format!("{method:?} {endpoint}")
}

#[async_trait]
impl ReportingClient for ScriptedClient {
    async fn send(&self, request: ApiRequest) -> Result<Envelope, ClientError> {
        self.calls.lock().unwrap().push(request.clone());
        let reply = {
            let mut routes = self.routes.lock().unwrap();
            let queue = routes.get_mut(&key(request.method, &request.endpoint));
            match queue {
                Some(q) if q.len() > 1 => q.pop_front(),
                Some(q) => q.front().cloned(),
                None => None,
            }
        };
        match reply {
            Some(Reply::Status(status, body)) => Ok(Envelope::new(status, body)),
            Some(Reply::Down(reason)) => Err(ClientError::Transport(reason)),
            None => Ok(Envelope::new(404, serde_json::json!({"code": "NOT_FOUND"}))),
        }
    }
}

// ─── Host fakes ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeHost {
    pub modules: Mutex<HashMap<i64, ModuleState>>,
    pub files: Mutex<HashMap<String, StoredFile>>,
}

impl FakeHost {
    pub fn with_module(mode: ReportGenerationMode) -> Self {
        let host = FakeHost::default();
        host.set_module(MODULE, active(mode));
        host
    }

    pub fn set_module(&self, module_ref: i64, state: ModuleState) {
        self.modules.lock().unwrap().insert(module_ref, state);
    }

    pub fn add_file(&self, identifier: &str, filename: &str, bytes: &[u8]) {
        self.files.lock().unwrap().insert(
            identifier.to_string(),
            StoredFile {
                filename: filename.to_string(),
                bytes: bytes.to_vec(),
            },
        );
    }

    pub fn remove_file(&self, identifier: &str) {
        self.files.lock().unwrap().remove(identifier);
    }
}

pub fn active(mode: ReportGenerationMode) -> ModuleState {
    ModuleState::Active(ModuleSettings {
        report_gen_mode: mode,
        module_instance_ref: INSTANCE,
    })
}

#[async_trait]
impl HostPlatform for FakeHost {
    async fn module_state(&self, module_ref: i64) -> Result<ModuleState, PlagiarismError> {
        Ok(self
            .modules
            .lock()
            .unwrap()
            .get(&module_ref)
            .cloned()
            .unwrap_or(ModuleState::Gone))
    }

    async fn file(&self, content_identifier: &str) -> Result<Option<StoredFile>, PlagiarismError> {
        Ok(self.files.lock().unwrap().get(content_identifier).cloned())
    }
}

#[derive(Default)]
pub struct FakeSource {
    pub texts: Mutex<HashMap<i64, String>>,
    pub answers: Mutex<HashMap<i64, Vec<String>>>,
    pub drafts: Mutex<HashSet<i64>>,
    pub due_date: Mutex<i64>,
    /// (owner, user, text) -> item
    pub items: Mutex<HashMap<(i64, i64, String), i64>>,
}

impl FakeSource {
    pub fn set_due_date(&self, due: i64) {
        *self.due_date.lock().unwrap() = due;
    }
}

#[async_trait]
impl ContentSource for FakeSource {
    async fn online_text(&self, item_ref: i64) -> Result<Option<String>, PlagiarismError> {
        Ok(self.texts.lock().unwrap().get(&item_ref).cloned())
    }

    async fn resolve_item_ref(&self, lookup: &ItemLookup) -> Result<Option<i64>, PlagiarismError> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .get(&(lookup.owner_module_ref, lookup.user_ref, lookup.text.clone()))
            .copied())
    }

    async fn due_date(&self, _module_instance_ref: i64) -> Result<i64, PlagiarismError> {
        Ok(*self.due_date.lock().unwrap())
    }

    async fn is_draft(&self, item_ref: i64) -> Result<bool, PlagiarismError> {
        Ok(self.drafts.lock().unwrap().contains(&item_ref))
    }

    async fn answers(&self, item_ref: i64) -> Result<Vec<String>, PlagiarismError> {
        Ok(self
            .answers
            .lock()
            .unwrap()
            .get(&item_ref)
            .cloned()
            .unwrap_or_default())
    }
}

// ─── Wiring ─────────────────────────────────────────────────────────

pub struct Harness {
    pub db: DatabaseConnection,
    pub client: Arc<ScriptedClient>,
    pub host: Arc<FakeHost>,
    pub source: Arc<FakeSource>,
    pub lifecycle: Arc<SubmissionLifecycleManager>,
    pub config: Arc<PlagiarismConfig>,
}

pub fn test_config() -> PlagiarismConfig {
    PlagiarismConfig {
        api_url: "https://similarity.test/api/v1".into(),
        api_key: "key".into(),
        webhook_url: "https://lms.test/api/plagiarism/webhook".into(),
        webhook_secret: Some("shared-secret".into()),
        remote_logging: false,
        retry: RetrySettings {
            send_max_attempts: 3,
            send_retry_seconds: 100,
            report_max_attempts: 4,
            report_retry_seconds: 50,
            report_first_retry_seconds: 10,
        },
        ..PlagiarismConfig::default()
    }
}

pub async fn harness(mode: ReportGenerationMode) -> Harness {
    harness_with(mode, test_config()).await
}

pub async fn harness_with(mode: ReportGenerationMode, config: PlagiarismConfig) -> Harness {
    let db = setup_test_db().await;
    let client = Arc::new(ScriptedClient::default());
    let host = Arc::new(FakeHost::with_module(mode));
    let source = Arc::new(FakeSource::default());
    let config = Arc::new(config);

    let registry = ContentRegistry::new()
        .register("assignment", source.clone() as Arc<dyn ContentSource>)
        .register("quiz", source.clone() as Arc<dyn ContentSource>);
    let lifecycle = Arc::new(SubmissionLifecycleManager::new(
        db.clone(),
        ReportingApi::new(client.clone()),
        host.clone(),
        registry,
        config.clone(),
    ));

    Harness {
        db,
        client,
        host,
        source,
        lifecycle,
        config,
    }
}

impl Harness {
    pub async fn queue_file(&self, identifier: &str) -> Model {
        self.host.add_file(identifier, "essay.docx", b"It was a dark and stormy night.");
        self.lifecycle
            .queue_submission(NewSubmission {
                owner_module_ref: MODULE,
                user_ref: USER,
                group_ref: None,
                submitter_ref: USER,
                content_category: "assignment".into(),
                content: SubmittedContent::File {
                    content_identifier: identifier.into(),
                    filename: "essay.docx".into(),
                },
            })
            .await
            .unwrap()
    }

    pub async fn reload(&self, id: i64) -> Model {
        db::models::PlagiarismSubmission::find_by_id(id)
            .one(&self.db)
            .await
            .unwrap()
            .unwrap()
    }

    /// Scripts a clean create + upload for `external_id`.
    pub fn script_send(&self, external_id: &str) {
        self.client.reply(
            Method::Post,
            "/submissions",
            201,
            serde_json::json!({"id": external_id, "status": "CREATED"}),
        );
        self.client.reply(
            Method::Put,
            &format!("/submissions/{external_id}/original"),
            202,
            serde_json::json!({"message": "Successfully uploaded file"}),
        );
    }
}
