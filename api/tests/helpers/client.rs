use async_trait::async_trait;
use plagiarism::client::{ApiRequest, Envelope, Method, ReportingClient};
use plagiarism::error::ClientError;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Mutex;

/// Fixed replies per route; anything unscripted answers 404.
#[derive(Default)]
pub struct ScriptedClient {
    routes: Mutex<HashMap<String, (u16, Value)>>,
    calls: Mutex<Vec<ApiRequest>>,
}

impl ScriptedClient {
    pub fn reply(&self, method: Method, endpoint: &str, status: u16, body: Value) {
        self.routes
            .lock()
            .unwrap()
            .insert(format!("{method:?} {endpoint}"), (status, body));
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

#[async_trait]
impl ReportingClient for ScriptedClient {
    async fn send(&self, request: ApiRequest) -> Result<Envelope, ClientError> {
        let key = format!("{:?} {}", request.method, request.endpoint);
        self.calls.lock().unwrap().push(request);
        let (status, body) = self
            .routes
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or((404, json!({"code": "NOT_FOUND"})));
        Ok(Envelope::new(status, body))
    }
}
