use crate::domain::models::Snapshot;
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

pub const DEFAULT_CREDENTIAL_HEADER: &str = "X-Master-Key";

/// A single remote JSON document that is always read and replaced whole.
#[async_trait]
pub trait RemoteDocumentStore: Send + Sync {
    async fn fetch(&self) -> Result<Snapshot, InfraError>;
    async fn replace(&self, snapshot: &Snapshot) -> Result<(), InfraError>;
}

#[derive(Debug, serde::Deserialize)]
struct ReadEnvelope {
    #[serde(default)]
    record: Option<Snapshot>,
}

#[derive(Debug, Clone)]
pub struct ReqwestDocumentStore {
    client: Client,
    endpoint: Url,
    credential_header: String,
    master_key: String,
}

impl ReqwestDocumentStore {
    pub fn new(
        endpoint: Url,
        credential_header: impl Into<String>,
        master_key: impl Into<String>,
    ) -> Result<Self, InfraError> {
        let credential_header = credential_header.into();
        let master_key = master_key.into();
        ensure_non_empty(&credential_header, "credential header")?;
        ensure_non_empty(&master_key, "master key")?;
        Ok(Self {
            client: Client::new(),
            endpoint,
            credential_header,
            master_key,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Joins `api_base` and `document_id` into the document URL.
    pub fn document_endpoint(api_base: &str, document_id: &str) -> Result<Url, InfraError> {
        ensure_non_empty(document_id, "document id")?;
        let mut url = Url::parse(api_base)
            .map_err(|error| InfraError::InvalidConfig(format!("invalid api base url: {error}")))?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                InfraError::InvalidConfig("api base URL cannot be a base".to_string())
            })?;
            segments.pop_if_empty();
            segments.push(document_id.trim());
        }
        Ok(url)
    }
}

fn ensure_non_empty(value: &str, field: &str) -> Result<(), InfraError> {
    if value.trim().is_empty() {
        return Err(InfraError::InvalidConfig(format!("{field} must not be empty")));
    }
    Ok(())
}

#[async_trait]
impl RemoteDocumentStore for ReqwestDocumentStore {
    async fn fetch(&self) -> Result<Snapshot, InfraError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .header(self.credential_header.as_str(), self.master_key.as_str())
            .send()
            .await
            .map_err(|error| InfraError::Network(format!("failed loading document: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Network(format!("failed reading document response: {error}")))?;

        if !status.is_success() {
            return Err(InfraError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: ReadEnvelope = serde_json::from_str(&body)
            .map_err(|error| InfraError::Payload(format!("invalid document payload: {error}")))?;
        Ok(envelope.record.unwrap_or_default())
    }

    async fn replace(&self, snapshot: &Snapshot) -> Result<(), InfraError> {
        let response = self
            .client
            .put(self.endpoint.clone())
            .header(self.credential_header.as_str(), self.master_key.as_str())
            .json(snapshot)
            .send()
            .await
            .map_err(|error| InfraError::Network(format!("failed writing document: {error}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InfraError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// Keeps the document as raw JSON so reads go through the same decoding as the wire.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    document: Mutex<Option<serde_json::Value>>,
    fail_reads: Mutex<bool>,
    fail_writes: Mutex<bool>,
    write_delay: Mutex<Option<Duration>>,
    fetch_calls: AtomicUsize,
    replace_calls: AtomicUsize,
}

impl InMemoryDocumentStore {
    pub fn with_document(document: serde_json::Value) -> Self {
        Self {
            document: Mutex::new(Some(document)),
            ..Self::default()
        }
    }

    pub fn document(&self) -> Option<serde_json::Value> {
        self.document.lock().ok().and_then(|guard| guard.clone())
    }

    pub fn set_fail_reads(&self, fail: bool) {
        if let Ok(mut guard) = self.fail_reads.lock() {
            *guard = fail;
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        if let Ok(mut guard) = self.fail_writes.lock() {
            *guard = fail;
        }
    }

    /// Holds every write for `delay` before it lands.
    pub fn set_write_delay(&self, delay: Duration) {
        if let Ok(mut guard) = self.write_delay.lock() {
            *guard = Some(delay);
        }
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn replace_calls(&self) -> usize {
        self.replace_calls.load(Ordering::SeqCst)
    }

    fn flag(flag: &Mutex<bool>) -> bool {
        flag.lock().map(|guard| *guard).unwrap_or(false)
    }
}

#[async_trait]
impl RemoteDocumentStore for InMemoryDocumentStore {
    async fn fetch(&self) -> Result<Snapshot, InfraError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if Self::flag(&self.fail_reads) {
            return Err(InfraError::Network("in-memory store read failure".to_string()));
        }
        let document = self
            .document
            .lock()
            .map_err(|error| InfraError::StateLock(format!("in-memory document lock poisoned: {error}")))?
            .clone();
        match document {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Snapshot::default()),
        }
    }

    async fn replace(&self, snapshot: &Snapshot) -> Result<(), InfraError> {
        self.replace_calls.fetch_add(1, Ordering::SeqCst);
        if Self::flag(&self.fail_writes) {
            return Err(InfraError::Network("in-memory store write failure".to_string()));
        }
        let value = serde_json::to_value(snapshot)?;
        let delay = self.write_delay.lock().ok().and_then(|guard| *guard);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut document = self
            .document
            .lock()
            .map_err(|error| InfraError::StateLock(format!("in-memory document lock poisoned: {error}")))?;
        *document = Some(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Idea, IdeaStatus, Task, TimerSettings};
    use axum::Router;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct FakeBin {
        record: Arc<Mutex<Option<serde_json::Value>>>,
        puts: Arc<AtomicUsize>,
    }

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get(DEFAULT_CREDENTIAL_HEADER)
            .and_then(|value| value.to_str().ok())
            == Some("secret-key")
    }

    async fn read_bin(
        State(bin): State<FakeBin>,
        headers: HeaderMap,
    ) -> Result<axum::Json<serde_json::Value>, StatusCode> {
        if !authorized(&headers) {
            return Err(StatusCode::UNAUTHORIZED);
        }
        let record = bin.record.lock().expect("record lock").clone();
        Ok(axum::Json(serde_json::json!({
            "record": record,
            "metadata": { "id": "bin-1", "private": true }
        })))
    }

    async fn write_bin(
        State(bin): State<FakeBin>,
        headers: HeaderMap,
        axum::Json(body): axum::Json<serde_json::Value>,
    ) -> StatusCode {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED;
        }
        bin.puts.fetch_add(1, Ordering::SeqCst);
        *bin.record.lock().expect("record lock") = Some(body);
        StatusCode::OK
    }

    async fn serve(bin: FakeBin) -> String {
        let router = Router::new()
            .route("/v3/b/:bin_id", get(read_bin).put(write_bin))
            .with_state(bin);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake bin server");
        let address = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        format!("http://{address}/v3/b/")
    }

    fn sample_snapshot() -> Snapshot {
        Snapshot {
            tasks: vec![Task {
                id: "tsk-1".to_string(),
                title: "Plan sprint".to_string(),
                date: chrono::NaiveDate::from_ymd_opt(2026, 2, 16).expect("date"),
                time: chrono::NaiveTime::from_hms_opt(9, 0, 0),
                completed: false,
                completed_date: None,
            }],
            ideas: vec![Idea {
                id: "idea-1".to_string(),
                title: "Weekly digest".to_string(),
                description: None,
                implementation: Some("cron + email".to_string()),
                status: IdeaStatus::New,
            }],
            timer_settings: TimerSettings {
                work_duration_minutes: 30,
                break_duration_minutes: 5,
                completed_sessions: 4,
            },
        }
    }

    #[test]
    fn document_endpoint_appends_document_id() {
        let url = ReqwestDocumentStore::document_endpoint("https://api.jsonbin.io/v3/b/", "abc123")
            .expect("endpoint");
        assert_eq!(url.as_str(), "https://api.jsonbin.io/v3/b/abc123");

        let without_slash =
            ReqwestDocumentStore::document_endpoint("https://api.jsonbin.io/v3/b", "abc123")
                .expect("endpoint");
        assert_eq!(without_slash.as_str(), "https://api.jsonbin.io/v3/b/abc123");
    }

    #[test]
    fn document_endpoint_rejects_empty_id() {
        let result = ReqwestDocumentStore::document_endpoint("https://api.jsonbin.io/v3/b/", "  ");
        assert!(matches!(result, Err(InfraError::InvalidConfig(_))));
    }

    #[test]
    fn new_rejects_empty_master_key() {
        let url = Url::parse("https://api.jsonbin.io/v3/b/abc").expect("url");
        let result = ReqwestDocumentStore::new(url, DEFAULT_CREDENTIAL_HEADER, " ");
        assert!(matches!(result, Err(InfraError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn reqwest_store_replaces_and_fetches_document() {
        let bin = FakeBin::default();
        let base = serve(bin.clone()).await;
        let endpoint = ReqwestDocumentStore::document_endpoint(&base, "bin-1").expect("endpoint");
        let store = ReqwestDocumentStore::new(endpoint, DEFAULT_CREDENTIAL_HEADER, "secret-key")
            .expect("store");

        let empty = store.fetch().await.expect("fetch empty bin");
        assert_eq!(empty, Snapshot::default());

        let snapshot = sample_snapshot();
        store.replace(&snapshot).await.expect("replace document");
        assert_eq!(bin.puts.load(Ordering::SeqCst), 1);

        let fetched = store.fetch().await.expect("fetch document");
        assert_eq!(fetched, snapshot);
    }

    #[tokio::test]
    async fn reqwest_store_surfaces_http_status() {
        let base = serve(FakeBin::default()).await;
        let endpoint = ReqwestDocumentStore::document_endpoint(&base, "bin-1").expect("endpoint");
        let store = ReqwestDocumentStore::new(endpoint, DEFAULT_CREDENTIAL_HEADER, "wrong-key")
            .expect("store");

        match store.fetch().await {
            Err(InfraError::HttpStatus { status, .. }) => assert_eq!(status, 401),
            other => panic!("expected http status error, got {other:?}"),
        }
        match store.replace(&Snapshot::default()).await {
            Err(InfraError::HttpStatus { status, .. }) => assert_eq!(status, 401),
            other => panic!("expected http status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn in_memory_store_tolerates_partial_documents() {
        let store = InMemoryDocumentStore::with_document(serde_json::json!({
            "tasks": [{"id": "a", "title": "A", "date": "2026-02-16"}]
        }));
        let snapshot = store.fetch().await.expect("fetch");
        assert_eq!(snapshot.tasks.len(), 1);
        assert!(snapshot.ideas.is_empty());
        assert_eq!(snapshot.timer_settings, TimerSettings::default());
    }

    #[tokio::test]
    async fn load_then_save_reproduces_equivalent_document() {
        let original = serde_json::json!({
            "tasks": [
                {"id": "a", "title": "A", "date": "2026-02-16", "time": "09:00", "completed": false, "completedDate": null},
                {"id": "b", "title": "B", "date": "2026-02-15", "time": null, "completed": true, "completedDate": "2026-02-16"},
                {"id": "c", "title": "C", "date": "2026-02-16", "time": "14:05:30", "completed": false, "completedDate": null}
            ],
            "ideas": [
                {"id": "i", "title": "I", "description": "text", "implementation": "", "status": "implemented"}
            ],
            "pomodoroSettings": {"workDuration": 25, "breakDuration": 5, "completedSessions": 9}
        });
        let store = InMemoryDocumentStore::with_document(original.clone());

        let loaded = store.fetch().await.expect("first load");
        store.replace(&loaded).await.expect("save");
        let reloaded = store.fetch().await.expect("second load");

        assert_eq!(reloaded, loaded);
        assert_eq!(reloaded.tasks[2].time, chrono::NaiveTime::from_hms_opt(14, 5, 30));
        assert_eq!(store.document(), Some(original));
    }
}
