use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};

use plexsync_api::app::{build_app, build_services, ServiceSettings};
use plexsync_auth::{AccessKey, SharedSecretValidator, ACCESS_KEY_HEADER};
use plexsync_infra::source::{
    DownloadReport, MediaSource, SourceConnector, SourceError, Track,
};

const API_KEY: &str = "test-key";

/// Resolves every link to one track, except `/track/missing` which finds nothing.
struct FakeSource;

#[async_trait]
impl MediaSource for FakeSource {
    async fn search(&self, url: &str) -> Result<Vec<Track>, SourceError> {
        if url.contains("/track/missing") {
            return Ok(vec![]);
        }
        Ok(vec![Track::new("Song", vec!["Band".into()], url)])
    }

    async fn download(&self, tracks: &[Track], _dir: &Path) -> Result<DownloadReport, SourceError> {
        Ok(DownloadReport {
            succeeded: tracks.to_vec(),
            failed: vec![],
        })
    }
}

struct FakeConnector;

#[async_trait]
impl SourceConnector for FakeConnector {
    async fn connect(&self) -> Result<Arc<dyn MediaSource>, SourceError> {
        Ok(Arc::new(FakeSource))
    }
}

/// Fails every connection, as when spotdl is not installed.
struct BrokenConnector;

#[async_trait]
impl SourceConnector for BrokenConnector {
    async fn connect(&self) -> Result<Arc<dyn MediaSource>, SourceError> {
        Err(SourceError::fatal("spotdl binary not found"))
    }
}

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
    _music: tempfile::TempDir,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(Arc::new(FakeConnector)).await
    }

    async fn spawn_with(connector: Arc<dyn SourceConnector>) -> Self {
        let music = tempfile::tempdir().expect("failed to create temp dir");
        let services = Arc::new(build_services(
            connector,
            ServiceSettings::new(music.path().join("music")),
        ));
        let validator = Arc::new(SharedSecretValidator::new(AccessKey::new(API_KEY).unwrap()));

        // Same router as prod, bound to an ephemeral port.
        let app = build_app(services, validator);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            handle,
            _music: music,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn submit(client: &reqwest::Client, srv: &TestServer, body: Value) -> reqwest::Response {
    client
        .post(srv.url("/api/download"))
        .header(ACCESS_KEY_HEADER, API_KEY)
        .json(&body)
        .send()
        .await
        .unwrap()
}

async fn wait_for_terminal(client: &reqwest::Client, srv: &TestServer, job_id: &str) -> Value {
    for _ in 0..200 {
        let res = client
            .get(srv.url(&format!("/api/jobs/{job_id}")))
            .header(ACCESS_KEY_HEADER, API_KEY)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let job: Value = res.json().await.unwrap();
        if job["status"] != "processing" {
            return job;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    panic!("job {job_id} did not finish within timeout");
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;

    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["output_dir_exists"], false);
    assert_eq!(body["downloader_ready"], true);
    assert_eq!(body["jobs"], json!({"processing": 0, "completed": 0, "failed": 0}));
}

#[tokio::test]
async fn health_reports_missing_downloader() {
    let srv = TestServer::spawn_with(Arc::new(BrokenConnector)).await;

    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["downloader_ready"], false);
}

#[tokio::test]
async fn submit_without_downloader_is_unavailable() {
    let srv = TestServer::spawn_with(Arc::new(BrokenConnector)).await;
    let client = reqwest::Client::new();

    let res = submit(
        &client,
        &srv,
        json!({"source_url": "https://open.spotify.com/track/abc123"}),
    )
    .await;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "downloader_unavailable");
    assert!(body["message"].as_str().unwrap().contains("spotdl binary not found"));

    let health: Value = reqwest::get(srv.url("/health")).await.unwrap().json().await.unwrap();
    assert_eq!(health["jobs"], json!({"processing": 0, "completed": 0, "failed": 0}));
}

#[tokio::test]
async fn access_key_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/api/download"))
        .json(&json!({"source_url": "https://open.spotify.com/track/abc123"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "forbidden");

    let res = client
        .get(srv.url("/api/jobs"))
        .header(ACCESS_KEY_HEADER, "wrong-key")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Rejected before any job logic ran.
    let health: Value = reqwest::get(srv.url("/health")).await.unwrap().json().await.unwrap();
    assert_eq!(health["jobs"]["processing"], 0);
}

#[tokio::test]
async fn foreign_url_is_rejected_without_creating_a_job() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = submit(&client, &srv, json!({"source_url": "https://example.com/not-spotify"})).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");

    let res = submit(&client, &srv, json!({})).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let list: Value = client
        .get(srv.url("/api/jobs"))
        .header(ACCESS_KEY_HEADER, API_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["jobs"], json!([]));
}

#[tokio::test]
async fn submitted_job_completes() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = submit(
        &client,
        &srv,
        json!({"source_url": "https://open.spotify.com/track/abc123"}),
    )
    .await;
    assert_eq!(res.status(), StatusCode::ACCEPTED);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "started");
    assert_eq!(body["source_url"], "https://open.spotify.com/track/abc123");
    assert!(body["output_dir"].as_str().unwrap().ends_with("music"));
    let job_id = body["job_id"].as_str().unwrap().to_string();

    let job = wait_for_terminal(&client, &srv, &job_id).await;
    assert_eq!(job["status"], "completed");
    assert_eq!(job["job_id"], job_id);
    assert_eq!(job["result"]["downloaded"], 1);
    assert!(job.get("error").is_none());
    assert!(!job["logs"].as_array().unwrap().is_empty());

    let health: Value = reqwest::get(srv.url("/health")).await.unwrap().json().await.unwrap();
    assert_eq!(health["output_dir_exists"], true);
    assert_eq!(health["downloader_ready"], true);
    assert_eq!(health["jobs"]["completed"], 1);
}

#[tokio::test]
async fn legacy_field_name_is_accepted() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = submit(
        &client,
        &srv,
        json!({"spotify_url": "https://open.spotify.com/album/xyz"}),
    )
    .await;
    assert_eq!(res.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn empty_search_ends_in_failed() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = submit(
        &client,
        &srv,
        json!({"source_url": "https://open.spotify.com/track/missing"}),
    )
    .await;
    assert_eq!(res.status(), StatusCode::ACCEPTED);
    let body: Value = res.json().await.unwrap();

    let job = wait_for_terminal(&client, &srv, body["job_id"].as_str().unwrap()).await;
    assert_eq!(job["status"], "failed");
    assert!(job["error"].as_str().unwrap().contains("no tracks found"));
    assert!(job.get("result").is_none());
}

#[tokio::test]
async fn unknown_and_malformed_job_ids() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(srv.url(&format!("/api/jobs/{}", plexsync_core::JobId::new())))
        .header(ACCESS_KEY_HEADER, API_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "not_found");

    let res = client
        .get(srv.url("/api/jobs/not-a-uuid"))
        .header(ACCESS_KEY_HEADER, API_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn jobs_can_be_listed_by_status() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let mut ids = Vec::new();
    for url in [
        "https://open.spotify.com/track/one",
        "https://open.spotify.com/track/missing",
    ] {
        let body: Value = submit(&client, &srv, json!({"source_url": url}))
            .await
            .json()
            .await
            .unwrap();
        ids.push(body["job_id"].as_str().unwrap().to_string());
    }
    for id in &ids {
        wait_for_terminal(&client, &srv, id).await;
    }

    let list = |query: &'static str| {
        let client = client.clone();
        let url = srv.url(&format!("/api/jobs{query}"));
        async move {
            let res = client
                .get(url)
                .header(ACCESS_KEY_HEADER, API_KEY)
                .send()
                .await
                .unwrap();
            (res.status(), res.json::<Value>().await.unwrap())
        }
    };

    let (status, all) = list("").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all["jobs"].as_array().unwrap().len(), 2);

    let (_, failed) = list("?status=failed").await;
    let failed = failed["jobs"].as_array().unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["job_id"], ids[1]);

    let (_, limited) = list("?limit=1").await;
    assert_eq!(limited["jobs"].as_array().unwrap().len(), 1);

    let (status, body) = list("?status=paused").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}
