//! HTTP API tests: the real router on an ephemeral port, an in-memory
//! SQLite store and a scripted model, driven with reqwest.

mod common;

use common::{sample_pdf, serve_files, spawn_router, test_config, ScriptedModel, DECK_REPLY};
use pdfdeck::server::{router, AppState, USER_EMAIL_HEADER, USER_ID_HEADER};
use pdfdeck::{SqliteStore, SummaryModel};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;

struct Api {
    base: String,
    client: reqwest::Client,
}

impl Api {
    async fn start(model: Arc<dyn SummaryModel>) -> Self {
        Self::start_with_limit(model, 1024 * 1024).await
    }

    async fn start_with_limit(model: Arc<dyn SummaryModel>, max_request_bytes: usize) -> Self {
        let store = SqliteStore::in_memory().await.unwrap();
        let state = AppState::new(Arc::new(store), model, test_config());
        let base = spawn_router(router(state, max_request_bytes)).await;
        Self {
            base,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn process(&self, user: &str, body: Value) -> (StatusCode, Value) {
        let resp = self
            .client
            .post(self.url("/api/process-and-summarize"))
            .header(USER_ID_HEADER, user)
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap())
    }

    async fn get_json(&self, user: &str, path: &str) -> (StatusCode, Value) {
        let resp = self
            .client
            .get(self.url(path))
            .header(USER_ID_HEADER, user)
            .send()
            .await
            .unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap())
    }
}

#[tokio::test]
async fn health_reports_version() {
    let api = Api::start(ScriptedModel::new(vec![])).await;
    let (status, body) = api.get_json("anyone", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn api_requires_identity() {
    let api = Api::start(ScriptedModel::new(vec![])).await;
    let resp = api.client.get(api.url("/api/summaries")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["kind"], "AUTHENTICATION");
}

#[tokio::test]
async fn rejects_bad_requests() {
    let api = Api::start(ScriptedModel::new(vec![])).await;

    let (status, body) = api.process("user_1", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields: fileUrl, fileName");

    let (status, body) = api
        .process(
            "user_1",
            json!({"fileUrl": "https://files.example/a.docx", "fileName": "a.docx"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "FILE_TYPE");

    let (status, _) = api
        .process(
            "user_1",
            json!({"fileUrl": "/etc/passwd.pdf", "fileName": "passwd.pdf"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let resp = api
        .client
        .post(api.url("/api/process-and-summarize"))
        .header(USER_ID_HEADER, "user_1")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let (_, list) = api.get_json("user_1", "/api/summaries").await;
    assert_eq!(list["summaries"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let api = Api::start_with_limit(ScriptedModel::new(vec![]), 64).await;
    let body = json!({
        "fileUrl": "https://f.example/a.pdf",
        "fileName": "a.pdf",
        "fileKey": "x".repeat(256),
    });
    let resp = api
        .client
        .post(api.url("/api/process-and-summarize"))
        .header(USER_ID_HEADER, "user_1")
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn full_summary_lifecycle() {
    let files = serve_files(sample_pdf()).await;
    let api = Api::start(ScriptedModel::replying(DECK_REPLY, 1)).await;

    let resp = api
        .client
        .post(api.url("/api/process-and-summarize"))
        .header(USER_ID_HEADER, "user_1")
        .header(USER_EMAIL_HEADER, "u1@example.com")
        .json(&json!({
            "fileUrl": format!("{files}/doc.pdf"),
            "fileName": "report.pdf",
            "fileKey": "upl_123"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["summary"]["title"], "Q3 Results");
    assert_eq!(body["summary"]["slides"].as_array().unwrap().len(), 3);
    assert_eq!(body["summary"]["metadata"]["fileName"], "report.pdf");
    assert_eq!(body["summary"]["metadata"]["pageCount"], 2);
    let id = body["id"].as_str().unwrap().to_string();

    // list
    let (status, list) = api.get_json("user_1", "/api/summaries").await;
    assert_eq!(status, StatusCode::OK);
    let items = list["summaries"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], id.as_str());
    assert_eq!(items[0]["status"], "completed");
    assert_eq!(items[0]["slides"][1], "# Costs\n\nOperating costs fell.");

    // get
    let (status, one) = api.get_json("user_1", &format!("/api/summaries/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(one["summary"]["title"], "Q3 Results");

    // another user cannot see it
    let (status, _) = api.get_json("user_2", &format!("/api/summaries/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // export
    let resp = api
        .client
        .get(api.url(&format!("/api/summaries/{id}/export")))
        .header(USER_ID_HEADER, "user_1")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let headers = resp.headers().clone();
    let content_type = headers["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/markdown"));
    assert_eq!(
        headers["content-disposition"].to_str().unwrap(),
        "attachment; filename=\"q3_results.md\""
    );
    let markdown = resp.text().await.unwrap();
    let expected_head = "# Q3 Results\n\n**Source:** report.pdf\n\n---\n\n# Growth";
    assert!(markdown.starts_with(expected_head));
    assert!(markdown.ends_with("Headcount flat.\n"));

    // delete
    let delete = |user: &'static str| {
        api.client
            .delete(api.url(&format!("/api/summaries/{id}")))
            .header(USER_ID_HEADER, user)
            .send()
    };
    let foreign = delete("user_2").await.unwrap();
    assert_eq!(foreign.status(), StatusCode::NOT_FOUND);
    let own = delete("user_1").await.unwrap();
    assert_eq!(own.status(), StatusCode::NO_CONTENT);
    let again = delete("user_1").await.unwrap();
    assert_eq!(again.status(), StatusCode::NOT_FOUND);

    let (_, list) = api.get_json("user_1", "/api/summaries").await;
    assert!(list["summaries"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn garbage_model_output_still_succeeds() {
    let files = serve_files(sample_pdf()).await;
    let api = Api::start(ScriptedModel::replying("Sorry, no JSON today.", 1)).await;

    let (status, body) = api
        .process(
            "user_1",
            json!({"fileUrl": format!("{files}/doc.pdf"), "fileName": "report.pdf"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["title"], "Summary of report.pdf");
    assert_eq!(body["summary"]["slides"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn unreachable_file_marks_summary_failed() {
    let api = Api::start(ScriptedModel::replying(DECK_REPLY, 1)).await;

    let (status, body) = api
        .process(
            "user_1",
            json!({"fileUrl": "http://127.0.0.1:1/missing.pdf", "fileName": "missing.pdf"}),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(
        body["error"],
        "We could not download your file. Please try uploading it again."
    );
    assert!(body["details"].as_str().unwrap().contains("127.0.0.1:1"));

    let (_, list) = api.get_json("user_1", "/api/summaries").await;
    let items = list["summaries"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["status"], "failed");
    assert!(items[0]["slides"].as_array().unwrap().is_empty());
}
