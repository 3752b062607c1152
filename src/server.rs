use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info};

use job_crawler::config::CrawlRequest;
use job_crawler::output::write_records;
use job_crawler::{CrawlError, Orchestrator};

#[derive(Debug, Clone, Serialize)]
pub struct LastRun {
    pub at: String,
    pub count: usize,
}

pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// File served by `/last`.
    pub output: PathBuf,
    pub last: Mutex<Option<LastRun>>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>, output: PathBuf) -> Self {
        Self {
            orchestrator,
            output,
            last: Mutex::new(None),
        }
    }

    fn last(&self) -> Option<LastRun> {
        self.last.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/crawl", post(crawl))
        .route("/health", get(health))
        .route("/last", get(last))
        .with_state(state)
}

pub async fn serve(state: Arc<AppState>, port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Listening on :{}", port);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// An empty body asks for all defaults; anything else must be a JSON request.
fn parse_request(body: &[u8]) -> serde_json::Result<CrawlRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(CrawlRequest::default());
    }
    serde_json::from_slice(body)
}

async fn crawl(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let started = Instant::now();
    let settings = match parse_request(&body) {
        Ok(request) => request.resolve(),
        Err(e) => {
            let body = json!({ "ok": false, "error": format!("invalid request body: {e}") });
            return (StatusCode::BAD_REQUEST, Json(body)).into_response();
        }
    };

    let outcome = match state.orchestrator.run(&settings.run).await {
        Ok(outcome) => outcome,
        Err(CrawlError::RunAlreadyInProgress) => {
            let body = json!({ "ok": false, "message": "a crawl is already running" });
            return (StatusCode::CONFLICT, Json(body)).into_response();
        }
        Err(e) => {
            let body = json!({ "ok": false, "error": e.to_string() });
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
        }
    };

    if let Some(path) = &settings.output {
        if let Err(e) = write_records(path, &outcome.records).await {
            error!("Writing output failed: {:#}", e);
        }
    }
    *state.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(LastRun {
        at: chrono::Utc::now().to_rfc3339(),
        count: outcome.records.len(),
    });

    Json(json!({
        "ok": true,
        "durationMs": u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        "count": outcome.records.len(),
        "data": outcome.records,
        "sources": outcome.sources,
    }))
    .into_response()
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "ok": true,
        "running": state.orchestrator.is_running(),
        "last": state.last(),
    }))
}

async fn last(State(state): State<Arc<AppState>>) -> Response {
    match tokio::fs::read_to_string(&state.output).await {
        Ok(text) => ([(header::CONTENT_TYPE, "application/json; charset=utf-8")], text).into_response(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let body = json!({ "ok": false, "message": "no output file yet" });
            (StatusCode::NOT_FOUND, Json(body)).into_response()
        }
        Err(e) => {
            let body = json!({ "ok": false, "error": e.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use job_crawler::providers::Registry;
    use job_crawler::session::HttpSessionFactory;
    use tower::ServiceExt;

    use super::*;

    fn state(output: PathBuf) -> Arc<AppState> {
        let orchestrator = Orchestrator::new(Registry::builtin(), Arc::new(HttpSessionFactory::default()));
        Arc::new(AppState::new(Arc::new(orchestrator), output))
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_idle() {
        let app = router(state(PathBuf::from("/nonexistent/jobs.json")));
        let resp = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["running"], false);
        assert!(body["last"].is_null());
    }

    #[tokio::test]
    async fn last_serves_file_or_404() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");

        let resp = router(state(path.clone()))
            .oneshot(Request::get("/last").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        std::fs::write(&path, "[]").unwrap();
        let resp = router(state(path))
            .oneshot(Request::get("/last").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, json!([]));
    }

    #[tokio::test]
    async fn crawl_with_only_unknown_sources() {
        let app = router(state(PathBuf::from("/nonexistent/jobs.json")));
        let req = Request::post("/crawl")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{ "providers": "bogus", "output": "" }"#))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = body_json(resp).await;
        assert_eq!(body["ok"], true);
        assert_eq!(body["count"], 0);
        assert_eq!(body["sources"][0]["stop"]["reason"], "unknown_source");
    }

    #[tokio::test]
    async fn malformed_body_is_a_bad_request() {
        let st = state(PathBuf::from("/nonexistent/jobs.json"));
        for body in [r#"{ "pages": "#, r#"{ "pages": "three" }"#, "[1, 2]"] {
            let req = Request::post("/crawl")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap();
            let resp = router(st.clone()).oneshot(req).await.unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{body}");
            let json = body_json(resp).await;
            assert_eq!(json["ok"], false);
            assert!(json["error"].as_str().unwrap().starts_with("invalid request body"));
        }
        // rejected bodies never start a run
        assert!(st.last().is_none());
    }

    #[tokio::test]
    async fn string_counts_are_accepted() {
        let app = router(state(PathBuf::from("/nonexistent/jobs.json")));
        let req = Request::post("/crawl")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{ "keyword": "後端", "pages": "3", "providers": "bogus", "output": "" }"#))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_json(resp).await["durationMs"].is_u64());

        let settings = parse_request(r#"{ "keyword": "後端", "pages": "3" }"#.as_bytes()).unwrap().resolve();
        assert_eq!(settings.run.query.keyword, "後端");
        assert_eq!(settings.run.query.page_budget, 3);
    }

    #[test]
    fn empty_body_means_defaults() {
        assert!(parse_request(b"").unwrap().keyword.is_none());
        assert!(parse_request(b"  \n").unwrap().pages.is_none());
    }
}
