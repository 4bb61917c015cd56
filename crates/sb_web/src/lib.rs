use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod handlers;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

pub async fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/", get(handlers::root))
        .route("/api/test", get(handlers::api_test))
        .route("/taskbook/highlights", get(handlers::highlights))
        .route("/taskbook/research", get(handlers::research))
        .route("/articles", get(handlers::list_articles))
        .route("/articles/search", get(handlers::search_articles))
        .route("/articles/:id", get(handlers::get_article))
        .route("/api/datasets", get(handlers::list_datasets))
        .route("/api/datasets/bulk", get(handlers::bulk_datasets))
        .route("/api/dataset/:id", get(handlers::get_dataset))
        .route("/api/dataset/:id/assays", get(handlers::dataset_assays))
        .route("/api/dataset/:id/files", get(handlers::dataset_files))
        .route("/api/dataset/:id/assay/:assay/samples", get(handlers::assay_samples))
        .route("/api/dataset/:id/assay/:assay/files", get(handlers::assay_files))
        .route(
            "/api/dataset/:id/assay/:assay/sample/:sample/files",
            get(handlers::sample_files),
        )
        .route("/api/assay-details", get(handlers::assay_details))
        .route("/ai/comprehensive-summary", post(handlers::comprehensive_summary))
        .route("/ai/chat", post(handlers::chat))
        .route("/ai/summarize", post(handlers::summarize))
        .route("/ai/keywords", post(handlers::keywords))
        .route("/ai/extract-data", post(handlers::extract_data))
        .route("/charts/render", post(handlers::render_chart))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

/// Binds `addr` and serves the API until the process exits.
pub async fn serve(addr: SocketAddr, state: AppState) -> sb_core::Result<()> {
    let app = create_app(state).await;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

pub mod prelude {
    pub use crate::{create_app, serve, AppState};
    pub use sb_core::{Error, Result};
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use sb_inference::models::DummyModel;
    use sb_inference::Analyst;
    use sb_scrapers::scrapers::ArticleCatalog;
    use sb_scrapers::{SourceManager, SourcesConfig};
    use sb_storage::{InvalidationPolicy, SessionCache};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const CATALOG: &str = "Title,Link,Year\n\
        Zebrafish heart regeneration,https://x.org/1,2021\n\
        Microgravity bone and muscle,https://x.org/2,2020\n";

    async fn app(upstream: &str) -> Router {
        let config = SourcesConfig {
            taskbook_base: upstream.to_string(),
            osdr_base: upstream.to_string(),
            ..SourcesConfig::default()
        };
        let catalog = ArticleCatalog::from_reader(CATALOG.as_bytes()).unwrap();
        let cache = Arc::new(SessionCache::new(InvalidationPolicy::Manual));
        let sources = SourceManager::with_catalog(config, catalog, cache).unwrap();
        let analyst = Analyst::new(Arc::new(DummyModel::new()));
        create_app(AppState::new(Arc::new(sources), analyst)).await
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, body) = send(app, request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_root_and_status() {
        let app = app("http://127.0.0.1:9").await;
        let (status, body) = get_json(&app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "NASA Space Biology API");

        let (_, body) = get_json(&app, "/api/test").await;
        assert_eq!(body["endpoints"].as_array().unwrap().len(), handlers::ENDPOINTS.len());
    }

    #[tokio::test]
    async fn test_articles() {
        let app = app("http://127.0.0.1:9").await;
        let (_, body) = get_json(&app, "/articles").await;
        assert_eq!(body.as_array().unwrap().len(), 2);

        let (_, body) = get_json(&app, "/articles/search?q=zebrafish").await;
        let titles: Vec<&str> = body.as_array().unwrap().iter().map(|a| a["title"].as_str().unwrap()).collect();
        assert_eq!(titles, vec!["Zebrafish heart regeneration"]);

        let (_, body) = get_json(&app, "/articles/search?year=2020&type=all").await;
        assert_eq!(body[0]["title"], "Microgravity bone and muscle");
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (status, body) = get_json(&app, "/articles/9").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("Article 9"));
    }

    #[tokio::test]
    async fn test_dataset_envelope() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/dataset/OSD-1/")
            .with_body(r#"{"OSD-1": {"metadata": {"organism": "Mus musculus"}}}"#)
            .create_async()
            .await;
        let app = app(&server.url()).await;

        let (status, body) = get_json(&app, "/api/dataset/OSD-1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["key"], "OSD-1");
        assert_eq!(body["value"]["metadata"]["organism"], "Mus musculus");
    }

    #[tokio::test]
    async fn test_upstream_failure_is_500() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/tbp/highlights.cfm")
            .with_status(500)
            .create_async()
            .await;
        let app = app(&server.url()).await;

        let (status, body) = get_json(&app, "/taskbook/highlights").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_render_chart() {
        let app = app("http://127.0.0.1:9").await;
        let request = post_json(
            "/charts/render",
            json!({
                "series": {
                    "chartType": "pie",
                    "title": "Organisms",
                    "data": [{"label": "A", "value": 30}, {"label": "B", "value": 70}]
                },
                "hover": 0
            }),
        );
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/svg+xml");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let svg = String::from_utf8(body.to_vec()).unwrap();
        assert!(svg.contains(r#"data-chart="pie""#));
        assert!(svg.contains("A: 30"));
    }

    #[tokio::test]
    async fn test_ai_routes() {
        let app = app("http://127.0.0.1:9").await;
        let (status, body) = send(&app, post_json("/ai/chat", json!({ "question": "tldr please" }))).await;
        assert_eq!(status, StatusCode::OK);
        let reply: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(reply["show_summary_button"], true);

        let request = post_json("/ai/extract-data", json!({ "title": "t", "content": "Flight: 45%, Ground: 55%" }));
        let (_, body) = send(&app, request).await;
        let reply: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(reply["chart_data"]["chartType"], "pie");

        let request = post_json("/ai/comprehensive-summary", json!({ "title": "t", "content": "<p>Short.</p>" }));
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        let reply: Value = serde_json::from_slice(&body).unwrap();
        assert!(reply["summary"].is_string());
        assert!(reply["keywords"].is_array());
    }
}
