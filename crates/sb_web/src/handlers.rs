use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use sb_core::{Article, ArticleContent, ChartKind, ChartSeries, ChatRequest, Dataset, Keyed, SummaryRequest, TextRequest};
use sb_views::{FuzzyMatcher, HoverState};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiResult;
use crate::AppState;

pub const ENDPOINTS: [&str; 22] = [
    "/",
    "/api/test",
    "/taskbook/highlights",
    "/taskbook/research",
    "/articles",
    "/articles/search",
    "/articles/:id",
    "/api/datasets",
    "/api/datasets/bulk",
    "/api/dataset/:id",
    "/api/dataset/:id/assays",
    "/api/dataset/:id/files",
    "/api/dataset/:id/assay/:assay/samples",
    "/api/dataset/:id/assay/:assay/files",
    "/api/dataset/:id/assay/:assay/sample/:sample/files",
    "/api/assay-details",
    "/ai/comprehensive-summary",
    "/ai/chat",
    "/ai/summarize",
    "/ai/keywords",
    "/ai/extract-data",
    "/charts/render",
];

type AppStateRef = State<Arc<AppState>>;

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "NASA Space Biology API" }))
}

pub async fn api_test() -> Json<Value> {
    Json(json!({ "status": "Backend is running", "endpoints": ENDPOINTS }))
}

pub async fn highlights(State(state): AppStateRef) -> ApiResult<Json<Value>> {
    let highlights = state.sources.highlights().await?;
    Ok(Json(json!({ "highlights": highlights })))
}

pub async fn research(State(state): AppStateRef) -> ApiResult<Json<Value>> {
    let results = state.sources.research().await?;
    Ok(Json(json!({ "results": results })))
}

pub async fn list_articles(State(state): AppStateRef) -> Json<Vec<Article>> {
    Json(state.sources.articles().to_vec())
}

pub async fn search_articles(
    State(state): AppStateRef,
    Query(query): Query<sb_views::Query>,
) -> Json<Vec<Article>> {
    let matches = sb_views::apply(state.sources.articles(), &query, &FuzzyMatcher::default());
    tracing::debug!("search {:?}: {} articles", query.text, matches.len());
    Json(matches.into_iter().cloned().collect())
}

pub async fn get_article(State(state): AppStateRef, Path(id): Path<usize>) -> ApiResult<Json<ArticleContent>> {
    Ok(Json(state.sources.article_content(id).await?))
}

pub async fn list_datasets(State(state): AppStateRef) -> ApiResult<Json<Value>> {
    Ok(Json(state.sources.osdr().datasets().await?))
}

pub async fn bulk_datasets(State(state): AppStateRef) -> ApiResult<Json<Vec<Dataset>>> {
    Ok(Json(state.sources.osdr().bulk_summaries().await?))
}

pub async fn get_dataset(State(state): AppStateRef, Path(id): Path<String>) -> ApiResult<Json<Keyed<Value>>> {
    Ok(Json(state.sources.osdr().dataset(&id).await?))
}

pub async fn dataset_assays(State(state): AppStateRef, Path(id): Path<String>) -> ApiResult<Json<Keyed<Value>>> {
    Ok(Json(state.sources.osdr().dataset_assays(&id).await?))
}

pub async fn dataset_files(State(state): AppStateRef, Path(id): Path<String>) -> ApiResult<Json<Keyed<Value>>> {
    Ok(Json(state.sources.osdr().dataset_files(&id).await?))
}

pub async fn assay_samples(
    State(state): AppStateRef,
    Path((id, assay)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    Ok(Json(state.sources.osdr().assay_samples(&id, &assay).await?))
}

pub async fn assay_files(
    State(state): AppStateRef,
    Path((id, assay)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    Ok(Json(state.sources.osdr().assay_files(&id, &assay).await?))
}

pub async fn sample_files(
    State(state): AppStateRef,
    Path((id, assay, sample)): Path<(String, String, String)>,
) -> ApiResult<Json<Value>> {
    Ok(Json(state.sources.osdr().sample_files(&id, &assay, &sample).await?))
}

#[derive(Debug, Deserialize)]
pub struct AssayDetailsParams {
    pub url: String,
}

pub async fn assay_details(
    State(state): AppStateRef,
    Query(params): Query<AssayDetailsParams>,
) -> ApiResult<Json<Value>> {
    Ok(Json(state.sources.osdr().assay_details(&params.url).await?))
}

pub async fn comprehensive_summary(State(state): AppStateRef, Json(article): Json<SummaryRequest>) -> impl IntoResponse {
    Json(state.analyst.comprehensive_summary(&article).await)
}

pub async fn chat(State(state): AppStateRef, Json(request): Json<ChatRequest>) -> impl IntoResponse {
    Json(state.analyst.chat(&request).await)
}

pub async fn summarize(State(state): AppStateRef, Json(request): Json<TextRequest>) -> Json<Value> {
    let summary = state.analyst.summarize(&request.text).await;
    Json(json!({ "summary": summary }))
}

pub async fn keywords(State(state): AppStateRef, Json(request): Json<TextRequest>) -> Json<Value> {
    let keywords = state.analyst.keywords(&request.text).await;
    Json(json!({ "keywords": keywords }))
}

pub async fn extract_data(State(state): AppStateRef, Json(article): Json<SummaryRequest>) -> Json<Value> {
    let chart = state.analyst.extract_data(&article);
    Json(json!({ "chart_data": chart }))
}

#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    pub series: ChartSeries,
    #[serde(default)]
    pub kind: Option<ChartKind>,
    #[serde(default)]
    pub hover: Option<usize>,
}

/// SVG for a series; `kind` overrides the series' own chart type.
pub async fn render_chart(Json(request): Json<RenderRequest>) -> impl IntoResponse {
    let kind = request.kind.unwrap_or(request.series.chart_type);
    let svg = sb_views::render(&request.series, kind, HoverState::from(request.hover));
    ([(header::CONTENT_TYPE, "image/svg+xml")], svg)
}
