use std::sync::Arc;

use reqwest::StatusCode;
use sb_core::{
    Article, ArticleContent, CacheKey, CacheRepository, ChatReply, ChatRequest, ComprehensiveSummary, Dataset,
    EntityKind, Error, Highlight, Keyed, ResearchRecord, Result, SummaryRequest,
};
use sb_storage::get_or_fetch_json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

#[derive(Deserialize)]
struct HighlightsResponse {
    highlights: Vec<Highlight>,
}

#[derive(Deserialize)]
struct ResearchResponse {
    results: Vec<ResearchRecord>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Talks to the dashboard API. Entity payloads go through the session
/// cache; AI analyses go through the persistent one.
pub struct DashboardClient {
    http: reqwest::Client,
    base: Url,
    session: Arc<dyn CacheRepository>,
    persistent: Arc<dyn CacheRepository>,
}

impl DashboardClient {
    pub fn new(
        base_url: &str,
        session: Arc<dyn CacheRepository>,
        persistent: Arc<dyn CacheRepository>,
    ) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            base: Url::parse(base_url)?,
            session,
            persistent,
        })
    }

    pub fn session(&self) -> &dyn CacheRepository {
        self.session.as_ref()
    }

    pub fn persistent(&self) -> &dyn CacheRepository {
        self.persistent.as_ref()
    }

    async fn read<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let url = response.url().clone();
        if status.is_success() {
            return Ok(response.json().await?);
        }
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => format!("{} returned {}", url, status),
        };
        if status == StatusCode::NOT_FOUND {
            Err(Error::NotFound(message))
        } else {
            Err(Error::upstream("backend", message))
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base.join(path)?;
        tracing::debug!("GET {}", url);
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::upstream("backend", e))?;
        self.read(response).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base.join(path)?;
        tracing::debug!("POST {}", url);
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::upstream("backend", e))?;
        self.read(response).await
    }

    pub async fn articles(&self) -> Result<Vec<Article>> {
        let key = CacheKey::all(EntityKind::ArticleList);
        get_or_fetch_json(self.session(), &key, || self.get("/articles")).await
    }

    pub async fn article_content(&self, id: usize) -> Result<ArticleContent> {
        let key = CacheKey::new(EntityKind::ArticleContent, id.to_string());
        let path = format!("/articles/{}", id);
        get_or_fetch_json(self.session(), &key, || self.get(&path)).await
    }

    /// Catalog entry and extracted body of one article, fetched concurrently.
    /// Either failing fails the view.
    pub async fn article_view(&self, id: usize) -> Result<(Article, ArticleContent)> {
        let (articles, content) = tokio::try_join!(self.articles(), self.article_content(id))?;
        let article = articles
            .into_iter()
            .find(|a| a.id == id)
            .ok_or_else(|| Error::NotFound(format!("Article {} not found", id)))?;
        Ok((article, content))
    }

    pub async fn datasets(&self) -> Result<Vec<Dataset>> {
        let key = CacheKey::all(EntityKind::DatasetList);
        get_or_fetch_json(self.session(), &key, || self.get("/api/datasets/bulk")).await
    }

    pub async fn dataset(&self, accession: &str) -> Result<Keyed<Value>> {
        let key = CacheKey::new(EntityKind::Dataset, accession);
        let path = format!("/api/dataset/{}", accession);
        get_or_fetch_json(self.session(), &key, || self.get(&path)).await
    }

    pub async fn highlights(&self) -> Result<Vec<Highlight>> {
        let key = CacheKey::all(EntityKind::Highlights);
        get_or_fetch_json(self.session(), &key, || async {
            let response: HighlightsResponse = self.get("/taskbook/highlights").await?;
            Ok(response.highlights)
        })
        .await
    }

    pub async fn research(&self) -> Result<Vec<ResearchRecord>> {
        let key = CacheKey::all(EntityKind::Research);
        get_or_fetch_json(self.session(), &key, || async {
            let response: ResearchResponse = self.get("/taskbook/research").await?;
            Ok(response.results)
        })
        .await
    }

    /// AI analysis of an article, kept across runs in the persistent cache.
    pub async fn analysis(&self, id: usize) -> Result<ComprehensiveSummary> {
        let key = CacheKey::new(EntityKind::Analysis, id.to_string());
        get_or_fetch_json(self.persistent(), &key, || async {
            let content = self.article_content(id).await?;
            let request = SummaryRequest {
                title: content.title,
                content: content.content,
            };
            self.post("/ai/comprehensive-summary", &request).await
        })
        .await
    }

    pub async fn chat(&self, id: usize, question: &str) -> Result<ChatReply> {
        let content = self.article_content(id).await?;
        let request = ChatRequest {
            question: question.to_string(),
            article_content: content.content,
            article_title: content.title,
        };
        self.post("/ai/chat", &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use sb_storage::{InvalidationPolicy, PersistentCache, SessionCache};
    use serde_json::json;

    fn session() -> Arc<dyn CacheRepository> {
        Arc::new(SessionCache::new(InvalidationPolicy::Manual))
    }

    fn articles_body() -> String {
        json!([
            { "id": 0, "title": "Mice in Bion-M 1 space mission", "link": "https://x.org/0" },
            { "id": 1, "title": "Microgravity bone and muscle", "link": "https://x.org/1" }
        ])
        .to_string()
    }

    fn content_body(id: usize) -> String {
        json!({
            "id": id,
            "title": "Microgravity bone and muscle",
            "link": "https://x.org/1",
            "content": "<p>Flight: 40%, Control: 60%.</p>",
            "tables": []
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_cached_read_hits_network_once() {
        let mut server = Server::new_async().await;
        let list = server
            .mock("GET", "/articles")
            .with_body(articles_body())
            .expect(1)
            .create_async()
            .await;
        let detail = server
            .mock("GET", "/articles/1")
            .with_body(content_body(1))
            .expect(1)
            .create_async()
            .await;
        let client = DashboardClient::new(&server.url(), session(), session()).unwrap();

        let (article, content) = client.article_view(1).await.unwrap();
        assert_eq!(article.title, "Microgravity bone and muscle");
        let (_, again) = client.article_view(1).await.unwrap();
        assert_eq!(content, again);

        list.assert_async().await;
        detail.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_detail_fails_view() {
        let mut server = Server::new_async().await;
        let _list = server.mock("GET", "/articles").with_body(articles_body()).create_async().await;
        let _detail = server
            .mock("GET", "/articles/7")
            .with_status(404)
            .with_body(r#"{"error":"Not found: Article 7 not found"}"#)
            .create_async()
            .await;
        let client = DashboardClient::new(&server.url(), session(), session()).unwrap();

        let err = client.article_view(7).await.unwrap_err();
        assert_eq!(err.kind(), sb_core::ErrorKind::NotFound);
        assert!(err.to_string().contains("Article 7"));
        assert!(client.session().get(&CacheKey::new(EntityKind::ArticleContent, "7")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_analysis_survives_restart() {
        let mut server = Server::new_async().await;
        let _detail = server.mock("GET", "/articles/1").with_body(content_body(1)).create_async().await;
        let summary = server
            .mock("POST", "/ai/comprehensive-summary")
            .match_body(mockito::Matcher::PartialJson(json!({ "title": "Microgravity bone and muscle" })))
            .with_body(r#"{"summary":"Bone loss.","keywords":["bone"]}"#)
            .expect(1)
            .create_async()
            .await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persistent.json");

        let persistent = Arc::new(PersistentCache::open(&path, InvalidationPolicy::Manual).await.unwrap());
        let client = DashboardClient::new(&server.url(), session(), persistent).unwrap();
        assert_eq!(client.analysis(1).await.unwrap().summary, "Bone loss.");

        let reopened = Arc::new(PersistentCache::open(&path, InvalidationPolicy::Manual).await.unwrap());
        let client = DashboardClient::new(&server.url(), session(), reopened).unwrap();
        assert_eq!(client.analysis(1).await.unwrap().keywords, vec!["bone"]);

        summary.assert_async().await;
    }

    #[tokio::test]
    async fn test_highlights_unwraps_envelope() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/taskbook/highlights")
            .with_body(r#"{"highlights":[{"title":"Study (March 2022)","summary":"s","link":"https://t/x.pdf","year":"March 2022","type":"PDF"}]}"#)
            .create_async()
            .await;
        let client = DashboardClient::new(&server.url(), session(), session()).unwrap();
        let highlights = client.highlights().await.unwrap();
        assert_eq!(highlights[0].year, "March 2022");
    }
}
