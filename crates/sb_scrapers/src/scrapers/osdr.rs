use futures::future::join_all;
use reqwest::StatusCode;
use sb_core::{Dataset, Error, Keyed, Result};
use serde_json::{json, Value};
use url::Url;

use super::utils;
use crate::logging::Logger;

pub const DEFAULT_OSDR_BASE: &str = "https://visualization.osdr.nasa.gov/biodata/api/v2";

/// Concurrent detail requests per bulk batch.
pub const BULK_BATCH_SIZE: usize = 20;

/// Proxy over the OSDR biodata API.
#[derive(Debug, Clone)]
pub struct OsdrClient {
    client: reqwest::Client,
    base: Url,
}

impl OsdrClient {
    pub fn new(client: reqwest::Client, base: &str) -> Result<Self> {
        let base = utils::parse_url(base.trim_end_matches('/'))?;
        if base.cannot_be_a_base() {
            return Err(Error::InvalidUrl(format!("{} cannot be a base URL", base)));
        }
        Ok(Self { client, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn logger(&self) -> Logger {
        Logger::new().with_prefix("[osdr]".to_string())
    }

    /// `{base}/seg/seg/` with every segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::InvalidUrl(format!("{} cannot be a base URL", self.base)))?
            .pop_if_empty()
            .extend(segments)
            .push("");
        Ok(url)
    }

    async fn get_json(&self, url: Url) -> Result<Value> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::upstream("osdr", e))?;
        match response.status() {
            status if status.is_success() => Ok(response.json().await?),
            StatusCode::NOT_FOUND => Err(Error::NotFound(format!("{} not found upstream", url.path()))),
            status => Err(Error::upstream("osdr", format!("{} returned {}", url, status))),
        }
    }

    /// The dataset index, passed through as-is.
    pub async fn datasets(&self) -> Result<Value> {
        self.get_json(self.endpoint(&["datasets"])?).await
    }

    pub async fn dataset(&self, accession: &str) -> Result<Keyed<Value>> {
        let response = self.get_json(self.endpoint(&["dataset", accession])?).await?;
        Keyed::from_upstream(accession, response)
    }

    /// Dataset detail parsed into the typed record.
    pub async fn dataset_record(&self, accession: &str) -> Result<Dataset> {
        let keyed = self.dataset(accession).await?;
        Dataset::from_upstream(accession, &keyed.value)
    }

    pub async fn dataset_assays(&self, accession: &str) -> Result<Keyed<Value>> {
        let response = self.get_json(self.endpoint(&["dataset", accession, "assays"])?).await?;
        Keyed::from_upstream(accession, response)
    }

    /// Datasets without files answer 404; that is an empty map, not an error.
    pub async fn dataset_files(&self, accession: &str) -> Result<Keyed<Value>> {
        match self.get_json(self.endpoint(&["dataset", accession, "files"])?).await {
            Ok(response) => Keyed::from_upstream(accession, response),
            Err(Error::NotFound(_)) => Ok(Keyed::new(accession, json!({}))),
            Err(e) => Err(e),
        }
    }

    pub async fn assay_samples(&self, accession: &str, assay: &str) -> Result<Value> {
        self.get_json(self.endpoint(&["dataset", accession, "assay", assay, "samples"])?)
            .await
    }

    pub async fn assay_files(&self, accession: &str, assay: &str) -> Result<Value> {
        let url = self.endpoint(&["dataset", accession, "assay", assay, "files"])?;
        empty_on_missing(self.get_json(url).await)
    }

    pub async fn sample_files(&self, accession: &str, assay: &str, sample: &str) -> Result<Value> {
        let url = self.endpoint(&["dataset", accession, "assay", assay, "sample", sample, "files"])?;
        empty_on_missing(self.get_json(url).await)
    }

    /// Follows a `REST_URL` handed out by an earlier response. Only URLs on
    /// the configured OSDR host are fetched.
    pub async fn assay_details(&self, url: &str) -> Result<Value> {
        let target = utils::parse_url(url)?;
        let same_origin = target.scheme() == self.base.scheme()
            && target.host_str() == self.base.host_str()
            && target.port_or_known_default() == self.base.port_or_known_default();
        if !same_origin {
            return Err(Error::InvalidUrl(format!("{} is not an OSDR URL", url)));
        }
        self.get_json(target).await
    }

    /// Summaries of every dataset in the index, fetched in concurrent batches.
    /// Details that answer non-200 are skipped; unreadable ones become
    /// placeholders.
    pub async fn bulk_summaries(&self) -> Result<Vec<Dataset>> {
        let index = self.datasets().await?;
        let ids: Vec<String> = match index {
            Value::Object(map) => map.keys().cloned().collect(),
            other => return Err(Error::Parse(format!("dataset index is not an object: {}", other))),
        };

        let logger = self.logger();
        let mut results = Vec::with_capacity(ids.len());
        for (n, batch) in ids.chunks(BULK_BATCH_SIZE).enumerate() {
            let fetched = join_all(batch.iter().map(|id| self.summary(id))).await;
            results.extend(fetched.into_iter().flatten());
            logger.debug(&format!("batch {} done, {} datasets so far", n + 1, results.len()));
        }
        logger.info(&format!("Loaded {} of {} datasets", results.len(), ids.len()));
        Ok(results)
    }

    async fn summary(&self, accession: &str) -> Option<Dataset> {
        let logger = self.logger().with_prefix(format!("[{}]", accession));
        let url = match self.endpoint(&["dataset", accession]) {
            Ok(url) => url,
            Err(e) => {
                logger.warn(&e.to_string());
                return Some(Dataset::placeholder(accession));
            }
        };
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                logger.warn(&format!("request failed: {}", e));
                return Some(Dataset::placeholder(accession));
            }
        };
        if response.status() != StatusCode::OK {
            logger.debug(&format!("skipped, status {}", response.status()));
            return None;
        }
        let parsed = match response.json::<Value>().await {
            Ok(body) => Keyed::from_upstream(accession, body)
                .and_then(|keyed| Dataset::from_upstream(accession, &keyed.value)),
            Err(e) => Err(Error::Parse(e.to_string())),
        };
        match parsed {
            Ok(dataset) => Some(dataset.summary()),
            Err(e) => {
                logger.warn(&format!("unreadable detail: {}", e));
                Some(Dataset::placeholder(accession))
            }
        }
    }
}

fn empty_on_missing(result: Result<Value>) -> Result<Value> {
    match result {
        Err(Error::NotFound(_)) => Ok(json!([])),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn detail(accession: &str, title: &str, organism: &str) -> String {
        json!({
            accession: {
                "metadata": { "study title": title, "organism": organism },
                "assays": { "a1": { "REST_URL": "https://visualization.osdr.nasa.gov/biodata/api/v2/dataset/x/assay/a1/" } }
            }
        })
        .to_string()
    }

    async fn client(server: &Server) -> OsdrClient {
        OsdrClient::new(reqwest::Client::new(), &server.url()).unwrap()
    }

    #[tokio::test]
    async fn test_dataset_is_keyed_by_accession() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/dataset/OSD-48/")
            .with_body(detail("OSD-48", "Rodent Research 1", "Mus musculus"))
            .create_async()
            .await;
        let osdr = client(&server).await;

        let keyed = osdr.dataset("OSD-48").await.unwrap();
        assert_eq!(keyed.key, "OSD-48");
        let record = osdr.dataset_record("OSD-48").await.unwrap();
        assert_eq!(record.organism, "Mus musculus");
        assert_eq!(record.assays["a1"].href().unwrap(), "https://visualization.osdr.nasa.gov/biodata/api/v2/dataset/x/assay/a1/");
    }

    #[tokio::test]
    async fn test_missing_files_are_empty() {
        let mut server = Server::new_async().await;
        let _files = server.mock("GET", "/dataset/OSD-1/files/").with_status(404).create_async().await;
        let _assay = server
            .mock("GET", "/dataset/OSD-1/assay/a%201/files/")
            .with_status(404)
            .create_async()
            .await;
        let osdr = client(&server).await;

        let files = osdr.dataset_files("OSD-1").await.unwrap();
        assert_eq!(files, Keyed::new("OSD-1", json!({})));
        assert_eq!(osdr.assay_files("OSD-1", "a 1").await.unwrap(), json!([]));
    }

    #[tokio::test]
    async fn test_dataset_not_found() {
        let mut server = Server::new_async().await;
        let _m = server.mock("GET", "/dataset/OSD-0/").with_status(404).create_async().await;
        let osdr = client(&server).await;
        let err = osdr.dataset("OSD-0").await.unwrap_err();
        assert_eq!(err.kind(), sb_core::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_assay_details_stays_on_host() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/dataset/OSD-1/assay/a1/")
            .with_body(r#"{"OSD-1": {"assay": "a1"}}"#)
            .create_async()
            .await;
        let osdr = client(&server).await;

        let url = format!("{}/dataset/OSD-1/assay/a1/", server.url());
        let value = osdr.assay_details(&url).await.unwrap();
        assert_eq!(value["OSD-1"]["assay"], "a1");

        let err = osdr.assay_details("http://169.254.169.254/latest/meta-data").await.unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_bulk_skips_and_placeholders() {
        let mut server = Server::new_async().await;
        let _index = server
            .mock("GET", "/datasets/")
            .with_body(r#"{"OSD-1": {}, "OSD-2": {}, "OSD-3": {}}"#)
            .create_async()
            .await;
        let _ok = server
            .mock("GET", "/dataset/OSD-1/")
            .with_body(detail("OSD-1", "Arabidopsis roots", "Arabidopsis thaliana"))
            .create_async()
            .await;
        let _gone = server.mock("GET", "/dataset/OSD-2/").with_status(500).create_async().await;
        let _junk = server
            .mock("GET", "/dataset/OSD-3/")
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;
        let osdr = client(&server).await;

        let datasets = osdr.bulk_summaries().await.unwrap();
        assert_eq!(datasets.len(), 2);
        assert_eq!(datasets[0].accession, "OSD-1");
        assert_eq!(datasets[0].title, "Arabidopsis roots");
        assert!(datasets[0].assays.is_empty());
        assert_eq!(datasets[1].accession, "OSD-3");
        assert_eq!(datasets[1].description, "Error loading details");
    }

    #[tokio::test]
    async fn test_bulk_batches_many_ids() {
        let mut server = Server::new_async().await;
        let ids: Vec<String> = (0..45).map(|i| format!("OSD-{}", i)).collect();
        let index: serde_json::Map<String, Value> = ids.iter().map(|id| (id.clone(), json!({}))).collect();
        let _index = server
            .mock("GET", "/datasets/")
            .with_body(Value::Object(index).to_string())
            .create_async()
            .await;
        let details = server
            .mock("GET", mockito::Matcher::Regex(r"^/dataset/OSD-\d+/$".to_string()))
            .with_body(r#"{"any": {"metadata": {}}}"#)
            .expect(45)
            .create_async()
            .await;
        let osdr = client(&server).await;

        let datasets = osdr.bulk_summaries().await.unwrap();
        assert_eq!(datasets.len(), 45);
        assert!(datasets.iter().all(|d| d.description == "No description available"));
        details.assert_async().await;
    }
}
