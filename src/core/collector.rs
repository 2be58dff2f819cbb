use crate::adapters::http::ApiClient;
use crate::core::projection::Projector;
use crate::domain::model::{
    Collection, Credential, OutputPaths, RawResponse, RequestFailure, TransformResult,
};
use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
use crate::utils::error::Result;

/// Sequential collector: one request per term, fixed delay in between.
pub struct ApiCollector<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    client: ApiClient,
    projector: Projector,
}

impl<S: Storage, C: ConfigProvider> ApiCollector<S, C> {
    pub fn new(storage: S, config: C, credential: Credential) -> Result<Self> {
        let client = ApiClient::from_config(&config, credential)?;
        let projector = Projector::from_config(&config);
        Ok(Self {
            storage,
            config,
            client,
            projector,
        })
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for ApiCollector<S, C> {
    async fn extract(&self) -> Result<Collection> {
        let terms = self.config.terms();
        let delay = self.config.request_delay();
        let mut collection = Collection::default();

        tracing::info!(
            "📡 Requesting {} terms from {} ({}ms between requests)",
            terms.len(),
            self.client.endpoint(),
            delay.as_millis()
        );

        for (index, term) in terms.iter().enumerate() {
            // 不論上一個請求成功與否都要等待，避免超過 API 限流
            if index > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            collection.attempted += 1;
            match self.client.fetch(term).await {
                Ok(body) => {
                    tracing::info!("✅ [{}/{}] {}: response received", index + 1, terms.len(), term);
                    collection.responses.push(RawResponse {
                        term: term.clone(),
                        body,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        "❌ [{}/{}] {}: {} (Category: {:?})",
                        index + 1,
                        terms.len(),
                        term,
                        e,
                        e.category()
                    );
                    collection.failures.push(RequestFailure::from_error(term, &e));
                }
            }
        }

        Ok(collection)
    }

    async fn transform(&self, collection: &Collection) -> Result<TransformResult> {
        let raw_responses: Vec<serde_json::Value> = collection
            .responses
            .iter()
            .map(|r| r.body.clone())
            .collect();

        let projection = self.projector.project(&raw_responses);
        let table_output = self.projector.render(&projection)?;

        Ok(TransformResult {
            raw_responses,
            projection,
            table_output,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<OutputPaths> {
        let raw_json = serde_json::to_vec_pretty(&result.raw_responses)?;

        tracing::debug!(
            "Writing {} raw records ({} bytes) to {}",
            result.raw_responses.len(),
            raw_json.len(),
            self.config.raw_file()
        );
        self.storage.write_file(self.config.raw_file(), &raw_json).await?;

        tracing::debug!(
            "Writing {} rows to {}",
            result.projection.rows.len(),
            self.config.table_file()
        );
        self.storage
            .write_file(self.config.table_file(), &result.table_output)
            .await?;

        Ok(OutputPaths {
            raw_path: self.storage.location(self.config.raw_file()),
            table_path: self.storage.location(self.config.table_file()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{AuthMethod, Column, FailureKind, HttpMethod, QueryParam};
    use crate::utils::error::CollectorError;
    use httpmock::prelude::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                CollectorError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        fn location(&self, path: &str) -> String {
            format!("memory://{}", path)
        }
    }

    struct MockConfig {
        api_endpoint: String,
        terms: Vec<String>,
        delay: Duration,
        timeout: Duration,
        columns: Vec<Column>,
    }

    impl MockConfig {
        fn new(api_endpoint: String, terms: &[&str]) -> Self {
            Self {
                api_endpoint,
                terms: terms.iter().map(|t| t.to_string()).collect(),
                delay: Duration::ZERO,
                timeout: Duration::from_secs(5),
                columns: vec!["name".parse().unwrap()],
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn api_endpoint(&self) -> &str {
            &self.api_endpoint
        }
        fn method(&self) -> HttpMethod {
            HttpMethod::Get
        }
        fn credential_var(&self) -> &str {
            "UNUSED"
        }
        fn auth(&self) -> AuthMethod {
            AuthMethod::Query("key".to_string())
        }
        fn query_param(&self) -> &str {
            "q"
        }
        fn terms(&self) -> &[String] {
            &self.terms
        }
        fn parameters(&self) -> Vec<QueryParam> {
            vec![]
        }
        fn request_delay(&self) -> Duration {
            self.delay
        }
        fn timeout(&self) -> Duration {
            self.timeout
        }
        fn items_path(&self) -> Option<&str> {
            Some("items")
        }
        fn columns(&self) -> &[Column] {
            &self.columns
        }
        fn output_path(&self) -> &str {
            "test_output"
        }
        fn raw_file(&self) -> &str {
            "raw.json"
        }
        fn table_file(&self) -> &str {
            "table.csv"
        }
        fn delimiter(&self) -> u8 {
            b','
        }
    }

    fn build_collector(config: MockConfig) -> (ApiCollector<MockStorage, MockConfig>, MockStorage) {
        let storage = MockStorage::new();
        let collector = ApiCollector::new(storage.clone(), config, Credential::new("k")).unwrap();
        (collector, storage)
    }

    #[tokio::test]
    async fn test_extract_keeps_going_after_failures() {
        let server = MockServer::start();
        let alpha = server.mock(|when, then| {
            when.method(GET).path("/search").query_param("q", "alpha");
            then.status(200).json_body(serde_json::json!({"items": [{"name": "a"}]}));
        });
        let beta = server.mock(|when, then| {
            when.method(GET).path("/search").query_param("q", "beta");
            then.status(500);
        });
        let gamma = server.mock(|when, then| {
            when.method(GET).path("/search").query_param("q", "gamma");
            then.status(200).body("{not json");
        });
        let delta = server.mock(|when, then| {
            when.method(GET).path("/search").query_param("q", "delta");
            then.status(200).json_body(serde_json::json!({"items": [{"name": "d"}]}));
        });

        let (collector, _) = build_collector(MockConfig::new(
            server.url("/search"),
            &["alpha", "beta", "gamma", "delta"],
        ));
        let collection = collector.extract().await.unwrap();

        alpha.assert();
        beta.assert();
        gamma.assert();
        delta.assert();

        assert_eq!(collection.attempted, 4);
        let terms: Vec<&str> = collection.responses.iter().map(|r| r.term.as_str()).collect();
        assert_eq!(terms, vec!["alpha", "delta"]);

        assert_eq!(collection.failures.len(), 2);
        assert_eq!(collection.failures[0].term, "beta");
        assert_eq!(collection.failures[0].kind, FailureKind::Status);
        assert_eq!(collection.failures[0].status, Some(500));
        assert_eq!(collection.failures[1].term, "gamma");
        assert_eq!(collection.failures[1].kind, FailureKind::Parse);
    }

    #[tokio::test]
    async fn test_extract_records_connection_errors() {
        // Nothing listens on port 9 (discard) on a test machine.
        let (collector, _) = build_collector(MockConfig::new(
            "http://127.0.0.1:9/search".to_string(),
            &["alpha"],
        ));
        let collection = collector.extract().await.unwrap();

        assert_eq!(collection.attempted, 1);
        assert!(collection.responses.is_empty());
        assert_eq!(collection.failures[0].kind, FailureKind::Request);
    }

    #[tokio::test]
    async fn test_extract_records_timeout_and_continues() {
        let server = MockServer::start();
        let slow = server.mock(|when, then| {
            when.method(GET).path("/search").query_param("q", "slow");
            then.status(200)
                .delay(Duration::from_millis(500))
                .json_body(serde_json::json!({"items": [{"name": "late"}]}));
        });
        let fast = server.mock(|when, then| {
            when.method(GET).path("/search").query_param("q", "fast");
            then.status(200).json_body(serde_json::json!({"items": [{"name": "f"}]}));
        });

        let mut config = MockConfig::new(server.url("/search"), &["slow", "fast"]);
        config.timeout = Duration::from_millis(100);
        let (collector, _) = build_collector(config);
        let collection = collector.extract().await.unwrap();

        slow.assert();
        fast.assert();
        assert_eq!(collection.attempted, 2);
        assert_eq!(collection.failures.len(), 1);
        assert_eq!(collection.failures[0].term, "slow");
        assert_eq!(collection.failures[0].kind, FailureKind::Request);
        assert_eq!(collection.responses.len(), 1);
        assert_eq!(collection.responses[0].term, "fast");
    }

    #[tokio::test]
    async fn test_extract_waits_between_requests() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/search");
            then.status(200).json_body(serde_json::json!({"items": []}));
        });

        let mut config = MockConfig::new(server.url("/search"), &["a", "b", "c"]);
        config.delay = Duration::from_millis(100);
        let (collector, _) = build_collector(config);

        let started = std::time::Instant::now();
        let collection = collector.extract().await.unwrap();
        let elapsed = started.elapsed();

        api_mock.assert_hits(3);
        assert_eq!(collection.attempted, 3);
        assert!(elapsed >= Duration::from_millis(200), "elapsed: {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_transform_and_load_write_both_files() {
        let (collector, storage) = build_collector(MockConfig::new("http://unused".to_string(), &["alpha"]));
        let collection = Collection {
            responses: vec![RawResponse {
                term: "alpha".to_string(),
                body: serde_json::json!({"items": [{"name": "x"}, {"name": "y"}, {"name": "z"}]}),
            }],
            failures: vec![],
            attempted: 1,
        };

        let result = collector.transform(&collection).await.unwrap();
        assert_eq!(result.projection.rows.len(), 3);

        let outputs = collector.load(result).await.unwrap();
        assert_eq!(outputs.raw_path, "memory://raw.json");
        assert_eq!(outputs.table_path, "memory://table.csv");

        let raw: Vec<serde_json::Value> =
            serde_json::from_slice(&storage.get_file("raw.json").await.unwrap()).unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0], collection.responses[0].body);

        let table = String::from_utf8(storage.get_file("table.csv").await.unwrap()).unwrap();
        assert_eq!(table, "record,name\n0,x\n0,y\n0,z\n");
    }

    #[tokio::test]
    async fn test_load_with_no_responses_writes_empty_outputs() {
        let (collector, storage) = build_collector(MockConfig::new("http://unused".to_string(), &["alpha"]));
        let result = collector.transform(&Collection::default()).await.unwrap();
        collector.load(result).await.unwrap();

        let raw = String::from_utf8(storage.get_file("raw.json").await.unwrap()).unwrap();
        assert_eq!(raw, "[]");
        let table = String::from_utf8(storage.get_file("table.csv").await.unwrap()).unwrap();
        assert_eq!(table, "record,name\n");
    }
}
