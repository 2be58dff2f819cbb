use crate::domain::model::{AuthMethod, Credential, HttpMethod, QueryParam};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{CollectorError, Result};
use reqwest::{Client, RequestBuilder};
use std::time::Duration;

const ERROR_BODY_PREVIEW: usize = 200;

/// One external API, one request per query term.
pub struct ApiClient {
    client: Client,
    endpoint: String,
    method: HttpMethod,
    auth: AuthMethod,
    credential: Credential,
    query_param: String,
    parameters: Vec<QueryParam>,
    timeout: Duration,
}

impl ApiClient {
    pub fn from_config<C: ConfigProvider>(config: &C, credential: Credential) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("api-collector/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.api_endpoint().to_string(),
            method: config.method(),
            auth: config.auth(),
            credential,
            query_param: config.query_param().to_string(),
            parameters: config.parameters(),
            timeout: config.timeout(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_request(&self, term: &str) -> RequestBuilder {
        let extra: Vec<(&str, &str)> = self
            .parameters
            .iter()
            .map(|p| (p.key.as_str(), p.value.as_str()))
            .collect();

        // GET 把查詢詞放在 query string，POST 放在 JSON body
        let request = match self.method {
            HttpMethod::Get => self
                .client
                .get(&self.endpoint)
                .query(&[(self.query_param.as_str(), term)])
                .query(&extra),
            HttpMethod::Post => {
                let mut body = serde_json::Map::new();
                for (key, value) in &extra {
                    body.insert(key.to_string(), serde_json::Value::String(value.to_string()));
                }
                body.insert(
                    self.query_param.clone(),
                    serde_json::Value::String(term.to_string()),
                );
                self.client.post(&self.endpoint).json(&body)
            }
        };

        let request = match &self.auth {
            AuthMethod::Query(param) => {
                request.query(&[(param.as_str(), self.credential.expose())])
            }
            AuthMethod::Header(name) => request.header(name.as_str(), self.credential.expose()),
            AuthMethod::Bearer => request.bearer_auth(self.credential.expose()),
        };

        request.timeout(self.timeout)
    }

    /// Sends the request for `term` and parses a 2xx body as JSON.
    pub async fn fetch(&self, term: &str) -> Result<serde_json::Value> {
        tracing::debug!("📡 {} {} (term: {})", self.method, self.endpoint, term);

        // 錯誤訊息中的 URL 可能帶有 query 憑證，先移除
        let response = self
            .build_request(term)
            .send()
            .await
            .map_err(|e| CollectorError::ApiError(e.without_url()))?;
        let status = response.status();
        tracing::debug!("📡 API response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
            return Err(CollectorError::HttpStatusError {
                status: status.as_u16(),
                message: format!(
                    "{} {}",
                    status.canonical_reason().unwrap_or("Unknown status"),
                    preview
                )
                .trim()
                .to_string(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| CollectorError::ApiError(e.without_url()))?;
        serde_json::from_str(&text).map_err(|e| CollectorError::ParseError {
            message: e.to_string(),
        })
    }
}
