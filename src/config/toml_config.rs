use crate::config::{
    validate_delimiter, validate_provider, DEFAULT_AUTH_PARAM, DEFAULT_CREDENTIAL_VAR, DEFAULT_DELAY_MS,
    DEFAULT_OUTPUT_PATH, DEFAULT_QUERY_PARAM, DEFAULT_RAW_FILE, DEFAULT_TABLE_FILE,
    DEFAULT_TIMEOUT_SECS,
};
use crate::domain::model::{AuthMethod, Column, HttpMethod, QueryParam};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{CollectorError, Result};
use crate::utils::validation::Validate;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    pub source: SourceConfig,
    #[serde(default)]
    pub request: RequestConfig,
    pub projection: ProjectionConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub endpoint: String,
    pub method: Option<HttpMethod>,
    pub credential_var: Option<String>,
    pub auth: Option<AuthMethod>,
    pub query_param: Option<String>,
    pub terms: Vec<String>,
    pub parameters: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestConfig {
    pub delay_ms: Option<u64>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectionConfig {
    pub items_path: Option<String>,
    pub columns: Vec<Column>,
    pub delimiter: Option<char>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    pub output_path: Option<String>,
    pub raw_file: Option<String>,
    pub table_file: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| CollectorError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${API_BASE_URL})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| CollectorError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl ConfigProvider for TomlConfig {
    fn api_endpoint(&self) -> &str {
        &self.source.endpoint
    }

    fn method(&self) -> HttpMethod {
        self.source.method.unwrap_or(HttpMethod::Get)
    }

    fn credential_var(&self) -> &str {
        self.source
            .credential_var
            .as_deref()
            .unwrap_or(DEFAULT_CREDENTIAL_VAR)
    }

    fn auth(&self) -> AuthMethod {
        match &self.source.auth {
            Some(auth) => auth.clone(),
            None => AuthMethod::Query(DEFAULT_AUTH_PARAM.to_string()),
        }
    }

    fn query_param(&self) -> &str {
        self.source
            .query_param
            .as_deref()
            .unwrap_or(DEFAULT_QUERY_PARAM)
    }

    fn terms(&self) -> &[String] {
        &self.source.terms
    }

    fn parameters(&self) -> Vec<QueryParam> {
        self.source
            .parameters
            .iter()
            .flatten()
            .map(|(key, value)| QueryParam {
                key: key.clone(),
                value: value.clone(),
            })
            .collect()
    }

    fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request.delay_ms.unwrap_or(DEFAULT_DELAY_MS))
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.request.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    fn items_path(&self) -> Option<&str> {
        self.projection
            .items_path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
    }

    fn columns(&self) -> &[Column] {
        &self.projection.columns
    }

    fn output_path(&self) -> &str {
        self.output
            .output_path
            .as_deref()
            .unwrap_or(DEFAULT_OUTPUT_PATH)
    }

    fn raw_file(&self) -> &str {
        self.output.raw_file.as_deref().unwrap_or(DEFAULT_RAW_FILE)
    }

    fn table_file(&self) -> &str {
        self.output.table_file.as_deref().unwrap_or(DEFAULT_TABLE_FILE)
    }

    fn delimiter(&self) -> u8 {
        self.projection
            .delimiter
            .and_then(|d| u8::try_from(d).ok())
            .unwrap_or(b',')
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        if let Some(delimiter) = self.projection.delimiter {
            validate_delimiter(delimiter)?;
        }
        validate_provider(self)
    }
}
