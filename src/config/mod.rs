pub mod toml_config;

use crate::domain::model::{AuthMethod, Column, HttpMethod, QueryParam};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{CollectorError, Result};
use crate::utils::validation::{self, Validate};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_ENDPOINT: &str = "https://newsapi.org/v2/everything";
pub const DEFAULT_CREDENTIAL_VAR: &str = "API_KEY";
pub const DEFAULT_AUTH: &str = "query:apiKey";
pub const DEFAULT_AUTH_PARAM: &str = "apiKey";
pub const DEFAULT_QUERY_PARAM: &str = "q";
pub const DEFAULT_DELAY_MS: u64 = 1000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_ITEMS_PATH: &str = "articles";
pub const DEFAULT_OUTPUT_PATH: &str = "./data";
pub const DEFAULT_RAW_FILE: &str = "raw_responses.json";
pub const DEFAULT_TABLE_FILE: &str = "processed.csv";

const MAX_DELAY_MS: u64 = 600_000;
const MAX_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
}

/// Every flag is optional; the collector runs with no arguments.
#[derive(Debug, Clone, Parser)]
#[command(name = "api-collector")]
#[command(about = "Collect JSON from an external API and save raw and processed outputs")]
pub struct CliConfig {
    #[arg(long, env = "COLLECTOR_CONFIG", help = "Load settings from a TOML file instead of flags")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "COLLECTOR_API_ENDPOINT", default_value = DEFAULT_API_ENDPOINT)]
    pub api_endpoint: String,

    #[arg(long, env = "COLLECTOR_METHOD", default_value = "GET")]
    pub method: HttpMethod,

    #[arg(long, env = "COLLECTOR_CREDENTIAL_VAR", default_value = DEFAULT_CREDENTIAL_VAR)]
    pub credential_var: String,

    #[arg(
        long,
        env = "COLLECTOR_AUTH",
        default_value = DEFAULT_AUTH,
        help = "bearer, query:<param> or header:<name>"
    )]
    pub auth: AuthMethod,

    #[arg(long, env = "COLLECTOR_QUERY_PARAM", default_value = DEFAULT_QUERY_PARAM)]
    pub query_param: String,

    #[arg(
        long,
        env = "COLLECTOR_TERMS",
        value_delimiter = ',',
        default_values = ["rust", "python", "golang"]
    )]
    pub terms: Vec<String>,

    #[arg(
        long = "param",
        env = "COLLECTOR_PARAMS",
        help = "Extra key=value request parameter; repeat the flag for more than one"
    )]
    pub params: Vec<QueryParam>,

    #[arg(long, env = "COLLECTOR_DELAY_MS", default_value_t = DEFAULT_DELAY_MS)]
    pub delay_ms: u64,

    #[arg(long, env = "COLLECTOR_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    #[arg(long, env = "COLLECTOR_ITEMS_PATH", default_value = DEFAULT_ITEMS_PATH)]
    pub items_path: String,

    #[arg(
        long,
        env = "COLLECTOR_COLUMNS",
        value_delimiter = ',',
        default_values = [
            "title",
            "source=source.name",
            "author",
            "published_at=publishedAt",
            "url"
        ],
        help = "Output columns as <path> or <name>=<path>"
    )]
    pub columns: Vec<Column>,

    #[arg(long, env = "COLLECTOR_OUTPUT_PATH", default_value = DEFAULT_OUTPUT_PATH)]
    pub output_path: String,

    #[arg(long, env = "COLLECTOR_RAW_FILE", default_value = DEFAULT_RAW_FILE)]
    pub raw_file: String,

    #[arg(long, env = "COLLECTOR_TABLE_FILE", default_value = DEFAULT_TABLE_FILE)]
    pub table_file: String,

    #[arg(long, env = "COLLECTOR_DELIMITER", default_value_t = ',')]
    pub delimiter: char,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

impl ConfigProvider for CliConfig {
    fn api_endpoint(&self) -> &str {
        &self.api_endpoint
    }

    fn method(&self) -> HttpMethod {
        self.method
    }

    fn credential_var(&self) -> &str {
        &self.credential_var
    }

    fn auth(&self) -> AuthMethod {
        self.auth.clone()
    }

    fn query_param(&self) -> &str {
        &self.query_param
    }

    fn terms(&self) -> &[String] {
        &self.terms
    }

    fn parameters(&self) -> Vec<QueryParam> {
        self.params.clone()
    }

    fn request_delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn items_path(&self) -> Option<&str> {
        Some(self.items_path.as_str()).filter(|p| !p.trim().is_empty())
    }

    fn columns(&self) -> &[Column] {
        &self.columns
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn raw_file(&self) -> &str {
        &self.raw_file
    }

    fn table_file(&self) -> &str {
        &self.table_file
    }

    fn delimiter(&self) -> u8 {
        u8::try_from(self.delimiter).unwrap_or(b',')
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_delimiter(self.delimiter)?;
        validate_provider(self)
    }
}

pub(crate) fn validate_delimiter(delimiter: char) -> Result<()> {
    if !delimiter.is_ascii() || matches!(delimiter, '"' | '\n' | '\r') {
        return Err(CollectorError::InvalidConfigValueError {
            field: "delimiter".to_string(),
            value: delimiter.to_string(),
            reason: "Delimiter must be a single ASCII character other than a quote or newline"
                .to_string(),
        });
    }
    Ok(())
}

/// 兩種設定來源共用的檢查
pub(crate) fn validate_provider<C: ConfigProvider>(config: &C) -> Result<()> {
    validation::validate_url("api_endpoint", config.api_endpoint())?;
    validation::validate_non_empty_string("credential_var", config.credential_var())?;
    validation::validate_non_empty_string("query_param", config.query_param())?;
    validation::validate_terms("terms", config.terms())?;

    validation::validate_range(
        "delay_ms",
        config.request_delay().as_millis() as u64,
        0,
        MAX_DELAY_MS,
    )?;
    validation::validate_range("timeout_secs", config.timeout().as_secs(), 1, MAX_TIMEOUT_SECS)?;

    if config.columns().is_empty() {
        return Err(CollectorError::InvalidConfigValueError {
            field: "columns".to_string(),
            value: String::new(),
            reason: "At least one output column is required".to_string(),
        });
    }

    validation::validate_path("output_path", config.output_path())?;
    validation::validate_file_name("raw_file", config.raw_file())?;
    validation::validate_file_name("table_file", config.table_file())?;
    if config.raw_file() == config.table_file() {
        return Err(CollectorError::ConfigError {
            message: "raw_file and table_file must be different files".to_string(),
        });
    }

    Ok(())
}
