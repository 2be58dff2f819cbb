use crate::utils::error::{CollectorError, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// API 金鑰，只在發送請求時取出，Debug 輸出一律遮蔽
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// 從環境變數讀取憑證；未設定或只有空白都視為缺少
    pub fn from_env(var: &str) -> Result<Self> {
        match std::env::var(var) {
            Ok(value) if !value.trim().is_empty() => Ok(Self(value)),
            _ => Err(CollectorError::MissingCredential {
                var: var.to_string(),
            }),
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// How the credential is attached to each request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum AuthMethod {
    Query(String),
    Header(String),
    Bearer,
}

impl FromStr for AuthMethod {
    type Err = CollectorError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("bearer") {
            return Ok(Self::Bearer);
        }

        let invalid = |reason: &str| CollectorError::InvalidConfigValueError {
            field: "auth".to_string(),
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let (kind, name) = s
            .split_once(':')
            .ok_or_else(|| invalid("Expected bearer, query:<param> or header:<name>"))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(invalid("Parameter or header name cannot be empty"));
        }

        match kind.trim().to_ascii_lowercase().as_str() {
            "query" => Ok(Self::Query(name.to_string())),
            "header" => Ok(Self::Header(name.to_string())),
            _ => Err(invalid("Expected bearer, query:<param> or header:<name>")),
        }
    }
}

impl TryFrom<String> for AuthMethod {
    type Error = CollectorError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query(param) => write!(f, "query:{}", param),
            Self::Header(name) => write!(f, "header:{}", name),
            Self::Bearer => f.write_str("bearer"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum HttpMethod {
    Get,
    Post,
}

impl FromStr for HttpMethod {
    type Err = CollectorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            other => Err(CollectorError::InvalidConfigValueError {
                field: "method".to_string(),
                value: other.to_string(),
                reason: "Only GET and POST are supported".to_string(),
            }),
        }
    }
}

impl TryFrom<String> for HttpMethod {
    type Error = CollectorError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Post => f.write_str("POST"),
        }
    }
}

/// Static extra parameter sent with every request (`key=value`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParam {
    pub key: String,
    pub value: String,
}

impl FromStr for QueryParam {
    type Err = CollectorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => Ok(Self {
                key: key.trim().to_string(),
                value: value.to_string(),
            }),
            _ => Err(CollectorError::InvalidConfigValueError {
                field: "params".to_string(),
                value: s.to_string(),
                reason: "Expected key=value".to_string(),
            }),
        }
    }
}

/// One output column: header name plus the dotted path read from each item.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct Column {
    pub name: String,
    pub path: String,
}

impl FromStr for Column {
    type Err = CollectorError;

    fn from_str(s: &str) -> Result<Self> {
        let (name, path) = match s.split_once('=') {
            Some((name, path)) => (name.trim(), path.trim()),
            None => (s.trim(), s.trim()),
        };

        if name.is_empty() || path.is_empty() {
            return Err(CollectorError::InvalidConfigValueError {
                field: "columns".to_string(),
                value: s.to_string(),
                reason: "Expected <path> or <name>=<path>".to_string(),
            });
        }

        Ok(Self {
            name: name.to_string(),
            path: path.to_string(),
        })
    }
}

impl TryFrom<String> for Column {
    type Error = CollectorError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub term: String,
    pub body: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// 連線失敗或逾時
    Request,
    Status,
    Parse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFailure {
    pub term: String,
    pub kind: FailureKind,
    pub status: Option<u16>,
    pub message: String,
}

impl RequestFailure {
    pub fn from_error(term: &str, error: &CollectorError) -> Self {
        let (kind, status) = match error {
            CollectorError::HttpStatusError { status, .. } => (FailureKind::Status, Some(*status)),
            CollectorError::ParseError { .. } => (FailureKind::Parse, None),
            CollectorError::ApiError(e) => (FailureKind::Request, e.status().map(|s| s.as_u16())),
            _ => (FailureKind::Request, None),
        };

        Self {
            term: term.to_string(),
            kind,
            status,
            message: error.to_string(),
        }
    }
}

/// Everything gathered by the request loop, in request order.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub responses: Vec<RawResponse>,
    pub failures: Vec<RequestFailure>,
    pub attempted: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedRow {
    pub record: usize,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub record: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct Projection {
    pub records: usize,
    pub header: Vec<String>,
    pub rows: Vec<ProcessedRow>,
    pub skipped: Vec<SkippedRecord>,
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub raw_responses: Vec<serde_json::Value>,
    pub projection: Projection,
    pub table_output: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub raw_path: String,
    pub table_path: String,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<RequestFailure>,
    pub rows: usize,
    pub skipped: usize,
    pub outputs: OutputPaths,
}

impl RunSummary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReprojectSummary {
    pub records: usize,
    pub rows: usize,
    pub skipped: usize,
    pub table_path: String,
}
