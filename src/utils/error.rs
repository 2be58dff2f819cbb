use thiserror::Error;

#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("Missing credential: environment variable {var} is not set")]
    MissingCredential { var: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration parse error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API returned status {status}: {message}")]
    HttpStatusError { status: u16, message: String },

    #[error("Response is not valid JSON: {message}")]
    ParseError { message: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Request,
    Parse,
    Output,
}

impl CollectorError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingCredential { .. }
            | Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. } => ErrorCategory::Configuration,
            Self::ApiError(_) | Self::HttpStatusError { .. } => ErrorCategory::Request,
            Self::ParseError { .. } => ErrorCategory::Parse,
            Self::CsvError(_) | Self::IoError(_) | Self::SerializationError(_) => {
                ErrorCategory::Output
            }
        }
    }

    /// 單一請求層級的錯誤只會被記錄，不會讓程式以這些代碼結束
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Configuration => 1,
            ErrorCategory::Output => 2,
            ErrorCategory::Request | ErrorCategory::Parse => 3,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::MissingCredential { var } => {
                format!("Please set {} in your environment or .env file", var)
            }
            Self::InvalidConfigValueError { field, reason, .. } => {
                format!("Invalid configuration for {}: {}", field, reason)
            }
            Self::IoError(e) => format!("File operation failed: {}", e),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check the .env file, COLLECTOR_* environment variables and command line flags"
            }
            ErrorCategory::Request => "Check network connectivity, the API endpoint and the credential",
            ErrorCategory::Parse => "Check that the endpoint returns JSON",
            ErrorCategory::Output => "Check that the output directory is writable",
        }
    }
}

pub type Result<T> = std::result::Result<T, CollectorError>;
