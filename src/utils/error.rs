use crate::utils::forms::ValidationErrors;
use thiserror::Error;

/// 後端未提供訊息時的預設錯誤文字
pub const DEFAULT_ERROR_MESSAGE: &str = "Something went wrong!";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error(
        "API responded with {status}: {}",
        .message.as_deref().unwrap_or(DEFAULT_ERROR_MESSAGE)
    )]
    ApiError {
        status: u16,
        message: Option<String>,
    },

    #[error("Not authenticated")]
    Unauthorized { message: Option<String> },

    #[error("Request failed: {message}")]
    FailError { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV output error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Validation failed: {0}")]
    ValidationError(ValidationErrors),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Auth,
    Backend,
    Input,
    System,
}

impl ClientError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ClientError::HttpError(_) => ErrorCategory::Network,
            ClientError::Unauthorized { .. } => ErrorCategory::Auth,
            ClientError::ApiError { .. } | ClientError::FailError { .. } => ErrorCategory::Backend,
            ClientError::ValidationError(_)
            | ClientError::InvalidConfigValueError { .. }
            | ClientError::MissingConfigError { .. }
            | ClientError::ConfigError { .. }
            | ClientError::UrlError(_) => ErrorCategory::Input,
            ClientError::IoError(_)
            | ClientError::SerializationError(_)
            | ClientError::CsvError(_) => ErrorCategory::System,
        }
    }

    /// 後端回傳的 `message`，若沒有則為 None
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            ClientError::FailError { message } => Some(message.as_str()),
            ClientError::ApiError { message, .. } | ClientError::Unauthorized { message } => {
                message.as_deref()
            }
            _ => None,
        }
    }

    /// 顯示給使用者的訊息：優先使用後端訊息，否則使用 fallback
    pub fn message_or(&self, fallback: &str) -> String {
        self.backend_message()
            .map(str::to_string)
            .unwrap_or_else(|| fallback.to_string())
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized { .. })
    }

    /// API client 已經處理過（toast 或導向登入頁）的錯誤
    pub fn is_reported(&self) -> bool {
        matches!(
            self,
            ClientError::HttpError(_) | ClientError::ApiError { .. } | ClientError::Unauthorized { .. }
        )
    }

    /// 值得重試的錯誤：連線失敗或 5xx
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::HttpError(e) => !e.is_decode(),
            ClientError::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ClientError::HttpError(e) if e.is_timeout() => {
                "The server took too long to respond".to_string()
            }
            ClientError::HttpError(e) if e.is_connect() => {
                "Could not reach the rental server".to_string()
            }
            ClientError::HttpError(_) => DEFAULT_ERROR_MESSAGE.to_string(),
            ClientError::Unauthorized { .. } => "Please log in to continue".to_string(),
            ClientError::ValidationError(errors) => errors.to_string(),
            other => other
                .backend_message()
                .map(str::to_string)
                .unwrap_or_else(|| other.to_string()),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check --base-url and that the backend is running",
            ErrorCategory::Auth => "Run `bike-rental login` to start a new session",
            ErrorCategory::Backend => "Review the request values and try again",
            ErrorCategory::Input => "Fix the highlighted fields or configuration values",
            ErrorCategory::System => "Check file permissions for the session and config files",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Input => 2,
            ErrorCategory::Auth => 3,
            _ => 1,
        }
    }
}

impl From<ValidationErrors> for ClientError {
    fn from(errors: ValidationErrors) -> Self {
        ClientError::ValidationError(errors)
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
