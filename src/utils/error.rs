use thiserror::Error;

#[derive(Error, Debug)]
pub enum LayerError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API returned HTTP {status} for {url}")]
    HttpStatusError { url: String, status: u16 },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("No walking route found from {origin} to {destination}")]
    NoRouteFound { origin: String, destination: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },
}

/// 錯誤分類，對應網路失敗、找不到路線、設定錯誤
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Routing,
    Configuration,
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl LayerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LayerError::ApiError(_)
            | LayerError::HttpStatusError { .. }
            | LayerError::SerializationError(_) => ErrorCategory::Network,
            LayerError::NoRouteFound { .. } => ErrorCategory::Routing,
            LayerError::ConfigError { .. }
            | LayerError::InvalidConfigValueError { .. }
            | LayerError::MissingConfigError { .. } => ErrorCategory::Configuration,
            LayerError::IoError(_) => ErrorCategory::Io,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Routing => ErrorSeverity::Low,
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Io => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            LayerError::ApiError(_) => "Check network connectivity and the service host",
            LayerError::HttpStatusError { status, .. } if *status == 401 || *status == 403 => {
                "Check that the access token is valid and has the required scopes"
            }
            LayerError::HttpStatusError { .. } => "The service rejected the request, retry later",
            LayerError::SerializationError(_) => {
                "The service returned an unexpected payload, check host and tileset"
            }
            LayerError::NoRouteFound { .. } => "Pick another destination closer to a walkable path",
            LayerError::IoError(_) => "Check file paths and permissions",
            LayerError::ConfigError { .. }
            | LayerError::InvalidConfigValueError { .. }
            | LayerError::MissingConfigError { .. } => "Fix the configuration file and run again",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not reach the map service: {}", self),
            ErrorCategory::Routing => format!("Routing failed: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Io => format!("File error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, LayerError>;
