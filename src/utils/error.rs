use thiserror::Error;

/// Failure kinds shared by every carrier adapter and the registry.
///
/// All variants are tracking failures; the variant names the layer that
/// went wrong.
#[derive(Error, Debug)]
pub enum TrackingError {
    /// The carrier was reached but its API reported an error
    /// (bad credentials, malformed request, service fault).
    #[error("Carrier API failure: {message}")]
    Api { message: String },

    /// Transport-level failure: timeout, DNS, connection reset.
    #[error("Network failure: {message}")]
    Network { message: String },

    /// The carrier answered but does not know this tracking number.
    #[error("Tracking number not found by carrier: {message}")]
    Number { message: String },

    /// The number does not match the adapter's format.
    #[error("Invalid tracking number: {tracking_number}")]
    InvalidTrackingNumber { tracking_number: String },

    /// No registered carrier recognizes the number.
    #[error("Unsupported tracking number: {tracking_number}")]
    UnsupportedTrackingNumber { tracking_number: String },
}

impl TrackingError {
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn number(message: impl Into<String>) -> Self {
        Self::Number {
            message: message.into(),
        }
    }

    pub fn invalid(tracking_number: &str) -> Self {
        Self::InvalidTrackingNumber {
            tracking_number: tracking_number.to_string(),
        }
    }

    pub fn unsupported(tracking_number: &str) -> Self {
        Self::UnsupportedTrackingNumber {
            tracking_number: tracking_number.to_string(),
        }
    }

    /// Process exit code used by the command line front end.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidTrackingNumber { .. } | Self::UnsupportedTrackingNumber { .. } => 2,
            Self::Number { .. } => 3,
            Self::Api { .. } => 4,
            Self::Network { .. } => 5,
        }
    }
}

impl From<reqwest::Error> for TrackingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            TrackingError::network(err.to_string())
        } else if let Some(status) = err.status() {
            TrackingError::api(format!("HTTP {}: {}", status, err))
        } else {
            TrackingError::api(err.to_string())
        }
    }
}

impl From<serde_json::Error> for TrackingError {
    fn from(err: serde_json::Error) -> Self {
        TrackingError::api(format!("Malformed carrier response: {}", err))
    }
}

impl From<ConfigError> for TrackingError {
    fn from(err: ConfigError) -> Self {
        TrackingError::api(format!("Carrier configuration: {}", err))
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration key not found: {namespace}.{key}")]
    KeyNotFound { namespace: String, key: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration parse error: {message}")]
    Parse { message: String },

    #[error("Invalid config value for '{field}': {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub fn key_not_found(namespace: &str, keys: &[&str]) -> Self {
        Self::KeyNotFound {
            namespace: namespace.to_string(),
            key: keys.join("."),
        }
    }
}

pub type Result<T> = std::result::Result<T, TrackingError>;
