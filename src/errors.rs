use thiserror::Error;

#[derive(Debug, Error)]
pub enum TapClawError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Device command failed: {0}")]
    DeviceCommand(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Model call failed: {0}")]
    ModelCall(String),

    #[error("Malformed model output: {0}")]
    MalformedAction(String),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

pub type TapClawResult<T> = Result<T, TapClawError>;
