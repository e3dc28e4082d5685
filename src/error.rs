use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read log input: {0}")]
    Io(#[from] std::io::Error),
    #[error("json parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("expected a JSON array of log records or JSON lines")]
    NotABatch,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
