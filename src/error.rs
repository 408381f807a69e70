use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid config: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("browser error: {0}")]
    Browser(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("invalid selector: {0}")]
    Selector(String),
}

pub type Result<T> = std::result::Result<T, Error>;
