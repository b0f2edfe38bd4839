use thiserror::Error;

pub type TrackResult<T> = Result<T, TrackError>;

#[derive(Error, Debug)]
pub enum TrackError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid properties: {0}")]
    InvalidProperties(String),

    #[error("Fixture error: {0}")]
    Fixture(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for TrackError {
    fn from(err: config::ConfigError) -> Self {
        TrackError::Config(err.to_string())
    }
}
