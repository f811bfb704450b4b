use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parsing failed: {0}")]
    FeedParse(#[from] feed_rs::parser::ParseFeedError),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown schedule interval: {0}")]
    UnknownSchedule(String),

    #[error("Stored watermark is not a timestamp: {0}")]
    InvalidWatermark(String),

    #[error("Not allowed: {0}")]
    Unauthorized(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
