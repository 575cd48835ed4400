use thiserror::Error;

pub type GeosketchResult<T> = Result<T, GeosketchError>;

#[derive(Debug, Error)]
pub enum GeosketchError {
    #[error("config error: {0}")]
    Config(String),

    #[error("WKT error at offset {offset}: {message}")]
    Wkt { offset: usize, message: String },

    #[error("feature table error: {0}")]
    Table(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
