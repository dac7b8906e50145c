use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    #[error("No {field} named {slug}")]
    NotFound { field: String, slug: String },
}

pub type Result<T> = std::result::Result<T, Error>;
