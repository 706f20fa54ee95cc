#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP status {status} from {url}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("Failed to decode JSON response: {0}")]
    Decode(#[from] serde_json::Error),
}
