use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommerceError {
    #[error("Invalid endpoint for store '{store_id}': {message}")]
    InvalidEndpoint { store_id: String, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Store '{store_id}' returned status {status}")]
    BadStatus {
        store_id: String,
        status: reqwest::StatusCode,
    },

    #[error("Malformed orders payload from store '{store_id}': {message}")]
    MalformedPayload { store_id: String, message: String },
}
