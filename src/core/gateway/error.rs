//! Gateway Error Types
//!
//! Construction-time failures. Call-time failures never surface as errors;
//! they become `RemoteResult` values.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Functions URL is not configured")]
    MissingBaseUrl,

    #[error("Invalid functions URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, GatewayError>;
