//! Error types for the REST client.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::topic::ProducerResponse;

pub type Result<T> = std::result::Result<T, Error>;

/// Error body returned by the REST proxy on a failed request
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorMessage {
    #[serde(skip_serializing_if = "is_zero")]
    pub error_code: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
}

fn is_zero(code: &i64) -> bool {
    *code == 0
}

#[derive(Debug, Error)]
pub enum Error {
    /// Connection, timeout or body read failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Unexpected status code, server sent a decodable error body
    #[error("API Error: StatusCode {status} ErrorCode {error_code} {message}")]
    Status {
        status: StatusCode,
        error_code: i64,
        message: String,
    },

    /// Unexpected status code, server sent something that is not an error body
    #[error("API Error: StatusCode {status}: {body}")]
    Api { status: StatusCode, body: String },

    /// The request went through but at least one record was rejected
    #[error("Error: produce messages to {target}: {}", .failures.join(": "))]
    Produce {
        target: String,
        response: Box<ProducerResponse>,
        failures: Vec<String>,
    },

    #[error("Error: empty {0}")]
    MissingArgument(&'static str),

    #[error("Must provide a value schema or value schema id for Avro format")]
    SchemaRequired,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// The decoded produce response when only some records failed.
    pub fn produce_response(&self) -> Option<&ProducerResponse> {
        match self {
            Error::Produce { response, .. } => Some(&**response),
            _ => None,
        }
    }

    /// HTTP status of a rejected request, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Status { status, .. } | Error::Api { status, .. } => Some(*status),
            Error::Http(e) => e.status(),
            _ => None,
        }
    }
}
