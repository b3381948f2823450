//! Errors raised while fetching or decoding ERP data

use thiserror::Error;

/// A layout, occupancy, or product request failed or returned an unexpected shape.
///
/// Callers recover locally: an empty layout, an "unknown" occupancy tier, or an
/// empty product list. It is never surfaced to the user as a hard failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataFetchError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("HTTP {status}: {text}")]
    Http { status: u16, text: String },
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("malformed payload: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for DataFetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}
