//! JSON-RPC envelopes for the ERP web controllers
//!
//! Controllers are called with `{"jsonrpc": "2.0", "method": "call", "params": {...}}`
//! and answer with either `result` or an `error` object.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DataFetchError;
use crate::location::LocationId;

/// Outgoing request body
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest<P: Serialize> {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    pub params: P,
    pub id: u64,
}

impl<P: Serialize> RpcRequest<P> {
    pub fn call(id: u64, params: P) -> Self {
        Self {
            jsonrpc: "2.0",
            method: "call",
            params,
            id,
        }
    }
}

/// Parameters of the layout endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutParams {
    pub company_id: Option<String>,
    pub loc_id: Option<String>,
}

impl LayoutParams {
    pub fn new(company_id: Option<&str>, location: Option<&LocationId>) -> Self {
        Self {
            company_id: company_id.map(str::to_string),
            loc_id: location.map(|l| l.0.clone()),
        }
    }
}

/// Parameters of the quantity and product endpoints
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationCodeParams {
    pub loc_code: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<RpcErrorData>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorData {
    #[serde(default)]
    message: Option<String>,
}

/// Extract `result` from a response body, mapping an `error` object to [`DataFetchError::Rpc`]
pub fn unwrap_response(body: &str) -> Result<Value, DataFetchError> {
    let response: RpcResponse = serde_json::from_str(body)?;
    if let Some(error) = response.error {
        // Odoo puts the useful text in data.message
        let message = error
            .data
            .and_then(|d| d.message)
            .filter(|m| !m.is_empty())
            .unwrap_or(error.message);
        return Err(DataFetchError::Rpc {
            code: error.code,
            message,
        });
    }
    Ok(response.result.unwrap_or(Value::Null))
}
