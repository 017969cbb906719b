use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

/// EIP-1193 error code for a request the user declined
pub const USER_REJECTED_CODE: i64 = 4001;

/// A JSON-RPC 2.0 request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcRequest<'a> {
    /// Always "2.0"
    pub jsonrpc: &'a str,
    /// Request id
    pub id: u64,
    /// Method name
    pub method: &'a str,
    /// Positional params
    pub params: serde_json::Value,
}

impl<'a> JsonRpcRequest<'a> {
    /// Instantiate a request
    pub fn new(id: u64, method: &'a str, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

/// Response to a JSON-RPC request. Exactly one of `result` and `error` must
/// be present; a `null` result is present and distinct from a missing one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcResponse {
    /// Result value, `Some(Value::Null)` for an explicit `null`
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Error details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

/// A JSON-RPC response that could not be turned into a value
#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    /// The server answered with an error object
    #[error("JSON-RPC error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),
    /// Neither or both of `result` and `error` were present
    #[error("Malformed JSON-RPC response: {0}")]
    Malformed(&'static str),
    /// `result` does not have the expected shape
    #[error("{0}")]
    Decode(#[from] serde_json::Error),
}

impl JsonRpcResponse {
    /// Decode the result, or surface the error
    pub fn into_result<T>(self) -> Result<T, ResponseError>
    where
        T: DeserializeOwned,
    {
        match (self.result, self.error) {
            (Some(result), None) => Ok(serde_json::from_value(result)?),
            (None, Some(error)) => Err(ResponseError::Rpc(error)),
            (None, None) => Err(ResponseError::Malformed("neither result nor error")),
            (Some(_), Some(_)) => Err(ResponseError::Malformed("both result and error")),
        }
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JsonRpcError {
    /// Error code
    pub code: i64,
    /// Error message
    #[serde(default)]
    pub message: String,
}

impl JsonRpcError {
    /// Whether the user declined the request in their wallet
    pub fn is_user_rejection(&self) -> bool {
        self.code == USER_REJECTED_CODE
    }
}
