//! JSON-RPC protocol representations and formatting utilities
//!
//! Provides standardized mapping of protocol failures to valid JSON-RPC payloads.

use rust_mcp_sdk::schema::{
    JsonrpcErrorResponse, JsonrpcResultResponse, RequestId, Result as McpResult, RpcError,
};
use serde_json::{json, Value};
use thiserror::Error;

pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid params: {message}")]
    InvalidParams {
        code: &'static str,
        message: &'static str,
    },
    #[error("internal error: {0}")]
    Internal(String),
}

impl ProtocolError {
    pub fn invalid_params(code: &'static str, message: &'static str) -> Self {
        Self::InvalidParams { code, message }
    }
}

pub fn is_json_rpc_error(value: &Value) -> bool {
    value.get("error").is_some()
}

pub fn protocol_error_to_json_rpc(id: Option<Value>, err: ProtocolError) -> Value {
    match err {
        ProtocolError::InvalidParams { code, message } => json_rpc_error_with_data(
            id,
            INVALID_PARAMS,
            "Invalid params",
            Some(json!({
                "code": code,
                "message": message,
                "details": {}
            })),
        ),
        ProtocolError::Internal(message) => {
            tracing::error!(error = %message, "protocol handler failed");
            json_rpc_error(id, INTERNAL_ERROR, "Internal error")
        }
    }
}

pub fn json_rpc_error(id: Option<Value>, code: i32, message: &str) -> Value {
    json_rpc_error_with_data(id, code, message, None)
}

pub fn json_rpc_error_with_data(
    id: Option<Value>,
    code: i32,
    message: &str,
    data: Option<Value>,
) -> Value {
    let response = JsonrpcErrorResponse::new(
        RpcError {
            code: i64::from(code),
            data,
            message: message.to_string(),
        },
        id.as_ref().and_then(value_to_request_id),
    );
    serde_json::to_value(response).expect("jsonrpc error response serialization")
}

pub fn json_rpc_result(id: Option<Value>, result: Value) -> Value {
    if let Some(request_id) = id.as_ref().and_then(value_to_request_id) {
        let extra = result.as_object().cloned();
        let response = JsonrpcResultResponse::new(request_id, McpResult { meta: None, extra });
        return serde_json::to_value(response).expect("jsonrpc result response serialization");
    }

    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

pub fn value_to_request_id(value: &Value) -> Option<RequestId> {
    if let Some(string_id) = value.as_str() {
        return Some(RequestId::String(string_id.to_string()));
    }

    value.as_i64().map(RequestId::Integer)
}

pub fn request_id_to_value(id: RequestId) -> Value {
    match id {
        RequestId::String(value) => Value::String(value),
        RequestId::Integer(value) => Value::Number(value.into()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn invalid_params_carry_structured_data() {
        let response = protocol_error_to_json_rpc(
            Some(json!(9)),
            ProtocolError::invalid_params("bad_thing", "the thing is bad"),
        );

        assert_eq!(response["id"], 9);
        assert_eq!(response["error"]["code"], INVALID_PARAMS);
        assert_eq!(response["error"]["data"]["code"], "bad_thing");
        assert!(is_json_rpc_error(&response));
    }

    #[test]
    fn string_ids_round_trip_through_request_id() {
        let id = value_to_request_id(&json!("abc")).expect("string id");
        assert_eq!(request_id_to_value(id), json!("abc"));
        assert!(value_to_request_id(&json!(1.5)).is_none());
    }

    #[test]
    fn result_keeps_request_id() {
        let response = json_rpc_result(Some(json!(4)), json!({}));
        assert_eq!(response["jsonrpc"], "2.0");
        assert_eq!(response["id"], 4);
        assert!(!is_json_rpc_error(&response));
    }
}
