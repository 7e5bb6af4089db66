//! JSON-RPC wire types.

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use soroshark_primitives::ContractValue;
use std::fmt;

/// JSON-RPC 2.0 request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub id: u64,

    #[serde(rename = "jsonrpc")]
    pub json_rpc: String,

    pub method: String,

    pub params: Vec<Value>,
}

impl RpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            id,
            json_rpc: "2.0".to_string(),
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponseError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: Value,

    #[serde(rename = "jsonrpc", default)]
    pub json_rpc: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcResponseError>,
}

/// VM state after a test invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VmState {
    None,
    Halt,
    Fault,
    Break,
}

impl fmt::Display for VmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "NONE",
            Self::Halt => "HALT",
            Self::Fault => "FAULT",
            Self::Break => "BREAK",
        };
        f.write_str(name)
    }
}

/// Result of `invokefunction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcInvokeResult {
    #[serde(default)]
    pub script: Option<String>,

    pub state: VmState,

    #[serde(rename = "gasconsumed", default)]
    pub gas_consumed: Option<String>,

    #[serde(default)]
    pub stack: Vec<ContractValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
}

impl RpcInvokeResult {
    pub fn is_halt(&self) -> bool {
        self.state == VmState::Halt
    }

    /// The first result stack item, if any.
    pub fn first(&self) -> Option<&ContractValue> {
        self.stack.first()
    }
}

/// Encodes a value as an `invokefunction` contract parameter.
pub fn contract_parameter(value: &ContractValue) -> Value {
    match value {
        ContractValue::Any => json!({ "type": "Any" }),
        ContractValue::Boolean(value) => json!({ "type": "Boolean", "value": value }),
        ContractValue::Integer(value) => json!({ "type": "Integer", "value": value.to_string() }),
        ContractValue::String(value) => json!({ "type": "String", "value": value }),
        ContractValue::ByteString(bytes) => json!({
            "type": "ByteArray",
            "value": general_purpose::STANDARD.encode(bytes),
        }),
        ContractValue::Array(items) => json!({
            "type": "Array",
            "value": items.iter().map(contract_parameter).collect::<Vec<_>>(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    #[test]
    fn test_request_serializes_jsonrpc_field() {
        let request = RpcRequest::new(7, "invokefunction", vec![json!("CTOKEN")]);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["id"], 7);
        assert_eq!(value["method"], "invokefunction");
        assert_eq!(value["params"][0], "CTOKEN");
    }

    #[test]
    fn test_invoke_result_parses_stack() {
        let result: RpcInvokeResult = serde_json::from_value(json!({
            "script": "00",
            "state": "HALT",
            "gasconsumed": "1007270",
            "stack": [{ "type": "Integer", "value": "123456789012345678901234567890" }]
        }))
        .unwrap();
        assert!(result.is_halt());
        assert_eq!(
            result.first().unwrap().as_integer().unwrap(),
            "123456789012345678901234567890".parse::<BigInt>().unwrap()
        );
    }

    #[test]
    fn test_fault_result_keeps_exception() {
        let result: RpcInvokeResult = serde_json::from_value(json!({
            "state": "FAULT",
            "stack": [],
            "exception": "contract trapped"
        }))
        .unwrap();
        assert_eq!(result.state, VmState::Fault);
        assert_eq!(result.exception.as_deref(), Some("contract trapped"));
        assert!(result.first().is_none());
    }

    #[test]
    fn test_contract_parameters() {
        assert_eq!(
            contract_parameter(&ContractValue::from(42i64)),
            json!({ "type": "Integer", "value": "42" })
        );
        assert_eq!(
            contract_parameter(&ContractValue::ByteString(vec![1, 2, 3])),
            json!({ "type": "ByteArray", "value": "AQID" })
        );
        assert_eq!(
            contract_parameter(&ContractValue::Array(vec![ContractValue::from("CFUND")])),
            json!({ "type": "Array", "value": [{ "type": "String", "value": "CFUND" }] })
        );
    }
}
