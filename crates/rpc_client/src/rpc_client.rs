use crate::error::{RpcError, RpcResult};
use crate::models::{contract_parameter, RpcInvokeResult, RpcRequest, RpcResponse};
use base64::{engine::general_purpose, Engine as _};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use soroshark_config::RpcConfig;
use soroshark_primitives::ContractValue;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

/// JSON-RPC client for contract reads.
#[derive(Debug)]
pub struct RpcClient {
    base_address: Url,
    http_client: Client,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Creates a client for `url`, with basic auth when both credentials are
    /// given.
    pub fn new(
        url: Url,
        rpc_user: Option<&str>,
        rpc_pass: Option<&str>,
        timeout: Duration,
    ) -> RpcResult<Self> {
        let mut builder = Client::builder().timeout(timeout);

        if let (Some(user), Some(pass)) = (rpc_user, rpc_pass) {
            let encoded = general_purpose::STANDARD.encode(format!("{user}:{pass}"));
            let value = HeaderValue::from_str(&format!("Basic {encoded}"))
                .map_err(|err| RpcError::Credentials(err.to_string()))?;
            let mut headers = HeaderMap::new();
            headers.insert(AUTHORIZATION, value);
            builder = builder.default_headers(headers);
        }

        Ok(Self::with_client(builder.build()?, url))
    }

    /// Creates a client with an existing HTTP client.
    pub fn with_client(client: Client, url: Url) -> Self {
        Self {
            base_address: url,
            http_client: client,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn from_config(config: &RpcConfig) -> RpcResult<Self> {
        let url = config
            .endpoint()
            .map_err(|err| RpcError::Parse(err.to_string()))?;
        Self::new(
            url,
            config.user.as_deref(),
            config.password.as_deref(),
            Duration::from_millis(config.request_timeout_ms),
        )
    }

    pub fn url(&self) -> &Url {
        &self.base_address
    }

    fn as_rpc_request(&self, method: &str, params: Vec<Value>) -> RpcRequest {
        RpcRequest::new(self.next_id.fetch_add(1, Ordering::Relaxed), method, params)
    }

    fn as_rpc_response(content: &str) -> RpcResult<RpcResponse> {
        let response: RpcResponse =
            serde_json::from_str(content).map_err(|err| RpcError::Parse(err.to_string()))?;

        if let Some(error) = &response.error {
            return Err(RpcError::Remote {
                code: error.code,
                message: error.message.clone(),
            });
        }

        Ok(response)
    }

    /// Posts `request` and parses the JSON-RPC response.
    pub async fn send(&self, request: &RpcRequest) -> RpcResult<RpcResponse> {
        trace!(id = request.id, method = %request.method, "sending rpc request");

        let response = self
            .http_client
            .post(self.base_address.clone())
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let content = response.text().await?;
        if !status.is_success() {
            return Err(RpcError::Status {
                status: status.as_u16(),
                body: content,
            });
        }

        Self::as_rpc_response(&content)
    }

    /// Sends `method` and returns its `result`.
    pub async fn rpc_send(&self, method: &str, params: Vec<Value>) -> RpcResult<Value> {
        let request = self.as_rpc_request(method, params);
        self.send(&request)
            .await?
            .result
            .ok_or_else(|| RpcError::MissingResult {
                method: method.to_string(),
            })
    }

    /// Test-invokes `operation` on `contract` without affecting chain state.
    pub async fn invoke_function(
        &self,
        contract: &str,
        operation: &str,
        args: &[ContractValue],
    ) -> RpcResult<RpcInvokeResult> {
        let params = vec![
            Value::String(contract.to_string()),
            Value::String(operation.to_string()),
            Value::Array(args.iter().map(contract_parameter).collect()),
        ];
        let result = self.rpc_send("invokefunction", params).await?;
        let invoked: RpcInvokeResult =
            serde_json::from_value(result).map_err(|err| RpcError::Parse(err.to_string()))?;

        debug!(
            contract,
            operation,
            state = %invoked.state,
            gas = invoked.gas_consumed.as_deref().unwrap_or("0"),
            "invokefunction completed"
        );
        Ok(invoked)
    }
}
