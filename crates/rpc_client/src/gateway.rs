use crate::rpc_client::RpcClient;
use async_trait::async_trait;
use soroshark_primitives::ContractValue;
use soroshark_sync::{ContractId, GatewayError, ReadGateway};
use std::sync::Arc;

/// [`ReadGateway`] backed by `invokefunction` test invocations.
///
/// A read succeeds only when the invocation halts; its first stack item is
/// the field value.
#[derive(Debug, Clone)]
pub struct RpcReadGateway {
    client: Arc<RpcClient>,
}

impl RpcReadGateway {
    pub fn new(client: Arc<RpcClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<RpcClient> {
        &self.client
    }
}

#[async_trait]
impl ReadGateway for RpcReadGateway {
    async fn read(
        &self,
        contract: &ContractId,
        method: &str,
        args: &[ContractValue],
    ) -> Result<ContractValue, GatewayError> {
        let result = self
            .client
            .invoke_function(contract.as_str(), method, args)
            .await
            .map_err(|err| GatewayError::rejected(contract.as_str(), method, err.to_string()))?;

        if !result.is_halt() {
            let message = result
                .exception
                .unwrap_or_else(|| format!("vm state {}", result.state));
            return Err(GatewayError::rejected(contract.as_str(), method, message));
        }

        result
            .stack
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::rejected(contract.as_str(), method, "empty result stack"))
    }
}
