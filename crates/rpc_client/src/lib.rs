//! SoroShark RPC Client Library
//!
//! JSON-RPC transport for contract view synchronization: an `invokefunction`
//! client, the [`RpcReadGateway`] over it, and the [`NotificationBridge`]
//! that turns a contract notification source into per-topic event streams.

mod bridge;
mod error;
mod gateway;
pub mod models;
mod rpc_client;

pub use bridge::{ContractNotification, NotificationBridge, SharedNotificationBridge};
pub use error::{RpcError, RpcResult, INTERNAL_ERROR, PARSE_ERROR};
pub use gateway::RpcReadGateway;
pub use rpc_client::RpcClient;

// Re-export commonly used types
pub use models::{RpcInvokeResult, RpcRequest, RpcResponse, RpcResponseError, VmState};
