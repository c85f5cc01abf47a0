//! sorobanindex-rpc: JSON-RPC transport for SorobanIndex.
//!
//! - [`RpcTransport`]: the async trait the event fetcher talks to
//! - [`JsonRpcRequest`] / [`JsonRpcResponse`]: wire types (named params)
//! - [`TransportError`]: structured error type
//! - [`RetryPolicy`]: backoff schedule, shared with the scheduler
//! - [`HttpRpcClient`]: `reqwest`-backed transport

pub mod error;
pub mod http;
pub mod request;
pub mod retry;
pub mod transport;

pub use error::TransportError;
pub use http::{HttpClientConfig, HttpRpcClient};
pub use request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcId};
pub use retry::{BackoffConfig, RetryPolicy};
pub use transport::RpcTransport;
