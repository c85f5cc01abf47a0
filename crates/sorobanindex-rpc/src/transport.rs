//! The `RpcTransport` trait: the abstraction the event fetcher talks to.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::TransportError;
use crate::request::{JsonRpcRequest, JsonRpcResponse};

/// The async trait every RPC transport implements.
///
/// Object-safe; stored as `Arc<dyn RpcTransport>`. Tests substitute a
/// scripted implementation.
#[async_trait]
pub trait RpcTransport: Send + Sync + 'static {
    /// Send a single JSON-RPC request and return the response.
    ///
    /// A well-formed JSON-RPC error is returned inside `Ok(response)`;
    /// `Err` is reserved for failures to get a response at all.
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError>;

    /// The transport's identifier (URL or name).
    fn url(&self) -> &str;

    /// Call a method and deserialize the result.
    async fn call<T: DeserializeOwned>(
        &self,
        id: u64,
        method: &str,
        params: Value,
    ) -> Result<T, TransportError>
    where
        Self: Sized,
    {
        let req = JsonRpcRequest::new(id, method, params);
        let resp = self.send(req).await?;
        let result = resp.into_result().map_err(TransportError::Rpc)?;
        serde_json::from_value(result).map_err(TransportError::Deserialization)
    }
}

#[async_trait]
impl<T: RpcTransport + ?Sized> RpcTransport for std::sync::Arc<T> {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
        (**self).send(req).await
    }

    fn url(&self) -> &str {
        (**self).url()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl RpcTransport for Echo {
        async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
            if req.method == "fail" {
                return Ok(JsonRpcResponse::failure(1, -32000, "nope"));
            }
            Ok(JsonRpcResponse::success(1, req.params))
        }

        fn url(&self) -> &str {
            "mock://echo"
        }
    }

    #[tokio::test]
    async fn call_deserializes_result() {
        let v: serde_json::Value = Echo.call(1, "echo", json!({"a": 1})).await.unwrap();
        assert_eq!(v["a"], 1);
    }

    #[tokio::test]
    async fn call_surfaces_rpc_error() {
        let err = Echo
            .call::<serde_json::Value>(1, "fail", serde_json::Value::Null)
            .await
            .unwrap_err();
        assert!(err.is_rpc_error());
    }
}
