//! Chain height over the daemon's JSON-RPC interface

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::{RpcCredentials, RpcEndpointConfig};
use crate::error::{BootstrapError, BootstrapResult};
use crate::traits::HeightSource;

const GET_BLOCK_COUNT: &str = "getblockcount";

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Vec<Value>,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcErrorBody>,
}

#[derive(Deserialize)]
struct JsonRpcErrorBody {
    code: i64,
    message: String,
}

/// [`HeightSource`] that calls `getblockcount` with basic auth
pub struct JsonRpcHeightSource {
    endpoint: RpcEndpointConfig,
    credentials: RpcCredentials,
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl JsonRpcHeightSource {
    pub fn new(endpoint: RpcEndpointConfig, credentials: RpcCredentials) -> BootstrapResult<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(endpoint.timeout)
            .pool_max_idle_per_host(0);

        if let Some(path) = &endpoint.cert_path {
            let pem = std::fs::read(path).map_err(|e| {
                BootstrapError::config(format!("failed to read RPC certificate {}: {}", path.display(), e))
            })?;
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&pem)?);
        } else if endpoint.insecure_tls {
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(Self {
            endpoint,
            credentials,
            client: builder.build()?,
            next_id: AtomicU64::new(1),
        })
    }

    async fn call(&self, method: &str) -> BootstrapResult<Value> {
        let request = JsonRpcRequest {
            jsonrpc: "1.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params: Vec::new(),
        };

        let response = self
            .client
            .post(self.endpoint.url.clone())
            .basic_auth(&self.credentials.user, Some(&self.credentials.password))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(BootstrapError::rpc(method, format!("rejected credentials ({status})")));
        }

        // Nodes answer RPC errors with a non-2xx status and a JSON error body
        let body: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| BootstrapError::rpc(method, format!("unreadable response ({status}): {e}")))?;

        if let Some(error) = body.error {
            return Err(BootstrapError::rpc(method, format!("{} (code {})", error.message, error.code)));
        }
        body.result
            .ok_or_else(|| BootstrapError::rpc(method, "response carried neither result nor error"))
    }
}

#[async_trait]
impl HeightSource for JsonRpcHeightSource {
    async fn best_height(&self) -> BootstrapResult<u64> {
        let result = self.call(GET_BLOCK_COUNT).await?;
        result
            .as_u64()
            .ok_or_else(|| BootstrapError::rpc(GET_BLOCK_COUNT, format!("expected an integer height, got {result}")))
    }
}
