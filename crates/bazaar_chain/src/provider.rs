//! Wallet-provider seam.
//!
//! The browser-injected wallet becomes an explicit trait here: everything the
//! client does on chain goes through [`EthereumProvider::request`] using the
//! standard provider verbs. [`HttpProvider`] is the production implementation,
//! speaking JSON-RPC to a development node and emulating the wallet-specific
//! verbs that a bare node does not understand.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::network::NetworkParams;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// EIP-1193 "unrecognized chain" error code, the signal that a
/// `wallet_addEthereumChain` request should follow a failed switch.
pub const UNRECOGNIZED_CHAIN_CODE: i64 = 4902;

/// Errors that any provider may return.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The provider answered with an error object.
    #[error("provider error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The provider could not be reached.
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider answered with something the client cannot interpret.
    #[error("unexpected provider response: {0}")]
    UnexpectedResponse(String),
}

/// Unified interface to a wallet provider.
///
/// Mirrors the request-based surface of an injected browser wallet: a single
/// entry point taking a method verb and a JSON params array.
#[async_trait]
pub trait EthereumProvider: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError>;
}

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// JSON-RPC provider for a development node with unlocked accounts.
///
/// Wallet-specific verbs are emulated client-side:
/// - `wallet_switchEthereumChain` compares the node's `eth_chainId` with the
///   requested id and reports a mismatch as error 4902.
/// - `wallet_addEthereumChain` probes the first RPC URL of the request and
///   re-points this provider at it when the endpoint serves the requested chain.
/// - `eth_requestAccounts` is forwarded as `eth_accounts` (a dev node exposes
///   its unlocked accounts without an authorization prompt).
pub struct HttpProvider {
    client: Client,
    url: RwLock<String>,
    next_id: AtomicU64,
}

impl HttpProvider {
    pub fn new(url: &str) -> Result<Self, ProviderError> {
        if !validate_url(url) {
            return Err(ProviderError::Transport(format!("invalid RPC URL: {url}")));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: RwLock::new(url.to_string()),
            next_id: AtomicU64::new(1),
        })
    }

    /// The RPC endpoint currently in use.
    pub fn url(&self) -> String {
        self.url.read().clone()
    }

    async fn raw_request(&self, url: &str, method: &str, params: Value) -> Result<Value, ProviderError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        debug!(url = %url, method = %method, "JSON-RPC request");

        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let body: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::UnexpectedResponse(e.to_string()))?;

        if let Some(error) = body.error {
            return Err(ProviderError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        Ok(body.result.unwrap_or(Value::Null))
    }

    async fn chain_id_of(&self, url: &str) -> Result<u64, ProviderError> {
        let value = self.raw_request(url, "eth_chainId", json!([])).await?;
        let hex = value
            .as_str()
            .ok_or_else(|| ProviderError::UnexpectedResponse(format!("eth_chainId: {value}")))?;
        parse_quantity(hex)
            .ok_or_else(|| ProviderError::UnexpectedResponse(format!("eth_chainId: {hex}")))
    }

    async fn switch_chain(&self, params: &Value) -> Result<Value, ProviderError> {
        let requested = requested_chain_id(params)?;
        let current = self.chain_id_of(&self.url()).await?;
        if current == requested {
            return Ok(Value::Null);
        }
        Err(ProviderError::Rpc {
            code: UNRECOGNIZED_CHAIN_CODE,
            message: format!("unrecognized chain id 0x{requested:x} (node serves 0x{current:x})"),
        })
    }

    async fn add_chain(&self, params: &Value) -> Result<Value, ProviderError> {
        let network: NetworkParams = serde_json::from_value(
            params
                .get(0)
                .cloned()
                .ok_or_else(|| ProviderError::UnexpectedResponse("missing chain parameters".into()))?,
        )
        .map_err(|e| ProviderError::UnexpectedResponse(format!("invalid chain parameters: {e}")))?;

        let requested = network.chain_id_u64().ok_or_else(|| {
            ProviderError::UnexpectedResponse(format!("invalid chain id: {}", network.chain_id))
        })?;
        let rpc_url = network
            .rpc_urls
            .first()
            .filter(|u| validate_url(u))
            .ok_or_else(|| ProviderError::UnexpectedResponse("no usable RPC URL in chain parameters".into()))?;

        let served = self.chain_id_of(rpc_url).await?;
        if served != requested {
            return Err(ProviderError::Rpc {
                code: -32602,
                message: format!("endpoint serves chain 0x{served:x}, expected 0x{requested:x}"),
            });
        }

        info!(url = %rpc_url, chain_id = requested, "re-pointing provider at added chain");
        *self.url.write() = rpc_url.clone();
        Ok(Value::Null)
    }
}

#[async_trait]
impl EthereumProvider for HttpProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        match method {
            "wallet_switchEthereumChain" => self.switch_chain(&params).await,
            "wallet_addEthereumChain" => self.add_chain(&params).await,
            "eth_requestAccounts" => self.raw_request(&self.url(), "eth_accounts", params).await,
            _ => self.raw_request(&self.url(), method, params).await,
        }
    }
}

/// Chain id from the parameter object of a `wallet_switchEthereumChain` request.
fn requested_chain_id(params: &Value) -> Result<u64, ProviderError> {
    params
        .get(0)
        .and_then(|p| p.get("chainId"))
        .and_then(Value::as_str)
        .and_then(parse_quantity)
        .ok_or_else(|| ProviderError::UnexpectedResponse(format!("invalid switch parameters: {params}")))
}

/// Parse a hex quantity (`0x`-prefixed, either case) into a `u64`.
pub fn parse_quantity(hex: &str) -> Option<u64> {
    let digits = hex.strip_prefix("0x").or_else(|| hex.strip_prefix("0X"))?;
    u64::from_str_radix(digits, 16).ok()
}

/// Validate that a URL is well-formed and uses HTTP or HTTPS.
pub fn validate_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            (scheme == "http" || scheme == "https") && parsed.host().is_some()
        }
        Err(_) => false,
    }
}
