//! In-memory providers used across the crate's tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use crate::provider::{EthereumProvider, ProviderError, UNRECOGNIZED_CHAIN_CODE, parse_quantity};

/// A wallet provider with browser-wallet chain-switch semantics: it sits on
/// one chain, knows a set of others it can switch to, and can be configured
/// to accept or reject add-chain requests.
#[derive(Clone)]
pub(crate) struct MockWallet {
    inner: Arc<Mutex<MockWalletState>>,
}

struct MockWalletState {
    current_chain: u64,
    known_chains: HashSet<u64>,
    accepts_adds: bool,
    accounts: Vec<String>,
    calls: Vec<(String, Value)>,
}

impl MockWallet {
    pub fn on_chain(chain_id: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockWalletState {
                current_chain: chain_id,
                known_chains: HashSet::from([chain_id]),
                accepts_adds: false,
                accounts: Vec::new(),
                calls: Vec::new(),
            })),
        }
    }

    pub fn knowing_chain(self, chain_id: u64) -> Self {
        self.inner.lock().known_chains.insert(chain_id);
        self
    }

    pub fn accepting_adds(self) -> Self {
        self.inner.lock().accepts_adds = true;
        self
    }

    pub fn with_accounts(self, accounts: &[&str]) -> Self {
        self.inner.lock().accounts = accounts.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn methods_called(&self) -> Vec<String> {
        self.inner.lock().calls.iter().map(|(m, _)| m.clone()).collect()
    }

    pub fn params_for(&self, method: &str) -> Option<Value> {
        self.inner
            .lock()
            .calls
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, p)| p.clone())
    }
}

#[async_trait]
impl EthereumProvider for MockWallet {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let mut state = self.inner.lock();
        state.calls.push((method.to_string(), params.clone()));

        match method {
            "eth_chainId" => Ok(json!(format!("0x{:x}", state.current_chain))),
            "eth_accounts" | "eth_requestAccounts" => Ok(json!(state.accounts)),
            "wallet_switchEthereumChain" => {
                let requested = params[0]["chainId"]
                    .as_str()
                    .and_then(parse_quantity)
                    .expect("switch params carry a chain id");
                if state.known_chains.contains(&requested) {
                    state.current_chain = requested;
                    Ok(Value::Null)
                } else {
                    Err(ProviderError::Rpc {
                        code: UNRECOGNIZED_CHAIN_CODE,
                        message: "unrecognized chain".to_string(),
                    })
                }
            }
            "wallet_addEthereumChain" => {
                if !state.accepts_adds {
                    return Err(ProviderError::Rpc {
                        code: 4001,
                        message: "user rejected the request".to_string(),
                    });
                }
                let added = params[0]["chainId"]
                    .as_str()
                    .and_then(parse_quantity)
                    .expect("add params carry a chain id");
                state.known_chains.insert(added);
                state.current_chain = added;
                Ok(Value::Null)
            }
            other => Err(ProviderError::UnexpectedResponse(format!(
                "MockWallet does not handle {other}"
            ))),
        }
    }
}

/// A provider answering from per-method response queues, recording every call.
pub(crate) struct ScriptedProvider {
    responses: Mutex<HashMap<String, VecDeque<Result<Value, ProviderError>>>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, method: &str, response: Result<Value, ProviderError>) {
        self.responses
            .lock()
            .entry(method.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn calls_of(&self, method: &str) -> Vec<Value> {
        self.calls
            .lock()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

#[async_trait]
impl EthereumProvider for ScriptedProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        self.calls.lock().push((method.to_string(), params));
        self.responses
            .lock()
            .get_mut(method)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                Err(ProviderError::UnexpectedResponse(format!(
                    "no scripted response for {method}"
                )))
            })
    }
}
