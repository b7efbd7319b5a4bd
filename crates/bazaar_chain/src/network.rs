use serde::{Deserialize, Serialize};

/// Chain id of the required network (Hardhat localhost).
pub const HARDHAT_CHAIN_ID: u64 = 31337;

/// Native currency descriptor, in the wire shape of `wallet_addEthereumChain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Parameters describing the required network.
///
/// Serializes to exactly the parameter object of a `wallet_addEthereumChain`
/// request, so it doubles as the add-chain payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkParams {
    /// Hex-encoded chain id, e.g. `0x7a69`.
    pub chain_id: String,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Option<Vec<String>>,
}

impl NetworkParams {
    /// The Hardhat localhost network the marketplace contract is deployed on.
    pub fn hardhat_localhost() -> Self {
        Self {
            chain_id: format!("0x{HARDHAT_CHAIN_ID:x}"),
            chain_name: "Hardhat Localhost".to_string(),
            native_currency: NativeCurrency {
                name: "ETH".to_string(),
                symbol: "ETH".to_string(),
                decimals: 18,
            },
            rpc_urls: vec!["http://127.0.0.1:8545/".to_string()],
            block_explorer_urls: None,
        }
    }

    /// Numeric chain id parsed from the hex field.
    pub fn chain_id_u64(&self) -> Option<u64> {
        crate::provider::parse_quantity(&self.chain_id)
    }
}
