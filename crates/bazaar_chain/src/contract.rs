//! Typed gateway to the marketplace contract.
//!
//! The contract itself lives on chain; this module binds its ABI to a signer
//! and exposes the four operations the client needs: enumerate, read one
//! record, mint, and buy.

use std::time::Duration;

use alloy_primitives::{Address, B256, U256, hex};
use alloy_sol_types::SolCall;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::provider::ProviderError;
use crate::wallet::Signer;

/// Generated ABI bindings for the marketplace contract.
pub mod abi {
    use alloy_sol_types::sol;

    sol! {
        function getTotalNFTs() external view returns (uint256);
        function nfts(uint256 id) external view returns (
            uint256 id,
            string name,
            string description,
            string imageHash,
            uint256 price,
            address owner
        );
        function createNFT(
            string name,
            string description,
            string imageHash,
            uint256 price
        ) external returns (uint256);
        function buyNFT(uint256 id) external payable;
    }
}

use abi::{buyNFTCall, createNFTCall, getTotalNFTsCall, nftsCall};

const DEFAULT_NAME: &str = "Unnamed NFT";
const DEFAULT_DESCRIPTION: &str = "No description";

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("ABI decode error: {0}")]
    Abi(#[from] alloy_sol_types::Error),

    #[error("transaction {0} reverted")]
    Reverted(B256),

    #[error("unexpected chain response: {0}")]
    UnexpectedResponse(String),
}

/// One token record, as stored by the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nft {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub image_hash: String,
    pub price: U256,
    pub owner: Address,
}

/// Binds the marketplace contract address to a signer.
pub struct MarketContract {
    address: Address,
    signer: Signer,
}

impl MarketContract {
    pub fn new(address: Address, signer: Signer) -> Self {
        Self { address, signer }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Current count of minted tokens; the authoritative upper bound for
    /// enumeration.
    pub async fn total_nfts(&self) -> Result<u64, ChainError> {
        let data = self.call(getTotalNFTsCall {}.abi_encode()).await?;
        let total = getTotalNFTsCall::abi_decode_returns(&data)?;
        u64::try_from(total)
            .map_err(|_| ChainError::UnexpectedResponse(format!("token count out of range: {total}")))
    }

    /// Read one token record by id.
    pub async fn nft(&self, id: u64) -> Result<Nft, ChainError> {
        let call = nftsCall { id: U256::from(id) };
        let data = self.call(call.abi_encode()).await?;
        let record = nftsCall::abi_decode_returns(&data)?;

        let id = u64::try_from(record.id)
            .map_err(|_| ChainError::UnexpectedResponse(format!("token id out of range: {}", record.id)))?;
        Ok(Nft {
            id,
            name: record.name,
            description: record.description,
            image_hash: record.imageHash,
            price: record.price,
            owner: record.owner,
        })
    }

    /// Submit a mint transaction and await its confirmation.
    ///
    /// Empty name/description fall back to fixed placeholders; `price` is
    /// already in wei.
    pub async fn create_nft(
        &self,
        name: &str,
        description: &str,
        image_hash: &str,
        price: U256,
    ) -> Result<(), ChainError> {
        let name = non_empty_or(name, DEFAULT_NAME);
        let description = non_empty_or(description, DEFAULT_DESCRIPTION);

        let call = createNFTCall {
            name: name.to_string(),
            description: description.to_string(),
            imageHash: image_hash.to_string(),
            price,
        };
        let tx_hash = self.send(call.abi_encode(), U256::ZERO).await?;
        info!(%tx_hash, name, "mint transaction submitted");
        self.wait_for_confirmation(tx_hash).await
    }

    /// Submit a purchase transaction carrying exactly the listed price as
    /// attached value, and await its confirmation.
    ///
    /// A mismatched value or an already-owned token is rejected by the
    /// contract and surfaces as a transaction failure.
    pub async fn buy_nft(&self, id: u64, price: U256) -> Result<(), ChainError> {
        let call = buyNFTCall { id: U256::from(id) };
        let tx_hash = self.send(call.abi_encode(), price).await?;
        info!(%tx_hash, id, "purchase transaction submitted");
        self.wait_for_confirmation(tx_hash).await
    }

    async fn call(&self, calldata: Vec<u8>) -> Result<Vec<u8>, ChainError> {
        let params = json!([
            {
                "from": self.signer.address().to_string(),
                "to": self.address.to_string(),
                "data": hex::encode_prefixed(&calldata),
            },
            "latest",
        ]);
        let result = self.signer.provider().request("eth_call", params).await?;
        let output = result
            .as_str()
            .ok_or_else(|| ChainError::UnexpectedResponse(format!("eth_call: {result}")))?;
        hex::decode(output.strip_prefix("0x").unwrap_or(output))
            .map_err(|e| ChainError::UnexpectedResponse(format!("eth_call output: {e}")))
    }

    async fn send(&self, calldata: Vec<u8>, value: U256) -> Result<B256, ChainError> {
        let params = json!([{
            "from": self.signer.address().to_string(),
            "to": self.address.to_string(),
            "data": hex::encode_prefixed(&calldata),
            "value": format!("0x{value:x}"),
        }]);
        let result = self
            .signer
            .provider()
            .request("eth_sendTransaction", params)
            .await?;
        result
            .as_str()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| ChainError::UnexpectedResponse(format!("eth_sendTransaction: {result}")))
    }

    /// Poll for the transaction receipt until the transaction is durable.
    ///
    /// There is no timeout layer: a pending transaction runs to completion or
    /// failure, matching the wallet's own confirmation behavior.
    async fn wait_for_confirmation(&self, tx_hash: B256) -> Result<(), ChainError> {
        loop {
            let receipt = self
                .signer
                .provider()
                .request("eth_getTransactionReceipt", json!([tx_hash.to_string()]))
                .await?;
            if receipt.is_null() {
                debug!(%tx_hash, "transaction pending");
                tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
                continue;
            }
            let succeeded = receipt.get("status").and_then(Value::as_str) == Some("0x1");
            return if succeeded {
                Ok(())
            } else {
                Err(ChainError::Reverted(tx_hash))
            };
        }
    }
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() { fallback } else { value }
}
