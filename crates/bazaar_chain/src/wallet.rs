//! Wallet adapter: account authorization and required-network enforcement.

use std::sync::Arc;

use alloy_primitives::Address;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::network::NetworkParams;
use crate::provider::{EthereumProvider, ProviderError, UNRECOGNIZED_CHAIN_CODE};

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    /// No wallet provider is installed.
    #[error("no wallet provider found, please install one")]
    MissingProvider,

    /// The wallet could not be brought onto the required network.
    #[error("wallet is not on the required network ({0})")]
    WrongNetwork(String),

    /// The wallet authorized no accounts.
    #[error("wallet returned no authorized accounts")]
    NoAccounts,

    /// The wallet returned an account the client cannot parse.
    #[error("invalid account address: {0}")]
    InvalidAddress(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// An authorized handle bound to one account, capable of submitting
/// transactions through the wallet provider.
#[derive(Clone)]
pub struct Signer {
    provider: Arc<dyn EthereumProvider>,
    address: Address,
    chain_id: u64,
}

impl Signer {
    /// The account this signer is bound to.
    pub fn address(&self) -> Address {
        self.address
    }

    /// The chain this signer was established on.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub(crate) fn provider(&self) -> &Arc<dyn EthereumProvider> {
        &self.provider
    }

    #[cfg(test)]
    pub(crate) fn for_tests(
        provider: Arc<dyn EthereumProvider>,
        address: Address,
        chain_id: u64,
    ) -> Self {
        Self {
            provider,
            address,
            chain_id,
        }
    }
}

/// Wraps the injected wallet provider: account access and network matching.
///
/// `provider` is `None` when no wallet is installed; every operation then
/// reports [`WalletError::MissingProvider`] rather than panicking.
pub struct WalletAdapter {
    provider: Option<Arc<dyn EthereumProvider>>,
    network: NetworkParams,
}

impl WalletAdapter {
    pub fn new(provider: Option<Arc<dyn EthereumProvider>>, network: NetworkParams) -> Self {
        Self { provider, network }
    }

    pub fn network(&self) -> &NetworkParams {
        &self.network
    }

    /// Bring the wallet onto the required network.
    ///
    /// Issues a chain-switch request; when the wallet does not know the chain
    /// (error 4902) a one-time add-chain request with the fixed network
    /// parameters follows. Failures never propagate past this boundary: the
    /// cause is logged and `false` is returned.
    pub async fn ensure_network(&self) -> bool {
        let Some(provider) = &self.provider else {
            warn!("cannot switch network: no wallet provider");
            return false;
        };

        let switch_params = json!([{ "chainId": self.network.chain_id }]);
        match provider.request("wallet_switchEthereumChain", switch_params).await {
            Ok(_) => true,
            Err(ProviderError::Rpc { code, .. }) if code == UNRECOGNIZED_CHAIN_CODE => {
                info!(chain = %self.network.chain_name, "chain unknown to wallet, requesting add");
                match provider
                    .request("wallet_addEthereumChain", json!([self.network]))
                    .await
                {
                    Ok(_) => true,
                    Err(e) => {
                        warn!(error = %e, "failed to add required network to wallet");
                        false
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to switch wallet to required network");
                false
            }
        }
    }

    /// Request account authorization and return a signer bound to the primary
    /// account on the required network.
    pub async fn connect(&self) -> Result<Signer, WalletError> {
        let Some(provider) = &self.provider else {
            return Err(WalletError::MissingProvider);
        };

        if !self.ensure_network().await {
            return Err(WalletError::WrongNetwork(self.network.chain_name.clone()));
        }

        let accounts = provider.request("eth_requestAccounts", json!([])).await?;
        let address = primary_account(&accounts)?;

        let chain_id = self
            .network
            .chain_id_u64()
            .ok_or_else(|| WalletError::WrongNetwork(self.network.chain_name.clone()))?;

        info!(account = %address, chain_id, "wallet connected");
        Ok(Signer {
            provider: Arc::clone(provider),
            address,
            chain_id,
        })
    }

    /// Accounts the wallet has already authorized, without prompting.
    ///
    /// Used for silent session resume at startup; any failure is reported as
    /// an empty list.
    pub async fn authorized_accounts(&self) -> Vec<Address> {
        let Some(provider) = &self.provider else {
            return Vec::new();
        };
        match provider.request("eth_accounts", json!([])).await {
            Ok(value) => value
                .as_array()
                .map(|accounts| {
                    accounts
                        .iter()
                        .filter_map(Value::as_str)
                        .filter_map(|s| s.parse().ok())
                        .collect()
                })
                .unwrap_or_default(),
            Err(e) => {
                debug!(error = %e, "authorized-accounts query failed");
                Vec::new()
            }
        }
    }
}

fn primary_account(accounts: &Value) -> Result<Address, WalletError> {
    let first = accounts
        .as_array()
        .and_then(|a| a.first())
        .and_then(Value::as_str)
        .ok_or(WalletError::NoAccounts)?;
    first
        .parse()
        .map_err(|_| WalletError::InvalidAddress(first.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockWallet;

    const ACCOUNT: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    fn adapter(wallet: MockWallet) -> WalletAdapter {
        WalletAdapter::new(Some(Arc::new(wallet)), NetworkParams::hardhat_localhost())
    }

    #[tokio::test]
    async fn connect_on_right_network() {
        let wallet = MockWallet::on_chain(31337).with_accounts(&[ACCOUNT]);
        let signer = adapter(wallet).connect().await.unwrap();
        assert_eq!(signer.address(), ACCOUNT.parse::<Address>().unwrap());
        assert_eq!(signer.chain_id(), 31337);
    }

    #[tokio::test]
    async fn connect_switches_known_chain() {
        let wallet = MockWallet::on_chain(1)
            .knowing_chain(31337)
            .with_accounts(&[ACCOUNT]);
        let signer = adapter(wallet.clone()).connect().await.unwrap();
        assert_eq!(signer.chain_id(), 31337);

        let methods = wallet.methods_called();
        assert!(methods.contains(&"wallet_switchEthereumChain".to_string()));
        assert!(!methods.contains(&"wallet_addEthereumChain".to_string()));
    }

    #[tokio::test]
    async fn unknown_chain_triggers_add_request() {
        let wallet = MockWallet::on_chain(1).accepting_adds().with_accounts(&[ACCOUNT]);
        let signer = adapter(wallet.clone()).connect().await.unwrap();
        assert_eq!(signer.chain_id(), 31337);

        let methods = wallet.methods_called();
        assert!(methods.contains(&"wallet_switchEthereumChain".to_string()));
        assert!(methods.contains(&"wallet_addEthereumChain".to_string()));

        // The add-chain request carries the fixed network parameters.
        let add_params = wallet.params_for("wallet_addEthereumChain").unwrap();
        assert_eq!(add_params[0]["chainId"], "0x7a69");
        assert_eq!(add_params[0]["rpcUrls"][0], "http://127.0.0.1:8545/");
    }

    #[tokio::test]
    async fn failed_add_fails_connect() {
        let wallet = MockWallet::on_chain(1).with_accounts(&[ACCOUNT]);
        let result = adapter(wallet.clone()).connect().await;
        assert!(matches!(result, Err(WalletError::WrongNetwork(_))));

        // No account request reaches the wallet after the network step fails.
        assert!(!wallet.methods_called().contains(&"eth_requestAccounts".to_string()));
    }

    #[tokio::test]
    async fn missing_provider_is_reported() {
        let adapter = WalletAdapter::new(None, NetworkParams::hardhat_localhost());
        assert!(matches!(adapter.connect().await, Err(WalletError::MissingProvider)));
        assert!(!adapter.ensure_network().await);
        assert!(adapter.authorized_accounts().await.is_empty());
    }

    #[tokio::test]
    async fn empty_account_list_fails_connect() {
        let wallet = MockWallet::on_chain(31337);
        assert!(matches!(
            adapter(wallet).connect().await,
            Err(WalletError::NoAccounts)
        ));
    }

    #[tokio::test]
    async fn authorized_accounts_silent_check() {
        let wallet = MockWallet::on_chain(31337).with_accounts(&[ACCOUNT]);
        let accounts = adapter(wallet.clone()).authorized_accounts().await;
        assert_eq!(accounts, vec![ACCOUNT.parse::<Address>().unwrap()]);

        // Silent check must not prompt.
        assert!(!wallet.methods_called().contains(&"eth_requestAccounts".to_string()));
    }
}
