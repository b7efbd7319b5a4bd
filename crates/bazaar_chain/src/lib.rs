pub mod contract;
pub mod network;
pub mod provider;
pub mod units;
pub mod wallet;

// Re-export primary types for convenient access.
pub use contract::{ChainError, MarketContract, Nft};
pub use network::{HARDHAT_CHAIN_ID, NativeCurrency, NetworkParams};
pub use provider::{EthereumProvider, HttpProvider, ProviderError, validate_url};
pub use units::{UnitsError, format_eth, parse_eth};
pub use wallet::{Signer, WalletAdapter, WalletError};

#[cfg(test)]
pub(crate) mod testutil;
