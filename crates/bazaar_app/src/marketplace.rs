//! Marketplace view-model: one explicit session object orchestrating the
//! wallet adapter, the asset uploader, and the contract gateway.

use std::path::PathBuf;
use std::sync::Arc;

use alloy_primitives::Address;
use anyhow::{Context, Result, bail, ensure};
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use bazaar_chain::{EthereumProvider, MarketContract, NetworkParams, Nft, WalletAdapter, parse_eth};
use bazaar_core::BazaarConfig;
use bazaar_pinning::AssetUploader;

/// Concurrent token reads per listing refresh. Output order stays ascending
/// regardless of this value.
const LISTING_FAN_OUT: usize = 4;

/// Session lifecycle. `Minting`/`Buying` double as the busy flag: only one
/// mutating sequence is in flight at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Disconnected,
    Connecting,
    Idle,
    Minting,
    Buying,
}

/// The creation form, held until the mint flow fully succeeds.
#[derive(Debug, Clone, Default)]
pub struct CreateForm {
    pub image: PathBuf,
    pub price: String,
    pub name: String,
    pub description: String,
}

struct Session {
    account: Address,
    contract: MarketContract,
}

/// Application state for one marketplace session.
///
/// Initialized empty at startup, populated on connect, cleared on explicit
/// disconnect. The cached token list is replaced wholesale on every refresh,
/// never patched in place.
pub struct Marketplace {
    wallet: WalletAdapter,
    uploader: Option<Arc<dyn AssetUploader>>,
    contract_address: Address,
    phase: Phase,
    session: Option<Session>,
    nfts: Vec<Nft>,
    draft: Option<CreateForm>,
    status: Option<String>,
}

impl Marketplace {
    pub fn new(
        config: &BazaarConfig,
        provider: Option<Arc<dyn EthereumProvider>>,
        uploader: Option<Arc<dyn AssetUploader>>,
    ) -> Result<Self> {
        let contract_address = config
            .contract_address
            .parse()
            .with_context(|| format!("invalid contract address in config: {}", config.contract_address))?;
        Ok(Self {
            wallet: WalletAdapter::new(provider, NetworkParams::hardhat_localhost()),
            uploader,
            contract_address,
            phase: Phase::Disconnected,
            session: None,
            nfts: Vec::new(),
            draft: None,
            status: None,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The connected account, if any.
    pub fn account(&self) -> Option<Address> {
        self.session.as_ref().map(|s| s.account)
    }

    /// Cached token snapshot, ascending by id.
    pub fn nfts(&self) -> &[Nft] {
        &self.nfts
    }

    /// Last user-visible status line.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn draft(&self) -> Option<&CreateForm> {
        self.draft.as_ref()
    }

    pub fn set_draft(&mut self, form: CreateForm) {
        self.draft = Some(form);
    }

    /// Reconnect silently at startup: a wallet that has already authorized
    /// an account is picked up without prompting again.
    pub async fn resume(&mut self) -> Result<()> {
        if self.wallet.authorized_accounts().await.is_empty() {
            return Ok(());
        }
        info!("wallet already authorized, resuming session");
        self.connect().await
    }

    /// Connect the wallet, bind the contract, and load the initial listing.
    pub async fn connect(&mut self) -> Result<()> {
        if self.session.is_some() {
            self.status = Some("Already connected".to_string());
            return Ok(());
        }

        self.phase = Phase::Connecting;
        let signer = match self.wallet.connect().await {
            Ok(signer) => signer,
            Err(e) => {
                self.phase = Phase::Disconnected;
                self.status = Some(e.to_string());
                return Err(e.into());
            }
        };

        self.session = Some(Session {
            account: signer.address(),
            contract: MarketContract::new(self.contract_address, signer),
        });
        self.phase = Phase::Idle;

        match self.refresh_listing().await {
            Ok(()) => self.status = None,
            Err(e) => {
                warn!(error = %e, "initial listing load failed");
                self.status = Some(format!("Connected, but loading the listing failed: {e}"));
            }
        }
        Ok(())
    }

    /// Clear the session back to the initialized-empty state.
    pub fn disconnect(&mut self) {
        self.session = None;
        self.nfts.clear();
        self.status = None;
        self.phase = Phase::Disconnected;
    }

    /// Rebuild the cached token list from the contract.
    ///
    /// Ids are read with a bounded fan-out that preserves ascending output
    /// order; an id that fails to load is skipped without aborting the
    /// listing. The cache is only replaced once the whole pass is done.
    pub async fn refresh_listing(&mut self) -> Result<()> {
        let session = self.session.as_ref().context("not connected")?;
        let total = session.contract.total_nfts().await?;

        let contract = &session.contract;
        let fetched: Vec<Option<Nft>> = stream::iter(1..=total)
            .map(|id| async move {
                match contract.nft(id).await {
                    Ok(nft) => Some(nft),
                    Err(e) => {
                        warn!(id, error = %e, "skipping token that failed to load");
                        None
                    }
                }
            })
            .buffered(LISTING_FAN_OUT)
            .collect()
            .await;

        self.nfts = fetched.into_iter().flatten().collect();
        Ok(())
    }

    /// Run the create sequence: upload, mint, refresh.
    ///
    /// Any failing step aborts the remaining ones and leaves a status
    /// message; the draft form is consumed only on full success.
    pub async fn create_token(&mut self) -> Result<()> {
        ensure!(self.phase == Phase::Idle, "another operation is in flight");
        ensure!(self.session.is_some(), "not connected");
        let Some(form) = self.draft.clone() else {
            bail!("nothing to create: fill in the form first");
        };
        let Some(uploader) = self.uploader.clone() else {
            let message = "pinning service is not configured (set PINATA_JWT)";
            self.status = Some(message.to_string());
            bail!(message);
        };
        let price = match parse_eth(&form.price) {
            Ok(price) => price,
            Err(e) => {
                self.status = Some(format!("Invalid price \"{}\": {e}", form.price));
                return Err(e.into());
            }
        };

        self.phase = Phase::Minting;
        self.status = Some("Uploading image to pinning service...".to_string());
        let cid = match uploader.pin_file(&form.image, &form.name, &form.description).await {
            Ok(cid) => cid,
            Err(e) => {
                self.phase = Phase::Idle;
                self.status = Some(format!("Upload failed: {e}"));
                return Err(e.into());
            }
        };

        self.status = Some("Creating NFT on blockchain...".to_string());
        let minted = {
            let session = self.session.as_ref().context("not connected")?;
            session.contract.create_nft(&form.name, &form.description, &cid, price).await
        };
        if let Err(e) = minted {
            self.phase = Phase::Idle;
            self.status = Some(format!("Error creating NFT: {e}"));
            return Err(e.into());
        }

        let refreshed = self.refresh_listing().await;
        self.phase = Phase::Idle;
        if let Err(e) = refreshed {
            self.status = Some(format!("NFT created, but refreshing the listing failed: {e}"));
            return Err(e);
        }

        self.draft = None;
        self.status = Some("NFT created successfully!".to_string());
        Ok(())
    }

    /// Run the purchase sequence: buy, refresh.
    ///
    /// A failed purchase leaves the cached owner untouched.
    pub async fn purchase_token(&mut self, id: u64) -> Result<()> {
        ensure!(self.phase == Phase::Idle, "another operation is in flight");
        ensure!(self.session.is_some(), "not connected");
        let price = self
            .nfts
            .iter()
            .find(|nft| nft.id == id)
            .map(|nft| nft.price)
            .with_context(|| format!("unknown token id {id}"))?;

        self.phase = Phase::Buying;
        let bought = {
            let session = self.session.as_ref().context("not connected")?;
            session.contract.buy_nft(id, price).await
        };
        if let Err(e) = bought {
            self.phase = Phase::Idle;
            self.status = Some(format!("Error buying NFT: {e}"));
            return Err(e.into());
        }

        let refreshed = self.refresh_listing().await;
        self.phase = Phase::Idle;
        if let Err(e) = refreshed {
            self.status = Some(format!("NFT purchased, but refreshing the listing failed: {e}"));
            return Err(e);
        }

        self.status = Some("NFT purchased".to_string());
        Ok(())
    }

    #[cfg(test)]
    fn force_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }
}
