mod marketplace;
mod render;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use bazaar_chain::{EthereumProvider, HttpProvider};
use bazaar_core::{BazaarConfig, logging};
use bazaar_pinning::{AssetUploader, PinningClient};

use marketplace::{CreateForm, Marketplace};

const HELP: &str = "\
Commands:
  connect                                      connect the wallet and load the listing
  list                                         show the marketplace listing
  create <image> <price> [name] [description]  upload an image and mint a token
  buy <id>                                     purchase a listed token
  disconnect                                   clear the session
  help                                         show this help
  quit                                         exit
";

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = logging::init_logging()?;
    let config = BazaarConfig::load()?;
    info!(rpc_url = %config.rpc_url, contract = %config.contract_address, "starting marketplace client");

    let provider = build_provider(&config);
    let uploader = build_uploader(&config);
    let mut market = Marketplace::new(&config, provider, uploader)?;

    println!("Simple NFT Marketplace");
    if let Err(e) = market.resume().await {
        warn!(error = %e, "session resume failed");
    }
    if market.account().is_some() {
        println!("Resumed session as {}", render::connect_label(market.account().as_ref()));
    }
    print!("Type 'help' for commands.\n> ");
    std::io::stdout().flush()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if !dispatch(&mut market, &config, line.trim()).await {
            break;
        }
        print!("> ");
        std::io::stdout().flush()?;
    }
    Ok(())
}

fn build_provider(config: &BazaarConfig) -> Option<Arc<dyn EthereumProvider>> {
    if config.rpc_url.is_empty() {
        return None;
    }
    match HttpProvider::new(&config.rpc_url) {
        Ok(provider) => Some(Arc::new(provider)),
        Err(e) => {
            warn!(error = %e, "wallet provider unavailable");
            None
        }
    }
}

fn build_uploader(config: &BazaarConfig) -> Option<Arc<dyn AssetUploader>> {
    let jwt = config.pinning_jwt.as_ref()?;
    Some(Arc::new(PinningClient::new(&config.pinning_endpoint, jwt)))
}

/// Handle one command line. Returns `false` when the session should end.
async fn dispatch(market: &mut Marketplace, config: &BazaarConfig, line: &str) -> bool {
    let mut words = line.split_whitespace();
    match words.next() {
        None => {}
        Some("help") => print!("{HELP}"),
        Some("quit") | Some("exit") => return false,
        Some("connect") => {
            if market.connect().await.is_ok() {
                println!("Connected as {}", render::connect_label(market.account().as_ref()));
                print_listing(market, config);
            }
            print_status(market);
        }
        Some("disconnect") => {
            market.disconnect();
            println!("Disconnected");
        }
        Some("list") => {
            if market.account().is_some() {
                if let Err(e) = market.refresh_listing().await {
                    println!("Failed to refresh listing: {e}");
                }
            }
            print_listing(market, config);
        }
        Some("create") => {
            let (image, price) = match (words.next(), words.next()) {
                (Some(image), Some(price)) => (image, price),
                _ => {
                    println!("usage: create <image> <price> [name] [description]");
                    return true;
                }
            };
            let name = words.next().unwrap_or_default().to_string();
            let description = words.collect::<Vec<_>>().join(" ");
            market.set_draft(CreateForm {
                image: PathBuf::from(image),
                price: price.to_string(),
                name,
                description,
            });
            let created = market.create_token().await.is_ok();
            print_status(market);
            if created {
                print_listing(market, config);
            }
        }
        Some("buy") => {
            let Some(id) = words.next().and_then(|w| w.parse::<u64>().ok()) else {
                println!("usage: buy <id>");
                return true;
            };
            let bought = market.purchase_token(id).await.is_ok();
            print_status(market);
            if bought {
                print_listing(market, config);
            }
        }
        Some(other) => println!("unknown command: {other} (try 'help')"),
    }
    true
}

fn print_status(market: &Marketplace) {
    if let Some(status) = market.status() {
        println!("{status}");
    }
}

fn print_listing(market: &Marketplace, config: &BazaarConfig) {
    print!(
        "{}",
        render::render_listing(
            market.nfts(),
            market.account(),
            &config.ipfs_gateway,
            &config.placeholder_image,
        )
    );
}
