//! Stateless presentation: derives display text from view-model state.

use alloy_primitives::Address;

use bazaar_chain::{Nft, format_eth};

/// Shorten an address for display: first 6 and last 4 characters.
pub fn truncate_address(address: &Address) -> String {
    let s = address.to_string();
    format!("{}...{}", &s[..6], &s[s.len() - 4..])
}

/// Label of the connect control.
pub fn connect_label(account: Option<&Address>) -> String {
    match account {
        Some(address) => truncate_address(address),
        None => "Connect Wallet".to_string(),
    }
}

/// Price line, major units with the currency symbol.
pub fn format_price(price: alloy_primitives::U256) -> String {
    format!("{} ETH", format_eth(price))
}

/// Gateway URL for a token image, falling back to the placeholder when the
/// token carries no resolvable content identifier.
pub fn image_url(image_hash: &str, gateway: &str, placeholder: &str) -> String {
    if image_hash.trim().is_empty() {
        placeholder.to_string()
    } else {
        format!("{}{}", gateway, image_hash)
    }
}

/// One token card. The purchase hint is hidden for the viewer's own tokens.
pub fn render_card(nft: &Nft, viewer: Option<Address>, gateway: &str, placeholder: &str) -> String {
    let mut card = format!("#{} {}\n", nft.id, nft.name);
    if !nft.description.is_empty() {
        card.push_str(&format!("    {}\n", nft.description));
    }
    card.push_str(&format!("    {}\n", format_price(nft.price)));
    card.push_str(&format!("    image: {}\n", image_url(&nft.image_hash, gateway, placeholder)));
    card.push_str(&format!("    owner: {}\n", truncate_address(&nft.owner)));
    if viewer.is_some_and(|account| account != nft.owner) {
        card.push_str(&format!("    [buy {}]\n", nft.id));
    }
    card
}

/// The whole marketplace grid, or the empty state.
pub fn render_listing(
    nfts: &[Nft],
    viewer: Option<Address>,
    gateway: &str,
    placeholder: &str,
) -> String {
    if nfts.is_empty() {
        return "No NFTs found in marketplace\n".to_string();
    }
    nfts.iter()
        .map(|nft| render_card(nft, viewer, gateway, placeholder))
        .collect::<Vec<_>>()
        .join("\n")
}
