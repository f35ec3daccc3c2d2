use alloy_primitives::{Address, address};
use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::models::common::TokenConfig;

pub const UNKNOWN_SYMBOL: &str = "UNKNOWN";
pub const DEFAULT_DECIMALS: u8 = 18;

// Stablecoins and wrapped ETH commonly spent through the card on Linea
static KNOWN_TOKENS: Lazy<HashMap<Address, (&'static str, u8)>> = Lazy::new(|| {
    HashMap::from([
        (address!("0x176211869ca2b568f2a7d4ee941e073a821ee1ff"), ("USDC", 6)),
        (address!("0xa219439258ca9da29e9cc4ce5596924745e12b93"), ("USDT", 6)),
        (address!("0x3ff47c5bf409c86533fe1f4907524d304062428d"), ("EURe", 18)),
        (address!("0xe5d7c2a44ffddf6b295a15c148167daaaf5cf34f"), ("WETH", 18)),
    ])
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub symbol: String,
    pub decimals: u8,
}

/// Token address to (symbol, decimals). Addresses are compared as bytes, so
/// lookups ignore hex case. Unknown tokens resolve to `UNKNOWN` with 18
/// decimals instead of failing.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    extra: HashMap<Address, TokenInfo>,
}

impl TokenRegistry {
    pub fn new(extra: &[TokenConfig]) -> Self {
        Self {
            extra: extra
                .iter()
                .map(|token| {
                    (
                        token.address,
                        TokenInfo {
                            symbol: token.symbol.clone(),
                            decimals: token.decimals,
                        },
                    )
                })
                .collect(),
        }
    }

    pub fn resolve(&self, address: &Address) -> TokenInfo {
        if let Some(info) = self.extra.get(address) {
            return info.clone();
        }
        match KNOWN_TOKENS.get(address) {
            Some((symbol, decimals)) => TokenInfo {
                symbol: symbol.to_string(),
                decimals: *decimals,
            },
            None => TokenInfo {
                symbol: UNKNOWN_SYMBOL.to_string(),
                decimals: DEFAULT_DECIMALS,
            },
        }
    }
}
