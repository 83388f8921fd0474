//! Market Query
//!
//! Resolves whether a direct or reverse trading pair exists for two assets
//! and fetches last prices. "No such pair" is a valid outcome, not an
//! error: it is what triggers bridged routing.

use crate::client::{ClientError, Exchange};
use serde::Serialize;
use tracing::debug;

/// Whether the user's "from" asset is the base (Direct) or the quote
/// (Reverse) of the exchange-canonical symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PairDirection {
    Direct,
    Reverse,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetPair {
    pub symbol: String,
    pub direction: PairDirection,
}

pub struct MarketQuery<'a, E: Exchange> {
    exchange: &'a E,
}

impl<'a, E: Exchange> MarketQuery<'a, E> {
    pub fn new(exchange: &'a E) -> Self {
        Self { exchange }
    }

    /// Try the canonical concatenation `FROM+TO` first; if the market does
    /// not recognize it, try `TO+FROM` and report it as reverse. At most
    /// one direction resolves for any pair of assets.
    pub async fn resolve_pair(
        &self,
        from_asset: &str,
        to_asset: &str,
    ) -> Result<Option<AssetPair>, ClientError> {
        let direct = format!("{}{}", from_asset.to_uppercase(), to_asset.to_uppercase());
        if self.exchange.ticker_price(&direct).await?.is_some() {
            debug!("Resolved {} -> {} as direct pair {}", from_asset, to_asset, direct);
            return Ok(Some(AssetPair {
                symbol: direct,
                direction: PairDirection::Direct,
            }));
        }

        let reverse = format!("{}{}", to_asset.to_uppercase(), from_asset.to_uppercase());
        if self.exchange.ticker_price(&reverse).await?.is_some() {
            debug!("Resolved {} -> {} as reverse pair {}", from_asset, to_asset, reverse);
            return Ok(Some(AssetPair {
                symbol: reverse,
                direction: PairDirection::Reverse,
            }));
        }

        debug!("No direct market between {} and {}", from_asset, to_asset);
        Ok(None)
    }

    /// Last traded price for an already-known symbol.
    pub async fn price_of(&self, symbol: &str) -> Result<Option<f64>, ClientError> {
        self.exchange.ticker_price(symbol).await
    }
}
