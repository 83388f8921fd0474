//! Account views: portfolio enumeration with USD valuation, single-asset
//! balances. Per-asset valuations are independent read-only lookups, so
//! they are issued concurrently.

use crate::client::{BinanceClient, ClientError, Exchange};
use crate::types::RawBalance;
use futures_util::future::join_all;
use serde::Serialize;
use tracing::warn;

/// Assets counted at par when valuing a portfolio in USD.
const STABLE_ASSETS: [&str; 3] = ["USDT", "USDC", "BUSD"];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetBalance {
    pub asset: String,
    pub free: f64,
    pub locked: f64,
    pub total: f64,
    pub usd_value: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub total_usd: f64,
    pub assets: Vec<AssetBalance>,
}

pub struct AccountService<'a> {
    client: &'a BinanceClient,
}

impl<'a> AccountService<'a> {
    pub fn new(client: &'a BinanceClient) -> Self {
        Self { client }
    }

    /// All non-zero balances valued in USD, sorted by value descending.
    pub async fn portfolio(&self) -> Result<Portfolio, ClientError> {
        let account = self.client.account().await?;
        let balances: Vec<RawBalance> = account
            .balances
            .into_iter()
            .filter(|b| b.free > 0.0 || b.locked > 0.0)
            .collect();

        let values = join_all(balances.iter().map(|b| self.value_in_usd(b))).await;

        let mut assets: Vec<AssetBalance> = balances
            .into_iter()
            .zip(values)
            .map(|(b, usd_value)| AssetBalance {
                total: b.free + b.locked,
                asset: b.asset,
                free: b.free,
                locked: b.locked,
                usd_value,
            })
            .collect();
        sort_by_usd(&mut assets);

        let total_usd = assets.iter().map(|a| a.usd_value).sum();
        Ok(Portfolio { total_usd, assets })
    }

    /// One asset's balance; a missing asset is a normal zero-balance
    /// result, not an error.
    pub async fn balance(&self, asset: &str) -> Result<AssetBalance, ClientError> {
        let asset = asset.to_uppercase();
        let portfolio = self.portfolio().await?;
        Ok(portfolio
            .assets
            .into_iter()
            .find(|a| a.asset == asset)
            .unwrap_or(AssetBalance {
                asset,
                free: 0.0,
                locked: 0.0,
                total: 0.0,
                usd_value: 0.0,
            }))
    }

    async fn value_in_usd(&self, balance: &RawBalance) -> f64 {
        let total = balance.free + balance.locked;
        if STABLE_ASSETS.contains(&balance.asset.as_str()) {
            return total;
        }
        match self
            .client
            .ticker_price(&format!("{}USDT", balance.asset))
            .await
        {
            Ok(Some(price)) => total * price,
            Ok(None) => 0.0,
            Err(e) => {
                warn!("Could not value {} in USD: {}", balance.asset, e);
                0.0
            }
        }
    }
}

fn sort_by_usd(assets: &mut [AssetBalance]) {
    assets.sort_by(|a, b| {
        b.usd_value
            .partial_cmp(&a.usd_value)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
