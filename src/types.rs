//! Shared type definitions: order domain types and Binance wire types.
//!
//! Binance reports most numeric fields as decimal strings; the serde
//! helpers below accept either a string or a bare number.

use serde::{Deserialize, Deserializer, Serialize};

// ==========================================
// Serde helpers
// ==========================================

#[derive(Deserialize)]
#[serde(untagged)]
enum NumOrStr {
    Num(f64),
    Str(String),
}

pub fn de_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumOrStr::deserialize(deserializer)? {
        NumOrStr::Num(v) => Ok(v),
        NumOrStr::Str(s) => s.parse::<f64>().map_err(serde::de::Error::custom),
    }
}

pub fn de_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumOrStr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumOrStr::Num(v)) => Ok(Some(v)),
        Some(NumOrStr::Str(s)) => {
            if s.is_empty() {
                Ok(None)
            } else {
                s.parse::<f64>().map(Some).map_err(serde::de::Error::custom)
            }
        }
    }
}

// ==========================================
// Order Types
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderKind {
    Market,
    Limit { price: f64 },
}

impl OrderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderKind::Market => "MARKET",
            OrderKind::Limit { .. } => "LIMIT",
        }
    }
}

/// Order sizing, matching the exchange's dual modes: by base-asset quantity
/// or by quote-currency spend (`quoteOrderQty`). Exactly one applies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderSizing {
    Base(f64),
    Quote(f64),
}

/// A fully specified order, ready to submit.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSpec {
    pub symbol: String,
    pub side: OrderSide,
    pub kind: OrderKind,
    pub sizing: OrderSizing,
}

// ==========================================
// Wire Types (Binance REST responses)
// ==========================================

#[derive(Debug, Clone, Deserialize)]
pub struct TickerPrice {
    pub symbol: String,
    #[serde(deserialize_with = "de_f64")]
    pub price: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker24h {
    #[serde(deserialize_with = "de_f64")]
    pub price_change_percent: f64,
    #[serde(deserialize_with = "de_f64")]
    pub high_price: f64,
    #[serde(deserialize_with = "de_f64")]
    pub low_price: f64,
    #[serde(deserialize_with = "de_f64")]
    pub quote_volume: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawBalance {
    pub asset: String,
    #[serde(deserialize_with = "de_f64")]
    pub free: f64,
    #[serde(deserialize_with = "de_f64")]
    pub locked: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountInfo {
    pub balances: Vec<RawBalance>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenOrder {
    pub order_id: i64,
    pub symbol: String,
    pub side: String,
    #[serde(rename = "type")]
    pub order_type: String,
    #[serde(deserialize_with = "de_f64")]
    pub price: f64,
    #[serde(rename = "origQty", deserialize_with = "de_f64")]
    pub quantity: f64,
    #[serde(rename = "executedQty", deserialize_with = "de_f64")]
    pub filled: f64,
    pub status: String,
}

/// Raw order-placement acknowledgement. Market and limit fills populate
/// different subsets of these fields; the executor normalizes them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAck {
    pub order_id: i64,
    pub symbol: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    pub orig_qty: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    pub executed_qty: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    pub cummulative_quote_qty: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountTrade {
    pub symbol: String,
    pub time: i64,
    #[serde(deserialize_with = "de_f64")]
    pub price: f64,
    #[serde(deserialize_with = "de_f64")]
    pub qty: f64,
    #[serde(deserialize_with = "de_f64")]
    pub commission: f64,
    pub commission_asset: String,
    pub is_buyer: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuturesPosition {
    pub symbol: String,
    #[serde(deserialize_with = "de_f64")]
    pub position_amt: f64,
    #[serde(deserialize_with = "de_f64")]
    pub entry_price: f64,
    #[serde(deserialize_with = "de_f64")]
    pub mark_price: f64,
    #[serde(rename = "unRealizedProfit", deserialize_with = "de_f64")]
    pub unrealized_profit: f64,
    pub leverage: String,
    #[serde(deserialize_with = "de_f64")]
    pub liquidation_price: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertQuote {
    pub quote_id: String,
    #[serde(default)]
    pub ratio: Option<String>,
    #[serde(default)]
    pub to_amount: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertAccept {
    #[serde(default)]
    pub order_status: Option<String>,
    #[serde(default)]
    pub to_amount: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DepositAddress {
    pub coin: String,
    pub address: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub network: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stringified_decimals() {
        let ticker: TickerPrice =
            serde_json::from_str(r#"{"symbol":"BTCUSDT","price":"65432.10000000"}"#).unwrap();
        assert_eq!(ticker.symbol, "BTCUSDT");
        assert!((ticker.price - 65432.1).abs() < 1e-9);
    }

    #[test]
    fn test_market_ack_shape() {
        // Market fills report executed quantities but a zero price.
        let ack: OrderAck = serde_json::from_str(
            r#"{"symbol":"ETHUSDT","orderId":42,"status":"FILLED",
                "origQty":"1.00000000","executedQty":"1.00000000",
                "cummulativeQuoteQty":"2910.00000000","price":"0.00000000"}"#,
        )
        .unwrap();
        assert_eq!(ack.order_id, 42);
        assert_eq!(ack.cummulative_quote_qty, Some(2910.0));
        assert_eq!(ack.price, Some(0.0));
    }

    #[test]
    fn test_limit_ack_shape() {
        let ack: OrderAck = serde_json::from_str(
            r#"{"symbol":"BTCUSDT","orderId":7,"status":"NEW",
                "origQty":"0.00100000","price":"60000.00000000"}"#,
        )
        .unwrap();
        assert_eq!(ack.orig_qty, Some(0.001));
        assert_eq!(ack.executed_qty, None);
        assert_eq!(ack.price, Some(60000.0));
    }
}
