//! Binance REST client
//!
//! One `reqwest::Client` per invocation, shared by public, signed-spot and
//! signed-futures requests. Error payloads (`{"code":..,"msg":..}`) are
//! decoded into typed rejections and surfaced verbatim; nothing is retried.

use crate::auth::RequestSigner;
use crate::config::Config;
use crate::format::format_qty;
use crate::types::{
    AccountInfo, AccountTrade, ConvertAccept, ConvertQuote, DepositAddress, FuturesPosition,
    OpenOrder, OrderAck, OrderKind, OrderSizing, OrderSpec, TickerPrice, Ticker24h,
};
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const REQUEST_TIMEOUT_SECS: u64 = 30;

// Binance error codes.
const CODE_UNKNOWN_SYMBOL: i64 = -1121;
const CODE_BAD_API_KEY_FMT: i64 = -2014;
const CODE_REJECTED_API_KEY: i64 = -2015;
const CODE_BAD_SIGNATURE: i64 = -1022;

// ==========================================
// Error Types
// ==========================================

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("API_KEY and SECRET required")]
    NotConfigured,
    #[error("invalid API credentials: {0}")]
    Unauthorized(String),
    #[error("{msg}")]
    Rejected { code: i64, msg: String },
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to parse exchange response: {0}")]
    Parse(String),
}

impl ClientError {
    /// Unknown trading symbol. Not fatal: it signals "no such market" and
    /// triggers fallback routing.
    pub fn is_unknown_symbol(&self) -> bool {
        matches!(self, ClientError::Rejected { code, .. } if *code == CODE_UNKNOWN_SYMBOL)
    }

    pub fn remote_code(&self) -> Option<i64> {
        match self {
            ClientError::Rejected { code, .. } => Some(*code),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErr {
    code: i64,
    msg: String,
}

// ==========================================
// Exchange seam
// ==========================================

/// The two remote operations the routing/execution core depends on.
/// Implemented by [`BinanceClient`] and by scripted mocks in tests.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Last traded price for a symbol, or `None` when the market does not
    /// recognize it.
    async fn ticker_price(&self, symbol: &str) -> Result<Option<f64>, ClientError>;

    /// Place exactly one order. No internal retry; rejections carry the
    /// remote code and message verbatim.
    async fn submit_order(&self, spec: &OrderSpec) -> Result<OrderAck, ClientError>;
}

// ==========================================
// Client
// ==========================================

pub struct BinanceClient {
    http: reqwest::Client,
    signer: Option<RequestSigner>,
    spot_url: String,
    futures_url: String,
}

impl BinanceClient {
    pub fn new(config: &Config) -> Self {
        let signer = match (&config.api_key, &config.api_secret) {
            (Some(key), Some(secret)) => Some(RequestSigner::new(key.clone(), secret.clone())),
            _ => None,
        };
        if signer.is_none() {
            debug!("No API credentials configured; private endpoints disabled");
        }

        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            signer,
            spot_url: config.spot_base_url().to_string(),
            futures_url: config.futures_base_url().to_string(),
        }
    }

    fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ClientError> {
        if let Ok(value) = serde_json::from_str::<T>(body) {
            return Ok(value);
        }
        if let Ok(err) = serde_json::from_str::<ApiErr>(body) {
            warn!("Exchange rejected request: {} (code {})", err.msg, err.code);
            return Err(match err.code {
                CODE_BAD_API_KEY_FMT | CODE_REJECTED_API_KEY | CODE_BAD_SIGNATURE => {
                    ClientError::Unauthorized(err.msg)
                }
                code => ClientError::Rejected { code, msg: err.msg },
            });
        }
        Err(ClientError::Parse(format!(
            "unexpected response body: {}",
            body.chars().take(200).collect::<String>()
        )))
    }

    async fn get_public<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ClientError> {
        let query: String = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        let url = if query.is_empty() {
            format!("{}{}", self.spot_url, path)
        } else {
            format!("{}{}?{}", self.spot_url, path, query)
        };

        debug!("GET {}", url);
        let body = self.http.get(&url).send().await?.text().await?;
        Self::decode(&body)
    }

    async fn signed<T: DeserializeOwned>(
        &self,
        method: Method,
        base: &str,
        path: &str,
        params: Vec<(String, String)>,
    ) -> Result<T, ClientError> {
        let signer = self.signer.as_ref().ok_or(ClientError::NotConfigured)?;
        let query = signer
            .signed_query(&params)
            .map_err(|e| ClientError::Unauthorized(e.to_string()))?;
        let url = format!("{}{}?{}", base, path, query);

        debug!("{} {}{}", method, base, path);
        let body = self
            .http
            .request(method, &url)
            .header("X-MBX-APIKEY", signer.api_key())
            .send()
            .await?
            .text()
            .await?;
        Self::decode(&body)
    }

    async fn signed_spot<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: Vec<(String, String)>,
    ) -> Result<T, ClientError> {
        let base = self.spot_url.clone();
        self.signed(method, &base, path, params).await
    }

    // ==========================================
    // Public endpoints
    // ==========================================

    pub async fn ticker(&self, symbol: &str) -> Result<TickerPrice, ClientError> {
        self.get_public("/api/v3/ticker/price", &[("symbol", symbol)]).await
    }

    pub async fn ticker_24h(&self, symbol: &str) -> Result<Ticker24h, ClientError> {
        self.get_public("/api/v3/ticker/24hr", &[("symbol", symbol)]).await
    }

    // ==========================================
    // Private spot endpoints
    // ==========================================

    pub async fn account(&self) -> Result<AccountInfo, ClientError> {
        self.signed_spot(Method::GET, "/api/v3/account", Vec::new()).await
    }

    pub async fn open_orders(&self, symbol: Option<&str>) -> Result<Vec<OpenOrder>, ClientError> {
        let mut params = Vec::new();
        if let Some(symbol) = symbol {
            params.push(("symbol".to_string(), symbol.to_string()));
        }
        self.signed_spot(Method::GET, "/api/v3/openOrders", params).await
    }

    pub async fn cancel_order(
        &self,
        order_id: i64,
        symbol: Option<&str>,
    ) -> Result<Value, ClientError> {
        let mut params = vec![("orderId".to_string(), order_id.to_string())];
        if let Some(symbol) = symbol {
            params.push(("symbol".to_string(), symbol.to_string()));
        }
        self.signed_spot(Method::DELETE, "/api/v3/order", params).await
    }

    pub async fn cancel_open_orders(&self, symbol: &str) -> Result<Vec<Value>, ClientError> {
        let params = vec![("symbol".to_string(), symbol.to_string())];
        self.signed_spot(Method::DELETE, "/api/v3/openOrders", params).await
    }

    pub async fn my_trades(&self, symbol: &str) -> Result<Vec<AccountTrade>, ClientError> {
        let params = vec![("symbol".to_string(), symbol.to_string())];
        self.signed_spot(Method::GET, "/api/v3/myTrades", params).await
    }

    pub async fn convert_quote(
        &self,
        from_asset: &str,
        to_asset: &str,
        amount: f64,
    ) -> Result<ConvertQuote, ClientError> {
        let params = vec![
            ("fromAsset".to_string(), from_asset.to_string()),
            ("toAsset".to_string(), to_asset.to_string()),
            ("fromAmount".to_string(), format_qty(amount)),
        ];
        self.signed_spot(Method::POST, "/sapi/v1/convert/getQuote", params).await
    }

    pub async fn convert_accept(&self, quote_id: &str) -> Result<ConvertAccept, ClientError> {
        let params = vec![("quoteId".to_string(), quote_id.to_string())];
        self.signed_spot(Method::POST, "/sapi/v1/convert/acceptQuote", params).await
    }

    pub async fn deposit_address(
        &self,
        coin: &str,
        network: Option<&str>,
    ) -> Result<DepositAddress, ClientError> {
        let mut params = vec![("coin".to_string(), coin.to_string())];
        if let Some(network) = network {
            params.push(("network".to_string(), network.to_string()));
        }
        self.signed_spot(Method::GET, "/sapi/v1/capital/deposit/address", params).await
    }

    // ==========================================
    // Futures endpoints
    // ==========================================

    pub async fn futures_positions(&self) -> Result<Vec<FuturesPosition>, ClientError> {
        let base = self.futures_url.clone();
        self.signed(Method::GET, &base, "/fapi/v2/positionRisk", Vec::new()).await
    }
}

#[async_trait]
impl Exchange for BinanceClient {
    async fn ticker_price(&self, symbol: &str) -> Result<Option<f64>, ClientError> {
        match self.ticker(symbol).await {
            Ok(ticker) => Ok(Some(ticker.price)),
            Err(e) if e.is_unknown_symbol() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn submit_order(&self, spec: &OrderSpec) -> Result<OrderAck, ClientError> {
        let mut params = vec![
            ("symbol".to_string(), spec.symbol.clone()),
            ("side".to_string(), spec.side.to_string()),
            ("type".to_string(), spec.kind.as_str().to_string()),
        ];
        if let OrderKind::Limit { price } = spec.kind {
            params.push(("price".to_string(), format_qty(price)));
            params.push(("timeInForce".to_string(), "GTC".to_string()));
        }
        match spec.sizing {
            OrderSizing::Base(qty) => params.push(("quantity".to_string(), format_qty(qty))),
            OrderSizing::Quote(amount) => {
                params.push(("quoteOrderQty".to_string(), format_qty(amount)))
            }
        }

        self.signed_spot(Method::POST, "/api/v3/order", params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_payload() {
        let err = BinanceClient::decode::<TickerPrice>(r#"{"code":-1121,"msg":"Invalid symbol."}"#)
            .unwrap_err();
        assert!(err.is_unknown_symbol());
        assert_eq!(err.remote_code(), Some(-1121));
    }

    #[test]
    fn test_decode_unauthorized() {
        let err = BinanceClient::decode::<TickerPrice>(
            r#"{"code":-2015,"msg":"Invalid API-key, IP, or permissions for action."}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ClientError::Unauthorized(_)));
    }

    #[test]
    fn test_decode_garbage_is_parse_error() {
        let err = BinanceClient::decode::<TickerPrice>("<html>502</html>").unwrap_err();
        assert!(matches!(err, ClientError::Parse(_)));
    }
}
