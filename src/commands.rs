//! Command handlers
//!
//! One handler per CLI command, each returning the JSON document printed to
//! stdout. Mutating handlers (`buy`, `sell`, `swap`) run through the
//! execution gate; everything else is read-only.

use crate::account::AccountService;
use crate::client::{BinanceClient, ClientError, Exchange};
use crate::executor::{OrderExecutor, OrderResult};
use crate::format::{format_qty, format_usd};
use crate::gate::{self, Gated};
use crate::quote::{Preview, TradePreview, CONFIRM_HINT};
use crate::router::{SwapError, SwapReport, SwapRouter};
use crate::types::{OrderKind, OrderSide, OrderSizing, OrderSpec};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use thiserror::Error;

const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Swap(#[from] SwapError),
    #[error("{}", .0.error.as_ref().map(|e| e.message.as_str()).unwrap_or("swap failed"))]
    SwapFailed(SwapReport),
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl CliError {
    /// Structured error payload for the process exit path.
    pub fn to_json(&self) -> Value {
        match self {
            CliError::SwapFailed(report) => {
                serde_json::to_value(report).unwrap_or_else(|_| json!({ "error": "swap failed" }))
            }
            CliError::Client(ClientError::Rejected { code, msg }) => {
                json!({ "error": msg, "code": code })
            }
            other => json!({ "error": other.to_string() }),
        }
    }
}

fn require_positive(amount: f64) -> Result<(), CliError> {
    if amount > 0.0 {
        Ok(())
    } else {
        Err(CliError::Usage("amount must be positive".to_string()))
    }
}

// ==========================================
// Read-only commands
// ==========================================

pub async fn price(client: &BinanceClient, asset: &str, quote: &str) -> Result<Value, CliError> {
    let pair = format!("{}{}", asset.to_uppercase(), quote.to_uppercase());

    // Price and 24h statistics are independent read-only lookups.
    let (ticker, stats) = tokio::try_join!(client.ticker(&pair), client.ticker_24h(&pair))?;

    Ok(json!({
        "symbol": pair,
        "price": format_usd(ticker.price),
        "priceRaw": ticker.price,
        "change24h": format!("{:.2}%", stats.price_change_percent),
        "high24h": format_usd(stats.high_price),
        "low24h": format_usd(stats.low_price),
        "volume24h": format_usd(stats.quote_volume),
    }))
}

pub async fn portfolio(client: &BinanceClient) -> Result<Value, CliError> {
    let portfolio = AccountService::new(client).portfolio().await?;
    Ok(json!({
        "totalUSD": format_usd(portfolio.total_usd),
        "assets": portfolio.assets.iter().map(|a| json!({
            "asset": a.asset,
            "free": a.free,
            "locked": a.locked,
            "total": a.total,
            "usdValue": format_usd(a.usd_value),
        })).collect::<Vec<_>>(),
    }))
}

pub async fn balance(client: &BinanceClient, asset: &str) -> Result<Value, CliError> {
    let balance = AccountService::new(client).balance(asset).await?;
    Ok(json!({
        "asset": balance.asset,
        "balance": balance.free,
        "locked": balance.locked,
        "total": balance.total,
        "usdValue": format_usd(balance.usd_value),
    }))
}

pub async fn orders(
    client: &BinanceClient,
    asset: Option<&str>,
    quote: &str,
) -> Result<Value, CliError> {
    let symbol = asset.map(|a| format!("{}{}", a.to_uppercase(), quote.to_uppercase()));
    let orders = client.open_orders(symbol.as_deref()).await?;

    Ok(Value::Array(
        orders
            .iter()
            .map(|o| {
                json!({
                    "orderId": o.order_id,
                    "symbol": o.symbol,
                    "side": o.side,
                    "type": o.order_type,
                    "price": o.price,
                    "quantity": o.quantity,
                    "filled": o.filled,
                    "status": o.status,
                })
            })
            .collect(),
    ))
}

// ==========================================
// Gated trading commands
// ==========================================

fn order_result_json(result: &OrderResult) -> Value {
    json!({
        "success": true,
        "orderId": result.order_id,
        "symbol": result.symbol,
        "side": result.side.to_string(),
        "type": result.order_type,
        "quantity": result.quantity,
        "price": result.price.map(Value::from).unwrap_or_else(|| Value::from("MARKET")),
        "status": result.status,
    })
}

async fn resolve_pair_price(
    client: &BinanceClient,
    pair: &str,
) -> Result<f64, CliError> {
    client.ticker_price(pair).await?.ok_or_else(|| {
        CliError::NotFound(format!(
            "Trading pair {} not found. Try a different --for currency.",
            pair
        ))
    })
}

#[allow(clippy::too_many_arguments)]
pub async fn buy(
    client: &BinanceClient,
    asset: &str,
    amount: f64,
    quote: &str,
    quote_sized: bool,
    limit: Option<f64>,
    confirm: bool,
) -> Result<Value, CliError> {
    require_positive(amount)?;
    let quote = quote.to_uppercase();
    let pair = format!("{}{}", asset.to_uppercase(), quote);
    let current_price = resolve_pair_price(client, &pair).await?;

    let kind = match limit {
        Some(price) => OrderKind::Limit { price },
        None => OrderKind::Market,
    };
    // Limit orders always size by base quantity; market buys may spend a
    // fixed quote amount instead.
    let sizing = if limit.is_none() && quote_sized {
        OrderSizing::Quote(amount)
    } else {
        OrderSizing::Base(amount)
    };
    let spec = OrderSpec {
        symbol: pair.clone(),
        side: OrderSide::Buy,
        kind,
        sizing,
    };

    let estimated_cost = match sizing {
        OrderSizing::Quote(spend) => format!("{} {}", format_qty(spend), quote),
        OrderSizing::Base(qty) => format_usd(qty * current_price),
    };
    let preview = Preview::Trade(TradePreview {
        preview: true,
        action: "BUY".to_string(),
        symbol: pair,
        amount,
        order_type: kind.as_str().to_string(),
        limit_price: limit,
        current_price: format_usd(current_price),
        estimated_cost: Some(estimated_cost),
        estimated_proceeds: None,
        message: CONFIRM_HINT.to_string(),
    });

    let executor = OrderExecutor::new(client);
    match gate::run(confirm, preview, || async { executor.submit(&spec).await }).await? {
        Gated::Preview(p) => Ok(serde_json::to_value(p)?),
        Gated::Executed(result) => Ok(order_result_json(&result)),
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn sell(
    client: &BinanceClient,
    asset: &str,
    amount: Option<f64>,
    quote: &str,
    all: bool,
    limit: Option<f64>,
    confirm: bool,
) -> Result<Value, CliError> {
    let quote = quote.to_uppercase();
    let asset = asset.to_uppercase();
    let pair = format!("{}{}", asset, quote);
    let current_price = resolve_pair_price(client, &pair).await?;

    let amount = if all {
        let balance = AccountService::new(client).balance(&asset).await?;
        if balance.free <= 0.0 {
            return Err(CliError::NotFound(format!("No {} balance found", asset)));
        }
        balance.free
    } else {
        amount.ok_or_else(|| CliError::Usage("amount required unless --all".to_string()))?
    };
    require_positive(amount)?;

    let kind = match limit {
        Some(price) => OrderKind::Limit { price },
        None => OrderKind::Market,
    };
    let spec = OrderSpec {
        symbol: pair.clone(),
        side: OrderSide::Sell,
        kind,
        sizing: OrderSizing::Base(amount),
    };

    let preview = Preview::Trade(TradePreview {
        preview: true,
        action: "SELL".to_string(),
        symbol: pair,
        amount,
        order_type: kind.as_str().to_string(),
        limit_price: limit,
        current_price: format_usd(current_price),
        estimated_cost: None,
        estimated_proceeds: Some(format!("{:.2} {}", amount * current_price, quote)),
        message: CONFIRM_HINT.to_string(),
    });

    let executor = OrderExecutor::new(client);
    match gate::run(confirm, preview, || async { executor.submit(&spec).await }).await? {
        Gated::Preview(p) => Ok(serde_json::to_value(p)?),
        Gated::Executed(result) => Ok(order_result_json(&result)),
    }
}

pub async fn swap(
    client: &BinanceClient,
    from: &str,
    to: &str,
    amount: f64,
    confirm: bool,
) -> Result<Value, CliError> {
    let router = SwapRouter::new(client);
    match router.swap(from, to, amount, confirm).await? {
        Gated::Preview(p) => Ok(serde_json::to_value(p)?),
        Gated::Executed(report) if report.success => Ok(serde_json::to_value(report)?),
        Gated::Executed(report) => Err(CliError::SwapFailed(report)),
    }
}

// ==========================================
// Order management
// ==========================================

pub async fn cancel(
    client: &BinanceClient,
    order_id: i64,
    asset: Option<&str>,
) -> Result<Value, CliError> {
    let symbol = asset.map(|a| format!("{}USDT", a.to_uppercase()));
    client.cancel_order(order_id, symbol.as_deref()).await?;
    Ok(json!({ "success": true, "cancelled": order_id }))
}

pub async fn cancel_all(client: &BinanceClient, asset: &str) -> Result<Value, CliError> {
    let symbol = format!("{}USDT", asset.to_uppercase());
    let cancelled = client.cancel_open_orders(&symbol).await?;
    Ok(json!({
        "success": true,
        "cancelled": cancelled.len(),
        "orders": cancelled,
    }))
}

// ==========================================
// History & futures
// ==========================================

pub async fn history_trades(
    client: &BinanceClient,
    asset: &str,
    days: i64,
) -> Result<Value, CliError> {
    let symbol = format!("{}USDT", asset.to_uppercase());
    let trades = client.my_trades(&symbol).await?;

    let cutoff = Utc::now().timestamp_millis() - days * 24 * 60 * 60 * 1000;
    let rows: Vec<Value> = trades
        .iter()
        .filter(|t| t.time > cutoff)
        .map(|t| {
            json!({
                "time": DateTime::<Utc>::from_timestamp_millis(t.time)
                    .map(|d| d.to_rfc3339())
                    .unwrap_or_default(),
                "symbol": t.symbol,
                "side": if t.is_buyer { "BUY" } else { "SELL" },
                "price": t.price,
                "quantity": t.qty,
                "total": format_usd(t.price * t.qty),
                "fee": format!("{} {}", format_qty(t.commission), t.commission_asset),
            })
        })
        .collect();

    let start = rows.len().saturating_sub(HISTORY_LIMIT);
    Ok(Value::Array(rows[start..].to_vec()))
}

pub async fn futures_positions(client: &BinanceClient) -> Result<Value, CliError> {
    let positions = client.futures_positions().await?;

    Ok(Value::Array(
        positions
            .iter()
            .filter(|p| p.position_amt != 0.0)
            .map(|p| {
                let size = p.position_amt.abs();
                let notional = p.entry_price * size;
                let pnl_pct = if notional > 0.0 {
                    p.unrealized_profit / notional * 100.0
                } else {
                    0.0
                };
                json!({
                    "symbol": p.symbol,
                    "side": if p.position_amt > 0.0 { "LONG" } else { "SHORT" },
                    "size": size,
                    "entryPrice": format_usd(p.entry_price),
                    "markPrice": format_usd(p.mark_price),
                    "pnl": format_usd(p.unrealized_profit),
                    "pnlPercent": format!("{:.2}%", pnl_pct),
                    "leverage": format!("{}x", p.leverage),
                    "liquidationPrice": format_usd(p.liquidation_price),
                })
            })
            .collect(),
    ))
}

// ==========================================
// Convert & deposit
// ==========================================

pub async fn convert(
    client: &BinanceClient,
    from: &str,
    to: &str,
    amount: f64,
    quote_only: bool,
) -> Result<Value, CliError> {
    require_positive(amount)?;
    let from = from.to_uppercase();
    let to = to.to_uppercase();

    let quote = match client.convert_quote(&from, &to, amount).await {
        Ok(quote) => quote,
        Err(ClientError::Rejected { msg, .. }) if msg.contains("not authorized") => {
            return Ok(json!({
                "error": "Convert API not authorized. Use \"swap\" command instead.",
                "suggestion": format!("Try: swap {} {} {} --confirm", from, to, format_qty(amount)),
            }));
        }
        Err(e) => return Err(e.into()),
    };

    if quote_only {
        return Ok(json!({
            "quote": true,
            "from": format!("{} {}", format_qty(amount), from),
            "to": format!("{} {}", quote.to_amount.as_deref().unwrap_or("?"), to),
            "rate": quote.ratio,
            "validFor": "10 seconds",
        }));
    }

    let accept = client.convert_accept(&quote.quote_id).await?;
    Ok(json!({
        "success": true,
        "from": format!("{} {}", format_qty(amount), from),
        "to": format!(
            "{} {}",
            accept.to_amount.or(quote.to_amount).as_deref().unwrap_or("?"),
            to
        ),
        "status": accept.order_status,
    }))
}

pub async fn deposit_address(
    client: &BinanceClient,
    asset: &str,
    network: Option<&str>,
) -> Result<Value, CliError> {
    let network = network.map(|n| n.to_uppercase());
    let address = client
        .deposit_address(&asset.to_uppercase(), network.as_deref())
        .await?;
    Ok(json!({
        "asset": address.coin,
        "network": address.network,
        "address": address.address,
        "memo": address.tag,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_payload_shapes() {
        let err = CliError::Client(ClientError::Rejected {
            code: -2010,
            msg: "Account has insufficient balance for requested action.".to_string(),
        });
        let payload = err.to_json();
        assert_eq!(payload["code"], -2010);
        assert!(payload["error"].as_str().unwrap().contains("insufficient balance"));

        let err = CliError::Usage("amount must be positive".to_string());
        assert_eq!(err.to_json()["error"], "amount must be positive");
    }

    #[test]
    fn test_order_result_price_fallback() {
        let result = OrderResult {
            success: true,
            order_id: 9,
            symbol: "ETHUSDT".to_string(),
            side: OrderSide::Sell,
            order_type: "MARKET".to_string(),
            quantity: 1.0,
            executed_qty: 1.0,
            quote_qty: 3000.0,
            price: None,
            status: "FILLED".to_string(),
        };
        let value = order_result_json(&result);
        assert_eq!(value["price"], "MARKET");
        assert_eq!(value["side"], "SELL");
    }
}
