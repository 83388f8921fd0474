//! Order Executor
//!
//! Submits a single order and normalizes the exchange's heterogeneous
//! acknowledgement shapes (limit acks carry an explicit price and original
//! quantity; market fills carry executed/cumulative amounts and a zero
//! price) into one uniform result. Exactly one remote order per call, no
//! internal retry; a rejection is reported upward verbatim.

use crate::client::{ClientError, Exchange};
use crate::types::{OrderSide, OrderSpec};
use serde::Serialize;
use tracing::info;

/// Uniform result of one submitted order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResult {
    pub success: bool,
    pub order_id: i64,
    pub symbol: String,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: String,
    /// Original order quantity where reported, executed quantity otherwise.
    pub quantity: f64,
    /// Base quantity actually filled.
    pub executed_qty: f64,
    /// Quote currency actually moved (`cummulativeQuoteQty`).
    pub quote_qty: f64,
    /// Limit price; `None` for market executions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    pub status: String,
}

pub struct OrderExecutor<'a, E: Exchange> {
    exchange: &'a E,
}

impl<'a, E: Exchange> OrderExecutor<'a, E> {
    pub fn new(exchange: &'a E) -> Self {
        Self { exchange }
    }

    pub async fn submit(&self, spec: &OrderSpec) -> Result<OrderResult, ClientError> {
        info!(
            "Submitting {} {} {} ({:?})",
            spec.side,
            spec.kind.as_str(),
            spec.symbol,
            spec.sizing
        );

        let ack = self.exchange.submit_order(spec).await?;

        let executed_qty = ack.executed_qty.unwrap_or(0.0);
        let quantity = ack
            .orig_qty
            .filter(|q| *q > 0.0)
            .unwrap_or(executed_qty);

        let result = OrderResult {
            success: true,
            order_id: ack.order_id,
            symbol: ack.symbol,
            side: spec.side,
            order_type: spec.kind.as_str().to_string(),
            quantity,
            executed_qty,
            quote_qty: ack.cummulative_quote_qty.unwrap_or(0.0),
            price: ack.price.filter(|p| *p > 0.0),
            status: ack.status.unwrap_or_else(|| "UNKNOWN".to_string()),
        };

        info!(
            "Order {} on {}: status={}, filled={}, quote={}",
            result.order_id, result.symbol, result.status, result.executed_qty, result.quote_qty
        );
        Ok(result)
    }
}
