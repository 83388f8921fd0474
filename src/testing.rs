//! Scripted in-process exchange for routing/execution tests.

use crate::client::{ClientError, Exchange};
use crate::types::{OrderAck, OrderKind, OrderSide, OrderSizing, OrderSpec};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

/// Mock exchange with a fixed price table. Fills are simulated off the
/// quoted price scaled by `fill_factor`, so a factor below 1.0 plays the
/// role of slippage: the realized amount differs from the estimate.
pub struct MockExchange {
    prices: HashMap<String, f64>,
    fill_factor: f64,
    fail_symbol: Option<String>,
    orders: Mutex<Vec<OrderSpec>>,
    next_order_id: AtomicI64,
}

impl MockExchange {
    pub fn new(prices: &[(&str, f64)]) -> Self {
        Self {
            prices: prices.iter().map(|(s, p)| (s.to_string(), *p)).collect(),
            fill_factor: 1.0,
            fail_symbol: None,
            orders: Mutex::new(Vec::new()),
            next_order_id: AtomicI64::new(1000),
        }
    }

    pub fn with_fill_factor(mut self, factor: f64) -> Self {
        self.fill_factor = factor;
        self
    }

    /// Reject every submission against the given symbol.
    pub fn failing_on(mut self, symbol: &str) -> Self {
        self.fail_symbol = Some(symbol.to_string());
        self
    }

    /// Orders submitted so far, in submission sequence.
    pub fn submitted(&self) -> Vec<OrderSpec> {
        self.orders.lock().unwrap().clone()
    }
}

#[async_trait]
impl Exchange for MockExchange {
    async fn ticker_price(&self, symbol: &str) -> Result<Option<f64>, ClientError> {
        Ok(self.prices.get(symbol).copied())
    }

    async fn submit_order(&self, spec: &OrderSpec) -> Result<OrderAck, ClientError> {
        if self.fail_symbol.as_deref() == Some(spec.symbol.as_str()) {
            return Err(ClientError::Rejected {
                code: -2010,
                msg: "Account has insufficient balance for requested action.".to_string(),
            });
        }

        let price = match self.prices.get(&spec.symbol) {
            Some(p) => *p,
            None => {
                return Err(ClientError::Rejected {
                    code: -1121,
                    msg: "Invalid symbol.".to_string(),
                })
            }
        };

        self.orders.lock().unwrap().push(spec.clone());
        let order_id = self.next_order_id.fetch_add(1, Ordering::SeqCst);

        let (orig_qty, executed_qty, quote_qty) = match spec.sizing {
            OrderSizing::Base(qty) => (qty, qty, qty * price * self.fill_factor),
            OrderSizing::Quote(amount) => {
                (amount / price, amount / price * self.fill_factor, amount)
            }
        };

        Ok(OrderAck {
            order_id,
            symbol: spec.symbol.clone(),
            status: Some("FILLED".to_string()),
            orig_qty: Some(orig_qty),
            executed_qty: Some(executed_qty),
            cummulative_quote_qty: Some(quote_qty),
            price: match spec.kind {
                OrderKind::Limit { price } => Some(price),
                OrderKind::Market => Some(0.0),
            },
        })
    }
}

/// Shorthand for a market order spec in tests.
pub fn market_order(symbol: &str, side: OrderSide, sizing: OrderSizing) -> OrderSpec {
    OrderSpec {
        symbol: symbol.to_string(),
        side,
        kind: OrderKind::Market,
        sizing,
    }
}
