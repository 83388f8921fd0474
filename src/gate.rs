//! Execution Gate
//!
//! Two-phase wrapper around every money-moving action: Preview (initial)
//! and Confirmed (terminal, triggers side effects). The only transition is
//! an explicit confirmation flag supplied with the same command that
//! describes the trade; without it the gate returns the preview and
//! performs zero remote mutation no matter how many times it runs. There
//! is no pending-confirmation state across invocations.

use crate::quote::Preview;
use std::future::Future;
use tracing::info;

#[derive(Debug)]
pub enum Gated<T> {
    Preview(Preview),
    Executed(T),
}

impl<T> Gated<T> {
    pub fn is_preview(&self) -> bool {
        matches!(self, Gated::Preview(_))
    }
}

/// Run `action` only when `confirmed` is set; otherwise hand back the
/// preview untouched. The action itself runs at most once.
pub async fn run<T, E, F, Fut>(confirmed: bool, preview: Preview, action: F) -> Result<Gated<T>, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    if !confirmed {
        info!("Confirmation absent; returning preview without executing");
        return Ok(Gated::Preview(preview));
    }
    action().await.map(Gated::Executed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quote::{SwapPreview, CONFIRM_HINT};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn dummy_preview() -> Preview {
        Preview::Swap(SwapPreview {
            preview: true,
            action: "SWAP".to_string(),
            from: "1 ETH".to_string(),
            to: "~20 SOL".to_string(),
            pair: "ETHSOL".to_string(),
            direction: "SELL".to_string(),
            price: 0.05,
            message: CONFIRM_HINT.to_string(),
        })
    }

    #[tokio::test]
    async fn test_unconfirmed_never_executes() {
        let calls = AtomicUsize::new(0);
        for _ in 0..5 {
            let outcome: Result<Gated<()>, ()> = run(false, dummy_preview(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
            assert!(outcome.unwrap().is_preview());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_confirmed_executes_exactly_once() {
        let calls = AtomicUsize::new(0);
        let outcome: Result<Gated<u32>, ()> = run(true, dummy_preview(), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(7)
        })
        .await;
        match outcome.unwrap() {
            Gated::Executed(v) => assert_eq!(v, 7),
            Gated::Preview(_) => panic!("confirmed run must execute"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_action_error_propagates() {
        let outcome: Result<Gated<()>, &str> =
            run(true, dummy_preview(), || async { Err("rejected") }).await;
        assert_eq!(outcome.unwrap_err(), "rejected");
    }
}
