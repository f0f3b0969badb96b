//! Order gate: one order at a time
//!
//! Submissions that arrive while one is in flight are dropped, not queued:
//! a queued stale order could execute against a price that no longer
//! satisfies the strategy condition. The in-flight permit is a real mutex
//! taken with `try_lock`, so check-and-acquire is atomic under the
//! multi-threaded runtime, and the owned guard releases on every exit path.
//! On a fill the strategy update runs while the permit is still held; a
//! tick evaluated after the gate reopens always sees the updated target,
//! so the fill/update window cannot produce a duplicate order.

use crate::api::ExchangeClient;
use crate::session::SessionManager;
use crate::strategy::StrategyState;
use crate::types::{OrderRequest, OrderType, Side};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info};

/// Outcome of one submission attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Order accepted by the exchange. Carries the side and the tick price
    /// that triggered the decision, from which the sell target was derived.
    Filled {
        side: Side,
        reference_price: Decimal,
    },
    /// Another submission was in flight; this one was silently discarded
    Dropped,
    /// Missing session or exchange rejection; reported, never retried
    Failed,
}

pub struct OrderGate {
    client: ExchangeClient,
    session: SessionManager,
    strategy: Arc<Mutex<StrategyState>>,
    account_id: String,
    symbol: String,
    qty: Decimal,
    in_flight: Arc<Mutex<()>>,
}

impl OrderGate {
    pub fn new(
        client: ExchangeClient,
        session: SessionManager,
        strategy: Arc<Mutex<StrategyState>>,
        account_id: String,
        symbol: String,
        qty: Decimal,
    ) -> Self {
        Self {
            client,
            session,
            strategy,
            account_id,
            symbol,
            qty,
            in_flight: Arc::new(Mutex::new(())),
        }
    }

    /// Claim the gate and run the submission as its own task, so tick
    /// handling keeps flowing while the order is in flight.
    ///
    /// The permit is taken here, synchronously with the caller's tick
    /// evaluation; an overlapping request is dropped before any I/O starts.
    pub fn dispatch(self: &Arc<Self>, side: Side, reference_price: Decimal) {
        let Ok(permit) = Arc::clone(&self.in_flight).try_lock_owned() else {
            debug!("[ORDER] submission in flight, dropping {}", side);
            return;
        };

        let gate = Arc::clone(self);
        tokio::spawn(async move {
            gate.submit_locked(permit, side, reference_price).await;
        });
    }

    /// Submit a market order inline. `reference_price` is the tick price
    /// that triggered the decision.
    pub async fn submit(&self, side: Side, reference_price: Decimal) -> SubmitOutcome {
        match Arc::clone(&self.in_flight).try_lock_owned() {
            Ok(permit) => self.submit_locked(permit, side, reference_price).await,
            Err(_) => {
                debug!("[ORDER] submission in flight, dropping {}", side);
                SubmitOutcome::Dropped
            }
        }
    }

    async fn submit_locked(
        &self,
        _permit: OwnedMutexGuard<()>,
        side: Side,
        reference_price: Decimal,
    ) -> SubmitOutcome {
        let token = match self.session.current_token().await {
            Ok(token) => token,
            Err(err) => {
                error!("[ORDER] {} aborted: {}", side, err);
                return SubmitOutcome::Failed;
            }
        };

        let base = self.symbol.split('-').next().unwrap_or(&self.symbol);
        info!("[ORDER] sending {} of {} {}", side, self.qty, base);

        let request = OrderRequest {
            qty: self.qty,
            side,
            order_type: OrderType::Market,
        };

        match self
            .client
            .place_order(&token, &self.account_id, &self.symbol, &request)
            .await
        {
            Ok(confirmation) => {
                info!(
                    "[ORDER] {} executed at reference price {}{}",
                    side,
                    reference_price,
                    confirmation
                        .order_id
                        .map(|id| format!(" (order {})", id))
                        .unwrap_or_default()
                );

                // Strategy update happens inside the critical section; the
                // permit must not drop until the target reflects the fill.
                let mut strategy = self.strategy.lock().await;
                match side {
                    Side::Buy => strategy.set_target_from_fill(reference_price),
                    Side::Sell => strategy.confirm_sell(),
                }

                SubmitOutcome::Filled {
                    side,
                    reference_price,
                }
            }
            Err(err) => {
                error!("[ORDER] {} failed: {}", side, err);
                SubmitOutcome::Failed
            }
        }
        // _permit drops here: success, failure, and abort paths all release
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use crate::strategy::ResetPolicy;
    use crate::types::Action;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn authenticated_session(server: &mockito::Server) -> SessionManager {
        let manager = SessionManager::new(
            ExchangeClient::new(server.url()),
            "key".to_string(),
            "secret".to_string(),
        );
        manager.install_for_test(Session {
            access_token: "tok-123".to_string(),
            expires_at: Utc::now() + chrono::Duration::minutes(5),
        });
        manager
    }

    fn gate(
        server: &mockito::Server,
        session: SessionManager,
        reset_policy: ResetPolicy,
    ) -> (OrderGate, Arc<Mutex<StrategyState>>) {
        let strategy = Arc::new(Mutex::new(StrategyState::new(
            dec!(100),
            dec!(1.05),
            reset_policy,
        )));
        let gate = OrderGate::new(
            ExchangeClient::new(server.url()),
            session,
            Arc::clone(&strategy),
            "acc-1".to_string(),
            "BTC-BRL".to_string(),
            dec!(0.001),
        );
        (gate, strategy)
    }

    #[tokio::test]
    async fn test_submit_filled_carries_reference_price() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/accounts/acc-1/BTC-BRL/orders")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"orderId":"ord-1"}"#)
            .create_async()
            .await;

        let session = authenticated_session(&server);
        let (gate, _strategy) = gate(&server, session, ResetPolicy::OnAttempt);

        let outcome = gate.submit(Side::Buy, dec!(95)).await;
        assert_eq!(
            outcome,
            SubmitOutcome::Filled {
                side: Side::Buy,
                reference_price: dec!(95)
            }
        );
    }

    #[tokio::test]
    async fn test_no_duplicate_buy_after_fill() {
        // Exactly one order may reach the exchange: the target update lands
        // before the gate reopens, so the next tick is no longer buy-eligible
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/accounts/acc-1/BTC-BRL/orders")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"orderId":"ord-1"}"#)
            .expect(1)
            .create_async()
            .await;

        let session = authenticated_session(&server);
        let (gate, strategy) = gate(&server, session, ResetPolicy::OnAttempt);

        assert!(matches!(
            gate.submit(Side::Buy, dec!(95)).await,
            SubmitOutcome::Filled { .. }
        ));

        // The gate is open again, but the very next tick already sees the
        // target set from the fill and emits no second buy
        let mut strategy = strategy.lock().await;
        assert_eq!(strategy.target_sell_price(), Some(dec!(99.75)));
        assert_eq!(strategy.on_tick(dec!(94)), Action::None);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_sell_fill_confirms_reset() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/accounts/acc-1/BTC-BRL/orders")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"orderId":"ord-2"}"#)
            .create_async()
            .await;

        let session = authenticated_session(&server);
        let (gate, strategy) = gate(&server, session, ResetPolicy::OnFill);
        strategy.lock().await.set_target_from_fill(dec!(95));

        assert!(matches!(
            gate.submit(Side::Sell, dec!(99.75)).await,
            SubmitOutcome::Filled { .. }
        ));
        assert_eq!(strategy.lock().await.target_sell_price(), None);
    }

    #[tokio::test]
    async fn test_submit_dropped_while_locked() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/accounts/acc-1/BTC-BRL/orders")
            .expect(0)
            .create_async()
            .await;

        let session = authenticated_session(&server);
        let (gate, _strategy) = gate(&server, session, ResetPolicy::OnAttempt);

        // Hold the in-flight permit as an outstanding submission would
        let _permit = gate.in_flight.try_lock().unwrap();

        assert_eq!(gate.submit(Side::Buy, dec!(95)).await, SubmitOutcome::Dropped);
        assert_eq!(gate.submit(Side::Sell, dec!(99)).await, SubmitOutcome::Dropped);
        mock.assert_async().await; // no network calls while locked
    }

    #[tokio::test]
    async fn test_dispatch_drops_while_locked() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/accounts/acc-1/BTC-BRL/orders")
            .expect(0)
            .create_async()
            .await;

        let session = authenticated_session(&server);
        let (gate, _strategy) = gate(&server, session, ResetPolicy::OnAttempt);
        let gate = Arc::new(gate);

        // Permit claimed: dispatch returns without spawning any submission
        let _permit = gate.in_flight.try_lock().unwrap();
        gate.dispatch(Side::Buy, dec!(95));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_submit_without_session_fails_without_network_call() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/accounts/acc-1/BTC-BRL/orders")
            .expect(0)
            .create_async()
            .await;

        let session = SessionManager::new(
            ExchangeClient::new(server.url()),
            "key".to_string(),
            "secret".to_string(),
        );
        let (gate, _strategy) = gate(&server, session, ResetPolicy::OnAttempt);

        assert_eq!(gate.submit(Side::Buy, dec!(95)).await, SubmitOutcome::Failed);
        mock.assert_async().await;

        // And the permit was released
        assert!(gate.in_flight.try_lock().is_ok());
    }

    #[tokio::test]
    async fn test_lock_released_after_rejection() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/accounts/acc-1/BTC-BRL/orders")
            .with_status(500)
            .with_body("exchange on fire")
            .expect(2)
            .create_async()
            .await;

        let session = authenticated_session(&server);
        let (gate, strategy) = gate(&server, session, ResetPolicy::OnAttempt);

        assert_eq!(gate.submit(Side::Buy, dec!(95)).await, SubmitOutcome::Failed);
        // Second submission reaches the exchange: the permit was released
        assert_eq!(gate.submit(Side::Buy, dec!(94)).await, SubmitOutcome::Failed);
        mock.assert_async().await;

        // Failures never touch the strategy
        assert_eq!(strategy.lock().await.target_sell_price(), None);
    }

    #[tokio::test]
    async fn test_lock_released_after_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/accounts/acc-1/BTC-BRL/orders")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"orderId":"ord-1"}"#)
            .expect(2)
            .create_async()
            .await;

        let session = authenticated_session(&server);
        let (gate, _strategy) = gate(&server, session, ResetPolicy::OnAttempt);

        assert!(matches!(
            gate.submit(Side::Buy, dec!(95)).await,
            SubmitOutcome::Filled { .. }
        ));
        assert!(matches!(
            gate.submit(Side::Sell, dec!(100)).await,
            SubmitOutcome::Filled { .. }
        ));
        mock.assert_async().await;
    }
}
