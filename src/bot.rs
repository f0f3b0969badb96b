//! Bot controller
//!
//! Wires the session manager, order gate, strategy, and stream supervisor
//! together. Holds no business logic of its own: ticks flow from the
//! supervisor into the strategy and decisions go to the gate, which folds
//! fill outcomes back into the strategy before it reopens.

use crate::api::ExchangeClient;
use crate::config::Config;
use crate::gate::OrderGate;
use crate::session::SessionManager;
use crate::strategy::StrategyState;
use crate::stream::StreamSupervisor;
use crate::types::{Action, Side};
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::info;

pub struct Bot {
    config: Config,
}

impl Bot {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Authenticate, start session renewal, and process ticks until a fatal
    /// error occurs. Initial authentication failure propagates out so the
    /// process can exit non-zero.
    pub async fn run(self) -> Result<()> {
        let account_id = self.config.require_account_id()?.to_string();

        let client = ExchangeClient::new(&self.config.api_base_url);
        let session = SessionManager::new(
            client.clone(),
            self.config.api_key.clone(),
            self.config.api_secret.clone(),
        );

        let initial = session
            .authenticate()
            .await
            .context("initial authentication failed")?;

        let (fatal_tx, mut fatal_rx) = mpsc::channel(1);
        let renewal = session.spawn_renewal(&initial, fatal_tx);

        let strategy = Arc::new(Mutex::new(StrategyState::new(
            self.config.buy_price,
            self.config.profitability,
            self.config.sell_reset,
        )));
        let gate = Arc::new(OrderGate::new(
            client,
            session,
            Arc::clone(&strategy),
            account_id,
            self.config.symbol.clone(),
            self.config.buy_qty,
        ));

        let supervisor =
            StreamSupervisor::new(self.config.ws_url.clone(), self.config.stream_id.clone());
        let (tick_tx, mut tick_rx) = mpsc::channel(64);
        let stream_task = tokio::spawn(async move { supervisor.run(tick_tx).await });

        info!("--- starting {} bot ---", self.config.symbol);

        let result = loop {
            tokio::select! {
                Some(err) = fatal_rx.recv() => {
                    break Err(anyhow::Error::new(err).context("session renewal failed"));
                }
                tick = tick_rx.recv() => match tick {
                    Some(price) => {
                        Self::handle_tick(price, &strategy, &gate).await;
                    }
                    None => break Ok(()),
                },
            }
        };

        // Cancel the renewal timer and the stream on the way out
        renewal.abort();
        stream_task.abort();
        result
    }

    /// Evaluate one tick and dispatch the decision through the gate. The
    /// gate claims its in-flight permit here, before this function returns,
    /// and runs the submission as its own task; later ticks keep flowing
    /// while the order is outstanding and overlapping decisions are dropped.
    async fn handle_tick(
        price: Decimal,
        strategy: &Arc<Mutex<StrategyState>>,
        gate: &Arc<OrderGate>,
    ) -> Action {
        let action = {
            let mut strategy = strategy.lock().await;
            info!("[MARKET] current price: {}", price);
            match strategy.target_sell_price() {
                Some(target) => info!("[STATUS] next sell target: {}", target),
                None => info!("[STATUS] next sell target: none"),
            }
            strategy.on_tick(price)
        };

        let side = match action {
            Action::Buy => Side::Buy,
            Action::Sell => Side::Sell,
            Action::None => return action,
        };

        gate.dispatch(side, price);
        action
    }
}
