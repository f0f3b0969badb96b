//! Ticker stream supervisor
//!
//! Owns the market-data connection lifecycle: connect, subscribe, forward
//! ticks, detect disconnect, reconnect after a fixed delay. Every attempt
//! builds a fresh connection; a dead handle is never reused. A single
//! malformed frame is logged and skipped, never fatal; only transport
//! errors tear the connection down, and the retry is unconditional because
//! any stream outage is expected to be transient.

use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

/// Fixed delay between reconnect attempts
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Inbound stream frame. Only `type: "ticker"` frames carry a price;
/// everything else is ignored.
#[derive(Debug, Deserialize)]
struct StreamFrame {
    #[serde(rename = "type")]
    frame_type: String,
    #[serde(default)]
    data: Option<TickerData>,
}

#[derive(Debug, Deserialize)]
struct TickerData {
    #[serde(default)]
    sell: Option<String>,
}

pub struct StreamSupervisor {
    ws_url: String,
    stream_id: String,
}

impl StreamSupervisor {
    pub fn new(ws_url: String, stream_id: String) -> Self {
        Self { ws_url, stream_id }
    }

    /// The subscribe frame sent after every (re)connect
    pub fn subscribe_frame(stream_id: &str) -> String {
        serde_json::json!({
            "type": "subscribe",
            "subscription": { "name": "ticker", "id": stream_id }
        })
        .to_string()
    }

    /// Parse one inbound text frame.
    ///
    /// `Ok(Some(price))` for a ticker frame, `Ok(None)` for frames of other
    /// types (not an error), `Err` for frames that cannot be parsed.
    pub fn parse_tick(text: &str) -> Result<Option<Decimal>> {
        let frame: StreamFrame = serde_json::from_str(text)?;
        if frame.frame_type != "ticker" {
            return Ok(None);
        }

        let sell = frame
            .data
            .and_then(|d| d.sell)
            .ok_or_else(|| anyhow::anyhow!("ticker frame without data.sell"))?;
        let price = Decimal::from_str(&sell)
            .map_err(|e| anyhow::anyhow!("unparseable sell price {:?}: {}", sell, e))?;

        Ok(Some(price))
    }

    /// Run forever, forwarding ticks in arrival order on `tick_tx`.
    /// Returns only when the receiving side is gone (shutdown).
    pub async fn run(&self, tick_tx: mpsc::Sender<Decimal>) {
        loop {
            match self.run_connection(&tick_tx).await {
                Ok(()) => info!(
                    "[WS] connection closed, reconnecting in {:?}...",
                    RECONNECT_DELAY
                ),
                Err(err) => warn!(
                    "[WS] transport error: {}, reconnecting in {:?}...",
                    err, RECONNECT_DELAY
                ),
            }

            if tick_tx.is_closed() {
                return;
            }
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }

    /// One full connect → subscribe → read cycle on a fresh connection.
    /// `Ok(())` on a clean server close, `Err` on transport failure.
    async fn run_connection(&self, tick_tx: &mpsc::Sender<Decimal>) -> Result<()> {
        debug!("[WS] connecting to {}", self.ws_url);
        let (ws_stream, _) = connect_async(self.ws_url.as_str()).await?;
        let (mut write, mut read) = ws_stream.split();

        info!("[WS] connected to price stream");
        write
            .send(Message::Text(Self::subscribe_frame(&self.stream_id)))
            .await?;
        info!("[WS] subscribed to ticker {}", self.stream_id);

        while let Some(msg) = read.next().await {
            match msg? {
                Message::Text(text) => match Self::parse_tick(&text) {
                    Ok(Some(price)) => {
                        if tick_tx.send(price).await.is_err() {
                            // Receiver dropped: shutting down
                            return Ok(());
                        }
                    }
                    Ok(None) => debug!("[WS] ignoring non-ticker frame"),
                    Err(err) => warn!("[WS] skipping malformed frame: {}", err),
                },
                Message::Close(_) => return Ok(()),
                Message::Ping(_) | Message::Pong(_) => {}
                _ => {}
            }
        }

        Ok(())
    }
}
