//! Configuration management for the trading bot

use crate::strategy::ResetPolicy;
use anyhow::Result;
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;

/// Default Mercado Bitcoin v4 REST base URL
pub const DEFAULT_API_BASE_URL: &str = "https://api.mercadobitcoin.net/api/v4";

/// Default Mercado Bitcoin ticker stream URL
pub const DEFAULT_WS_URL: &str = "wss://ws.mercadobitcoin.net/ws";

/// Bot configuration loaded from environment
#[derive(Debug, Clone)]
pub struct Config {
    /// API key used as the login for the authorize endpoint
    pub api_key: String,

    /// API secret used as the password for the authorize endpoint
    pub api_secret: String,

    /// Account to place orders against. Optional at load time so the
    /// `account-id` lookup command can run before it is known; required
    /// before the bot starts trading.
    pub account_id: Option<String>,

    /// Trading pair in `BASE-QUOTE` format, e.g. `BTC-BRL`
    pub symbol: String,

    /// Ticker subscription id for the price stream
    pub stream_id: String,

    /// Buy when the tick price is at or below this threshold
    pub buy_price: Decimal,

    /// Quantity in the base asset per order
    pub buy_qty: Decimal,

    /// Sell target multiplier applied to the buy reference price
    pub profitability: Decimal,

    /// When the sell target is cleared: at decision time or on confirmed fill
    pub sell_reset: ResetPolicy,

    /// REST base URL (overridable for tests)
    pub api_base_url: String,

    /// WebSocket stream URL (overridable for tests)
    pub ws_url: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let api_key = required_var("API_KEY")?;
        let api_secret = required_var("API_SECRET")?;
        let account_id = env::var("ACCOUNT_ID").ok().filter(|s| !s.is_empty());

        let symbol = required_var("SYMBOL")?;
        validate_symbol(&symbol)?;

        let stream_id = required_var("STREAM_ID")?;

        let buy_price = positive_decimal("BUY_PRICE", &required_var("BUY_PRICE")?)?;
        let buy_qty = positive_decimal("BUY_QTY", &required_var("BUY_QTY")?)?;
        let profitability = positive_decimal("PROFITABILITY", &required_var("PROFITABILITY")?)?;

        let sell_reset = match env::var("SELL_RESET") {
            Ok(v) => ResetPolicy::from_str(&v)
                .map_err(|e| anyhow::anyhow!("SELL_RESET: {}", e))?,
            Err(_) => ResetPolicy::default(),
        };

        let api_base_url = env::var("API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());
        let ws_url = env::var("WS_URL").unwrap_or_else(|_| DEFAULT_WS_URL.to_string());

        Ok(Self {
            api_key,
            api_secret,
            account_id,
            symbol,
            stream_id,
            buy_price,
            buy_qty,
            profitability,
            sell_reset,
            api_base_url,
            ws_url,
        })
    }

    /// Account id, required once the bot actually trades
    pub fn require_account_id(&self) -> Result<&str> {
        self.account_id
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("ACCOUNT_ID is required to run the bot"))
    }

    /// The `BASE` part of the `BASE-QUOTE` symbol, used in order logs
    pub fn base_asset(&self) -> &str {
        self.symbol.split('-').next().unwrap_or(&self.symbol)
    }
}

fn required_var(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => anyhow::bail!("{} is required", name),
    }
}

fn validate_symbol(symbol: &str) -> Result<()> {
    let mut parts = symbol.split('-');
    match (parts.next(), parts.next()) {
        (Some(base), Some(quote)) if !base.is_empty() && !quote.is_empty() => Ok(()),
        _ => anyhow::bail!("SYMBOL must be in BASE-QUOTE format, got {:?}", symbol),
    }
}

fn positive_decimal(name: &str, value: &str) -> Result<Decimal> {
    let parsed = Decimal::from_str(value.trim())
        .map_err(|_| anyhow::anyhow!("{} must be a decimal number, got {:?}", name, value))?;
    if parsed <= Decimal::ZERO {
        anyhow::bail!("{} must be positive, got {}", name, parsed);
    }
    Ok(parsed)
}
