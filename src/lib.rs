//! Mercado Bitcoin Trading Bot Library
//!
//! A threshold trading bot for a single pair on Mercado Bitcoin. It keeps a
//! REST session alive, watches the ticker WebSocket stream, and places
//! market orders when two price thresholds are crossed: buy at or below
//! `BUY_PRICE`, then sell once the price reaches the buy reference price
//! times `PROFITABILITY`.
//!
//! The interesting part is the coordination: one order in flight at a time,
//! tokens renewed before expiry and never used past it, and a stream that
//! reconnects forever on a fixed delay.

pub mod api;
pub mod bot;
pub mod config;
pub mod error;
pub mod gate;
pub mod session;
pub mod strategy;
pub mod stream;
pub mod types;

pub use api::ExchangeClient;
pub use bot::Bot;
pub use config::Config;
pub use error::ExchangeError;
pub use gate::{OrderGate, SubmitOutcome};
pub use session::{Session, SessionManager};
pub use strategy::{ResetPolicy, StrategyState};
pub use stream::StreamSupervisor;
pub use types::{Action, OrderRequest, OrderType, Side};
