//! Exchange error taxonomy
//!
//! Classifies REST failures into the handful of cases the bot reacts to
//! differently: authentication rejections terminate the process, a missing
//! session aborts the submission, and order rejections are reported without
//! retry. Stream-level failures never appear here; the supervisor contains
//! them with its own reconnect loop.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Credentials rejected by the authorize endpoint. Fatal: no further
    /// correct operation is possible without a valid token.
    #[error("authentication rejected ({status}): {body}")]
    AuthRejected { status: u16, body: String },

    /// No non-expired session exists. Submissions abort, nothing retries.
    #[error("no valid session")]
    NotAuthenticated,

    /// The exchange refused an order. Reported, never retried.
    #[error("order rejected ({status}): {body}")]
    OrderRejected { status: u16, body: String },

    /// Non-auth failure on a non-order endpoint, such as a 5xx from the
    /// account listing.
    #[error("request failed ({status}): {body}")]
    RequestFailed { status: u16, body: String },

    /// The authorize endpoint returned an expiration outside the
    /// representable timestamp range.
    #[error("invalid token expiration: {0}")]
    InvalidExpiration(i64),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}
