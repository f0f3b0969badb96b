//! Mercado Bitcoin v4 REST client
//!
//! Thin wrapper around `reqwest` for the three endpoints the bot touches:
//! authorize, account listing (one-time setup), and market order placement.
//! Non-2xx responses are classified into [`ExchangeError`] variants; no
//! retry logic lives here.

use crate::error::ExchangeError;
use crate::types::OrderRequest;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Response from `POST /authorize/`
#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    /// Token expiry as epoch seconds
    pub expiration: i64,
}

/// One entry from `GET /accounts/`
#[derive(Debug, Deserialize)]
pub struct Account {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Response from order placement
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmation {
    #[serde(default)]
    pub order_id: Option<String>,
}

/// Client for the Mercado Bitcoin v4 REST API
#[derive(Clone)]
pub struct ExchangeClient {
    client: Client,
    base_url: String,
}

impl ExchangeClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Exchange API credentials for a bearer token
    pub async fn authorize(
        &self,
        login: &str,
        password: &str,
    ) -> Result<AuthResponse, ExchangeError> {
        let url = format!("{}/authorize/", self.base_url);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "login": login, "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ExchangeError::AuthRejected { status, body });
        }

        Ok(response.json().await?)
    }

    /// List accounts for the authenticated user (one-time setup lookup)
    pub async fn list_accounts(&self, token: &str) -> Result<Vec<Account>, ExchangeError> {
        let url = format!("{}/accounts/", self.base_url);
        debug!("GET {}", url);

        let response = self.client.get(&url).bearer_auth(token).send().await?;

        let status = response.status();
        if !status.is_success() {
            let status = status.as_u16();
            if status == 401 || status == 403 {
                return Err(ExchangeError::NotAuthenticated);
            }
            let body = response.text().await.unwrap_or_default();
            return Err(ExchangeError::RequestFailed { status, body });
        }

        Ok(response.json().await?)
    }

    /// Place a market order against an account/symbol
    pub async fn place_order(
        &self,
        token: &str,
        account_id: &str,
        symbol: &str,
        order: &OrderRequest,
    ) -> Result<OrderConfirmation, ExchangeError> {
        let url = format!("{}/accounts/{}/{}/orders", self.base_url, account_id, symbol);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(order)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let status = status.as_u16();
            if status == 401 || status == 403 {
                return Err(ExchangeError::NotAuthenticated);
            }
            let body = response.text().await.unwrap_or_default();
            return Err(ExchangeError::OrderRejected { status, body });
        }

        Ok(response.json().await?)
    }
}
