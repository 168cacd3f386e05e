//! Client for the external payment gateway.
//!
//! The server only ever asks the gateway to open a charge for an order. The gateway reports the outcome later through
//! the signed `/gateway/payment-status` callback.
use std::{fmt::Debug, sync::Arc};

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use serde::{Deserialize, Serialize};
use shop_common::Money;
use thiserror::Error;

use crate::config::GatewayConfig;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Could not initialize the gateway client. {0}")]
    Initialization(String),
    #[error("Could not reach the payment gateway. {0}")]
    RequestError(String),
    #[error("The payment gateway returned {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Could not read the gateway response. {0}")]
    JsonError(String),
}

/// A charge opened with the gateway. Amounts are in minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Charge {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct NewCharge<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    fn currency(&self) -> &str;

    async fn create_charge(&self, amount: Money, currency: &str, receipt: &str) -> Result<Charge, GatewayError>;
}

#[derive(Clone)]
pub struct GatewayClient {
    config: GatewayConfig,
    client: Arc<Client>,
}

impl Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GatewayClient({})", self.config.url)
    }
}

impl GatewayClient {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client =
            Client::builder().default_headers(headers).build().map_err(|e| GatewayError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.url.trim_end_matches('/'))
    }
}

impl PaymentGateway for GatewayClient {
    fn currency(&self) -> &str {
        &self.config.currency
    }

    async fn create_charge(&self, amount: Money, currency: &str, receipt: &str) -> Result<Charge, GatewayError> {
        let url = self.url("/orders");
        debug!("💳️ Opening a charge of {amount} {currency} for {receipt}");
        let body = NewCharge { amount: amount.value(), currency, receipt };
        let response = self
            .client
            .post(url)
            .basic_auth(&self.config.key_id, Some(self.config.key_secret.reveal()))
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::RequestError(e.to_string()))?;
        if response.status().is_success() {
            let charge = response.json::<Charge>().await.map_err(|e| GatewayError::JsonError(e.to_string()))?;
            info!("💳️ Gateway charge {} opened for {receipt}", charge.id);
            Ok(charge)
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| GatewayError::RequestError(e.to_string()))?;
            warn!("💳️ Gateway refused the charge for {receipt}. {status}: {message}");
            Err(GatewayError::QueryError { status, message })
        }
    }
}
