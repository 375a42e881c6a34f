use std::{sync::Arc, time::Duration};

use log::*;
use reqwest::{Client, Method};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;

use rpg_common::Money;

use crate::{config::RazorpayConfig, data_objects::{GatewayOrder, PaymentRecord, RefundRecord}, GatewayError};

/// The gateway operations the server depends on. A trait so that endpoint tests can substitute a mock and the
/// reconciliation worker stays agnostic of the concrete client.
#[allow(async_fn_in_trait)]
pub trait GatewayClient {
    /// Registers an order of `amount` with the gateway and returns its gateway order id.
    async fn create_order(&self, amount: Money, receipt: &str) -> Result<GatewayOrder, GatewayError>;

    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentRecord, GatewayError>;

    /// Issues a refund against a captured payment. `speed` is `normal` or `optimum`.
    async fn refund_payment(&self, payment_id: &str, amount: Money, speed: &str)
        -> Result<RefundRecord, GatewayError>;

    async fn fetch_refund(&self, refund_id: &str) -> Result<RefundRecord, GatewayError>;
}

#[derive(Clone)]
pub struct RazorpayApi {
    config: RazorpayConfig,
    client: Arc<Client>,
}

impl RazorpayApi {
    pub fn new(config: RazorpayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, GatewayError> {
        let url = self.url(path);
        trace!("Sending REST query: {url}");
        let mut req = self
            .client
            .request(method, url)
            .basic_auth(&self.config.key_id, Some(self.config.key_secret.reveal()));
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                GatewayError::Unavailable(e.to_string())
            } else {
                GatewayError::ResponseError(e.to_string())
            }
        })?;
        if response.status().is_success() {
            trace!("REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| GatewayError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| GatewayError::ResponseError(e.to_string()))?;
            Err(GatewayError::QueryError { status, message })
        }
    }
}

impl GatewayClient for RazorpayApi {
    async fn create_order(&self, amount: Money, receipt: &str) -> Result<GatewayOrder, GatewayError> {
        let body = json!({
            "amount": amount.value(),
            "currency": rpg_common::INR_CURRENCY_CODE,
            "receipt": receipt,
        });
        debug!("Creating gateway order for {amount} (receipt {receipt})");
        let order = self.rest_query::<GatewayOrder, _>(Method::POST, "/orders", Some(body)).await?;
        info!("Created gateway order {}", order.id);
        Ok(order)
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentRecord, GatewayError> {
        let path = format!("/payments/{payment_id}");
        self.rest_query::<PaymentRecord, ()>(Method::GET, &path, None).await
    }

    async fn refund_payment(
        &self,
        payment_id: &str,
        amount: Money,
        speed: &str,
    ) -> Result<RefundRecord, GatewayError> {
        let path = format!("/payments/{payment_id}/refund");
        let body = json!({
            "amount": amount.value(),
            "speed": speed,
        });
        debug!("Refunding {amount} on payment {payment_id} at {speed} speed");
        let refund = self.rest_query::<RefundRecord, _>(Method::POST, &path, Some(body)).await?;
        info!("Refund {} created for payment {payment_id}", refund.id);
        Ok(refund)
    }

    async fn fetch_refund(&self, refund_id: &str) -> Result<RefundRecord, GatewayError> {
        let path = format!("/refunds/{refund_id}");
        self.rest_query::<RefundRecord, ()>(Method::GET, &path, None).await
    }
}
