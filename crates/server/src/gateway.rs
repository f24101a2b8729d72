//! Outbound client for the hosted payment gateway.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use staybook_core::config::GatewayConfig;
use staybook_core::domain::booking::Booking;
use staybook_core::domain::payment::Payment;
use staybook_core::gateway::{CheckoutSession, GatewayError, GatewayRefund, PaymentGateway};
use tracing::{info, warn};

#[derive(Clone)]
pub struct HttpPaymentGateway {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutBody<'a> {
    booking_id: &'a str,
    amount: Decimal,
    amount_cents: i64,
    description: String,
    customer_email: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefundBody<'a> {
    payment_reference: &'a str,
    amount: Decimal,
    reason: &'a str,
}

impl HttpPaymentGateway {
    /// `None` when no gateway is configured.
    pub fn from_config(config: &GatewayConfig) -> Result<Option<Self>, GatewayError> {
        let (Some(base_url), Some(api_key)) = (&config.base_url, &config.api_key) else {
            return Ok(None);
        };
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| GatewayError::Transport(error.to_string()))?;

        Ok(Some(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.clone(),
        }))
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|error| GatewayError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(
                event_name = "gateway.request_rejected",
                url = %url,
                status = status.as_u16(),
                "payment gateway rejected request"
            );
            return Err(GatewayError::Rejected { status: status.as_u16(), message });
        }

        response.json::<T>().await.map_err(|error| {
            GatewayError::Transport(format!("failed to decode gateway response: {error}"))
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_checkout(
        &self,
        booking: &Booking,
    ) -> Result<Option<CheckoutSession>, GatewayError> {
        let cents = (booking.pricing.total * Decimal::ONE_HUNDRED).round();
        let body = CheckoutBody {
            booking_id: &booking.id.0,
            amount: booking.pricing.total,
            amount_cents: i64::try_from(cents).map_err(|_| {
                GatewayError::Transport(format!("total {} is out of range", booking.pricing.total))
            })?,
            description: format!(
                "{} nights from {}",
                booking.pricing.nights,
                booking.stay.check_in()
            ),
            customer_email: booking.guest_email.as_deref(),
        };

        let session: CheckoutSession = self.post("/checkout/sessions", &body).await?;
        info!(
            event_name = "gateway.checkout_created",
            booking_id = %booking.id.0,
            checkout_reference = %session.reference,
            "checkout session opened"
        );
        Ok(Some(session))
    }

    async fn refund(
        &self,
        payment: &Payment,
        amount: Decimal,
        reason: &str,
    ) -> Result<GatewayRefund, GatewayError> {
        let body = RefundBody { payment_reference: &payment.external_reference, amount, reason };
        let refund: GatewayRefund = self.post("/refunds", &body).await?;
        info!(
            event_name = "gateway.refund_created",
            payment_id = %payment.id.0,
            refund_reference = %refund.reference,
            amount = %amount,
            "gateway refund issued"
        );
        Ok(refund)
    }
}

#[cfg(test)]
mod tests {
    use staybook_core::config::GatewayConfig;

    use super::HttpPaymentGateway;

    fn config(base_url: Option<&str>, api_key: Option<&str>) -> GatewayConfig {
        GatewayConfig {
            base_url: base_url.map(str::to_owned),
            api_key: api_key.map(|key| key.to_owned().into()),
            webhook_secret: None,
            timeout_secs: 5,
        }
    }

    #[test]
    fn unconfigured_gateway_yields_none() {
        assert!(HttpPaymentGateway::from_config(&config(None, None)).expect("config").is_none());
        assert!(HttpPaymentGateway::from_config(&config(Some("https://pay.example"), None))
            .expect("config")
            .is_none());
    }

    #[test]
    fn configured_gateway_trims_trailing_slash() {
        let gateway =
            HttpPaymentGateway::from_config(&config(Some("https://pay.example/v1/"), Some("sk_test")))
                .expect("config")
                .expect("gateway");
        assert_eq!(gateway.base_url, "https://pay.example/v1");
    }
}
