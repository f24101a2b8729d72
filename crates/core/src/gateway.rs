use async_trait::async_trait;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::domain::booking::{Booking, BookingId};
use crate::domain::payment::Payment;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_PREFIX: &str = "sha256=";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub url: String,
    pub reference: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayRefund {
    pub reference: String,
}

/// Body of a signed `payment.succeeded` notification from the gateway.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSucceededEvent {
    pub booking_id: BookingId,
    pub external_payment_reference: String,
    pub amount: Decimal,
    pub commission: Decimal,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("gateway transport failure: {0}")]
    Transport(String),
    #[error("gateway rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens a hosted checkout for a pending booking. `None` when the gateway
    /// collects payment out of band.
    async fn create_checkout(
        &self,
        booking: &Booking,
    ) -> Result<Option<CheckoutSession>, GatewayError>;

    async fn refund(
        &self,
        payment: &Payment,
        amount: Decimal,
        reason: &str,
    ) -> Result<GatewayRefund, GatewayError>;
}

/// Accepts every refund locally and never issues checkout links.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopPaymentGateway;

#[async_trait]
impl PaymentGateway for NoopPaymentGateway {
    async fn create_checkout(
        &self,
        _booking: &Booking,
    ) -> Result<Option<CheckoutSession>, GatewayError> {
        Ok(None)
    }

    async fn refund(
        &self,
        payment: &Payment,
        _amount: Decimal,
        _reason: &str,
    ) -> Result<GatewayRefund, GatewayError> {
        Ok(GatewayRefund { reference: format!("noop-refund-{}", payment.id.0) })
    }
}

/// `sha256=<hex>` HMAC over the raw request body.
pub fn sign_payload(secret: &[u8], payload: &[u8]) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(payload);
    format!("{SIGNATURE_PREFIX}{}", encode_hex(mac.finalize().into_bytes().as_slice()))
}

pub fn verify_signature(secret: &[u8], payload: &[u8], header: &str) -> bool {
    let Some(hex) = header.trim().strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    let Some(expected) = decode_hex(hex) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

fn encode_hex(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        output.push_str(&format!("{byte:02x}"));
    }
    output
}

fn decode_hex(raw: &str) -> Option<Vec<u8>> {
    if raw.len() % 2 != 0 {
        return None;
    }
    (0..raw.len())
        .step_by(2)
        .map(|index| u8::from_str_radix(raw.get(index..index + 2)?, 16).ok())
        .collect()
}
