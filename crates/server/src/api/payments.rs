use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use secrecy::ExposeSecret;
use serde::Serialize;
use staybook_core::domain::account::AccountRole;
use staybook_core::domain::payment::Payment;
use staybook_core::errors::ApplicationError;
use staybook_core::gateway::{verify_signature, PaymentSucceededEvent};
use staybook_core::settlement::{FinalizeRequest, RefundRequest};
use staybook_db::{FinalizedPayment, RequestContext};
use tracing::{info, warn};

use super::{ApiError, ApiState, Caller, SIGNATURE_HEADER};

#[derive(Debug, Serialize)]
pub struct RefundResponse {
    pub payment: Payment,
}

/// Operator confirmation of a captured payment. The route trusts the
/// reference it is given, so only admins may call it; guest checkouts are
/// confirmed through the signed webhook.
pub async fn finalize(
    caller: Caller,
    State(state): State<ApiState>,
    body: Result<Json<FinalizeRequest>, JsonRejection>,
) -> Result<Json<FinalizedPayment>, ApiError> {
    caller.require_role(&[AccountRole::Admin])?;
    let Json(request) = body.map_err(|error| ApiError::from_json(error, caller.correlation_id()))?;

    let finalized = state
        .service
        .finalize_payment(&caller.context, request)
        .await
        .map_err(|error| caller.fail(error))?;
    Ok(Json(finalized))
}

pub async fn refund(
    caller: Caller,
    State(state): State<ApiState>,
    body: Result<Json<RefundRequest>, JsonRejection>,
) -> Result<Json<RefundResponse>, ApiError> {
    caller.require_role(&[AccountRole::Host, AccountRole::Admin])?;
    let Json(request) = body.map_err(|error| ApiError::from_json(error, caller.correlation_id()))?;

    let payment = state
        .service
        .refund_payment(&caller.context, request)
        .await
        .map_err(|error| caller.fail(error))?;
    Ok(Json(RefundResponse { payment }))
}

/// `payment.succeeded` callback from the gateway, authenticated by an HMAC
/// over the raw body.
pub async fn webhook(
    caller: Caller,
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<FinalizedPayment>, ApiError> {
    let correlation_id = caller.correlation_id();
    let Some(secret) = state.webhook_secret.as_ref() else {
        return Err(caller.fail(ApplicationError::Configuration(
            "gateway webhook secret is not configured".to_owned(),
        )));
    };

    let signature = headers.get(SIGNATURE_HEADER).and_then(|value| value.to_str().ok());
    let verified = signature
        .map(|signature| verify_signature(secret.expose_secret().as_bytes(), &body, signature))
        .unwrap_or(false);
    if !verified {
        warn!(
            event_name = "payment.webhook_rejected",
            correlation_id = %correlation_id,
            signature_present = signature.is_some(),
            "webhook signature did not verify"
        );
        return Err(caller.fail(ApplicationError::Forbidden(
            "webhook signature is missing or invalid".to_owned(),
        )));
    }

    let event: PaymentSucceededEvent = serde_json::from_slice(&body).map_err(|error| {
        ApiError::bad_request(format!("invalid webhook payload: {error}"), correlation_id)
    })?;
    info!(
        event_name = "payment.webhook_received",
        correlation_id = %correlation_id,
        booking_id = %event.booking_id.0,
        external_reference = %event.external_payment_reference,
        "gateway reported a captured payment"
    );

    let request = FinalizeRequest {
        booking_id: event.booking_id,
        external_payment_reference: event.external_payment_reference,
        amount: event.amount,
        commission: event.commission,
    };
    let finalized = state
        .service
        .finalize_payment(&RequestContext::gateway(correlation_id), request)
        .await
        .map_err(|error| caller.fail(error))?;
    Ok(Json(finalized))
}
