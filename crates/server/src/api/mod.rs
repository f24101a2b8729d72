//! JSON API for guests, hosts and the payment gateway.
//!
//! Endpoints:
//! - `GET   /properties/{property_id}/quote`         price a prospective stay
//! - `GET   /properties/{property_id}/availability`  ledger rows in a date window
//! - `PUT   /properties/{property_id}/availability`  host edit of one night
//! - `POST  /bookings`                                request a booking
//! - `GET   /bookings/{booking_id}`                   booking detail
//! - `PATCH /bookings/{booking_id}/status`            host status change
//! - `POST  /payments/finalize`                       record a captured payment (admin)
//! - `POST  /payments/refund`                         refund a paid booking
//! - `POST  /payments/webhook`                        signed gateway callback

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use secrecy::SecretString;
use serde::Serialize;
use staybook_core::errors::{ApplicationError, DomainError, InterfaceError};
use staybook_db::BookingService;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

mod bookings;
mod caller;
mod payments;
mod properties;

pub use caller::Caller;

pub const CORRELATION_HEADER: &str = "x-correlation-id";
pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";
pub const SIGNATURE_HEADER: &str = "x-staybook-signature";

#[derive(Clone)]
pub struct ApiState {
    service: BookingService,
    webhook_secret: Option<SecretString>,
}

impl ApiState {
    pub fn new(service: BookingService, webhook_secret: Option<SecretString>) -> Self {
        Self { service, webhook_secret }
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/properties/{property_id}/quote", get(properties::quote))
        .route(
            "/properties/{property_id}/availability",
            get(properties::list_availability).put(properties::set_availability),
        )
        .route("/bookings", post(bookings::create))
        .route("/bookings/{booking_id}", get(bookings::show))
        .route("/bookings/{booking_id}/status", patch(bookings::update_status))
        .route("/payments/finalize", post(payments::finalize))
        .route("/payments/refund", post(payments::refund))
        .route("/payments/webhook", post(payments::webhook))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
    pub correlation_id: String,
}

/// Error half of every handler result.
#[derive(Debug)]
pub struct ApiError(pub InterfaceError);

impl ApiError {
    pub fn from_application(error: ApplicationError, correlation_id: &str) -> Self {
        Self(error.into_interface(correlation_id))
    }

    pub fn bad_request(message: impl Into<String>, correlation_id: &str) -> Self {
        Self::from_application(DomainError::validation(message).into(), correlation_id)
    }

    pub fn from_json(rejection: JsonRejection, correlation_id: &str) -> Self {
        Self::bad_request(format!("invalid request body: {}", rejection.body_text()), correlation_id)
    }

    pub fn from_query(rejection: QueryRejection, correlation_id: &str) -> Self {
        Self::bad_request(format!("invalid query string: {}", rejection.body_text()), correlation_id)
    }

    pub fn status(&self) -> StatusCode {
        match &self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::Forbidden { .. } => StatusCode::FORBIDDEN,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(
                event_name = "api.request_failed",
                correlation_id = %self.0.correlation_id(),
                code = self.0.code(),
                error = %self.0,
                "request failed"
            );
        } else {
            warn!(
                event_name = "api.request_rejected",
                correlation_id = %self.0.correlation_id(),
                code = self.0.code(),
                error = %self.0,
                "request rejected"
            );
        }

        let body = ErrorBody {
            error: self.0.user_message(),
            code: self.0.code(),
            correlation_id: self.0.correlation_id().to_owned(),
        };
        (status, Json(body)).into_response()
    }
}
