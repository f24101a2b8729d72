use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lifecycle::LifecycleError;

/// Checkout gates an attached guest account must clear before booking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationGate {
    Identity,
    PaymentMethod,
}

impl VerificationGate {
    pub fn code(self) -> &'static str {
        match self {
            Self::Identity => "KYC_NOT_VERIFIED",
            Self::PaymentMethod => "PAYMENT_NOT_VERIFIED",
        }
    }
}

impl fmt::Display for VerificationGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity => f.write_str("identity verification must be completed before booking"),
            Self::PaymentMethod => {
                f.write_str("a verified payment method is required before booking")
            }
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    VerificationRequired(VerificationGate),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { entity, id: id.into() }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, code: &'static str, correlation_id: String },
    #[error("forbidden: {message}")]
    Forbidden { message: String, code: &'static str, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, code: &'static str, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, code: &'static str, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, code: &'static str, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, code: &'static str, correlation_id: String },
}

impl InterfaceError {
    /// Message safe to hand back to a caller. Client errors carry their own
    /// message; server-side failures are replaced with a generic one.
    pub fn user_message(&self) -> String {
        match self {
            Self::BadRequest { message, .. }
            | Self::Forbidden { message, .. }
            | Self::NotFound { message, .. }
            | Self::Conflict { message, .. } => message.clone(),
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly.".to_owned()
            }
            Self::Internal { .. } => "An unexpected internal error occurred.".to_owned(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest { code, .. }
            | Self::Forbidden { code, .. }
            | Self::NotFound { code, .. }
            | Self::Conflict { code, .. }
            | Self::ServiceUnavailable { code, .. }
            | Self::Internal { code, .. } => code,
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::Forbidden { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Conflict { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Forbidden { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(DomainError::Validation(message)) => {
                Self::BadRequest { message, code: "VALIDATION_ERROR", correlation_id }
            }
            ApplicationError::Domain(DomainError::Lifecycle(error)) => Self::BadRequest {
                message: error.to_string(),
                code: "INVALID_TRANSITION",
                correlation_id,
            },
            ApplicationError::Domain(DomainError::InvariantViolation(message)) => {
                Self::BadRequest { message, code: "INVARIANT_VIOLATION", correlation_id }
            }
            ApplicationError::Domain(DomainError::VerificationRequired(gate)) => {
                Self::Forbidden { message: gate.to_string(), code: gate.code(), correlation_id }
            }
            error @ ApplicationError::NotFound { .. } => {
                Self::NotFound { message: error.to_string(), code: "NOT_FOUND", correlation_id }
            }
            ApplicationError::Forbidden(message) => {
                Self::Forbidden { message, code: "FORBIDDEN", correlation_id }
            }
            ApplicationError::Conflict(message) => {
                Self::Conflict { message, code: "CONFLICT", correlation_id }
            }
            ApplicationError::Persistence(message) => {
                Self::ServiceUnavailable { message, code: "PERSISTENCE", correlation_id }
            }
            ApplicationError::Integration(message) => {
                Self::ServiceUnavailable { message, code: "INTEGRATION", correlation_id }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, code: "CONFIGURATION", correlation_id }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, DomainError, InterfaceError, VerificationGate};

    #[test]
    fn validation_error_maps_to_bad_request_with_its_message() {
        let interface =
            ApplicationError::from(DomainError::validation("check-out must be after check-in"))
                .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ..
            } if correlation_id == "req-1"
        ));
        assert_eq!(interface.user_message(), "check-out must be after check-in");
        assert_eq!(interface.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn verification_gate_maps_to_forbidden_with_gate_code() {
        let interface =
            ApplicationError::from(DomainError::VerificationRequired(VerificationGate::Identity))
                .into_interface("req-2");

        assert!(matches!(interface, InterfaceError::Forbidden { .. }));
        assert_eq!(interface.code(), "KYC_NOT_VERIFIED");

        let interface = ApplicationError::from(DomainError::VerificationRequired(
            VerificationGate::PaymentMethod,
        ))
        .into_interface("req-3");
        assert_eq!(interface.code(), "PAYMENT_NOT_VERIFIED");
    }

    #[test]
    fn not_found_names_the_missing_entity() {
        let interface = ApplicationError::not_found("booking", "BK-404").into_interface("req-4");

        assert!(matches!(interface, InterfaceError::NotFound { .. }));
        assert_eq!(interface.user_message(), "booking `BK-404` not found");
    }

    #[test]
    fn persistence_error_hides_detail_from_caller() {
        let interface = ApplicationError::Persistence("database lock timeout".to_owned())
            .into_interface("req-5");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(
            interface.user_message(),
            "The service is temporarily unavailable. Please retry shortly."
        );
        assert_eq!(interface.correlation_id(), "req-5");
    }

    #[test]
    fn configuration_error_maps_to_internal() {
        let interface = ApplicationError::Configuration("missing webhook secret".to_owned())
            .into_interface("req-6");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }
}
