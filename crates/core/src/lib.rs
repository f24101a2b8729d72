pub mod audit;
pub mod config;
pub mod dates;
pub mod domain;
pub mod errors;
pub mod gateway;
pub mod lifecycle;
pub mod pricing;
pub mod settlement;

pub use chrono;
pub use rust_decimal;

pub use audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink};
pub use dates::StayRange;
pub use domain::account::{Account, AccountId, AccountRole, Actor, IdentityVerification};
pub use domain::availability::{AvailabilityConflict, AvailabilityEntry};
pub use domain::booking::{
    Booking, BookingId, BookingPaymentStatus, BookingStatus, PricingSnapshot,
};
pub use domain::notification::{Notification, NotificationKind};
pub use domain::payment::{Payment, PaymentId, PaymentStatus};
pub use domain::property::{Property, PropertyId};
pub use errors::{ApplicationError, DomainError, InterfaceError, VerificationGate};
pub use gateway::{CheckoutSession, GatewayError, NoopPaymentGateway, PaymentGateway};
pub use lifecycle::{BookingEvent, BookingLifecycle, LifecycleAction, TransitionOutcome};
pub use pricing::{PricingEngine, StayQuote, WeekendAwarePricingEngine};
pub use settlement::{FinalizeRequest, RefundRequest, SettlementPolicy};
