use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::booking::Booking;
use crate::errors::{DomainError, VerificationGate};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    Guest,
    Host,
    Admin,
}

impl AccountRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Host => "host",
            Self::Admin => "admin",
        }
    }
}

impl std::str::FromStr for AccountRole {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "guest" => Ok(Self::Guest),
            "host" => Ok(Self::Host),
            "admin" => Ok(Self::Admin),
            other => Err(DomainError::validation(format!(
                "unknown role `{other}` (expected guest|host|admin)"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityVerification {
    Unverified,
    Pending,
    Verified,
    Rejected,
}

impl IdentityVerification {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unverified => "unverified",
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for IdentityVerification {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "unverified" => Ok(Self::Unverified),
            "pending" => Ok(Self::Pending),
            "verified" => Ok(Self::Verified),
            "rejected" => Ok(Self::Rejected),
            other => Err(DomainError::validation(format!(
                "unknown identity verification status `{other}`"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub role: AccountRole,
    pub display_name: String,
    pub email: String,
    pub identity_verification: IdentityVerification,
    pub payment_method_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Identity is checked before the payment method so the caller is sent to
    /// KYC first.
    pub fn checkout_gate(&self) -> Result<(), DomainError> {
        if self.identity_verification != IdentityVerification::Verified {
            return Err(DomainError::VerificationRequired(VerificationGate::Identity));
        }
        if !self.payment_method_verified {
            return Err(DomainError::VerificationRequired(VerificationGate::PaymentMethod));
        }
        Ok(())
    }
}

/// Caller identity as asserted by the upstream authenticator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub account_id: AccountId,
    pub role: AccountRole,
}

impl Actor {
    pub fn new(account_id: impl Into<String>, role: AccountRole) -> Self {
        Self { account_id: AccountId(account_id.into()), role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == AccountRole::Admin
    }

    /// Hosts manage only their own listings; admins manage all of them.
    pub fn manages(&self, owner_id: &AccountId) -> bool {
        self.is_admin() || (self.role == AccountRole::Host && &self.account_id == owner_id)
    }

    pub fn can_view(&self, booking: &Booking) -> bool {
        self.is_admin() || booking.is_party(&self.account_id)
    }

    pub fn audit_label(&self) -> String {
        format!("{}:{}", self.role.as_str(), self.account_id.0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{Account, AccountId, AccountRole, Actor, IdentityVerification};
    use crate::domain::booking::fixtures::pending_booking;
    use crate::errors::{DomainError, VerificationGate};

    fn guest(identity: IdentityVerification, payment_method_verified: bool) -> Account {
        Account {
            id: AccountId("AC-GUEST-1".to_owned()),
            role: AccountRole::Guest,
            display_name: "Riley".to_owned(),
            email: "riley@example.com".to_owned(),
            identity_verification: identity,
            payment_method_verified,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn checkout_gate_requires_identity_then_payment_method() {
        assert_eq!(
            guest(IdentityVerification::Pending, true).checkout_gate(),
            Err(DomainError::VerificationRequired(VerificationGate::Identity))
        );
        assert_eq!(
            guest(IdentityVerification::Unverified, false).checkout_gate(),
            Err(DomainError::VerificationRequired(VerificationGate::Identity))
        );
        assert_eq!(
            guest(IdentityVerification::Verified, false).checkout_gate(),
            Err(DomainError::VerificationRequired(VerificationGate::PaymentMethod))
        );
        assert!(guest(IdentityVerification::Verified, true).checkout_gate().is_ok());
    }

    #[test]
    fn roles_parse_case_insensitively() {
        assert_eq!("Host".parse::<AccountRole>(), Ok(AccountRole::Host));
        assert!("owner".parse::<AccountRole>().is_err());
    }

    #[test]
    fn only_the_owning_host_or_an_admin_manages_a_listing() {
        let owner = AccountId("AC-HOST-1".to_owned());

        assert!(Actor::new("AC-HOST-1", AccountRole::Host).manages(&owner));
        assert!(Actor::new("AC-ADMIN-1", AccountRole::Admin).manages(&owner));
        assert!(!Actor::new("AC-HOST-2", AccountRole::Host).manages(&owner));
        assert!(!Actor::new("AC-HOST-1", AccountRole::Guest).manages(&owner));
    }

    #[test]
    fn bookings_are_visible_to_their_parties_and_admins() {
        let booking = pending_booking();

        assert!(Actor::new("AC-GUEST-1", AccountRole::Guest).can_view(&booking));
        assert!(Actor::new("AC-HOST-1", AccountRole::Host).can_view(&booking));
        assert!(Actor::new("AC-ADMIN-1", AccountRole::Admin).can_view(&booking));
        assert!(!Actor::new("AC-GUEST-2", AccountRole::Guest).can_view(&booking));
        assert_eq!(Actor::new("AC-HOST-1", AccountRole::Host).audit_label(), "host:AC-HOST-1");
    }
}
