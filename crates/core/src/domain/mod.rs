pub mod account;
pub mod availability;
pub mod booking;
pub mod notification;
pub mod payment;
pub mod property;
