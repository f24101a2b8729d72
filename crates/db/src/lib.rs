pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;
pub mod workflows;

pub use connection::{connect, connect_with_config, connect_with_settings, DbPool};
pub use fixtures::{DemoDataset, SeedResult};
pub use repositories::RepositoryError;
pub use workflows::{
    BookingService, CreatedBooking, FinalizedPayment, NewBooking, RequestContext,
};
