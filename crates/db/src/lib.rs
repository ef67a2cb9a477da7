pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_config, connect_with_settings, DbPool};
pub use fixtures::{DemoDataset, SeedResult, TicketSeedInfo, VerificationResult};
pub use repositories::{
    InMemoryAccountRepository, InMemoryConnectionRepository, InMemoryLeaveRepository,
    InMemoryTicketRepository, RepositoryError, SqlAccountRepository, SqlConnectionRepository,
    SqlLeaveRepository, SqlTicketRepository,
};
