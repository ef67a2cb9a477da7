pub mod account;
pub mod connection;
pub mod leave;
pub mod ticket;
