pub mod availability;
pub mod lock;
pub mod selector;

pub use availability::EngineerAvailability;
pub use lock::PincodeLocks;
pub use selector::{EngineerSelector, Selection};
