pub mod assignment;
pub mod audit;
pub mod clock;
pub mod config;
pub mod domain;
pub mod errors;
pub mod geo;
pub mod lifecycle;
pub mod notify;
pub mod ports;
pub mod priority;

pub use assignment::{EngineerAvailability, EngineerSelector, PincodeLocks, Selection};
pub use audit::{AuditEvent, AuditSink, InMemoryAuditSink, TracingAuditSink};
pub use clock::{Clock, FixedClock, SystemClock};
pub use domain::account::{Account, AccountId, AccountStatus, Pincode, Role};
pub use domain::connection::{Connection, ConnectionId, ConnectionStatus, NewConnection};
pub use domain::leave::{LeaveId, LeaveRecord, LeaveStatus};
pub use domain::ticket::{
    ConnectionType, NewTicket, Priority, ServiceType, Ticket, TicketId, TicketStatus,
    TransitionPolicy,
};
pub use errors::{DomainError, ErrorKind, ServiceError};
pub use geo::{distance_km, GeoPoint};
pub use lifecycle::views::TicketViews;
pub use lifecycle::{
    Collaborators, EngineerLocation, FaultRequest, InstallationRequest, LifecycleOptions,
    Reassignment, TicketLifecycle, TicketReceipt,
};
pub use notify::{InMemoryNotifier, Notification, Notifier, TracingNotifier};
pub use ports::{AccountQuery, ConnectionStore, LeavePredicate, PortError, TicketFilter, TicketStore};
pub use priority::assign_priority;
