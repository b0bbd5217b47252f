//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The core domain
//! depends only on these traits, not on concrete implementations.

mod clock;
mod notifier;
mod repository;

pub use clock::{Clock, SystemClock};
pub use notifier::Notifier;
pub use repository::{
    atomically, read, AccountRepository, AuditRepository, OtpRepository, Session, Store,
    TransactionRepository, UserRepository,
};
