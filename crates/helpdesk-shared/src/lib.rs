//! # helpdesk-shared
//!
//! Vocabulary shared by the store and the server: roles and the trusted
//! actor descriptor, ticket statuses, workload policy, and the two pure
//! scheduling rules (round-robin rotation and priority escalation).
//!
//! Nothing in this crate performs I/O.

pub mod constants;
pub mod error;
pub mod escalation;
pub mod policy;
pub mod rotation;
pub mod types;

pub use error::ParseError;
pub use policy::DeskPolicy;
pub use types::{Actor, AuditAction, Role, StaffRole, TicketStatus};
