use thiserror::Error;

/// Failure to decode one of the shared enums from its stored or wire form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unknown role: {0}")]
    Role(String),

    #[error("Unknown staff role: {0}")]
    StaffRole(String),

    #[error("Unknown ticket status id: {0}")]
    Status(i64),

    #[error("Unknown audit action: {0}")]
    AuditAction(String),
}
