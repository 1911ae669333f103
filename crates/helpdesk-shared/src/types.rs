use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

// ---------------------------------------------------------------------------
// Roles and the trusted actor
// ---------------------------------------------------------------------------

/// Caller role, decided once at the authentication boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Unauthenticated visitor (chatbot only).
    Guest,
    /// Customer who submits tickets.
    User,
    /// Support staff working tickets in their field.
    Staff,
    /// Staff member with directory and override rights.
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::User => "user",
            Role::Staff => "staff",
            Role::Admin => "admin",
        }
    }

    /// Staff and admins both work tickets.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Staff | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "guest" => Ok(Role::Guest),
            "user" => Ok(Role::User),
            "staff" => Ok(Role::Staff),
            "admin" => Ok(Role::Admin),
            other => Err(ParseError::Role(other.to_string())),
        }
    }
}

/// Role column of the `staff` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaffRole {
    Staff,
    Admin,
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Staff => "staff",
            StaffRole::Admin => "admin",
        }
    }
}

impl From<StaffRole> for Role {
    fn from(role: StaffRole) -> Self {
        match role {
            StaffRole::Staff => Role::Staff,
            StaffRole::Admin => Role::Admin,
        }
    }
}

impl FromStr for StaffRole {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "staff" => Ok(StaffRole::Staff),
            "admin" => Ok(StaffRole::Admin),
            other => Err(ParseError::StaffRole(other.to_string())),
        }
    }
}

/// Resolved identity handed to every desk operation.
///
/// Produced upstream by authentication; the desk trusts it as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Row id in `users`.
    pub user_id: i64,
    /// Row id in `staff`, present for staff and admins.
    pub staff_id: Option<i64>,
    pub role: Role,
    pub email: String,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// The staff id when the actor works tickets.
    pub fn working_staff_id(&self) -> Option<i64> {
        if self.role.is_staff() {
            self.staff_id
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Ticket status
// ---------------------------------------------------------------------------

/// Ticket lifecycle state. Discriminants match the seeded `statuses` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(i64)]
pub enum TicketStatus {
    Pending = 1,
    InProgress = 2,
    Resolved = 3,
    Cancelled = 4,
}

impl TicketStatus {
    pub fn id(self) -> i64 {
        self as i64
    }

    pub fn from_id(id: i64) -> Result<Self, ParseError> {
        match id {
            1 => Ok(TicketStatus::Pending),
            2 => Ok(TicketStatus::InProgress),
            3 => Ok(TicketStatus::Resolved),
            4 => Ok(TicketStatus::Cancelled),
            other => Err(ParseError::Status(other)),
        }
    }

    /// Resolved and Cancelled accept no further status, staff or
    /// conversation changes.
    pub fn is_terminal(self) -> bool {
        matches!(self, TicketStatus::Resolved | TicketStatus::Cancelled)
    }

    pub fn is_in_flight(self) -> bool {
        !self.is_terminal()
    }

    pub fn label(self) -> &'static str {
        match self {
            TicketStatus::Pending => "Pending",
            TicketStatus::InProgress => "In-Progress",
            TicketStatus::Resolved => "Resolved",
            TicketStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Audit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "Create",
            AuditAction::Update => "Update",
            AuditAction::Delete => "Delete",
        }
    }
}

impl FromStr for AuditAction {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Create" => Ok(AuditAction::Create),
            "Update" => Ok(AuditAction::Update),
            "Delete" => Ok(AuditAction::Delete),
            other => Err(ParseError::AuditAction(other.to_string())),
        }
    }
}
