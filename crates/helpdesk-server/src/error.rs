use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use helpdesk_shared::TicketStatus;
use helpdesk_store::StoreError;

/// Why a request collided with the current state of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Conflict {
    #[error("Staff member has reached the in-flight ticket limit")]
    LimitReached,

    #[error("Cannot claim your own ticket")]
    OwnTicket,

    #[error("Ticket is {0}")]
    InvalidStatus(TicketStatus),

    #[error("Conversation already started")]
    AlreadyStarted,

    #[error("Conversation is already closed")]
    AlreadyClosed,

    #[error("Conversation is closed")]
    ConversationClosed,

    #[error("Nothing to update")]
    NoChange,

    #[error("Record already exists")]
    Duplicate,
}

impl Conflict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Conflict::LimitReached => "limit_reached",
            Conflict::OwnTicket => "own_ticket",
            Conflict::InvalidStatus(_) => "invalid_status",
            Conflict::AlreadyStarted => "already_started",
            Conflict::AlreadyClosed => "already_closed",
            Conflict::ConversationClosed => "conversation_closed",
            Conflict::NoChange => "no_change",
            Conflict::Duplicate => "duplicate",
        }
    }
}

/// Domain error returned by every desk operation.
#[derive(Debug, Error)]
pub enum DeskError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(Conflict),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Store temporarily unavailable")]
    Unavailable,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeskError {
    pub fn validation(msg: impl Into<String>) -> Self {
        DeskError::Validation(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        DeskError::Forbidden(msg.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DeskError::Validation(_) => "validation",
            DeskError::NotFound(_) => "not_found",
            DeskError::Conflict(_) => "conflict",
            DeskError::Forbidden(_) => "forbidden",
            DeskError::Unauthorized(_) => "unauthorized",
            DeskError::Unavailable => "unavailable",
            DeskError::Internal(_) => "internal",
        }
    }

    /// Adapter for `map_err` that names the missing record.
    pub fn missing(what: &'static str) -> impl FnOnce(StoreError) -> DeskError {
        move |e| match e {
            StoreError::NotFound => DeskError::NotFound(what),
            other => DeskError::from(other),
        }
    }
}

impl From<Conflict> for DeskError {
    fn from(c: Conflict) -> Self {
        DeskError::Conflict(c)
    }
}

impl From<StoreError> for DeskError {
    fn from(e: StoreError) -> Self {
        if e.is_transient() {
            return DeskError::Unavailable;
        }
        if e.is_constraint_violation() {
            return DeskError::Conflict(Conflict::Duplicate);
        }
        match e {
            StoreError::NotFound => DeskError::NotFound("record"),
            other => DeskError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for DeskError {
    fn into_response(self) -> Response {
        let status = match &self {
            DeskError::Validation(_) => StatusCode::BAD_REQUEST,
            DeskError::NotFound(_) => StatusCode::NOT_FOUND,
            DeskError::Conflict(_) => StatusCode::CONFLICT,
            DeskError::Forbidden(_) => StatusCode::FORBIDDEN,
            DeskError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            DeskError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            DeskError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            DeskError::Internal(detail) => {
                tracing::error!(error = %detail, "Internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut body = serde_json::json!({
            "error": message,
            "kind": self.kind(),
        });
        if let DeskError::Conflict(reason) = &self {
            body["reason"] = serde_json::Value::from(reason.as_str());
        }

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_not_found_keeps_record_name() {
        let err = DeskError::missing("ticket")(StoreError::NotFound);
        assert!(matches!(err, DeskError::NotFound("ticket")));
        assert_eq!(err.to_string(), "ticket not found");
    }

    #[test]
    fn conflict_status_code_and_reason() {
        let resp = DeskError::from(Conflict::LimitReached).into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = DeskError::validation("subject is empty").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = DeskError::Unavailable.into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn invalid_status_names_the_status() {
        let err = DeskError::from(Conflict::InvalidStatus(TicketStatus::Resolved));
        assert_eq!(err.to_string(), "Ticket is Resolved");
    }
}
