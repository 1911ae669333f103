//! Staff/requester chat threads attached to tickets.
//!
//! A ticket has at most one open conversation. Only the assigned staff
//! member starts one; starting again after a close reopens the same row.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use helpdesk_shared::constants::MAX_MESSAGE_LEN;
use helpdesk_shared::{Actor, AuditAction};
use helpdesk_store::{Conversation, Database, Message, StoreError, Ticket};

use super::{check_len, is_assignee, load_ticket, require_staff, Desk};
use crate::error::{Conflict, DeskError};

/// Result of asking to start a conversation.
#[derive(Debug, Clone, Serialize)]
pub struct Opened {
    pub conversation: Conversation,
    /// `true` when a closed conversation was brought back.
    pub reopened: bool,
}

/// One message as seen by a particular viewer.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MessageView {
    pub id: i64,
    pub sender_id: i64,
    pub content: String,
    pub sent_at: DateTime<Utc>,
    pub is_sender: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationView {
    pub conversation: Conversation,
    pub messages: Vec<MessageView>,
}

/// Messages as the requester or assigned staff sees them: `is_sender`
/// marks the viewer's own lines.
pub fn participant_view(messages: &[Message], viewer_user_id: i64) -> Vec<MessageView> {
    messages
        .iter()
        .map(|m| view(m, m.sender_id == viewer_user_id))
        .collect()
}

/// Messages as an admin sees them: `is_sender` marks the staff side.
pub fn admin_view(messages: &[Message]) -> Vec<MessageView> {
    messages.iter().map(|m| view(m, m.sender_is_staff)).collect()
}

fn view(m: &Message, is_sender: bool) -> MessageView {
    MessageView {
        id: m.id,
        sender_id: m.sender_id,
        content: m.content.clone(),
        sent_at: m.sent_at,
        is_sender,
    }
}

impl Desk {
    /// Start the ticket's conversation, or reopen it if it was closed.
    pub fn open_conversation(&self, actor: &Actor, ticket_id: i64) -> Result<Opened, DeskError> {
        require_staff(actor)?;

        let opened = self.db.immediate(|db| {
            let ticket = load_ticket(db, ticket_id)?;
            if ticket.status.is_terminal() {
                return Err(Conflict::InvalidStatus(ticket.status).into());
            }
            if !is_assignee(actor, &ticket) {
                return Err(DeskError::forbidden(
                    "only the assigned staff member may start a conversation",
                ));
            }

            match db.latest_conversation_for_ticket(ticket_id)? {
                Some(conv) if !conv.closed => Err(Conflict::AlreadyStarted.into()),
                Some(conv) => {
                    db.reopen_conversation(conv.id)?;
                    Ok(Opened {
                        conversation: load_conversation(db, conv.id)?,
                        reopened: true,
                    })
                }
                None => {
                    let conversation = db
                        .insert_conversation(ticket_id, Utc::now())
                        .map_err(already_started)?;
                    Ok(Opened {
                        conversation,
                        reopened: false,
                    })
                }
            }
        })?;

        let conv_id = opened.conversation.id;
        if opened.reopened {
            info!(ticket_id, conversation_id = conv_id, "Conversation reopened");
            self.audit(
                AuditAction::Update,
                Some(actor.user_id),
                &format!("conversation {conv_id} reopened for ticket {ticket_id}"),
            );
        } else {
            info!(ticket_id, conversation_id = conv_id, "Conversation started");
            self.audit(
                AuditAction::Create,
                Some(actor.user_id),
                &format!("conversation {conv_id} started for ticket {ticket_id}"),
            );
        }
        Ok(opened)
    }

    /// Post a message to an open conversation.
    pub fn send_message(
        &self,
        actor: &Actor,
        conversation_id: i64,
        content: &str,
    ) -> Result<MessageView, DeskError> {
        check_len("message", content, MAX_MESSAGE_LEN)?;

        let message = self.db.immediate(|db| {
            let conv = load_conversation(db, conversation_id)?;
            let ticket = load_ticket(db, conv.ticket_id)?;
            if !is_participant(actor, &ticket) {
                return Err(DeskError::forbidden("not a participant of this conversation"));
            }
            if !conv.accepts_messages() {
                return Err(Conflict::ConversationClosed.into());
            }
            Ok(db.insert_message(conversation_id, actor.user_id, content.trim(), Utc::now())?)
        })?;

        Ok(view(&message, true))
    }

    /// Close an open conversation without touching the ticket.
    pub fn close_conversation(&self, actor: &Actor, conversation_id: i64) -> Result<Conversation, DeskError> {
        require_staff(actor)?;

        let conv = self.db.immediate(|db| {
            let conv = load_conversation(db, conversation_id)?;
            let ticket = load_ticket(db, conv.ticket_id)?;
            if !(actor.is_admin() || is_assignee(actor, &ticket)) {
                return Err(DeskError::forbidden(
                    "only the assigned staff member may close this conversation",
                ));
            }
            if !db.close_conversation(conversation_id, Utc::now())? {
                return Err(Conflict::AlreadyClosed.into());
            }
            load_conversation(db, conversation_id)
        })?;

        self.audit(
            AuditAction::Update,
            Some(actor.user_id),
            &format!("conversation {conversation_id} closed for ticket {}", conv.ticket_id),
        );
        Ok(conv)
    }

    pub fn read_conversation(&self, actor: &Actor, conversation_id: i64) -> Result<ConversationView, DeskError> {
        let conv = load_conversation(&self.db, conversation_id)?;
        self.conversation_view(actor, conv)
    }

    /// The ticket's current conversation, open or most recently closed.
    pub fn conversation_for_ticket(&self, actor: &Actor, ticket_id: i64) -> Result<ConversationView, DeskError> {
        let ticket = load_ticket(&self.db, ticket_id)?;
        if !is_participant(actor, &ticket) {
            return Err(DeskError::forbidden("not a participant of this ticket"));
        }
        let conv = self
            .db
            .latest_conversation_for_ticket(ticket_id)?
            .ok_or(DeskError::NotFound("conversation"))?;
        self.conversation_view(actor, conv)
    }

    fn conversation_view(&self, actor: &Actor, conversation: Conversation) -> Result<ConversationView, DeskError> {
        let ticket = load_ticket(&self.db, conversation.ticket_id)?;
        if !is_participant(actor, &ticket) {
            return Err(DeskError::forbidden("not a participant of this conversation"));
        }

        let messages = self.db.list_messages(conversation.id)?;
        let messages = if actor.is_admin() {
            admin_view(&messages)
        } else {
            participant_view(&messages, actor.user_id)
        };
        Ok(ConversationView {
            conversation,
            messages,
        })
    }
}

/// Requester, assigned staff, or admin.
fn is_participant(actor: &Actor, ticket: &Ticket) -> bool {
    actor.is_admin() || ticket.requester_id == actor.user_id || is_assignee(actor, ticket)
}

fn load_conversation(db: &Database, id: i64) -> Result<Conversation, DeskError> {
    db.get_conversation(id).map_err(DeskError::missing("conversation"))
}

/// The partial unique index fired: another writer opened one first.
fn already_started(e: StoreError) -> DeskError {
    if e.is_constraint_violation() {
        Conflict::AlreadyStarted.into()
    } else {
        e.into()
    }
}
