//! v001 -- Initial schema creation.
//!
//! Lookup tables (`categories`, `priorities`, `statuses`), the directory
//! (`users`, `staff`), the ticket tables (`tickets`, `assignments`,
//! `conversations`, `messages`) and the append-only `audit` log.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Lookups
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS categories (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL UNIQUE,
    description TEXT
);

CREATE TABLE IF NOT EXISTS priorities (
    id          INTEGER PRIMARY KEY,          -- lower id = more severe
    name        TEXT NOT NULL UNIQUE,
    description TEXT
);

CREATE TABLE IF NOT EXISTS statuses (
    id          INTEGER PRIMARY KEY,          -- matches TicketStatus discriminants
    name        TEXT NOT NULL UNIQUE,
    description TEXT
);

-- ----------------------------------------------------------------
-- Directory
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    email        TEXT NOT NULL UNIQUE,
    display_name TEXT,
    created_at   TEXT NOT NULL                -- RFC-3339 UTC
);

CREATE TABLE IF NOT EXISTS staff (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id    INTEGER NOT NULL UNIQUE,       -- FK -> users(id)
    email      TEXT NOT NULL,
    field_id   INTEGER NOT NULL,              -- FK -> categories(id)
    role       TEXT NOT NULL CHECK (role IN ('staff', 'admin')),
    is_active  INTEGER NOT NULL DEFAULT 1,    -- boolean 0/1
    created_at TEXT NOT NULL,

    FOREIGN KEY (user_id)  REFERENCES users(id),
    FOREIGN KEY (field_id) REFERENCES categories(id)
);

-- rotation order for auto-assignment
CREATE INDEX IF NOT EXISTS idx_staff_field ON staff(field_id, is_active, id);

-- ----------------------------------------------------------------
-- Tickets
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS tickets (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    requester_id INTEGER NOT NULL,            -- FK -> users(id)
    staff_id     INTEGER,                     -- nullable FK -> staff(id)
    category_id  INTEGER NOT NULL,            -- FK -> categories(id)
    priority_id  INTEGER,                     -- nullable FK -> priorities(id)
    status_id    INTEGER NOT NULL,            -- FK -> statuses(id)
    subject      TEXT NOT NULL,
    description  TEXT NOT NULL,
    note         TEXT,
    created_at   TEXT NOT NULL,
    resolved_at  TEXT,

    FOREIGN KEY (requester_id) REFERENCES users(id),
    FOREIGN KEY (staff_id)     REFERENCES staff(id),
    FOREIGN KEY (category_id)  REFERENCES categories(id),
    FOREIGN KEY (priority_id)  REFERENCES priorities(id),
    FOREIGN KEY (status_id)    REFERENCES statuses(id)
);

CREATE INDEX IF NOT EXISTS idx_tickets_staff_status ON tickets(staff_id, status_id);
CREATE INDEX IF NOT EXISTS idx_tickets_category_status ON tickets(category_id, status_id);
CREATE INDEX IF NOT EXISTS idx_tickets_requester ON tickets(requester_id);
CREATE INDEX IF NOT EXISTS idx_tickets_created ON tickets(created_at);

-- ----------------------------------------------------------------
-- Round-robin cursor, one row per category
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS assignments (
    category_id   INTEGER PRIMARY KEY NOT NULL, -- FK -> categories(id)
    last_staff_id INTEGER NOT NULL,             -- FK -> staff(id)
    updated_at    TEXT NOT NULL,

    FOREIGN KEY (category_id)   REFERENCES categories(id),
    FOREIGN KEY (last_staff_id) REFERENCES staff(id)
);

-- ----------------------------------------------------------------
-- Conversations and messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS conversations (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    ticket_id  INTEGER NOT NULL,              -- FK -> tickets(id)
    closed     INTEGER NOT NULL DEFAULT 0,    -- boolean 0/1
    started_at TEXT NOT NULL,
    ended_at   TEXT,

    FOREIGN KEY (ticket_id) REFERENCES tickets(id)
);

CREATE INDEX IF NOT EXISTS idx_conversations_ticket ON conversations(ticket_id);

-- at most one open conversation per ticket
CREATE UNIQUE INDEX IF NOT EXISTS idx_conversations_one_open
    ON conversations(ticket_id) WHERE closed = 0;

CREATE TABLE IF NOT EXISTS messages (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    conversation_id INTEGER NOT NULL,         -- FK -> conversations(id)
    sender_id       INTEGER NOT NULL,         -- FK -> users(id)
    content         TEXT NOT NULL,
    sent_at         TEXT NOT NULL,

    FOREIGN KEY (conversation_id) REFERENCES conversations(id),
    FOREIGN KEY (sender_id)       REFERENCES users(id)
);

CREATE INDEX IF NOT EXISTS idx_messages_conversation_ts
    ON messages(conversation_id, sent_at ASC);

-- ----------------------------------------------------------------
-- Audit (append-only)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS audit (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at TEXT NOT NULL,
    action     TEXT NOT NULL CHECK (action IN ('Create', 'Update', 'Delete')),
    actor_id   INTEGER,                       -- NULL for background jobs
    detail     TEXT NOT NULL
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
