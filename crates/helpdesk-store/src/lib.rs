//! # helpdesk-store
//!
//! SQLite persistence for the helpdesk service.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for every domain
//! model. Multi-step invariants are enforced by running those helpers inside
//! [`Database::immediate`].

pub mod assignments;
pub mod audit;
pub mod conversations;
pub mod database;
pub mod lookups;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod staff;
pub mod tickets;
pub mod users;

mod codec;
mod error;

pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
