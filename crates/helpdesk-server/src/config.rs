//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use helpdesk_shared::constants::{
    AUTO_ASSIGN_CAP, CLAIM_CAP, DEFAULT_HTTP_PORT, ESCALATION_AFTER_HOURS,
    ESCALATION_BUDGET_SECS, ESCALATION_INTERVAL_SECS, MAX_ESCALATION_AFTER_HOURS,
};
use helpdesk_shared::DeskPolicy;

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: `None` (platform data directory).
    pub database_path: Option<PathBuf>,

    /// Shared secret the upstream gateway sends in `x-gateway-token`.
    /// Env: `GATEWAY_TOKEN`
    /// Default: unset (identity headers trusted as-is).
    pub gateway_token: Option<String>,

    /// Env: `AUTO_ASSIGN_CAP`
    pub auto_assign_cap: u32,

    /// Env: `CLAIM_CAP`
    pub claim_cap: u32,

    /// Env: `ESCALATION_AFTER_HOURS`
    pub escalate_after_hours: i64,

    /// Env: `ESCALATION_INTERVAL_SECS`
    pub escalation_interval: Duration,

    /// Env: `ESCALATION_BUDGET_SECS`
    pub escalation_budget: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: None,
            gateway_token: None,
            auto_assign_cap: AUTO_ASSIGN_CAP,
            claim_cap: CLAIM_CAP,
            escalate_after_hours: ESCALATION_AFTER_HOURS,
            escalation_interval: Duration::from_secs(ESCALATION_INTERVAL_SECS),
            escalation_budget: Duration::from_secs(ESCALATION_BUDGET_SECS),
        }
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("http_addr", &self.http_addr)
            .field("database_path", &self.database_path)
            .field("gateway_token", &self.gateway_token.as_ref().map(|_| "<redacted>"))
            .field("auto_assign_cap", &self.auto_assign_cap)
            .field("claim_cap", &self.claim_cap)
            .field("escalate_after_hours", &self.escalate_after_hours)
            .field("escalation_interval", &self.escalation_interval)
            .field("escalation_budget", &self.escalation_budget)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(path) = lookup("DATABASE_PATH") {
            if !path.is_empty() {
                config.database_path = Some(PathBuf::from(path));
            }
        }

        if let Some(token) = lookup("GATEWAY_TOKEN") {
            if !token.is_empty() {
                config.gateway_token = Some(token);
            }
        }

        if let Some(n) = parse_positive(&lookup, "AUTO_ASSIGN_CAP") {
            config.auto_assign_cap = n as u32;
        }
        if let Some(n) = parse_positive(&lookup, "CLAIM_CAP") {
            config.claim_cap = n as u32;
        }
        if let Some(n) = parse_bounded(&lookup, "ESCALATION_AFTER_HOURS", MAX_ESCALATION_AFTER_HOURS) {
            config.escalate_after_hours = n as i64;
        }
        if let Some(n) = parse_positive(&lookup, "ESCALATION_INTERVAL_SECS") {
            config.escalation_interval = Duration::from_secs(n);
        }
        if let Some(n) = parse_positive(&lookup, "ESCALATION_BUDGET_SECS") {
            config.escalation_budget = Duration::from_secs(n);
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }

    pub fn desk_policy(&self) -> DeskPolicy {
        DeskPolicy {
            auto_assign_cap: self.auto_assign_cap,
            claim_cap: self.claim_cap,
            escalate_after: chrono::Duration::hours(self.escalate_after_hours),
        }
    }
}

/// Parse a strictly positive integer, warning and returning `None` otherwise.
fn parse_positive(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    parse_bounded(lookup, key, u32::MAX as u64)
}

/// Parse an integer in `1..=max`, warning and returning `None` otherwise.
fn parse_bounded(lookup: &impl Fn(&str) -> Option<String>, key: &str, max: u64) -> Option<u64> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(n) if n > 0 && n <= max => Some(n),
        _ => {
            tracing::warn!(key, value = %raw, "Invalid value, using default");
            None
        }
    }
}
