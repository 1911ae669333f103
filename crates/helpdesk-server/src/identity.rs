//! Trusted identity headers set by the authentication gateway.
//!
//! Sign-in happens upstream. The gateway forwards the resolved identity in
//! `x-actor-*` headers and, when `GATEWAY_TOKEN` is configured, proves itself
//! with `x-gateway-token`.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use subtle::ConstantTimeEq;

use helpdesk_shared::{Actor, Role};

use crate::api::AppState;
use crate::error::DeskError;

pub const ACTOR_ID: &str = "x-actor-id";
pub const ACTOR_ROLE: &str = "x-actor-role";
pub const ACTOR_EMAIL: &str = "x-actor-email";
pub const ACTOR_STAFF_ID: &str = "x-actor-staff-id";
pub const GATEWAY_TOKEN: &str = "x-gateway-token";

/// Extractor yielding the caller's [`Actor`].
pub struct Caller(pub Actor);

impl FromRequestParts<AppState> for Caller {
    type Rejection = DeskError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(expected) = &state.config.gateway_token {
            verify_gateway_token(&parts.headers, expected)?;
        }
        actor_from_headers(&parts.headers).map(Caller)
    }
}

fn verify_gateway_token(headers: &HeaderMap, expected: &str) -> Result<(), DeskError> {
    let token = header(headers, GATEWAY_TOKEN).unwrap_or("");

    let token_bytes = token.as_bytes();
    let expected_bytes = expected.as_bytes();
    if token_bytes.len() != expected_bytes.len()
        || token_bytes.ct_eq(expected_bytes).unwrap_u8() != 1
    {
        return Err(DeskError::Unauthorized("invalid gateway token".into()));
    }
    Ok(())
}

pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, DeskError> {
    let role: Role = required(headers, ACTOR_ROLE)?
        .parse()
        .map_err(|_| DeskError::Unauthorized(format!("invalid {ACTOR_ROLE}")))?;
    let user_id = parse_id(headers, ACTOR_ID)?;
    let email = required(headers, ACTOR_EMAIL)?.trim().to_string();

    let staff_id = if role.is_staff() {
        Some(parse_id(headers, ACTOR_STAFF_ID)?)
    } else {
        None
    };

    Ok(Actor {
        user_id,
        staff_id,
        role,
        email,
    })
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn required<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, DeskError> {
    header(headers, name)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| DeskError::Unauthorized(format!("missing {name}")))
}

fn parse_id(headers: &HeaderMap, name: &str) -> Result<i64, DeskError> {
    required(headers, name)?
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| DeskError::Unauthorized(format!("invalid {name}")))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn customer_needs_no_staff_id() {
        let actor = actor_from_headers(&headers(&[
            (ACTOR_ID, "4"),
            (ACTOR_ROLE, "user"),
            (ACTOR_EMAIL, "c@example.com"),
        ]))
        .unwrap();
        assert_eq!(actor.role, Role::User);
        assert_eq!(actor.staff_id, None);
    }

    #[test]
    fn staff_without_staff_id_is_rejected() {
        let err = actor_from_headers(&headers(&[
            (ACTOR_ID, "4"),
            (ACTOR_ROLE, "staff"),
            (ACTOR_EMAIL, "s@example.com"),
        ]))
        .unwrap_err();
        assert!(matches!(err, DeskError::Unauthorized(_)));
    }

    #[test]
    fn unknown_role_is_rejected() {
        let err = actor_from_headers(&headers(&[
            (ACTOR_ID, "4"),
            (ACTOR_ROLE, "root"),
            (ACTOR_EMAIL, "s@example.com"),
        ]))
        .unwrap_err();
        assert!(matches!(err, DeskError::Unauthorized(_)));
    }

    #[test]
    fn gateway_token_must_match_exactly() {
        assert!(verify_gateway_token(&headers(&[(GATEWAY_TOKEN, "abc")]), "abc").is_ok());
        assert!(verify_gateway_token(&headers(&[(GATEWAY_TOKEN, "abd")]), "abc").is_err());
        assert!(verify_gateway_token(&headers(&[]), "abc").is_err());
    }
}
