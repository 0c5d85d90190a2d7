//! Session cookie resolution.
//!
//! Login and cookie issuance belong to the identity provider. Both tiers only
//! need to turn the cookie they receive into a `Principal`, which is what the
//! `SessionStore` seam provides.

use crate::model::Role;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::HeaderMap;
use http::header::COOKIE;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

/// The authenticated caller, inserted into request extensions by `authenticate`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub user: String,
    pub role: Role,
}

pub trait SessionStore: Send + Sync {
    fn resolve(&self, token: &str) -> Option<Principal>;
}

fn default_cookie_name() -> String {
    "erms_session".into()
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// Name of the cookie carrying the session token
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Sessions issued by the identity provider
    #[serde(default)]
    pub sessions: Vec<SessionEntry>,
}

#[derive(Error, Debug, PartialEq)]
pub enum SessionConfigError {
    #[error("Session cookie name cannot be empty")]
    EmptyCookieName,

    #[error("Session token for {0} is empty")]
    EmptyToken(String),

    #[error("Session token is configured more than once (user {0})")]
    DuplicateToken(String),
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), SessionConfigError> {
        if self.cookie_name.trim().is_empty() {
            return Err(SessionConfigError::EmptyCookieName);
        }

        let mut seen = HashSet::new();
        for entry in &self.sessions {
            if entry.token.is_empty() {
                return Err(SessionConfigError::EmptyToken(entry.user.clone()));
            }
            if !seen.insert(entry.token.as_str()) {
                return Err(SessionConfigError::DuplicateToken(entry.user.clone()));
            }
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            cookie_name: default_cookie_name(),
            sessions: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SessionEntry {
    pub token: String,
    pub user: String,
    pub role: Role,
}

/// Fixed token table loaded from configuration.
pub struct StaticSessionStore {
    sessions: HashMap<String, Principal>,
}

impl StaticSessionStore {
    pub fn new(entries: Vec<SessionEntry>) -> Self {
        let sessions = entries
            .into_iter()
            .map(|entry| {
                let principal = Principal {
                    user: entry.user,
                    role: entry.role,
                };
                (entry.token, principal)
            })
            .collect();

        Self { sessions }
    }
}

impl SessionStore for StaticSessionStore {
    fn resolve(&self, token: &str) -> Option<Principal> {
        self.sessions.get(token).cloned()
    }
}

/// Cookie name plus the store used to resolve it.
#[derive(Clone)]
pub struct Sessions {
    cookie_name: Arc<str>,
    store: Arc<dyn SessionStore>,
}

impl Sessions {
    pub fn new(cookie_name: &str, store: Arc<dyn SessionStore>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            store,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        let store = StaticSessionStore::new(config.sessions.clone());
        Self::new(&config.cookie_name, Arc::new(store))
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn principal(&self, headers: &HeaderMap) -> Option<Principal> {
        session_token(headers, &self.cookie_name).and_then(|token| self.store.resolve(token))
    }
}

/// Finds the value of `cookie_name` across all `Cookie` headers.
pub fn session_token<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// Rejects requests without a resolvable session with 401 and stores the
/// `Principal` for downstream guards and handlers.
pub async fn authenticate(
    State(sessions): State<Sessions>,
    mut req: Request,
    next: Next,
) -> Response {
    match sessions.principal(req.headers()) {
        Some(principal) => {
            req.extensions_mut().insert(principal);
            next.run(req).await
        }
        None => {
            tracing::debug!(path = %req.uri().path(), "Request without a valid session");
            StatusCode::UNAUTHORIZED.into_response()
        }
    }
}
