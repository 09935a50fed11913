use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    config::{AppConfig, Env},
    error::AppError,
    policy::Session,
};

/// Cookie the identity provider's frontend SDK stores the session token in.
pub const SESSION_COOKIE: &str = "__session";

/// Development-only header carrying a user id directly (honoured in `Env::Local`).
pub const LOCAL_USER_HEADER: &str = "x-user-id";

/// Claims
///
/// Payload of the session JWT issued by the external identity provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the identity provider's user id.
    pub sub: String,
    /// Expiration Time (exp): tokens past this instant are rejected.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// AuthError
///
/// A token was presented but could not be turned into an identity.
/// A request carrying no token at all is not an error: it is `Session::Anonymous`.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid session token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("session token has an empty subject")]
    EmptySubject,
}

/// resolve_session
///
/// The identity provider boundary. Resolution order:
/// 1. `Env::Local` only: a non-empty `x-user-id` header.
/// 2. `Authorization: Bearer <token>`, falling back to the `__session` cookie.
/// 3. No token found: anonymous.
pub fn resolve_session(headers: &HeaderMap, config: &AppConfig) -> Result<Session, AuthError> {
    if config.env == Env::Local {
        let bypass = headers
            .get(LOCAL_USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty());
        if let Some(user_id) = bypass {
            return Ok(Session::Authenticated(user_id.to_string()));
        }
    }

    let Some(token) = bearer_token(headers).or_else(|| session_cookie(headers)) else {
        return Ok(Session::Anonymous);
    };

    let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;

    let token_data = decode::<Claims>(token, &decoding_key, &validation)?;
    let user_id = token_data.claims.sub.trim();
    if user_id.is_empty() {
        return Err(AuthError::EmptySubject);
    }

    Ok(Session::Authenticated(user_id.to_string()))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|token| !token.is_empty())
}

/// AuthUser
///
/// Resolved identity of an authenticated request. Handlers that act on behalf of a user
/// take this as an argument; anonymous callers are rejected with 401.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
}

/// AuthUser Extractor Implementation
///
/// Reuses the `Session` the access middleware stored in the request extensions. When the
/// middleware did not store one (static bypass, fail-open, or a router built without the
/// middleware) the session is resolved here from the headers.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = match parts.extensions.get::<Session>() {
            Some(session) => session.clone(),
            None => {
                let config = AppConfig::from_ref(state);
                resolve_session(&parts.headers, &config)?
            }
        };

        match session {
            Session::Authenticated(id) => Ok(AuthUser { id }),
            Session::Anonymous => Err(AppError::Unauthorized),
        }
    }
}
