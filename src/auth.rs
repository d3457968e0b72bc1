//! Bearer-token authentication for the HTTP transport.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::warn;

/// Accepted tokens. Authentication is off when the list is empty.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    tokens: Vec<String>,
}

/// Why a request was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthFailure {
    #[error("Missing Bearer token in Authorization header")]
    MissingToken,

    #[error("{0}")]
    MalformedHeader(&'static str),

    #[error("Invalid Bearer token")]
    InvalidToken,
}

impl AuthFailure {
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::MissingToken => "Include a valid token: 'Authorization: Bearer <token>'",
            Self::MalformedHeader(_) => "Use the format: 'Authorization: Bearer <your-token>'",
            Self::InvalidToken => "Check that you are using a valid token configured on the server",
        }
    }
}

impl IntoResponse for AuthFailure {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: ErrorDetail,
        }

        #[derive(Serialize)]
        struct ErrorDetail {
            code: &'static str,
            message: String,
            suggestion: &'static str,
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: "unauthorized",
                message: self.to_string(),
                suggestion: self.suggestion(),
            },
        };
        let json = serde_json::to_string(&body).unwrap_or_else(|_| {
            r#"{"error":{"code":"unauthorized","message":"Authentication failed"}}"#.to_string()
        });

        (
            StatusCode::UNAUTHORIZED,
            [(header::CONTENT_TYPE, "application/json")],
            json,
        )
            .into_response()
    }
}

impl AuthConfig {
    /// Build from configured tokens; blank entries are a configuration error.
    pub fn from_tokens(tokens: Vec<String>) -> Result<Self, String> {
        let mut accepted: Vec<String> = Vec::with_capacity(tokens.len());
        for token in tokens {
            let trimmed = token.trim();
            if trimmed.is_empty() {
                return Err("Empty token value in configuration".to_string());
            }
            if !accepted.iter().any(|t| t == trimmed) {
                accepted.push(trimmed.to_string());
            }
        }
        Ok(Self { tokens: accepted })
    }

    pub fn is_enabled(&self) -> bool {
        !self.tokens.is_empty()
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Check an `Authorization` header value against the accepted tokens.
    pub fn authorize(&self, authorization: Option<&HeaderValue>) -> Result<(), AuthFailure> {
        if !self.is_enabled() {
            return Ok(());
        }

        let header = authorization.ok_or(AuthFailure::MissingToken)?;
        let value = header.to_str().map_err(|_| {
            AuthFailure::MalformedHeader("Authorization header contains invalid characters")
        })?;
        let token = value.strip_prefix("Bearer ").ok_or(AuthFailure::MalformedHeader(
            "Invalid Authorization header format. Expected 'Bearer <token>'",
        ))?;
        if token.is_empty() {
            return Err(AuthFailure::MalformedHeader("Bearer token is empty"));
        }

        // Compare against every token so timing does not reveal which one matched
        let matched = self
            .tokens
            .iter()
            .fold(false, |found, expected| found | constant_time_eq(token, expected));
        if matched {
            Ok(())
        } else {
            warn!(token_prefix = %mask_token(token), "Authentication failed: invalid token");
            Err(AuthFailure::InvalidToken)
        }
    }
}

/// Axum middleware rejecting requests without an accepted bearer token.
pub async fn auth_middleware(
    State(auth_config): State<Arc<AuthConfig>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match auth_config.authorize(request.headers().get(header::AUTHORIZATION)) {
        Ok(()) => next.run(request).await,
        Err(failure) => {
            warn!(reason = %failure, "Rejected unauthenticated request");
            failure.into_response()
        }
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.len() == b.len() && bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}

fn mask_token(token: &str) -> String {
    let visible: String = token.chars().take(3).collect();
    if visible.len() == token.len() {
        "***".to_string()
    } else {
        format!("{}***", visible)
    }
}
