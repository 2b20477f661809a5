//! Optional bearer-token authentication.
//!
//! Credentials are never required. A request either carries a valid HS256
//! bearer token, in which case its decoded payload travels with the request
//! as [`AuthContext::Authenticated`], or it carries nothing usable and runs
//! as [`AuthContext::Anonymous`]. Only a token that is present and fails
//! verification (or an `Authorization` header that cannot be split into a
//! scheme and a credential) rejects the request.
//!
//! # Policy
//!
//! | `Authorization` header            | outcome                        |
//! |-----------------------------------|--------------------------------|
//! | absent or empty                   | `Anonymous`                    |
//! | `Bearer <valid token>`            | `Authenticated(claims)`        |
//! | `Bearer <invalid/expired token>`  | 401 `INVALID_TOKEN`            |
//! | `<other scheme> <anything>`       | `Anonymous`                    |
//! | any other shape                   | 401 `CREDENTIALS_BAD_FORMAT`   |
//!
//! CORS preflight requests (`OPTIONS` announcing `authorization` in
//! `Access-Control-Request-Headers`) are never verified.

use crate::error::AppError;
use axum::http::{
    header::{ACCESS_CONTROL_REQUEST_HEADERS, AUTHORIZATION},
    HeaderMap, Method,
};
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, Validation};
use thiserror::Error;

/// Decoded token payload. Its fields are never inspected here.
pub type Claims = serde_json::Map<String, serde_json::Value>;

/// Authentication state of a single request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthContext {
    /// The request carried a valid bearer token.
    Authenticated(Claims),
    /// The request carried no usable credentials.
    #[default]
    Anonymous,
}

impl AuthContext {
    /// Claims of an authenticated request.
    #[must_use]
    pub const fn claims(&self) -> Option<&Claims> {
        match self {
            Self::Authenticated(claims) => Some(claims),
            Self::Anonymous => None,
        }
    }

    /// Whether the request carried a valid token.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

/// Why a token failed verification.
#[derive(Debug, Error)]
pub enum TokenError {
    /// `exp` is in the past.
    #[error("jwt expired")]
    Expired,

    /// `nbf` is in the future.
    #[error("jwt not active")]
    NotActive,

    /// Bad signature, wrong algorithm or undecodable token.
    #[error("invalid token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::ImmatureSignature => Self::NotActive,
            _ => Self::Invalid(err),
        }
    }
}

/// Reasons the authentication policy rejects a request.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The `Authorization` header is not `<scheme> <credentials>`.
    #[error("Format is Authorization: Bearer [token]")]
    CredentialsBadFormat,

    /// A bearer token was supplied but did not verify.
    #[error(transparent)]
    InvalidToken(#[from] TokenError),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::CredentialsBadFormat => {
                Self::unauthorized("CREDENTIALS_BAD_FORMAT", err.to_string())
            }
            AuthError::InvalidToken(source) => {
                Self::unauthorized("INVALID_TOKEN", source.to_string()).with_source(source)
            }
        }
    }
}

/// HS256 token verifier with a shared secret.
///
/// `exp` and `nbf` are checked when present, with no leeway. No claim is
/// required and audience/issuer are not checked.
#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    /// Verifier for tokens signed with `secret` using HS256.
    #[must_use]
    pub fn hs256(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_aud = false;
        validation.validate_nbf = true;
        validation.required_spec_claims.clear();

        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Verify `token` and return its payload.
    ///
    /// # Errors
    ///
    /// Returns a [`TokenError`] if the signature, algorithm or time-based
    /// claims do not check out.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.key, &self.validation)?;
        Ok(data.claims)
    }
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtVerifier")
            .field("algorithms", &self.validation.algorithms)
            .finish_non_exhaustive()
    }
}

/// Apply the optional-credential policy to one request.
///
/// # Errors
///
/// Returns [`AuthError::CredentialsBadFormat`] for an `Authorization` header
/// that is not `<scheme> <credentials>`, and [`AuthError::InvalidToken`] for a
/// bearer token that fails verification.
pub fn authenticate(
    verifier: &JwtVerifier,
    method: &Method,
    headers: &HeaderMap,
) -> Result<AuthContext, AuthError> {
    if *method == Method::OPTIONS && is_preflight_for_authorization(headers) {
        return Ok(AuthContext::Anonymous);
    }

    let Some(header) = headers.get(AUTHORIZATION) else {
        return Ok(AuthContext::Anonymous);
    };
    let header = header
        .to_str()
        .map_err(|_| AuthError::CredentialsBadFormat)?;
    if header.is_empty() {
        return Ok(AuthContext::Anonymous);
    }

    let parts: Vec<&str> = header.split(' ').collect();
    let [scheme, token] = parts.as_slice() else {
        return Err(AuthError::CredentialsBadFormat);
    };

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Ok(AuthContext::Anonymous);
    }

    Ok(AuthContext::Authenticated(verifier.verify(token)?))
}

fn is_preflight_for_authorization(headers: &HeaderMap) -> bool {
    headers
        .get_all(ACCESS_CONTROL_REQUEST_HEADERS)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|name| name.trim().eq_ignore_ascii_case("authorization"))
}
