//! # Bearer Authentication
//!
//! Token validation and the extractors that turn a request into a caller.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Authorization: Bearer <jwt>      or      Cookie: token=<jwt>           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  JwtManager::verify (HS256, exp checked) ── bad/missing ──► 401         │
//! │       │ Claims { id, email, role, iat, exp }                            │
//! │       ▼                                                                 │
//! │  users row by id ──────────────────────── missing ─────────► 401        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  AuthUser { id, email, role, outlet_id }                                │
//! │       │                                                                 │
//! │       ├── CustomerUser  requires CUSTOMER ──────── else ──► 403         │
//! │       └── StaffUser     requires STAFF | SUPERADMIN ─ else ─► 403       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Role and outlet are read from the user row, not the token, so a role
//! change takes effect on the next request.

use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::AppState;
use canteen_core::{Role, User};
use canteen_db::repository::UserRepository;
use canteen_db::{DbError, StaffActor};

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub id: i64,

    pub email: String,

    pub role: Role,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// HS256 token manager.
#[derive(Clone)]
pub struct JwtManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl std::fmt::Debug for JwtManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtManager").finish_non_exhaustive()
    }
}

impl JwtManager {
    pub fn new(secret: &str) -> Self {
        JwtManager {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Signs a token for `user`. Login lives elsewhere; this serves tests
    /// and local tooling.
    pub fn issue(&self, user: &User, lifetime: Duration) -> ApiResult<String> {
        let now = Utc::now();
        let claims = Claims {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("Failed to sign token: {e}")))
    }

    /// Validate and decode a token.
    pub fn verify(&self, token: &str) -> ApiResult<Claims> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "Token rejected");
                ApiError::unauthorized("Invalid or expired token")
            })
    }
}

/// Bearer header first, then the `token` cookie.
fn extract_token(parts: &Parts) -> Option<String> {
    if let Some(value) = parts.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        if let Some(token) = value.trim().strip_prefix("Bearer ") {
            let token = token.trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }

    parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().strip_prefix("token="))
        .find(|token| !token.is_empty())
        .map(String::from)
}

// =============================================================================
// Extractors
// =============================================================================

/// Any authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
    pub role: Role,
    /// Assigned outlet for staff.
    pub outlet_id: Option<i64>,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = extract_token(parts).ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
        let claims = state.jwt.verify(&token)?;

        let mut conn = state.db.pool().acquire().await.map_err(DbError::from)?;
        let user = UserRepository::new(&mut conn)
            .get_by_id(claims.id)
            .await?
            .ok_or_else(|| ApiError::unauthorized("User not found"))?;

        Ok(AuthUser {
            id: user.id,
            email: user.email,
            role: user.role,
            outlet_id: user.outlet_id,
        })
    }
}

/// Caller with role CUSTOMER.
#[derive(Debug, Clone)]
pub struct CustomerUser(pub AuthUser);

impl FromRequestParts<AppState> for CustomerUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != Role::Customer {
            return Err(ApiError::forbidden("Customer access required"));
        }
        Ok(CustomerUser(user))
    }
}

/// Caller with role STAFF or SUPERADMIN.
#[derive(Debug, Clone)]
pub struct StaffUser(pub AuthUser);

impl StaffUser {
    pub fn actor(&self) -> StaffActor {
        StaffActor {
            user_id: self.0.id,
            role: self.0.role,
            outlet_id: self.0.outlet_id,
        }
    }
}

impl FromRequestParts<AppState> for StaffUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !matches!(user.role, Role::Staff | Role::Superadmin) {
            return Err(ApiError::forbidden("Staff access required"));
        }
        Ok(StaffUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn user(role: Role) -> User {
        User {
            id: 7,
            email: "asha@example.com".to_string(),
            name: "Asha".to_string(),
            role,
            outlet_id: None,
            is_verified: true,
            created_at: Utc::now(),
        }
    }

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_issue_and_verify() {
        let jwt = JwtManager::new("test-secret");
        let token = jwt.issue(&user(Role::Customer), Duration::hours(1)).unwrap();

        let claims = jwt.verify(&token).unwrap();
        assert_eq!(claims.id, 7);
        assert_eq!(claims.role, Role::Customer);
        assert_eq!(claims.email, "asha@example.com");
    }

    #[test]
    fn test_rejects_wrong_secret_and_expired() {
        let token = JwtManager::new("one").issue(&user(Role::Staff), Duration::hours(1)).unwrap();
        assert!(matches!(JwtManager::new("two").verify(&token), Err(ApiError::Unauthorized(_))));

        let jwt = JwtManager::new("one");
        let expired = jwt.issue(&user(Role::Staff), Duration::hours(-2)).unwrap();
        assert!(matches!(jwt.verify(&expired), Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn test_extract_token_sources() {
        let bearer = parts(Request::builder().header(AUTHORIZATION, "Bearer abc.def"));
        assert_eq!(extract_token(&bearer).as_deref(), Some("abc.def"));

        let cookie = parts(Request::builder().header(COOKIE, "theme=dark; token=xyz.123"));
        assert_eq!(extract_token(&cookie).as_deref(), Some("xyz.123"));

        let basic = parts(Request::builder().header(AUTHORIZATION, "Basic creds"));
        assert_eq!(extract_token(&basic), None);

        let empty = parts(Request::builder().header(AUTHORIZATION, "Bearer   "));
        assert_eq!(extract_token(&empty), None);
    }
}
