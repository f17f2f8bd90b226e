// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! HS256 access and refresh tokens.
//!
//! Access tokens carry `user_id` and `role` and live for an hour. Refresh
//! tokens carry `user_id` and a random `jti`, live for a day, and are
//! additionally pinned in the auth service's session store; that check lives
//! in the auth crate.

use std::any::Any;

use carwash_base::Secret;
use carwash_error::{ErrorExt, StackError, StatusCode, status_code_of};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use smart_default::SmartDefault;
use snafu::{ResultExt, Snafu};

pub const ACCESS_TOKEN_TTL_SECS: i64 = 60 * 60;
pub const REFRESH_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Snafu, strum_macros::EnumProperty)]
#[snafu(visibility(pub))]
pub enum TokenError {
    #[snafu(display("Failed to sign token"))]
    #[strum(props(status_code = "internal"))]
    Sign { source: jsonwebtoken::errors::Error },

    #[snafu(display("Invalid token"))]
    #[strum(props(status_code = "unauthorized"))]
    Invalid { source: jsonwebtoken::errors::Error },

    #[snafu(display("Token has no role claim"))]
    #[strum(props(status_code = "unauthorized"))]
    MissingRole,
}

impl StackError for TokenError {
    fn debug_fmt(&self, layer: usize, buf: &mut Vec<String>) {
        buf.push(format!("{layer}: {self}"));
    }

    fn next(&self) -> Option<&dyn StackError> { None }
}

impl ErrorExt for TokenError {
    fn status_code(&self) -> StatusCode { status_code_of(self) }

    fn as_any(&self) -> &dyn Any { self }
}

pub type Result<T> = std::result::Result<T, TokenError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub user_id: String,
    pub role:    String,
    pub iat:     i64,
    pub exp:     i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub user_id: String,
    /// Unique per issue, so two logins in the same second still differ.
    pub jti:     String,
    pub iat:     i64,
    pub exp:     i64,
}

/// Token pair returned by login and refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tokens {
    pub access_token:  String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, SmartDefault, bon::Builder)]
pub struct TokenConfig {
    #[default(_code = "Secret::from(\"key\")")]
    #[builder(into)]
    pub access_key:       Secret,
    #[default(_code = "Secret::from(\"key\")")]
    #[builder(into)]
    pub refresh_key:      Secret,
    #[default = 3600]
    #[builder(default = ACCESS_TOKEN_TTL_SECS)]
    pub access_ttl_secs:  i64,
    #[default = 86400]
    #[builder(default = REFRESH_TOKEN_TTL_SECS)]
    pub refresh_ttl_secs: i64,
}

/// Issues and verifies tokens for one pair of signing keys.
#[derive(Debug, Clone)]
pub struct TokenManager {
    config: TokenConfig,
}

impl TokenManager {
    pub const fn new(config: TokenConfig) -> Self { Self { config } }

    pub fn issue_access(&self, user_id: &str, role: &str) -> Result<String> {
        let iat = Utc::now().timestamp();
        let claims = AccessClaims {
            user_id: user_id.to_string(),
            role:    role.to_string(),
            iat,
            exp:     iat + self.config.access_ttl_secs,
        };
        sign(&claims, &self.config.access_key)
    }

    pub fn issue_refresh(&self, user_id: &str) -> Result<String> {
        let iat = Utc::now().timestamp();
        let claims = RefreshClaims {
            user_id: user_id.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
            iat,
            exp: iat + self.config.refresh_ttl_secs,
        };
        sign(&claims, &self.config.refresh_key)
    }

    /// Verifies signature and expiry of an access token.
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims> {
        verify(token, &self.config.access_key)
    }

    /// Verifies signature and expiry of a refresh token.
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims> {
        verify(token, &self.config.refresh_key)
    }

    /// Reads access claims without checking signature or expiry, and
    /// requires a non-empty role.
    pub fn peek_access(&self, token: &str) -> Result<AccessClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        let claims: AccessClaims = decode(token, &DecodingKey::from_secret(&[]), &validation)
            .context(InvalidSnafu)?
            .claims;
        if claims.role.is_empty() {
            return MissingRoleSnafu.fail();
        }
        Ok(claims)
    }

    /// Issues a fresh access token for `role` paired with the caller's
    /// existing refresh token. Refresh tokens are not rotated.
    pub fn refreshed_pair(
        &self,
        user_id: &str,
        role: &str,
        refresh_token: String,
    ) -> Result<Tokens> {
        Ok(Tokens {
            access_token: self.issue_access(user_id, role)?,
            refresh_token,
        })
    }

    /// How long a stored refresh token stays valid in the session store.
    pub fn refresh_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.config.refresh_ttl_secs.max(0).unsigned_abs())
    }
}

/// Strips an optional `Bearer ` prefix from an `Authorization` header value.
pub fn bearer_token(header: &str) -> &str {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .unwrap_or(header)
        .trim()
}

fn sign<T: Serialize>(claims: &T, key: &Secret) -> Result<String> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(key.as_bytes()),
    )
    .context(SignSnafu)
}

fn verify<T: DeserializeOwned>(token: &str, key: &Secret) -> Result<T> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<T>(token, &DecodingKey::from_secret(key.as_bytes()), &validation)
        .map(|data| data.claims)
        .context(InvalidSnafu)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> TokenManager {
        TokenManager::new(
            TokenConfig::builder()
                .access_key("access-secret")
                .refresh_key("refresh-secret")
                .build(),
        )
    }

    #[test]
    fn test_access_token_round_trip() {
        let tokens = manager();
        let token = tokens.issue_access("user-1", "admin").unwrap();
        let claims = tokens.verify_access(&token).unwrap();
        assert_eq!(claims.user_id, "user-1");
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.exp - claims.iat, ACCESS_TOKEN_TTL_SECS);
    }

    #[test]
    fn test_refresh_token_lifetime() {
        let tokens = manager();
        let token = tokens.issue_refresh("user-1").unwrap();
        let claims = tokens.verify_refresh(&token).unwrap();
        assert_eq!(claims.user_id, "user-1");
        assert_eq!(claims.exp - claims.iat, REFRESH_TOKEN_TTL_SECS);
    }

    #[test]
    fn test_back_to_back_refresh_tokens_differ() {
        let tokens = manager();
        let first = tokens.issue_refresh("user-1").unwrap();
        let second = tokens.issue_refresh("user-1").unwrap();
        assert_ne!(first, second);

        let first = tokens.verify_refresh(&first).unwrap();
        let second = tokens.verify_refresh(&second).unwrap();
        assert_eq!(first.user_id, second.user_id);
        assert_ne!(first.jti, second.jti);
    }

    #[test]
    fn test_keys_are_not_interchangeable() {
        let tokens = manager();
        let refresh = tokens.issue_refresh("user-1").unwrap();
        let err = tokens.verify_access(&refresh).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::Unauthorized);
    }

    #[test]
    fn test_expired_token_is_rejected_but_peekable() {
        let tokens = TokenManager::new(
            TokenConfig::builder()
                .access_key("access-secret")
                .refresh_key("refresh-secret")
                .access_ttl_secs(-3600)
                .build(),
        );
        let token = tokens.issue_access("user-1", "user").unwrap();
        assert!(tokens.verify_access(&token).is_err());
        assert_eq!(tokens.peek_access(&token).unwrap().role, "user");
    }

    #[test]
    fn test_peek_ignores_signature() {
        let other = TokenManager::new(
            TokenConfig::builder()
                .access_key("someone-else")
                .refresh_key("someone-else")
                .build(),
        );
        let token = other.issue_access("user-9", "provider").unwrap();
        let tokens = manager();
        assert!(tokens.verify_access(&token).is_err());
        assert_eq!(tokens.peek_access(&token).unwrap().user_id, "user-9");
    }

    #[test]
    fn test_peek_rejects_garbage_and_missing_role() {
        let tokens = manager();
        assert!(tokens.peek_access("not-a-jwt").is_err());

        let no_role = tokens.issue_access("user-1", "").unwrap();
        assert!(matches!(
            tokens.peek_access(&no_role),
            Err(TokenError::MissingRole)
        ));
    }

    #[test]
    fn test_refreshed_pair_keeps_refresh_token() {
        let tokens = manager();
        let refresh = tokens.issue_refresh("user-1").unwrap();
        let pair = tokens
            .refreshed_pair("user-1", "user", refresh.clone())
            .unwrap();
        assert_eq!(pair.refresh_token, refresh);
        assert_eq!(tokens.verify_access(&pair.access_token).unwrap().role, "user");
    }

    #[test]
    fn test_bearer_prefix() {
        assert_eq!(bearer_token("Bearer abc"), "abc");
        assert_eq!(bearer_token("abc"), "abc");
    }
}
