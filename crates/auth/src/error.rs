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

use std::any::Any;

use axum::response::{IntoResponse, Response};
use carwash_error::{ErrorExt, StackError, StatusCode, status_code_of};
use carwash_token::TokenError;
use snafu::Snafu;

#[derive(Debug, Snafu, strum_macros::EnumProperty)]
#[snafu(visibility(pub))]
pub enum AuthError {
    #[snafu(transparent)]
    #[strum(props(status_code = "internal"))]
    Database { source: sqlx::Error },

    #[snafu(transparent)]
    #[strum(props(status_code = "internal"))]
    Migrate {
        source: sqlx::migrate::MigrateError,
    },

    #[snafu(display("Email {email} is already registered"))]
    #[strum(props(status_code = "conflict"))]
    EmailTaken { email: String },

    #[snafu(display("User {id} not found"))]
    #[strum(props(status_code = "not_found"))]
    UserNotFound { id: String },

    #[snafu(display("Invalid email or password"))]
    #[strum(props(status_code = "unauthorized"))]
    InvalidCredentials,

    #[snafu(display("Refresh token is not the current session"))]
    #[strum(props(status_code = "unauthorized"))]
    StaleRefreshToken,

    #[snafu(display("Invalid request: {reason}"))]
    #[strum(props(status_code = "invalid_argument"))]
    InvalidRequest { reason: String },

    #[snafu(display("Failed to hash password"))]
    #[strum(props(status_code = "internal"))]
    PasswordHash { source: bcrypt::BcryptError },

    #[snafu(display("Password hashing task failed"))]
    #[strum(props(status_code = "internal"))]
    HashTask { source: tokio::task::JoinError },

    #[snafu(display("Session store error"))]
    #[strum(props(status_code = "internal"))]
    Session { source: redis::RedisError },

    #[snafu(transparent)]
    Token { source: TokenError },
}

impl StackError for AuthError {
    fn debug_fmt(&self, layer: usize, buf: &mut Vec<String>) {
        buf.push(format!("{layer}: {self}"));
        if let Self::Token { source } = self {
            source.debug_fmt(layer + 1, buf);
        }
    }

    fn next(&self) -> Option<&dyn StackError> {
        match self {
            Self::Token { source } => Some(source),
            _ => None,
        }
    }

    fn transparent(&self) -> bool {
        matches!(
            self,
            Self::Database { .. } | Self::Migrate { .. } | Self::Token { .. }
        )
    }
}

impl ErrorExt for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Token { source } => source.status_code(),
            _ => status_code_of(self),
        }
    }

    fn as_any(&self) -> &dyn Any { self }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response { carwash_server::error::error_response(&self) }
}

impl From<AuthError> for tonic::Status {
    fn from(err: AuthError) -> Self {
        if err.status_code().is_internal() {
            tracing::error!(error = ?err, "auth request failed");
        }
        err.to_tonic_status()
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AuthError::EmailTaken {
                email: "a@b.c".into(),
            }
            .status_code(),
            StatusCode::Conflict
        );
        assert_eq!(
            AuthError::InvalidCredentials.status_code(),
            StatusCode::Unauthorized
        );
        assert_eq!(
            AuthError::Token {
                source: TokenError::MissingRole,
            }
            .status_code(),
            StatusCode::Unauthorized
        );
    }

    #[test]
    fn test_internal_errors_hide_cause() {
        let err = AuthError::Database {
            source: sqlx::Error::PoolTimedOut,
        };
        let status = tonic::Status::from(err);
        assert_eq!(status.code(), tonic::Code::Internal);
        assert!(!status.message().contains("pool"));
    }
}
