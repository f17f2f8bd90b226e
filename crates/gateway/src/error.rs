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

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use carwash_error::{ErrorExt, StackError, StatusCode, status_code_of};
use snafu::Snafu;
use tracing::error;

#[derive(Debug, Snafu, strum_macros::EnumProperty)]
#[snafu(visibility(pub))]
pub enum GatewayError {
    #[snafu(display("{reason}"))]
    #[strum(props(status_code = "invalid_argument"))]
    InvalidRequest { reason: String },

    #[snafu(display("{status}"))]
    #[strum(props(status_code = "internal"))]
    Downstream { status: tonic::Status },

    #[snafu(display("Failed to encode event for {queue}"))]
    #[strum(props(status_code = "internal"))]
    EncodeEvent {
        queue:  carwash_broker::Queue,
        source: serde_json::Error,
    },

    #[snafu(display("Failed to read policy file {path}"))]
    #[strum(props(status_code = "internal"))]
    ReadPolicy {
        path:   String,
        source: std::io::Error,
    },

    #[snafu(display("Invalid policy rule on line {line}: {reason}"))]
    #[strum(props(status_code = "invalid_argument"))]
    InvalidPolicy { line: usize, reason: String },

    #[snafu(display("Policy enforcer failed"))]
    #[strum(props(status_code = "internal"))]
    Enforcer { source: casbin::Error },

    #[snafu(display("Invalid service url {url}"))]
    #[strum(props(status_code = "invalid_argument"))]
    InvalidUrl {
        url:    String,
        source: tonic::transport::Error,
    },
}

impl StackError for GatewayError {
    fn debug_fmt(&self, layer: usize, buf: &mut Vec<String>) {
        buf.push(format!("{layer}: {self}"));
    }

    fn next(&self) -> Option<&dyn StackError> { None }
}

impl ErrorExt for GatewayError {
    fn status_code(&self) -> StatusCode { status_code_of(self) }

    fn as_any(&self) -> &dyn Any { self }
}

impl From<tonic::Status> for GatewayError {
    fn from(status: tonic::Status) -> Self { Self::Downstream { status } }
}

/// `{"error": "..."}` body used for every gateway failure.
pub fn error_body(status: axum::http::StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": message.into() })),
    )
        .into_response()
}

impl IntoResponse for GatewayError {
    /// Downstream failures are all reported as 500 with the downstream
    /// message, which the services already scrub of internal detail.
    fn into_response(self) -> Response {
        let code = self.status_code();
        let message = match &self {
            Self::Downstream { status } => {
                error!(
                    code = ?status.code(),
                    detail = status.message(),
                    "downstream call failed"
                );
                status.message().to_string()
            }
            _ if code.is_internal() => {
                error!(error = %self, "gateway request failed");
                self.output_msg()
            }
            _ => self.output_msg(),
        };
        error_body(code.http_status(), message)
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
