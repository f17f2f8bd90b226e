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

//! JSON error bodies for REST handlers.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use carwash_error::{ErrorExt, StatusCode};
use serde::Serialize;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code:    StatusCode,
    pub message: String,
}

/// Renders `err` as `{"code": .., "message": ..}` with the HTTP status of its
/// kind. Internal errors are logged here since their cause never reaches the
/// client.
pub fn error_response<E: ErrorExt>(err: &E) -> Response {
    let code = err.status_code();
    if code.is_internal() {
        error!(error = %err, "request failed");
    }
    let body = Json(ErrorBody {
        code,
        message: err.output_msg(),
    });
    (code.http_status(), body).into_response()
}
