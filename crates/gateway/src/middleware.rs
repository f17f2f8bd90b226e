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

//! Authentication and authorization for gateway routes.

use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use carwash_token::bearer_token;
use tracing::debug;

use crate::{GatewayState, error::error_body};

/// Checks the caller's role against the casbin policy, then the token's signature
/// and expiry. On success the verified [`carwash_token::AccessClaims`] are
/// inserted into the request extensions.
pub async fn authorize(
    State(state): State<GatewayState>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(token) = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(bearer_token)
        .filter(|token| !token.is_empty())
    else {
        return error_body(StatusCode::UNAUTHORIZED, "authorization header is required");
    };

    let role = match state.tokens.peek_access(token) {
        Ok(claims) => claims.role,
        Err(err) => {
            debug!(error = %err, "rejecting undecodable token");
            return error_body(StatusCode::UNAUTHORIZED, "invalid token");
        }
    };

    let path = req.uri().path();
    let method = req.method().as_str();
    match state.policy.allows(&role, path, method) {
        Ok(true) => {}
        Ok(false) => {
            debug!(role = %role, path, method, "policy denied request");
            return error_body(StatusCode::UNAUTHORIZED, "You don't have permission");
        }
        Err(err) => return err.into_response(),
    }

    let claims = match state.tokens.verify_access(token) {
        Ok(claims) => claims,
        Err(err) => {
            return error_body(StatusCode::BAD_REQUEST, format!("invalid token: {err}"));
        }
    };

    req.extensions_mut().insert(claims);
    next.run(req).await
}
