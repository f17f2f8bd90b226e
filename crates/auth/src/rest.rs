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

//! Credential routes served by the auth service's own HTTP listener.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use carwash_api::pb::auth::v1::{Profile, RegisterRequest};
use carwash_token::Tokens;
use serde::{Deserialize, Serialize};

use crate::{
    error::{AuthError, Result},
    service::AuthService,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email:    String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

/// Mounts `/auth/{register,login,logout,refresh}` onto `router`.
pub fn auth_routes(service: Arc<AuthService>) -> impl Fn(Router) -> Router + Send + Sync + 'static {
    move |router: Router| {
        router.merge(
            Router::new()
                .route("/auth/register", post(register))
                .route("/auth/login", post(login))
                .route("/auth/logout", post(logout))
                .route("/auth/refresh", post(refresh))
                .with_state(service.clone()),
        )
    }
}

fn body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AuthError::InvalidRequest {
            reason: rejection.body_text(),
        })
}

async fn register(
    State(service): State<Arc<AuthService>>,
    payload: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<Profile>> {
    Ok(Json(service.register(body(payload)?).await?))
}

async fn login(
    State(service): State<Arc<AuthService>>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Tokens>> {
    let req = body(payload)?;
    Ok(Json(service.login(&req.email, &req.password).await?))
}

async fn logout(
    State(service): State<Arc<AuthService>>,
    payload: std::result::Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> Result<Json<MessageBody>> {
    service.logout(&body(payload)?.refresh_token).await?;
    Ok(Json(MessageBody {
        message: "logged out".to_string(),
    }))
}

async fn refresh(
    State(service): State<Arc<AuthService>>,
    payload: std::result::Result<Json<RefreshTokenRequest>, JsonRejection>,
) -> Result<Json<Tokens>> {
    Ok(Json(service.refresh(&body(payload)?.refresh_token).await?))
}
