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

//! REST front door for the carwash services.
//!
//! Every route except the health endpoints passes through [`authorize`], then
//! maps one-to-one onto a gRPC call against the auth or booking service.
//! Booking creation and cancellation are handed to the message queue instead
//! and answered with `202 Accepted`.

pub mod clients;
pub mod config;
pub mod error;
pub mod middleware;
pub mod policy;
mod routes;

use std::sync::Arc;

use axum::Router;
use carwash_broker::Publisher;
use carwash_token::TokenManager;

pub use crate::{
    clients::Clients,
    config::{GatewayArgs, GatewayConfig},
    error::{GatewayError, Result},
    middleware::authorize,
    policy::Policy,
};

/// Shared handler state. Cloned per request; every field is a handle.
#[derive(Clone)]
pub struct GatewayState {
    pub clients:   Clients,
    pub publisher: Arc<dyn Publisher>,
    pub tokens:    Arc<TokenManager>,
    pub policy:    Arc<Policy>,
}

impl GatewayState {
    /// Builds the state from `config`, loading the policy table and preparing
    /// lazy downstream channels.
    pub async fn new(config: &GatewayConfig, publisher: Arc<dyn Publisher>) -> Result<Self> {
        Ok(Self {
            clients: Clients::connect_lazy(&config.auth_service_url, &config.booking_service_url)?,
            publisher,
            tokens: Arc::new(TokenManager::new(config.tokens.clone())),
            policy: Arc::new(Policy::load(config.policy_file.as_deref()).await?),
        })
    }
}

/// All gateway routes behind the policy middleware.
pub fn gateway_router(state: GatewayState) -> Router {
    Router::new()
        .merge(routes::auth::routes())
        .merge(routes::booking::routes())
        .merge(routes::payment::routes())
        .merge(routes::provider::routes())
        .merge(routes::service::routes())
        .merge(routes::review::routes())
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            authorize,
        ))
        .with_state(state)
}

/// Route handler for `carwash_server::http::start_rest_server`.
pub fn gateway_routes(state: GatewayState) -> impl Fn(Router) -> Router + Send + Sync + 'static {
    move |router: Router| router.merge(gateway_router(state.clone()))
}
