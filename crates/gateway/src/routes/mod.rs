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

pub(crate) mod auth;
pub(crate) mod booking;
pub(crate) mod payment;
pub(crate) mod provider;
pub(crate) mod review;
pub(crate) mod service;

use axum::{
    Json,
    extract::{
        Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use carwash_broker::Queue;
use serde::Serialize;
use snafu::ResultExt;
use tracing::error;

use crate::{
    GatewayState,
    error::{EncodeEventSnafu, GatewayError, Result},
};

pub(crate) type Payload<T> = std::result::Result<Json<T>, JsonRejection>;
pub(crate) type Params<T> = std::result::Result<Query<T>, QueryRejection>;

pub(crate) fn body<T>(payload: Payload<T>) -> Result<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| GatewayError::InvalidRequest {
            reason: rejection.body_text(),
        })
}

pub(crate) fn query<T>(params: Params<T>) -> Result<T> {
    params
        .map(|Query(value)| value)
        .map_err(|rejection| GatewayError::InvalidRequest {
            reason: rejection.body_text(),
        })
}

/// Serializes `value` now and publishes it in the background. A failed
/// publish is logged and otherwise dropped.
pub(crate) fn publish_detached<T: Serialize>(
    state: &GatewayState,
    queue: Queue,
    value: &T,
) -> Result<()> {
    let body = serde_json::to_vec(value).context(EncodeEventSnafu { queue })?;
    let publisher = state.publisher.clone();
    tokio::spawn(async move {
        if let Err(err) = publisher.publish(queue, body).await {
            error!(%queue, error = %err, "failed to publish event");
        }
    });
    Ok(())
}

/// `202 Accepted` answer for work handed to `queue`.
pub(crate) fn queued(queue: Queue) -> Response {
    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "status": "queued", "queue": queue.as_ref() })),
    )
        .into_response()
}
