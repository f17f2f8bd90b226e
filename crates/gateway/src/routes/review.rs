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

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post, put},
};
use carwash_api::pb::booking::v1::{
    CreateReviewRequest, DeleteByIdRequest, ListRequest, ListReviewsResponse, MessageResponse,
    Review, UpdateReviewRequest,
};
use carwash_broker::Queue;

use super::{Params, Payload, body, publish_detached, query};
use crate::{GatewayState, error::Result};

pub(crate) fn routes() -> Router<GatewayState> {
    Router::new()
        .route("/review/create-review", post(create_review))
        .route("/review/list-review", get(list_reviews))
        .route("/review/update-review", put(update_review))
        .route("/review/delete-review/{id}", delete(delete_review))
}

async fn create_review(
    State(state): State<GatewayState>,
    payload: Payload<CreateReviewRequest>,
) -> Result<Json<Review>> {
    let mut client = state.clients.booking.clone();
    let review = client.create_review(body(payload)?).await?.into_inner();
    publish_detached(&state, Queue::ReviewSubmitted, &review)?;
    Ok(Json(review))
}

async fn list_reviews(
    State(state): State<GatewayState>,
    params: Params<ListRequest>,
) -> Result<Json<ListReviewsResponse>> {
    let mut client = state.clients.booking.clone();
    Ok(Json(client.list_reviews(query(params)?).await?.into_inner()))
}

async fn update_review(
    State(state): State<GatewayState>,
    payload: Payload<UpdateReviewRequest>,
) -> Result<Json<Review>> {
    let mut client = state.clients.booking.clone();
    Ok(Json(client.update_review(body(payload)?).await?.into_inner()))
}

async fn delete_review(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let mut client = state.clients.booking.clone();
    Ok(Json(
        client
            .delete_review(DeleteByIdRequest { id })
            .await?
            .into_inner(),
    ))
}
