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
    CreateServiceRequest, DeleteByIdRequest, ListRequest, ListServicesResponse, MessageResponse,
    SearchServicesRequest, UpdateServiceRequest, WashService,
};

use super::{Params, Payload, body, query};
use crate::{GatewayState, error::Result};

pub(crate) fn routes() -> Router<GatewayState> {
    Router::new()
        .route("/service/create-service", post(create_service))
        .route("/service/list-service", get(list_services))
        .route("/service/update-service", put(update_service))
        .route("/service/delete-service/{id}", delete(delete_service))
        .route("/service/search-service", get(search_services))
}

async fn create_service(
    State(state): State<GatewayState>,
    payload: Payload<CreateServiceRequest>,
) -> Result<Json<WashService>> {
    let mut client = state.clients.booking.clone();
    Ok(Json(client.create_service(body(payload)?).await?.into_inner()))
}

async fn list_services(
    State(state): State<GatewayState>,
    params: Params<ListRequest>,
) -> Result<Json<ListServicesResponse>> {
    let mut client = state.clients.booking.clone();
    Ok(Json(client.list_services(query(params)?).await?.into_inner()))
}

async fn update_service(
    State(state): State<GatewayState>,
    payload: Payload<UpdateServiceRequest>,
) -> Result<Json<WashService>> {
    let mut client = state.clients.booking.clone();
    Ok(Json(client.update_service(body(payload)?).await?.into_inner()))
}

async fn delete_service(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let mut client = state.clients.booking.clone();
    Ok(Json(
        client
            .delete_service(DeleteByIdRequest { id })
            .await?
            .into_inner(),
    ))
}

async fn search_services(
    State(state): State<GatewayState>,
    params: Params<SearchServicesRequest>,
) -> Result<Json<ListServicesResponse>> {
    let mut client = state.clients.booking.clone();
    Ok(Json(client.search_services(query(params)?).await?.into_inner()))
}
