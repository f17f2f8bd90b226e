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
    routing::{delete, get, put},
};
use carwash_api::pb::auth::v1::{
    DeleteProfileRequest, GetProfileRequest, ListProfilesRequest, ListProfilesResponse,
    MessageResponse, Profile, UpdateProfileRequest,
};

use super::{Params, Payload, body, query};
use crate::{GatewayState, error::Result};

pub(crate) fn routes() -> Router<GatewayState> {
    Router::new()
        .route("/auth/profiles", get(list_profiles))
        .route("/auth/update-profile", put(update_profile))
        .route("/auth/delete-profile/{id}", delete(delete_profile))
        .route("/auth/{id}", get(get_profile))
}

async fn list_profiles(
    State(state): State<GatewayState>,
    params: Params<ListProfilesRequest>,
) -> Result<Json<ListProfilesResponse>> {
    let mut client = state.clients.auth.clone();
    Ok(Json(client.list_profiles(query(params)?).await?.into_inner()))
}

async fn get_profile(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<Profile>> {
    let mut client = state.clients.auth.clone();
    Ok(Json(
        client
            .get_profile(GetProfileRequest { id })
            .await?
            .into_inner(),
    ))
}

async fn update_profile(
    State(state): State<GatewayState>,
    payload: Payload<UpdateProfileRequest>,
) -> Result<Json<Profile>> {
    let mut client = state.clients.auth.clone();
    Ok(Json(client.update_profile(body(payload)?).await?.into_inner()))
}

async fn delete_profile(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let mut client = state.clients.auth.clone();
    Ok(Json(
        client
            .delete_profile(DeleteProfileRequest { id })
            .await?
            .into_inner(),
    ))
}
