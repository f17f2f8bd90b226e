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
    routing::{get, post, put},
};
use carwash_api::pb::booking::v1::{
    CreateProviderRequest, DeleteByIdRequest, GetByIdRequest, ListProvidersResponse, ListRequest,
    Location, MessageResponse, Provider, SearchProvidersRequest, UpdateProviderRequest,
};
use serde::Deserialize;

use super::{Params, Payload, body, query};
use crate::{GatewayState, error::Result};

/// Flat query-string form of [`SearchProvidersRequest`].
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ProviderSearch {
    user_id:      String,
    company_name: String,
    city:         String,
    country:      String,
}

impl From<ProviderSearch> for SearchProvidersRequest {
    fn from(search: ProviderSearch) -> Self {
        let location = (!search.city.is_empty() || !search.country.is_empty()).then(|| Location {
            city:    search.city,
            country: search.country,
        });
        Self {
            user_id: search.user_id,
            company_name: search.company_name,
            location,
        }
    }
}

pub(crate) fn routes() -> Router<GatewayState> {
    Router::new()
        .route("/provider/create-provider", post(create_provider))
        .route("/provider/list-providers", get(list_providers))
        .route("/provider/update-provider", put(update_provider))
        .route("/provider/search-provider", get(search_providers))
        .route("/provider/{id}", get(get_provider).delete(delete_provider))
}

async fn create_provider(
    State(state): State<GatewayState>,
    payload: Payload<CreateProviderRequest>,
) -> Result<Json<Provider>> {
    let mut client = state.clients.booking.clone();
    Ok(Json(client.create_provider(body(payload)?).await?.into_inner()))
}

async fn list_providers(
    State(state): State<GatewayState>,
    params: Params<ListRequest>,
) -> Result<Json<ListProvidersResponse>> {
    let mut client = state.clients.booking.clone();
    Ok(Json(client.list_providers(query(params)?).await?.into_inner()))
}

async fn update_provider(
    State(state): State<GatewayState>,
    payload: Payload<UpdateProviderRequest>,
) -> Result<Json<Provider>> {
    let mut client = state.clients.booking.clone();
    Ok(Json(client.update_provider(body(payload)?).await?.into_inner()))
}

async fn search_providers(
    State(state): State<GatewayState>,
    params: Params<ProviderSearch>,
) -> Result<Json<ListProvidersResponse>> {
    let mut client = state.clients.booking.clone();
    let request = SearchProvidersRequest::from(query(params)?);
    Ok(Json(client.search_providers(request).await?.into_inner()))
}

async fn get_provider(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<Provider>> {
    let mut client = state.clients.booking.clone();
    Ok(Json(client.get_provider(GetByIdRequest { id }).await?.into_inner()))
}

async fn delete_provider(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let mut client = state.clients.booking.clone();
    Ok(Json(
        client
            .delete_provider(DeleteByIdRequest { id })
            .await?
            .into_inner(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_only_when_given() {
        let request = SearchProvidersRequest::from(ProviderSearch {
            company_name: "Shine".into(),
            ..Default::default()
        });
        assert!(request.location.is_none());

        let request = SearchProvidersRequest::from(ProviderSearch {
            city: "Tashkent".into(),
            ..Default::default()
        });
        assert_eq!(request.location.unwrap().city, "Tashkent");
    }
}
