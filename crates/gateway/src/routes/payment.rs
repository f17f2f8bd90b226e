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
    CreatePaymentRequest, DeleteByIdRequest, GetByIdRequest, ListPaymentsResponse, ListRequest,
    MessageResponse, Payment, UpdatePaymentRequest,
};
use carwash_broker::Queue;

use super::{Params, Payload, body, publish_detached, query};
use crate::{GatewayState, error::Result};

pub(crate) fn routes() -> Router<GatewayState> {
    Router::new()
        .route("/payment/create-payment", post(create_payment))
        .route("/payment/update-payment", put(update_payment))
        .route("/payment/delete-payment/{id}", delete(delete_payment))
        .route("/payment/list-payments", get(list_payments))
        .route("/payment/{id}", get(get_payment))
}

async fn create_payment(
    State(state): State<GatewayState>,
    payload: Payload<CreatePaymentRequest>,
) -> Result<Json<Payment>> {
    let mut client = state.clients.booking.clone();
    let payment = client.create_payment(body(payload)?).await?.into_inner();
    publish_detached(&state, Queue::PaymentProcessed, &payment)?;
    Ok(Json(payment))
}

async fn update_payment(
    State(state): State<GatewayState>,
    payload: Payload<UpdatePaymentRequest>,
) -> Result<Json<Payment>> {
    let mut client = state.clients.booking.clone();
    Ok(Json(client.update_payment(body(payload)?).await?.into_inner()))
}

async fn delete_payment(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let mut client = state.clients.booking.clone();
    Ok(Json(
        client
            .delete_payment(DeleteByIdRequest { id })
            .await?
            .into_inner(),
    ))
}

async fn list_payments(
    State(state): State<GatewayState>,
    params: Params<ListRequest>,
) -> Result<Json<ListPaymentsResponse>> {
    let mut client = state.clients.booking.clone();
    Ok(Json(client.list_payments(query(params)?).await?.into_inner()))
}

async fn get_payment(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<Payment>> {
    let mut client = state.clients.booking.clone();
    Ok(Json(client.get_payment(GetByIdRequest { id }).await?.into_inner()))
}
