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
    response::Response,
    routing::{get, post, put},
};
use carwash_api::pb::booking::v1::{
    BookingRecord, CancelBookingRequest, CreateBookingRequest, GetByIdRequest,
    ListBookingsResponse, ListRequest, UpdateBookingRequest,
};
use carwash_broker::Queue;

use super::{Params, Payload, body, publish_detached, query, queued};
use crate::{GatewayState, error::Result};

pub(crate) fn routes() -> Router<GatewayState> {
    Router::new()
        .route("/booking/create-booking", post(create_booking))
        .route("/booking/list-bookings", get(list_bookings))
        .route("/booking/update-booking", put(update_booking))
        .route("/booking/{id}", get(get_booking).delete(cancel_booking))
}

async fn create_booking(
    State(state): State<GatewayState>,
    payload: Payload<CreateBookingRequest>,
) -> Result<Response> {
    publish_detached(&state, Queue::CreateBooking, &body(payload)?)?;
    Ok(queued(Queue::CreateBooking))
}

async fn cancel_booking(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Response> {
    publish_detached(&state, Queue::BookingCancelled, &CancelBookingRequest { id })?;
    Ok(queued(Queue::BookingCancelled))
}

async fn list_bookings(
    State(state): State<GatewayState>,
    params: Params<ListRequest>,
) -> Result<Json<ListBookingsResponse>> {
    let mut client = state.clients.booking.clone();
    Ok(Json(client.list_bookings(query(params)?).await?.into_inner()))
}

async fn get_booking(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<BookingRecord>> {
    let mut client = state.clients.booking.clone();
    Ok(Json(client.get_booking(GetByIdRequest { id }).await?.into_inner()))
}

async fn update_booking(
    State(state): State<GatewayState>,
    payload: Payload<UpdateBookingRequest>,
) -> Result<Json<BookingRecord>> {
    let mut client = state.clients.booking.clone();
    Ok(Json(client.update_booking(body(payload)?).await?.into_inner()))
}
