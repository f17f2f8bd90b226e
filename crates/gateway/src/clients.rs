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

use carwash_api::pb::{
    auth::v1::auth_client::AuthClient, booking::v1::booking_client::BookingClient,
};
use snafu::ResultExt;
use tonic::transport::{Channel, Endpoint};

use crate::error::{InvalidUrlSnafu, Result};

/// gRPC clients for the downstream services. Channels connect lazily, so the
/// gateway starts even when a service is not up yet; calls made meanwhile fail
/// with `Unavailable`.
#[derive(Debug, Clone)]
pub struct Clients {
    pub auth:    AuthClient<Channel>,
    pub booking: BookingClient<Channel>,
}

impl Clients {
    pub fn connect_lazy(auth_url: &str, booking_url: &str) -> Result<Self> {
        Ok(Self {
            auth:    AuthClient::new(lazy_channel(auth_url)?),
            booking: BookingClient::new(lazy_channel(booking_url)?),
        })
    }
}

fn lazy_channel(url: &str) -> Result<Channel> {
    Ok(Endpoint::from_shared(url.to_string())
        .context(InvalidUrlSnafu { url })?
        .connect_lazy())
}
