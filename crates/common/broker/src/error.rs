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

use std::any::Any;

use carwash_error::{ErrorExt, StackError, StatusCode, status_code_of};
use snafu::Snafu;

use crate::Queue;

#[derive(Debug, Snafu, strum_macros::EnumProperty)]
#[snafu(visibility(pub))]
pub enum BrokerError {
    #[snafu(display("Failed to connect to message broker at {uri}"))]
    #[strum(props(status_code = "internal"))]
    Connect { uri: String, source: lapin::Error },

    #[snafu(display("Failed to open broker channel"))]
    #[strum(props(status_code = "internal"))]
    Channel { source: lapin::Error },

    #[snafu(display("Failed to declare queue {queue}"))]
    #[strum(props(status_code = "internal"))]
    Declare { queue: Queue, source: lapin::Error },

    #[snafu(display("Failed to publish to queue {queue}"))]
    #[strum(props(status_code = "internal"))]
    Publish { queue: Queue, source: lapin::Error },

    #[snafu(display("Failed to consume queue {queue}"))]
    #[strum(props(status_code = "internal"))]
    Consume { queue: Queue, source: lapin::Error },

    #[snafu(display("Failed to settle delivery"))]
    #[strum(props(status_code = "internal"))]
    Settle { source: lapin::Error },

    #[snafu(display("Failed to encode message body"))]
    #[strum(props(status_code = "internal"))]
    Encode { source: serde_json::Error },

    #[snafu(display("Queue {queue} already has a consumer"))]
    #[strum(props(status_code = "conflict"))]
    AlreadySubscribed { queue: Queue },

    #[snafu(display("Queue {queue} is closed"))]
    #[strum(props(status_code = "internal"))]
    Closed { queue: Queue },
}

impl StackError for BrokerError {
    fn debug_fmt(&self, layer: usize, buf: &mut Vec<String>) {
        buf.push(format!("{layer}: {self}"));
    }

    fn next(&self) -> Option<&dyn StackError> { None }
}

impl ErrorExt for BrokerError {
    fn status_code(&self) -> StatusCode { status_code_of(self) }

    fn as_any(&self) -> &dyn Any { self }
}

pub type Result<T> = std::result::Result<T, BrokerError>;
