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

use carwash_broker::{BrokerError, Queue};
use carwash_error::{ErrorExt, StackError, StatusCode, status_code_of};
use snafu::Snafu;

#[derive(Debug, Snafu, strum_macros::EnumProperty)]
#[snafu(visibility(pub))]
pub enum BookingError {
    #[snafu(display("Invalid id {id:?}"))]
    #[strum(props(status_code = "invalid_argument"))]
    InvalidId { id: String },

    #[snafu(display("{kind} {id} not found"))]
    #[strum(props(status_code = "not_found"))]
    NotFound { kind: &'static str, id: String },

    #[snafu(display("Malformed message on {queue}"))]
    #[strum(props(status_code = "invalid_argument"))]
    InvalidMessage {
        queue:  Queue,
        source: serde_json::Error,
    },

    #[snafu(display("No booking handler consumes {queue}"))]
    #[strum(props(status_code = "internal"))]
    UnconsumedQueue { queue: Queue },

    #[snafu(display("Handler for {queue} rejected the message: {status}"))]
    #[strum(props(status_code = "internal"))]
    Rejected { queue: Queue, status: tonic::Status },

    #[snafu(display("Document store error"))]
    #[strum(props(status_code = "internal"))]
    Mongo { source: mongodb::error::Error },

    #[snafu(display("Failed to encode document"))]
    #[strum(props(status_code = "internal"))]
    EncodeDocument {
        source: mongodb::bson::ser::Error,
    },

    #[snafu(display("Failed to decode document"))]
    #[strum(props(status_code = "internal"))]
    DecodeDocument {
        source: mongodb::bson::de::Error,
    },

    #[snafu(transparent)]
    Broker { source: BrokerError },
}

impl StackError for BookingError {
    fn debug_fmt(&self, layer: usize, buf: &mut Vec<String>) {
        buf.push(format!("{layer}: {self}"));
        if let Some(next) = self.next() {
            next.debug_fmt(layer + 1, buf);
        }
    }

    fn next(&self) -> Option<&dyn StackError> {
        match self {
            Self::Broker { source } => Some(source),
            _ => None,
        }
    }

    fn transparent(&self) -> bool { matches!(self, Self::Broker { .. }) }
}

impl ErrorExt for BookingError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Broker { source } => source.status_code(),
            _ => status_code_of(self),
        }
    }

    fn as_any(&self) -> &dyn Any { self }
}

impl From<BookingError> for tonic::Status {
    fn from(err: BookingError) -> Self {
        if err.status_code().is_internal() {
            tracing::error!(error = ?err, "booking request failed");
        }
        err.to_tonic_status()
    }
}

pub type Result<T> = std::result::Result<T, BookingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let status = tonic::Status::from(BookingError::InvalidId { id: "zz".into() });
        assert_eq!(status.code(), tonic::Code::InvalidArgument);

        let status = tonic::Status::from(BookingError::NotFound {
            kind: "booking",
            id:   "66f0c0ffee0000000000beef".into(),
        });
        assert_eq!(status.code(), tonic::Code::NotFound);
        assert!(status.message().contains("booking"));
    }
}
