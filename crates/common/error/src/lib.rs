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

//! Error taxonomy shared by the gateway, auth and booking services.
//!
//! Every crate-level error enum carries a [`StatusCode`] per variant (as a
//! strum property) and implements [`ErrorExt`], so one error value renders
//! either as an HTTP status or as a gRPC status without a second mapping.

use std::{any::Any, error::Error as StdError, sync::Arc};

use http::StatusCode as HttpStatusCode;
use serde::Serialize;
use strum::EnumProperty;
use tonic::Code as TonicCode;

#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    Serialize,
    strum_macros::EnumProperty,
    strum_macros::EnumString,
    strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StatusCode {
    #[strum(props(http_status = "400", tonic_code = "3"))]
    InvalidArgument,
    #[strum(props(http_status = "404", tonic_code = "5"))]
    NotFound,
    #[strum(props(http_status = "401", tonic_code = "16"))]
    Unauthorized,
    #[strum(props(http_status = "403", tonic_code = "7"))]
    Forbidden,
    #[strum(props(http_status = "409", tonic_code = "6"))]
    Conflict,
    #[strum(props(http_status = "500", tonic_code = "13"))]
    Internal,
    #[strum(props(http_status = "500", tonic_code = "13"))]
    Unknown,
}

impl StatusCode {
    pub fn http_status(self) -> HttpStatusCode {
        self.get_str("http_status")
            .and_then(|value| value.parse::<u16>().ok())
            .and_then(|value| HttpStatusCode::from_u16(value).ok())
            .unwrap_or(HttpStatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn tonic_code(self) -> TonicCode {
        let value = self
            .get_str("tonic_code")
            .and_then(|value| value.parse::<i32>().ok())
            .unwrap_or(TonicCode::Internal as i32);
        TonicCode::from_i32(value)
    }

    /// Internal kinds hide their cause from clients.
    pub const fn is_internal(self) -> bool { matches!(self, Self::Internal | Self::Unknown) }
}

pub trait StackError: StdError {
    fn debug_fmt(&self, layer: usize, buf: &mut Vec<String>);

    fn next(&self) -> Option<&dyn StackError>;

    fn last(&self) -> &dyn StackError
    where
        Self: Sized,
    {
        let Some(mut result) = self.next() else {
            return self;
        };
        while let Some(err) = result.next() {
            result = err;
        }
        result
    }

    fn transparent(&self) -> bool { false }
}

pub trait ErrorExt: StackError {
    fn status_code(&self) -> StatusCode { StatusCode::Unknown }

    fn as_any(&self) -> &dyn Any;

    /// Client-facing message. Internal failures collapse to a generic text.
    fn output_msg(&self) -> String
    where
        Self: Sized,
    {
        if self.status_code().is_internal() {
            return format!("Internal error: {}", self.status_code() as u32);
        }
        let error = self.last();
        if let Some(external_error) = error.source() {
            let mut root = external_error;
            while let Some(source) = root.source() {
                root = source;
            }
            if error.transparent() {
                format!("{root}")
            } else {
                format!("{error}: {root}")
            }
        } else {
            format!("{error}")
        }
    }

    fn root_cause(&self) -> Option<&dyn StdError>
    where
        Self: Sized,
    {
        let error = self.last();
        let mut source = error.source()?;
        while let Some(next) = source.source() {
            source = next;
        }
        Some(source)
    }

    /// Renders the error as a gRPC status carrying the client-facing message.
    fn to_tonic_status(&self) -> tonic::Status
    where
        Self: Sized,
    {
        tonic::Status::new(self.status_code().tonic_code(), self.output_msg())
    }
}

impl<T: ?Sized + StackError> StackError for Arc<T> {
    fn debug_fmt(&self, layer: usize, buf: &mut Vec<String>) { self.as_ref().debug_fmt(layer, buf) }

    fn next(&self) -> Option<&dyn StackError> { self.as_ref().next() }
}

impl<T: StackError> StackError for Box<T> {
    fn debug_fmt(&self, layer: usize, buf: &mut Vec<String>) { self.as_ref().debug_fmt(layer, buf) }

    fn next(&self) -> Option<&dyn StackError> { self.as_ref().next() }
}

/// Derives [`StatusCode`] from a strum `status_code` property on an error
/// variant, falling back to [`StatusCode::Unknown`].
pub fn status_code_of<E: EnumProperty>(error: &E) -> StatusCode {
    error
        .get_str("status_code")
        .and_then(|value| value.parse().ok())
        .unwrap_or(StatusCode::Unknown)
}

#[cfg(test)]
mod tests {
    use snafu::Snafu;

    use super::*;

    #[derive(Debug, Snafu, strum_macros::EnumProperty)]
    enum TestError {
        #[snafu(display("Booking {id} not found"))]
        #[strum(props(status_code = "not_found"))]
        Missing { id: String },

        #[snafu(display("Database failure"))]
        #[strum(props(status_code = "internal"))]
        Database { source: std::io::Error },

        #[snafu(display("Unmapped"))]
        Unmapped,
    }

    impl StackError for TestError {
        fn debug_fmt(&self, layer: usize, buf: &mut Vec<String>) {
            buf.push(format!("{layer}: {self}"));
        }

        fn next(&self) -> Option<&dyn StackError> { None }
    }

    impl ErrorExt for TestError {
        fn status_code(&self) -> StatusCode { status_code_of(self) }

        fn as_any(&self) -> &dyn Any { self }
    }

    #[test]
    fn test_status_code_mappings() {
        assert_eq!(StatusCode::InvalidArgument.http_status(), 400);
        assert_eq!(StatusCode::Unauthorized.http_status(), 401);
        assert_eq!(StatusCode::Conflict.http_status(), 409);
        assert_eq!(StatusCode::Unknown.http_status(), 500);
        assert_eq!(StatusCode::NotFound.tonic_code(), TonicCode::NotFound);
        assert_eq!(StatusCode::Unauthorized.tonic_code(), TonicCode::Unauthenticated);
        assert_eq!(StatusCode::Conflict.tonic_code(), TonicCode::AlreadyExists);
        assert_eq!(StatusCode::Internal.tonic_code(), TonicCode::Internal);
    }

    #[test]
    fn test_output_msg_hides_internal_causes() {
        let err = TestError::Database {
            source: std::io::Error::other("disk on fire"),
        };
        assert_eq!(err.status_code(), StatusCode::Internal);
        assert!(!err.output_msg().contains("disk on fire"));

        let status = err.to_tonic_status();
        assert_eq!(status.code(), TonicCode::Internal);
    }

    #[test]
    fn test_output_msg_keeps_client_errors() {
        let err = TestError::Missing { id: "42".to_string() };
        assert_eq!(err.output_msg(), "Booking 42 not found");
        assert_eq!(err.to_tonic_status().code(), TonicCode::NotFound);
    }

    #[test]
    fn test_missing_property_is_unknown() {
        assert_eq!(TestError::Unmapped.status_code(), StatusCode::Unknown);
        assert_eq!(StatusCode::Unknown.to_string(), "unknown");
    }
}
