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

//! Generated protobuf types and gRPC stubs shared by every carwash service.

#[allow(clippy::all, clippy::pedantic, clippy::nursery)]
pub mod pb {
    /// Encoded file descriptor set for gRPC reflection.
    pub const GRPC_DESC: &[u8] = tonic::include_file_descriptor_set!("carwash_grpc_desc");

    pub mod auth {
        pub mod v1 {
            tonic::include_proto!("carwash.auth.v1");
        }
    }

    pub mod booking {
        pub mod v1 {
            tonic::include_proto!("carwash.booking.v1");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::pb::booking::v1::{CreateBookingRequest, Location};

    #[test]
    fn test_missing_json_fields_fall_back_to_defaults() {
        let req: CreateBookingRequest =
            serde_json::from_str(r#"{"user_id":"u1","location":{"city":"Tashkent"}}"#).unwrap();
        assert_eq!(req.user_id, "u1");
        assert_eq!(req.total_price, 0.0);
        assert!(req.scheduled_time.is_none());
        assert_eq!(
            req.location,
            Some(Location {
                city:    "Tashkent".to_string(),
                country: String::new(),
            })
        );
    }

    #[test]
    fn test_descriptor_set_is_embedded() {
        assert!(!super::pb::GRPC_DESC.is_empty());
    }
}
