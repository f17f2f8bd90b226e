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

//! The booking service: document-store CRUD over gRPC plus the queue
//! consumers that create and cancel bookings asynchronously.

pub mod config;
pub mod consumer;
pub mod error;
pub mod model;
pub mod service;
pub mod store;

pub use config::{BookingArgs, BookingConfig, StoreBackend};
pub use consumer::{ConsumerHandle, start_consumers};
pub use error::{BookingError, Result};
pub use service::BookingService;
pub use store::{BookingStore, MemoryStore, MongoStore, Page};
