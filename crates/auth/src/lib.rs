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

//! The authentication service: user registration and profiles over gRPC,
//! credential exchange over REST.

pub mod config;
pub mod error;
mod grpc;
pub mod password;
pub mod repository;
pub mod rest;
pub mod service;
pub mod session;

pub use config::{AuthArgs, AuthConfig, SessionBackend};
pub use error::{AuthError, Result};
pub use rest::auth_routes;
pub use service::AuthService;
