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

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use snafu::ResultExt;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tonic::{service::RoutesBuilder, transport::Server};
use tonic_health::server::HealthReporter;
use tonic_reflection::server::v1::{ServerReflection, ServerReflectionServer};
use tracing::info;

use crate::{ParseAddressSnafu, ReflectionSnafu, Result, ServiceHandler};

/// Default maximum gRPC receiving message size (4 MB)
pub const DEFAULT_MAX_GRPC_RECV_MESSAGE_SIZE: usize = 4 * 1024 * 1024;
/// Default maximum gRPC sending message size (4 MB)
pub const DEFAULT_MAX_GRPC_SEND_MESSAGE_SIZE: usize = 4 * 1024 * 1024;

/// Configuration options for a gRPC server
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, SmartDefault, bon::Builder)]
pub struct GrpcServerConfig {
    /// The address to bind the gRPC server
    #[default = "127.0.0.1:50051"]
    #[builder(into)]
    pub bind_address:          String,
    /// Maximum gRPC receiving (decoding) message size in bytes
    #[default(_code = "DEFAULT_MAX_GRPC_RECV_MESSAGE_SIZE")]
    #[builder(default = DEFAULT_MAX_GRPC_RECV_MESSAGE_SIZE)]
    pub max_recv_message_size: usize,
    /// Maximum gRPC sending (encoding) message size in bytes
    #[default(_code = "DEFAULT_MAX_GRPC_SEND_MESSAGE_SIZE")]
    #[builder(default = DEFAULT_MAX_GRPC_SEND_MESSAGE_SIZE)]
    pub max_send_message_size: usize,
}

/// A gRPC service that can be mounted on the shared server.
///
/// The server owns reflection, health checking and graceful shutdown; an
/// implementation only wraps itself in its generated tonic server and reports
/// its own readiness.
#[async_trait]
pub trait GrpcServiceHandler: Send + Sync + 'static {
    /// The name of the service for logging and identification purposes
    fn service_name(&self) -> &'static str;
    /// The compiled protobuf file descriptor set used for gRPC reflection
    fn file_descriptor_set(&self) -> &'static [u8];
    /// Wraps the implementation in its generated server, applying the message
    /// size limits from `config`, and adds it to the builder.
    fn register_service(self: &Arc<Self>, builder: &mut RoutesBuilder, config: &GrpcServerConfig);
    /// Called once the service is registered to publish its health status.
    async fn readiness_reporting(
        self: &Arc<Self>,
        _cancellation_token: CancellationToken,
        health_reporter: HealthReporter,
    ) {
        health_reporter
            .set_service_status("", tonic_health::ServingStatus::Serving)
            .await;
    }
}

/// Starts the gRPC server in a background task with health and reflection
/// services mounted next to `services`.
///
/// # Errors
/// Returns an error if the bind address cannot be parsed or the descriptor
/// sets are malformed.
pub async fn start_grpc_server(
    config: GrpcServerConfig,
    services: Vec<Arc<impl GrpcServiceHandler>>,
) -> Result<ServiceHandler> {
    let bind_addr = config
        .bind_address
        .parse::<std::net::SocketAddr>()
        .context(ParseAddressSnafu {
            addr: config.bind_address.clone(),
        })?;

    let reflection_service = {
        let mut file_descriptor_sets = Vec::new();
        for service in &services {
            file_descriptor_sets.push(service.file_descriptor_set());
        }
        file_descriptor_sets.push(tonic_reflection::pb::v1::FILE_DESCRIPTOR_SET);
        build_reflection_service(&file_descriptor_sets)?
    };

    let (reporter, health_service) = tonic_health::server::health_reporter();
    let mut routes_builder = RoutesBuilder::default();
    routes_builder
        .add_service(health_service)
        .add_service(reflection_service);

    for service in &services {
        info!("registering gRPC service {}", service.service_name());
        service.register_service(&mut routes_builder, &config);
    }

    let cancellation_token = CancellationToken::new();
    let (join_handle, started_rx) = {
        let (started_tx, started_rx) = oneshot::channel::<()>();
        let cancellation_token_clone = cancellation_token.clone();
        let join_handle = tokio::spawn(async move {
            let result = Server::builder()
                .add_routes(routes_builder.routes())
                .serve_with_shutdown(bind_addr, async move {
                    let _ = started_tx.send(());
                    info!("gRPC server (on {}) started", bind_addr);
                    cancellation_token_clone.cancelled().await;
                    info!("gRPC server (on {}) received shutdown signal", bind_addr);
                })
                .await;

            info!(
                "gRPC server (on {}) task completed: {:?}",
                bind_addr, result
            );
        });
        (join_handle, started_rx)
    };

    let reporter_handles = services
        .iter()
        .map(|service| {
            let service = service.clone();
            let reporter = reporter.clone();
            let cancellation_token_clone = cancellation_token.clone();
            tokio::spawn(async move {
                service
                    .readiness_reporting(cancellation_token_clone, reporter)
                    .await;
                info!(
                    "readiness reporting task for {} completed",
                    service.service_name()
                );
            })
        })
        .collect();

    Ok(ServiceHandler {
        join_handle,
        cancellation_token,
        started_rx: Some(started_rx),
        reporter_handles,
    })
}

fn build_reflection_service(
    file_descriptor_sets: &[&[u8]],
) -> Result<ServerReflectionServer<impl ServerReflection>> {
    let mut builder = tonic_reflection::server::Builder::configure();

    for file_descriptor_set in file_descriptor_sets {
        builder = builder.register_encoded_file_descriptor_set(file_descriptor_set);
    }
    builder.build_v1().context(ReflectionSnafu)
}
