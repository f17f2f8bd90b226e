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

//! Process wiring for the three carwash services.
//!
//! Each `start_*` function brings one service up and returns an [`AppHandle`]
//! that owns every server and background task it started. The `run_*`
//! functions add logging, the panic hook and signal handling around that for
//! use from the binary.

use std::sync::Arc;

use axum::Router;
pub use carwash_auth::AuthArgs;
use carwash_auth::{AuthConfig, AuthService, auth_routes};
pub use carwash_booking::BookingArgs;
use carwash_booking::{BookingConfig, BookingService, ConsumerHandle, start_consumers};
use carwash_broker::{Publisher, Subscriber, amqp::AmqpBroker};
use carwash_common_telemetry::{
    logging::{LogFormat, LoggingOptions, init_global_logging},
    panic_hook::set_panic_hook,
};
pub use carwash_gateway::GatewayArgs;
use carwash_gateway::{GatewayConfig, GatewayState, gateway_routes};
use carwash_server::{
    ServiceHandler,
    grpc::start_grpc_server,
    http::{health_routes, start_rest_server},
};
use snafu::{ResultExt, Whatever};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

type RouteFn = Box<dyn Fn(Router) -> Router + Send + Sync>;

/// Everything one service process started, in start order.
pub struct AppHandle {
    name:      &'static str,
    servers:   Vec<ServiceHandler>,
    consumers: Option<ConsumerHandle>,
    broker:    Option<Arc<AmqpBroker>>,
}

impl AppHandle {
    const fn new(name: &'static str) -> Self {
        Self {
            name,
            servers: Vec::new(),
            consumers: None,
            broker: None,
        }
    }

    pub const fn name(&self) -> &'static str { self.name }

    /// Resolves once every server has signalled that it is serving.
    pub async fn wait_for_start(&mut self) -> Result<(), Whatever> {
        for server in &mut self.servers {
            server
                .wait_for_start()
                .await
                .whatever_context("server failed to start")?;
        }
        Ok(())
    }

    /// Stops consumers first so no message is half handled when the servers
    /// go away, then the servers, then the broker connection.
    pub async fn shutdown(self) -> Result<(), Whatever> {
        info!(service = self.name, "shutting down");
        if let Some(consumers) = &self.consumers {
            consumers.shutdown();
            consumers.wait().await;
        }
        for server in &self.servers {
            server.shutdown();
        }
        for server in self.servers {
            server
                .wait_for_stop()
                .await
                .whatever_context("server did not stop cleanly")?;
        }
        if let Some(broker) = self.broker {
            if let Err(err) = broker.close().await {
                warn!(error = %err, "failed to close broker connection");
            }
        }
        info!(service = self.name, "shutdown complete");
        Ok(())
    }
}

/// Starts the auth gRPC server and its credential REST listener.
pub async fn start_auth(config: &AuthConfig) -> Result<AppHandle, Whatever> {
    let service = Arc::new(
        AuthService::open(config)
            .await
            .whatever_context("failed to open auth storage")?,
    );
    let mut handle = AppHandle::new("auth");
    handle.servers.push(
        start_grpc_server(config.grpc.clone(), vec![service.clone()])
            .await
            .whatever_context("failed to start auth gRPC server")?,
    );
    let routes: Vec<RouteFn> = vec![Box::new(auth_routes(service)), Box::new(health_routes)];
    handle.servers.push(
        start_rest_server(config.http.clone(), routes)
            .await
            .whatever_context("failed to start auth REST server")?,
    );
    Ok(handle)
}

/// Starts the booking gRPC server and the queue consumers, using `subscriber`
/// as the message source.
pub async fn start_booking_with(
    config: &BookingConfig,
    subscriber: &dyn Subscriber,
) -> Result<AppHandle, Whatever> {
    let store = config
        .open_store()
        .await
        .whatever_context("failed to open booking store")?;
    let service = Arc::new(BookingService::new(store));
    let mut handle = AppHandle::new("booking");
    handle.servers.push(
        start_grpc_server(config.grpc.clone(), vec![service.clone()])
            .await
            .whatever_context("failed to start booking gRPC server")?,
    );
    handle.consumers = Some(
        start_consumers(subscriber, service, CancellationToken::new())
            .await
            .whatever_context("failed to start queue consumers")?,
    );
    Ok(handle)
}

/// [`start_booking_with`] against the configured AMQP broker.
pub async fn start_booking(config: &BookingConfig) -> Result<AppHandle, Whatever> {
    let broker = Arc::new(
        AmqpBroker::connect(&config.amqp_url)
            .await
            .whatever_context("failed to connect to message broker")?,
    );
    let mut handle = start_booking_with(config, &*broker).await?;
    handle.broker = Some(broker);
    Ok(handle)
}

/// Starts the gateway REST server, publishing queue events to `publisher`.
pub async fn start_gateway_with(
    config: &GatewayConfig,
    publisher: Arc<dyn Publisher>,
) -> Result<AppHandle, Whatever> {
    let state = GatewayState::new(config, publisher)
        .await
        .whatever_context("invalid gateway setup")?;
    let mut handle = AppHandle::new("gateway");
    let routes: Vec<RouteFn> = vec![Box::new(gateway_routes(state)), Box::new(health_routes)];
    handle.servers.push(
        start_rest_server(config.http.clone(), routes)
            .await
            .whatever_context("failed to start gateway REST server")?,
    );
    Ok(handle)
}

/// [`start_gateway_with`] against the configured AMQP broker.
pub async fn start_gateway(config: &GatewayConfig) -> Result<AppHandle, Whatever> {
    let broker = Arc::new(
        AmqpBroker::connect(&config.amqp_url)
            .await
            .whatever_context("failed to connect to message broker")?,
    );
    let mut handle = start_gateway_with(config, broker.clone()).await?;
    handle.broker = Some(broker);
    Ok(handle)
}

/// Logging settings shared by every service command.
#[derive(clap::Args, Debug, Clone)]
pub struct LogArgs {
    /// Directory for rolling log files; unset logs to stdout only.
    #[arg(long, env = "LOG_DIR", global = true)]
    pub log_dir: Option<String>,

    /// Level filter such as `info` or `carwash_booking=debug`.
    #[arg(long, env = "LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// `text` or `json`.
    #[arg(long, env = "LOG_FORMAT", default_value = "text", global = true)]
    pub log_format: LogFormat,
}

impl From<LogArgs> for LoggingOptions {
    fn from(args: LogArgs) -> Self {
        Self::builder()
            .dir(args.log_dir.unwrap_or_default())
            .maybe_level(args.log_level)
            .log_format(args.log_format)
            .build()
    }
}

pub async fn run_auth(args: AuthArgs, log: LogArgs) -> Result<(), Whatever> {
    let config = AuthConfig::from(args);
    run("auth", log, async move { start_auth(&config).await }).await
}

pub async fn run_booking(args: BookingArgs, log: LogArgs) -> Result<(), Whatever> {
    let config = BookingConfig::from(args);
    run("booking", log, async move { start_booking(&config).await }).await
}

pub async fn run_gateway(args: GatewayArgs, log: LogArgs) -> Result<(), Whatever> {
    let config = GatewayConfig::from(args);
    run("gateway", log, async move { start_gateway(&config).await }).await
}

/// Sets up logging, starts the service and blocks until a shutdown signal
/// arrives.
async fn run(
    name: &'static str,
    log: LogArgs,
    start: impl Future<Output = Result<AppHandle, Whatever>>,
) -> Result<(), Whatever> {
    let _guards = init_global_logging(name, &LoggingOptions::from(log));
    set_panic_hook();

    info!(service = name, version = env!("CARGO_PKG_VERSION"), "starting");
    let mut handle = start.await?;
    handle.wait_for_start().await?;
    info!(service = name, "started");

    shutdown_signal().await;
    handle.shutdown().await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("Received Ctrl+C signal"); },
        () = terminate => { info!("Received terminate signal"); },
    }
}
