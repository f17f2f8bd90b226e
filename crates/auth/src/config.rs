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

use carwash_server::{grpc::GrpcServerConfig, http::RestServerConfig};
use carwash_token::TokenConfig;
use smart_default::SmartDefault;

/// Where refresh-token sessions live.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::EnumString, strum_macros::Display,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SessionBackend {
    #[default]
    Redis,
    Memory,
}

#[derive(Debug, Clone, SmartDefault, bon::Builder)]
#[builder(on(String, into))]
pub struct AuthConfig {
    #[default(_code = "GrpcServerConfig::builder().bind_address(\"0.0.0.0:50051\").build()")]
    #[builder(default = GrpcServerConfig::builder().bind_address("0.0.0.0:50051").build())]
    pub grpc:            GrpcServerConfig,
    #[default(_code = "RestServerConfig::builder().bind_address(\"0.0.0.0:8081\").build()")]
    #[builder(default = RestServerConfig::builder().bind_address("0.0.0.0:8081").build())]
    pub http:            RestServerConfig,
    #[default = "sqlite://auth.db?mode=rwc"]
    #[builder(default = "sqlite://auth.db?mode=rwc".to_string())]
    pub database_url:    String,
    #[builder(default)]
    pub session_backend: SessionBackend,
    #[default = "redis://127.0.0.1:6379/0"]
    #[builder(default = "redis://127.0.0.1:6379/0".to_string())]
    pub redis_url:       String,
    #[builder(default)]
    pub tokens:          TokenConfig,
    #[default = 12]
    #[builder(default = bcrypt::DEFAULT_COST)]
    pub bcrypt_cost:     u32,
}

/// Auth service settings, read from flags or the environment.
#[derive(clap::Args, Debug, Clone)]
pub struct AuthArgs {
    /// gRPC listen address.
    #[arg(long, env = "AUTH_GRPC_ADDR", default_value = "0.0.0.0:50051")]
    pub grpc_addr: String,

    /// REST listen address for `/auth/*`.
    #[arg(long, env = "AUTH_HTTP_ADDR", default_value = "0.0.0.0:8081")]
    pub http_addr: String,

    /// SQLite database holding the users table.
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://auth.db?mode=rwc")]
    pub database_url: String,

    /// Refresh-token session store: `redis` or `memory`.
    #[arg(long, env = "SESSION_STORE", default_value_t = SessionBackend::Redis)]
    pub session_store: SessionBackend,

    #[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6379/0")]
    pub redis_url: String,

    /// HS256 key for access tokens; must match the gateway's.
    #[arg(long, env = "ACCESS_TOKEN_KEY", default_value = "key", hide_env_values = true)]
    pub access_token_key: String,

    /// HS256 key for refresh tokens.
    #[arg(long, env = "REFRESH_TOKEN_KEY", default_value = "key", hide_env_values = true)]
    pub refresh_token_key: String,

    /// bcrypt work factor for new password hashes.
    #[arg(long, env = "BCRYPT_COST", default_value_t = bcrypt::DEFAULT_COST)]
    pub bcrypt_cost: u32,
}

impl From<AuthArgs> for AuthConfig {
    fn from(args: AuthArgs) -> Self {
        Self {
            grpc:            GrpcServerConfig::builder()
                .bind_address(args.grpc_addr)
                .build(),
            http:            RestServerConfig::builder()
                .bind_address(args.http_addr)
                .build(),
            database_url:    args.database_url,
            session_backend: args.session_store,
            redis_url:       args.redis_url,
            tokens:          TokenConfig::builder()
                .access_key(args.access_token_key)
                .refresh_key(args.refresh_token_key)
                .build(),
            bcrypt_cost:     args.bcrypt_cost,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = AuthConfig::default();
        assert_eq!(config.grpc.bind_address, "0.0.0.0:50051");
        assert_eq!(config.http.bind_address, "0.0.0.0:8081");
        assert_eq!(config.session_backend, SessionBackend::Redis);
        assert_eq!(config.bcrypt_cost, 12);

        let built = AuthConfig::builder().build();
        assert_eq!(built.database_url, config.database_url);
        assert_eq!(built.bcrypt_cost, config.bcrypt_cost);
    }

    #[derive(clap::Parser)]
    struct Cli {
        #[command(flatten)]
        args: AuthArgs,
    }

    #[test]
    fn test_args_build_config() {
        let cli = Cli::try_parse_from([
            "auth",
            "--grpc-addr",
            "127.0.0.1:6000",
            "--session-store",
            "MEMORY",
            "--bcrypt-cost",
            "4",
            "--access-token-key",
            "shared",
        ])
        .unwrap();
        let config = AuthConfig::from(cli.args);
        assert_eq!(config.grpc.bind_address, "127.0.0.1:6000");
        assert_eq!(config.session_backend, SessionBackend::Memory);
        assert_eq!(config.bcrypt_cost, 4);
        assert_eq!(config.tokens.access_key.as_bytes(), b"shared");
    }

    #[test]
    fn test_args_reject_bad_values() {
        assert!(Cli::try_parse_from(["auth", "--session-store", "etcd"]).is_err());
        assert!(Cli::try_parse_from(["auth", "--bcrypt-cost", "many"]).is_err());
    }

    #[test]
    fn test_session_backend_parse() {
        assert_eq!(
            "memory".parse::<SessionBackend>().unwrap(),
            SessionBackend::Memory
        );
        assert_eq!(
            "REDIS".parse::<SessionBackend>().unwrap(),
            SessionBackend::Redis
        );
        assert!("etcd".parse::<SessionBackend>().is_err());
    }
}
