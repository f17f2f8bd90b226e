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

use carwash_app::{AuthArgs, BookingArgs, GatewayArgs, LogArgs};
use clap::{Parser, Subcommand};
use snafu::Whatever;

mod build_info;

#[derive(Debug, Parser)]
#[clap(
name = "carwash",
about= "carwash booking platform services",
author = build_info::AUTHOR,
version = build_info::FULL_VERSION)]
struct Cli {
    #[command(flatten)]
    log: LogArgs,

    #[command(subcommand)]
    commands: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(long_about = r"

Starts the auth service: user gRPC API plus the credential REST listener.
Every flag can also be set through the environment variable shown with it.
Examples:

carwash auth --session-store memory

")]
    Auth(AuthArgs),

    #[command(long_about = r"

Starts the booking service: booking gRPC API plus the queue consumers.
Every flag can also be set through the environment variable shown with it.
Examples:

carwash booking --store memory

")]
    Booking(BookingArgs),

    #[command(long_about = r"

Starts the REST gateway in front of the auth and booking services.
Every flag can also be set through the environment variable shown with it.
Examples:

carwash gateway --policy-file ./policy.csv

")]
    Gateway(GatewayArgs),
}

#[tokio::main]
async fn main() -> Result<(), Whatever> {
    // `.env` has to be merged before clap reads the environment.
    carwash_base::env::load_dotenv();
    let cli = Cli::parse();
    match cli.commands {
        Commands::Auth(args) => carwash_app::run_auth(args, cli.log).await,
        Commands::Booking(args) => carwash_app::run_booking(args, cli.log).await,
        Commands::Gateway(args) => carwash_app::run_gateway(args, cli.log).await,
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_is_well_formed() { Cli::command().debug_assert(); }

    #[test]
    fn test_subcommands_parse() {
        let cli = Cli::try_parse_from(["carwash", "gateway"]).unwrap();
        assert!(matches!(cli.commands, Commands::Gateway(_)));
        assert!(Cli::try_parse_from(["carwash", "server"]).is_err());
    }

    #[test]
    fn test_service_flags_reach_subcommand() {
        let cli = Cli::try_parse_from([
            "carwash",
            "booking",
            "--store",
            "memory",
            "--log-format",
            "json",
        ])
        .unwrap();
        let Commands::Booking(args) = cli.commands else {
            panic!("expected booking");
        };
        assert_eq!(args.store.to_string(), "memory");
        assert_eq!(cli.log.log_format.to_string().to_lowercase(), "json");
    }

    #[test]
    fn test_flags_belong_to_their_service() {
        assert!(Cli::try_parse_from(["carwash", "auth", "--policy-file", "p.csv"]).is_err());
        assert!(Cli::try_parse_from(["carwash", "gateway", "--bcrypt-cost", "4"]).is_err());
    }
}
