use std::process::ExitCode;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use octranspo::client::OcTranspo;
use octranspo::domain::{RouteNo, StopNo};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Get credentials from environment
    let app_id = std::env::var("OCTRANSPO_APP_ID").unwrap_or_else(|_| {
        eprintln!("Warning: OCTRANSPO_APP_ID not set. API calls will fail.");
        String::new()
    });
    let app_key = std::env::var("OCTRANSPO_API_KEY").unwrap_or_else(|_| {
        eprintln!("Warning: OCTRANSPO_API_KEY not set. API calls will fail.");
        String::new()
    });

    // Parse the stop and optional route filter from the command line
    let mut args = std::env::args().skip(1);
    let Some(stop_arg) = args.next() else {
        eprintln!("Usage: octranspo <stop-no> [route-no ...]");
        return ExitCode::FAILURE;
    };

    let stop = match StopNo::parse(&stop_arg) {
        Ok(stop) => stop,
        Err(e) => {
            eprintln!("{stop_arg}: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut routes = Vec::new();
    for arg in args {
        match RouteNo::parse(&arg) {
            Ok(route) => routes.push(route),
            Err(e) => {
                eprintln!("{arg}: {e}");
                return ExitCode::FAILURE;
            }
        }
    }
    let route_filter = if routes.is_empty() {
        None
    } else {
        Some(routes.as_slice())
    };

    let client = OcTranspo::new(app_id, app_key).expect("Failed to create feed client");

    match client
        .simple_get_next_trips_for_stop(stop, route_filter, None)
        .await
    {
        Ok(trips) => match serde_json::to_string_pretty(&trips) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Failed to serialize trips: {e}");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
