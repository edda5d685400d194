//! Coordinator gateway: entry point.
//!
//! Settings come from defaults, the file named by `COORDINATOR_CONFIG` and
//! `COORDINATOR__SECTION__KEY` environment variables, in that order.
//!
//! | Variable | Example | Effect |
//! |----------|---------|--------|
//! | `COORDINATOR_CONFIG` | `/etc/coordinator.yaml` | Settings file (YAML, TOML or JSON). |
//! | `COORDINATOR__SERVER__PORT` | `8080` | Listen port. |
//! | `COORDINATOR__DECISION__ENGINE` | `remote` | Decision engine. |
//! | `COORDINATOR__DECISION__URL` | `http://ranker:7000/decide` | Remote engine URL. |
//! | `RUST_LOG` | `coordinator_gateway=debug` | Overrides `logging.filter`. |

use coordinator_gateway::server::GatewayServer;
use coordinator_gateway::settings::GatewaySettings;
use coordinator_gateway::telemetry;
use tracing::info;

#[tokio::main]
async fn main() {
    let settings = match GatewaySettings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };
    telemetry::init(&settings.logging);

    let engine = settings.decision.build_engine();
    info!(
        engine = engine.name(),
        forward_timeout_ms = settings.dispatch.forward_timeout_ms,
        max_in_flight = settings.dispatch.max_in_flight,
        "Coordinator configuration loaded"
    );

    let server = match GatewayServer::new(settings, engine) {
        Ok(server) => server,
        Err(e) => {
            eprintln!("Failed to initialise metrics: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = server.start().await {
        eprintln!("Gateway error: {e}");
        std::process::exit(1);
    }
}
