use log::{error, info, warn};
use mattori_home::ac::{AcStatus, AcStatusFile, AcStatusStore, SimulatedAcUnit, TemperatureRange};
use mattori_home::atmosphere::{AtmosphereEngine, EngineSettings, SimulatedAtmosphere};
use mattori_home::config::{self, Config};
use mattori_home::instance_lock::InstanceLock;
use mattori_home::rpc::{HomeServer, HomeService};
use std::sync::Arc;
use tokio::signal;
use tonic::transport::Server;

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

#[tokio::main]
async fn main() {
    // Load .env file before anything else
    config::load_dotenv();
    init_logger();
    info!("Starting mattori-home");

    let _lock = match InstanceLock::acquire() {
        Ok(lock) => lock,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let config = Config::from_env();
    info!("Configuration loaded:");
    info!("  Listen address: {}", config.server.listen_addr);
    info!("  Read interval: {} ms", config.atmosphere.read_interval_ms);
    info!(
        "  Temperature range: {}..={} °C",
        config.ac.min_temperature, config.ac.max_temperature
    );

    let range = TemperatureRange::new(config.ac.min_temperature, config.ac.max_temperature);
    if range.min > range.max {
        error!("Invalid temperature range {}", range);
        std::process::exit(1);
    }

    // The unit cannot be queried, so start it from the last saved status
    let state_file = config.ac.state_path.clone().map(AcStatusFile::new);
    let initial = state_file
        .as_ref()
        .and_then(AcStatusFile::load)
        .map(|saved| saved.status)
        .unwrap_or_else(AcStatus::default);
    let unit = Arc::new(SimulatedAcUnit::new(initial));
    let store = match state_file {
        Some(file) => {
            info!("  AC state file: {:?}", file.path());
            AcStatusStore::with_persistence(unit, range, file)
        }
        None => {
            warn!("AC state is kept in memory only (set AC_STATE_PATH or AC_PERSIST=1)");
            AcStatusStore::new(unit, range)
        }
    };

    let sensor = Arc::new(SimulatedAtmosphere::new(config.atmosphere.sea_level_pressure));
    let engine = Arc::new(AtmosphereEngine::new(
        sensor,
        EngineSettings::from(&config.atmosphere),
    ));

    let service = HomeService::new(engine.clone(), Arc::new(store));

    info!("gRPC server listening on {}", config.server.listen_addr);
    info!("  - Press Ctrl+C to exit");

    let shutdown = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received shutdown signal"),
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
    };

    // Sessions hold their response streams open, so cancel them alongside
    // the server's graceful shutdown instead of after it
    let serve = Server::builder()
        .add_service(HomeServer::new(service))
        .serve_with_shutdown(config.server.listen_addr, async {
            shutdown.await;
            engine.shutdown().await;
        });

    if let Err(e) = serve.await {
        error!("gRPC server error: {}", e);
        std::process::exit(1);
    }

    info!("mattori-home stopped");
}
