//! Development client for the mattori-home gRPC service.
//!
//! Usage:
//!   cargo run --bin home-cli -- atmosphere --temperature --humidity
//!   cargo run --bin home-cli -- ac get
//!   cargo run --bin home-cli -- ac set --powered --mode cool --temperature 22

use clap::{Parser, Subcommand};
use mattori_home::ac::{self, AcMode};
use mattori_home::atmosphere::FeatureMask;
use mattori_home::rpc::HomeClient;
use mattori_home::rpc::proto::{AcStatus, AcStatusParam, AtmosphereFeatures};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Default service address
const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:50051";

#[derive(Parser)]
#[command(name = "home-cli")]
#[command(about = "Development client for the mattori-home service")]
struct Cli {
    /// Service URL
    #[arg(long, env = "HOME_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    server: String,

    /// Print AC status as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream atmosphere readings (all features when none is selected)
    Atmosphere {
        #[arg(long)]
        temperature: bool,
        #[arg(long)]
        pressure: bool,
        #[arg(long)]
        humidity: bool,
        #[arg(long)]
        altitude: bool,

        /// Stop after this many readings
        #[arg(long)]
        count: Option<usize>,
    },
    /// Read or change the AC status
    Ac {
        #[command(subcommand)]
        action: AcAction,
    },
}

#[derive(Subcommand)]
enum AcAction {
    /// Print the current status
    Get,
    /// Set a new status
    Set {
        /// Turn the unit on (off when omitted)
        #[arg(long)]
        powered: bool,

        /// auto, warm, dry, cool or fan
        #[arg(long, default_value = "auto")]
        mode: AcMode,

        /// Target temperature in °C
        #[arg(long)]
        temperature: u32,
    },
}

fn print_status(status: AcStatus, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let status = ac::AcStatus::try_from(status)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("AC: {}", status);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut client = HomeClient::connect(cli.server.clone()).await.map_err(|e| {
        eprintln!("Failed to connect to {}", cli.server);
        eprintln!("Make sure mattori-home is running and accessible.");
        eprintln!("Error: {}", e);
        e
    })?;

    match cli.command {
        Commands::Atmosphere {
            temperature,
            pressure,
            humidity,
            altitude,
            count,
        } => {
            let mut mask = FeatureMask {
                temperature,
                pressure,
                humidity,
                altitude,
            };
            if mask.is_empty() {
                mask = FeatureMask::ALL;
            }
            println!("Streaming {}", mask);

            // Keep the sender alive so the server sees an open stream
            let (tx, rx) = mpsc::channel(1);
            tx.send(AtmosphereFeatures::from(mask)).await?;

            let mut readings = client
                .read_atmosphere(ReceiverStream::new(rx))
                .await?
                .into_inner();

            let mut received = 0;
            while let Some(reading) = readings.message().await? {
                let mut fields = Vec::new();
                if mask.temperature {
                    fields.push(format!("temperature {:.2} °C", reading.temperature));
                }
                if mask.pressure {
                    fields.push(format!("pressure {:.2} hPa", reading.pressure));
                }
                if mask.humidity {
                    fields.push(format!("humidity {:.2} %", reading.humidity));
                }
                if mask.altitude {
                    fields.push(format!("altitude {:.2} m", reading.altitude));
                }
                println!("{}", fields.join(", "));

                received += 1;
                if count.is_some_and(|n| received >= n) {
                    break;
                }
            }
            drop(tx);
        }
        Commands::Ac { action } => match action {
            AcAction::Get => {
                let status = client.get_ac_status(AcStatusParam {}).await?.into_inner();
                print_status(status, cli.json)?;
            }
            AcAction::Set {
                powered,
                mode,
                temperature,
            } => {
                let requested = ac::AcStatus {
                    powered,
                    mode,
                    temperature,
                };
                let status = client
                    .set_ac_status(AcStatus::from(requested))
                    .await
                    .map_err(|status| {
                        eprintln!("Set failed ({:?}): {}", status.code(), status.message());
                        status
                    })?
                    .into_inner();
                print_status(status, cli.json)?;
            }
        },
    }

    Ok(())
}
