mod config;
mod push;
mod server;

use clap::{Parser, Subcommand};
use config::Config;
use server::run_server;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "scalehub")]
#[command(about = "Latest-value weight relay for remote scale devices")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Server {
        /// Path to configuration file (optional)
        #[arg(short, long, default_value = "config.yaml")]
        config: String,
    },
    /// Report a single reading to a running server, as a scale device would
    Push {
        /// Base URL of the server
        #[arg(long, default_value = "http://127.0.0.1:5000")]
        url: String,

        /// Machine identifier
        #[arg(short, long)]
        machine: String,

        /// Weight in kilograms
        #[arg(short, long, allow_negative_numbers = true)]
        weight: f64,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scalehub=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Server { config } => {
            tracing::info!("Starting Scalehub server with config: {}", config);

            let cfg = match Config::from_file(&config) {
                Ok(c) => c,
                Err(e) => {
                    tracing::error!("Failed to load config: {}", e);
                    std::process::exit(1);
                }
            };

            tracing::info!(
                "Bind: {}, Backend: {}, Data dir: {:?}",
                cfg.bind_addr,
                cfg.storage.backend.as_str(),
                cfg.storage.data_dir
            );

            if let Err(e) = run_server(cfg).await {
                tracing::error!("Server error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Push {
            url,
            machine,
            weight,
        } => match push::push_weight(&url, &machine, weight).await {
            Ok(ack) => {
                tracing::info!(
                    "Machine {} accepted {} kg at {}",
                    ack.machine_id,
                    ack.weight,
                    ack.timestamp
                );
            }
            Err(e) => {
                tracing::error!("Push failed: {:#}", e);
                std::process::exit(1);
            }
        },
    }
}
