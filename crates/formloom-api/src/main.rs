//! Formloom CLI and REST API entry point.
//!
//! Binary name: `floom`
//!
//! Parses CLI arguments, initializes database and services, then either
//! starts the REST API server or runs a management command.

mod http;
mod state;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};

use state::AppState;

#[derive(Parser)]
#[command(name = "floom", version, about = "AI form builder backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API server.
    Serve {
        /// Bind address.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Bind port.
        #[arg(long, default_value_t = 8080, env = "FORMLOOM_PORT")]
        port: u16,

        /// Export traces via OpenTelemetry (stdout exporter).
        #[arg(long)]
        otel: bool,
    },

    /// Create an API key for a user (prints the plaintext key once).
    ApiKey {
        /// The user id the key authenticates as.
        user_id: String,

        /// Display name for the key.
        #[arg(long, default_value = "default")]
        name: String,
    },

    /// Generate shell completions.
    Completions { shell: Shell },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        generate(*shell, &mut cmd, "floom", &mut std::io::stdout());
        return Ok(());
    }

    match cli.command {
        Commands::Serve { host, port, otel } => {
            formloom_observe::tracing_setup::init_tracing(otel)
                .map_err(|e| anyhow::anyhow!("failed to init tracing: {e}"))?;

            let state = AppState::init().await?;
            let router = http::router::build_router(state);

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!(%addr, "Formloom API listening");

            axum::serve(listener, router).await?;
            formloom_observe::tracing_setup::shutdown_tracing();
        }

        Commands::ApiKey { user_id, name } => {
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new("warn"))
                .with_target(false)
                .init();

            // Key creation needs only the database, not the full state.
            let data_dir = formloom_infra::config::resolve_data_dir();
            tokio::fs::create_dir_all(&data_dir).await?;
            let db_url = format!(
                "sqlite://{}?mode=rwc",
                data_dir.join("formloom.db").display()
            );
            let pool = formloom_infra::sqlite::pool::DatabasePool::new(&db_url).await?;

            let key = http::extractors::auth::create_api_key(&pool, &user_id, &name).await?;
            println!("{key}");
            println!("(store this key now; only its hash is kept)");
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}
