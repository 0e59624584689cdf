use anyhow::Context;
use bookshelf_db::DbHandle;
use bookshelf_kernel::settings::Settings;
use clap::{Parser, Subcommand};

/// Book catalogue service
#[derive(Debug, Parser)]
#[command(name = "bookshelf", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTTP API until interrupted (default)
    Serve,
    /// Print the resolved settings as JSON
    Config,
    /// Connect to the configured database and ping it
    Ping,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load bookshelf settings")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            bookshelf_telemetry::init(&settings.telemetry)?;
            tracing::info!(env = ?settings.environment, "bookshelf serve starting");
            bookshelf_app::run(&settings).await
        }
        Command::Config => {
            let rendered = serde_json::to_string_pretty(&settings)
                .with_context(|| "failed to render settings")?;
            println!("{}", rendered);
            Ok(())
        }
        Command::Ping => {
            bookshelf_telemetry::init(&settings.telemetry)?;
            let handle = DbHandle::connect(&settings).await?;
            let result = handle.ping().await;
            handle.shutdown().await;
            result?;
            println!("database '{}' is reachable", handle.database_name());
            Ok(())
        }
    }
}
