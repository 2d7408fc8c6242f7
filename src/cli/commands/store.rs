use clap::Subcommand;

use crate::cli::{utils::output_success, OutputFormat};
use crate::config::{AppConfig, StoreBackend};
use crate::store::{self, PgStore};

#[derive(Subcommand)]
pub enum StoreCommands {
    #[command(about = "Create the Postgres tables if they do not exist")]
    Migrate,

    #[command(about = "Check that the configured store answers")]
    Ping,
}

pub async fn handle(cmd: StoreCommands, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        StoreCommands::Migrate => {
            if config.database.backend != StoreBackend::Postgres {
                anyhow::bail!("migrate needs STORE_BACKEND=postgres");
            }
            let store = PgStore::connect(&config.database).await?;
            store.migrate().await?;
            output_success(output_format, "Schema is up to date", None)
        }
        StoreCommands::Ping => {
            let store = store::open(config).await?;
            store.ping().await?;
            output_success(output_format, &format!("{:?} store is reachable", config.database.backend), None)
        }
    }
}
