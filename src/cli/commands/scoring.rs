use anyhow::Context;
use chrono::Utc;
use clap::Subcommand;
use serde_json::json;

use crate::cli::{
    utils::{output_list, output_success},
    OutputFormat,
};
use crate::config::AppConfig;
use crate::scoring::{calculate_score, TopSix};
use crate::services::results;
use crate::store;

/// Actor recorded in the audit log for CLI rescoring.
const CLI_ACTOR: &str = "prix_cli";

#[derive(Subcommand)]
pub enum ScoringCommands {
    #[command(about = "Score one prediction against a result")]
    Score {
        #[arg(long, value_delimiter = ',', help = "Predicted top six, comma separated")]
        predicted: Vec<String>,
        #[arg(long, value_delimiter = ',', help = "Actual top six, comma separated")]
        actual: Vec<String>,
    },

    #[command(about = "Rescore a race from its stored result")]
    Recalc {
        #[arg(help = "Race id")]
        race_id: String,
    },

    #[command(about = "Print season standings")]
    Standings {
        #[arg(long, help = "Limit to one league")]
        league: Option<String>,
    },
}

pub async fn handle(cmd: ScoringCommands, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ScoringCommands::Score { predicted, actual } => {
            let predicted = TopSix::from_drivers(predicted).context("invalid --predicted")?;
            let actual = TopSix::from_drivers(actual).context("invalid --actual")?;
            let breakdown = calculate_score(&predicted, &actual);

            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&breakdown)?),
                OutputFormat::Text => {
                    println!("{}", breakdown.summary());
                    println!("Total: {} points", breakdown.total_points);
                }
            }
            Ok(())
        }

        ScoringCommands::Recalc { race_id } => {
            let store = store::open(config).await?;
            let run = results::recalculate(store.as_ref(), CLI_ACTOR, &race_id, Utc::now()).await?;
            output_success(
                output_format,
                &format!("Rescored {} ({} scores, {} batches)", run.race_id, run.scores_written, run.batches),
                Some(json!({ "run": run })),
            )
        }

        ScoringCommands::Standings { league } => {
            let store = store::open(config).await?;
            let table = results::standings(store.as_ref(), league.as_deref()).await?;
            output_list(output_format, &table, "No scores yet", |s| {
                format!("{:>3}. {:<30} {:>4} pts ({} races)", s.rank, s.team_name, s.total_points, s.races_scored)
            })
        }
    }
}
