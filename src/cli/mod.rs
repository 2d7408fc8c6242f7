pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "prix")]
#[command(about = "Prix Six CLI - server, scoring and newsletter tooling")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the API server")]
    Serve,

    #[command(about = "Token utilities")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "Scoring, rescoring and standings")]
    Scoring {
        #[command(subcommand)]
        cmd: commands::scoring::ScoringCommands,
    },

    #[command(about = "Store maintenance")]
    Store {
        #[command(subcommand)]
        cmd: commands::store::StoreCommands,
    },

    #[command(about = "Paddock Pub Chat newsletter")]
    Paddock {
        #[command(subcommand)]
        cmd: commands::paddock::PaddockCommands,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let config = crate::config::config().clone();

    match cli.command {
        Commands::Serve => crate::app::serve(config).await,
        Commands::Auth { cmd } => commands::auth::handle(cmd, &config, output_format).await,
        Commands::Scoring { cmd } => commands::scoring::handle(cmd, &config, output_format).await,
        Commands::Store { cmd } => commands::store::handle(cmd, &config, output_format).await,
        Commands::Paddock { cmd } => commands::paddock::handle(cmd, &config, output_format).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_score_command() {
        let cli = Cli::try_parse_from([
            "prix",
            "--json",
            "scoring",
            "score",
            "--predicted",
            "ver,nor,lec,pia,sai,ham",
            "--actual",
            "nor,ver,lec,pia,rus,ham",
        ])
        .unwrap();
        assert_eq!(OutputFormat::from_cli(&cli), OutputFormat::Json);
        assert!(matches!(cli.command, Commands::Scoring { .. }));
    }

    #[test]
    fn test_text_is_default() {
        let cli = Cli::try_parse_from(["prix", "serve"]).unwrap();
        assert_eq!(OutputFormat::from_cli(&cli), OutputFormat::Text);
    }

    #[test]
    fn test_parse_paddock_news_commands() {
        use commands::paddock::PaddockCommands;

        let cli = Cli::try_parse_from(["prix", "paddock", "publish", "issue.html", "--news"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Paddock { cmd: PaddockCommands::Publish { news: true, .. } }
        ));

        let cli = Cli::try_parse_from([
            "prix", "paddock", "news", "--feed", "https://a.example.com/rss", "--feed", "https://b.example.com/atom",
        ])
        .unwrap();
        let Commands::Paddock { cmd: PaddockCommands::News { feeds } } = cli.command else {
            panic!("expected paddock news");
        };
        assert_eq!(feeds.len(), 2);
    }
}
