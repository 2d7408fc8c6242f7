use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use serde_json::json;
use std::path::PathBuf;

use crate::cli::{
    utils::{output_list, output_success},
    OutputFormat,
};
use crate::config::AppConfig;
use crate::paddock::{
    self, build_newsletter_html, dedupe_stories, fetch_forecast, fetch_stories, forecast::OPEN_METEO_URL,
    headlines_html, Story, Venue,
};
use crate::store;

/// Author recorded on newsletters published from the CLI.
const ENGINE_ACTOR: &str = "prix_six_engine";

#[derive(Subcommand)]
pub enum PaddockCommands {
    #[command(about = "Publish a newsletter body and write the standalone HTML next to it")]
    Publish {
        #[arg(help = "File holding the newsletter body (code fences are stripped)")]
        file: PathBuf,
        #[arg(long, help = "Issue date, YYYY-MM-DD (defaults to today)")]
        date: Option<NaiveDate>,
        #[arg(long, help = "Append a headlines section from the configured news feeds")]
        news: bool,
    },

    #[command(about = "Collect and de-duplicate stories from the configured news feeds")]
    News {
        #[arg(long = "feed", help = "Feed URL to read instead of PADDOCK_NEWS_FEEDS (repeatable)")]
        feeds: Vec<String>,
    },

    #[command(about = "Drop near-duplicate stories from a JSON array of stories")]
    Dedupe {
        #[arg(help = "JSON file: [{\"title\": ..., \"summary\": ..., \"link\": ...}]")]
        file: PathBuf,
    },

    #[command(about = "Race-weekend weather forecast from Open-Meteo")]
    Forecast {
        #[arg(long, help = "Venue name")]
        name: Option<String>,
        #[arg(long, allow_hyphen_values = true, requires = "longitude")]
        latitude: Option<f64>,
        #[arg(long, allow_hyphen_values = true, requires = "latitude")]
        longitude: Option<f64>,
    },
}

pub async fn handle(cmd: PaddockCommands, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        PaddockCommands::Publish { file, date, news } => {
            let mut raw = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            if news {
                let stories = collect_news(config, &config.paddock.news_feeds).await;
                raw = format!("{}\n{}", paddock::strip_code_fences(&raw), headlines_html(&stories));
            }

            let store = store::open(config).await?;
            let chat = paddock::publish(store.as_ref(), &raw, ENGINE_ACTOR, Utc::now()).await?;

            let date = date.unwrap_or_else(|| Utc::now().date_naive());
            let out = file.with_extension("newsletter.html");
            std::fs::write(&out, build_newsletter_html(&chat.content, date))
                .with_context(|| format!("writing {}", out.display()))?;

            output_success(
                output_format,
                &format!("Published pub chat ({} bytes), wrote {}", chat.content.len(), out.display()),
                Some(json!({ "pubChat": chat, "html": out })),
            )
        }

        PaddockCommands::News { feeds } => {
            let feeds = if feeds.is_empty() { config.paddock.news_feeds.clone() } else { feeds };
            let stories = collect_news(config, &feeds).await;
            output_list(output_format, &stories, "No stories", |s| format!("- {} ({})", s.title, s.source))
        }

        PaddockCommands::Dedupe { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let stories: Vec<Story> = serde_json::from_str(&raw).context("parsing stories")?;
            let kept = dedupe_stories(stories);
            output_list(output_format, &kept, "No stories", |s| format!("- {}", s.title))
        }

        PaddockCommands::Forecast { name, latitude, longitude } => {
            let mut venue = Venue::silverstone();
            if let (Some(latitude), Some(longitude)) = (latitude, longitude) {
                venue.latitude = latitude;
                venue.longitude = longitude;
                venue.name = name.clone().unwrap_or_else(|| format!("{:.2},{:.2}", latitude, longitude));
            } else if let Some(name) = name {
                venue.name = name;
            }

            let client = reqwest::Client::new();
            let forecast = fetch_forecast(&client, OPEN_METEO_URL, &venue).await;

            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&forecast)?),
                OutputFormat::Text => {
                    println!("Forecast for {}", forecast.location);
                    if let Some(error) = &forecast.error {
                        println!("  unavailable: {}", error);
                    }
                    for day in &forecast.days {
                        println!(
                            "  {}  {}/{} °C  rain {}%",
                            day.date,
                            fmt_opt(day.max_temp_c),
                            fmt_opt(day.min_temp_c),
                            fmt_opt(day.precip_pct)
                        );
                    }
                }
            }
            Ok(())
        }
    }
}

async fn collect_news(config: &AppConfig, feeds: &[String]) -> Vec<Story> {
    let client = reqwest::Client::new();
    dedupe_stories(fetch_stories(&client, feeds, config.paddock.stories_per_feed).await)
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{:.0}", v)).unwrap_or_else(|| "-".to_string())
}
