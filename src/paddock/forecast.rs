use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

pub const OPEN_METEO_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const FORECAST_DAYS: usize = 3;
const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("Forecast request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed forecast: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Venue {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Venue {
    pub fn silverstone() -> Self {
        Self {
            name: "Silverstone".to_string(),
            latitude: 52.07,
            longitude: -1.02,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastDay {
    pub date: String,
    pub max_temp_c: Option<f64>,
    pub min_temp_c: Option<f64>,
    pub precip_pct: Option<f64>,
    pub code: Option<i64>,
}

/// A failed fetch still produces a forecast: no days, plus the error text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Forecast {
    pub location: String,
    pub days: Vec<ForecastDay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Daily {
    time: Vec<String>,
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
    precipitation_probability_max: Vec<Option<f64>>,
    weathercode: Vec<Option<i64>>,
}

pub fn forecast_url(base: &str, venue: &Venue) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base)?;
    url.query_pairs_mut()
        .append_pair("latitude", &venue.latitude.to_string())
        .append_pair("longitude", &venue.longitude.to_string())
        .append_pair(
            "daily",
            "temperature_2m_max,temperature_2m_min,precipitation_probability_max,weathercode",
        )
        .append_pair("timezone", "Europe/London")
        .append_pair("forecast_days", &FORECAST_DAYS.to_string());
    Ok(url)
}

fn series<T: Clone>(name: &str, values: &[T], i: usize) -> Result<T, ForecastError> {
    values
        .get(i)
        .cloned()
        .ok_or_else(|| ForecastError::Malformed(format!("daily.{} has no value for day {}", name, i)))
}

/// Reads an Open-Meteo body into per-day rows.
pub fn parse_forecast(body: &Value) -> Result<Vec<ForecastDay>, ForecastError> {
    let Some(daily) = body.get("daily") else {
        return Ok(Vec::new());
    };
    let daily: Daily = serde_json::from_value(daily.clone())
        .map_err(|e| ForecastError::Malformed(e.to_string()))?;

    daily
        .time
        .iter()
        .enumerate()
        .map(|(i, date)| {
            Ok(ForecastDay {
                date: date.clone(),
                max_temp_c: series("temperature_2m_max", &daily.temperature_2m_max, i)?,
                min_temp_c: series("temperature_2m_min", &daily.temperature_2m_min, i)?,
                precip_pct: series(
                    "precipitation_probability_max",
                    &daily.precipitation_probability_max,
                    i,
                )?,
                code: series("weathercode", &daily.weathercode, i)?,
            })
        })
        .collect()
}

async fn request(client: &reqwest::Client, url: Url) -> Result<Vec<ForecastDay>, ForecastError> {
    let body: Value = client
        .get(url)
        .timeout(FETCH_TIMEOUT)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    parse_forecast(&body)
}

pub async fn fetch_forecast(client: &reqwest::Client, base: &str, venue: &Venue) -> Forecast {
    let result = match forecast_url(base, venue) {
        Ok(url) => {
            debug!("Fetching forecast from {}", url);
            request(client, url).await
        }
        Err(e) => Err(ForecastError::Malformed(e.to_string())),
    };

    match result {
        Ok(days) => Forecast {
            location: venue.name.clone(),
            days,
            error: None,
        },
        Err(e) => {
            warn!("Forecast for {} unavailable: {}", venue.name, e);
            Forecast {
                location: venue.name.clone(),
                days: Vec::new(),
                error: Some(e.to_string()),
            }
        }
    }
}
