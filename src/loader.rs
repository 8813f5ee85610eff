// src/loader.rs
// Reads candle CSV files and zone JSON files from disk.

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Deserialize;
use std::path::Path;

use crate::errors::{AnalysisError, Result};
use crate::types::{Candle, Zone};

/// One CSV row. `_time` is accepted so Influx exports load unchanged.
#[derive(Debug, Deserialize)]
struct CandleCsvRecord {
    #[serde(alias = "_time", alias = "timestamp")]
    time: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

impl CandleCsvRecord {
    fn into_candle(self) -> Result<Candle> {
        let timestamp = DateTime::parse_from_rfc3339(self.time.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| AnalysisError::InvalidCandle {
                timestamp: self.time.clone(),
                reason: format!("unparseable time: {}", e),
            })?;
        Candle::new(self.open, self.high, self.low, self.close, timestamp)
    }
}

/// Parses candles from CSV text with a header row. Lines starting with '#' are skipped.
pub fn parse_candles_csv(text: &str) -> Result<Vec<Candle>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut candles = Vec::new();
    for record in rdr.deserialize::<CandleCsvRecord>() {
        candles.push(record?.into_candle()?);
    }

    if candles.windows(2).any(|w| w[0].timestamp > w[1].timestamp) {
        warn!("[LOADER] Candles were out of order, sorting by timestamp");
        candles.sort_by_key(|c| c.timestamp);
    }
    Ok(candles)
}

pub async fn load_candles_csv(path: &Path) -> Result<Vec<Candle>> {
    let text = tokio::fs::read_to_string(path).await?;
    let candles = parse_candles_csv(&text)?;
    info!("[LOADER] Loaded {} candles from {}", candles.len(), path.display());
    Ok(candles)
}

pub async fn load_zones_json(path: &Path) -> Result<Vec<Zone>> {
    let bytes = tokio::fs::read(path).await?;
    let zones: Vec<Zone> = serde_json::from_slice(&bytes)?;
    info!("[LOADER] Loaded {} zones from {}", zones.len(), path.display());
    Ok(zones)
}
