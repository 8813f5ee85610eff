// src/main.rs
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};
use serde_json::json;

use zone_scanner::alerts::{AlertPreferences, AlertSession, JsonFileAlertStore, TriggerContext};
use zone_scanner::loader::{load_candles_csv, load_zones_json};
use zone_scanner::notifications::{LogNotifier, NotificationManager, Notifier};
use zone_scanner::{AnalysisReport, AnalysisRequest, EngineConfig, Result, ZoneAnalyzer};

#[derive(Parser, Debug)]
#[command(name = "zone_scanner")]
#[command(about = "Validate and score supply/demand zones against recent candles")]
struct Args {
    /// Candle CSV with time,open,high,low,close columns
    #[arg(long)]
    candles: PathBuf,

    /// JSON array of zones
    #[arg(long)]
    zones: PathBuf,

    #[arg(long)]
    symbol: String,

    #[arg(long, default_value = "30m")]
    timeframe: String,

    /// Current price (default: last close)
    #[arg(long)]
    price: Option<f64>,

    /// Price at the previous check, used to tell whether price is approaching a zone
    #[arg(long)]
    previous_price: Option<f64>,

    /// Directory for per-user alert state; alerts are only triggered when set
    #[arg(long)]
    alerts_dir: Option<PathBuf>,

    #[arg(long, default_value = "local")]
    user: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn setup_logging(debug: bool) {
    let default_filter = if debug { "zone_scanner=debug" } else { "zone_scanner=info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Stderr)
        .init();
}

async fn run(args: &Args, analyzer: Arc<ZoneAnalyzer>) -> Result<AnalysisReport> {
    let candles = load_candles_csv(&args.candles).await?;
    let zones = load_zones_json(&args.zones).await?;
    let current_price = args.price.or_else(|| candles.last().map(|c| c.close)).unwrap_or_default();

    let request = AnalysisRequest {
        symbol: args.symbol.clone(),
        timeframe: args.timeframe.clone(),
        candles: candles.clone(),
        zones: zones.clone(),
        current_price,
        user_preferences: Some(AlertPreferences::default()),
    };

    let worker = Arc::clone(&analyzer);
    let report = tokio::task::spawn_blocking(move || worker.run_complete_analysis(&request))
        .await
        .map_err(|e| zone_scanner::AnalysisError::Task(e.to_string()))??;

    if let Some(dir) = &args.alerts_dir {
        let store = Arc::new(JsonFileAlertStore::new(dir));
        let notifiers: Vec<Arc<dyn Notifier>> = vec![Arc::new(LogNotifier::new())];
        let dispatcher = Arc::new(NotificationManager::new(notifiers));
        let session =
            AlertSession::new(&args.user, store, dispatcher, analyzer.config().alert_cooldown_minutes);
        session.init().await;

        let outcomes = session
            .process_alerts(
                &analyzer,
                &args.symbol,
                current_price,
                args.previous_price,
                &zones,
                &candles,
                &TriggerContext::now(),
            )
            .await;
        let sent = outcomes.iter().filter(|o| o.success).count();
        let skipped = outcomes.iter().filter(|o| o.skipped).count();
        info!("🔔 {} alerts evaluated: {} delivered or held, {} skipped", outcomes.len(), sent, skipped);
        session.dispose().await;
    }

    Ok(report)
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let args = Args::parse();
    setup_logging(args.debug);

    let analyzer = Arc::new(ZoneAnalyzer::new(EngineConfig::from_env()));

    match run(&args, analyzer).await {
        Ok(report) => {
            let mut body = match serde_json::to_value(&report) {
                Ok(v) => v,
                Err(e) => {
                    error!("❌ Failed to serialize report: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            if let Some(obj) = body.as_object_mut() {
                obj.insert("success".to_string(), json!(true));
            }
            println!("{}", body);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("❌ Analysis for {} failed: {}", args.symbol, e);
            println!("{}", json!({ "success": false, "error": e.to_string() }));
            ExitCode::FAILURE
        }
    }
}
