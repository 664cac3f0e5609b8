use log::{error, info, warn};
use time::{Duration, OffsetDateTime};
use tokio::sync::mpsc;

use weather_beacon_etl::bluetooth::run_scanner;
use weather_beacon_etl::config::CollectorConfig;
use weather_beacon_etl::database::PostgresStore;
use weather_beacon_etl::pipeline::IngestionPipeline;
use weather_beacon_etl::resolver::LocationTable;
use weather_beacon_etl::throttle::AdmissionThrottle;
use weather_beacon_etl::utils::format_datetime;

// Depth of the advertisement event queue between the scanner and the
// single ingestion task. A burst beyond this applies back-pressure to the
// watcher tasks, not to bluetoothd.
const EVENT_QUEUE_DEPTH: usize = 64;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match CollectorConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    let locations = LocationTable::new(config.locations);
    if locations.is_empty() {
        warn!("No sensor locations configured; all readings will use the fallback label");
    }

    // A collector without its store must not run half-initialized.
    let store = match PostgresStore::connect(&config.database_url).await {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to open reading store: {}", e);
            return Err(e);
        }
    };

    // Same for the radio.
    let session = bluer::Session::new().await?;
    let adapter = session.default_adapter().await?;
    adapter.set_powered(true).await?;

    info!(
        "Starting collector on adapter {} at {} (throttle {}s, {} known sensors)",
        adapter.name(),
        format_datetime(&OffsetDateTime::now_utc()),
        config.log_interval_secs,
        locations.len()
    );

    let pipeline = IngestionPipeline::new(
        locations,
        AdmissionThrottle::new(Duration::seconds(config.log_interval_secs as i64)),
        store,
    );

    let (tx, mut rx) = mpsc::channel(EVENT_QUEUE_DEPTH);

    let scan_task = tokio::spawn(async move {
        if let Err(e) = run_scanner(adapter, tx).await {
            error!("Advertisement scan terminated: {}", e);
        }
    });

    // Single ingestion task: admission decisions for one identity are
    // serialized by construction.
    tokio::select! {
        _ = async {
            while let Some(event) = rx.recv().await {
                pipeline.handle_event(&event, OffsetDateTime::now_utc()).await;
            }
        } => {
            warn!("Advertisement stream ended");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Collector terminated by user. Exiting gracefully.");
        }
    }

    scan_task.abort();
    Ok(())
}
