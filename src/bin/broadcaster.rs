use log::{error, info};
use tokio::time::{sleep, Duration};

use weather_beacon_etl::bluetooth::Beacon;
use weather_beacon_etl::codec::{self, PRODUCT_TAG};
use weather_beacon_etl::config::BroadcasterConfig;
use weather_beacon_etl::sensors::{Bme280Source, SensorSource};

/// Sample, encode and publish on a fixed period
///
/// A failed acquisition or publish abandons the cycle, never the loop; the
/// node keeps broadcasting its last good payload until the next success.
async fn broadcast_loop<S: SensorSource>(
    mut sensors: S,
    beacon: &mut Beacon,
    interval_secs: u64,
) {
    loop {
        match sensors.read() {
            Ok(sample) => {
                info!(
                    "BMP: {:.1}°C, {:.0} hPa | SHT: {:.1}°C, {:.0}%",
                    sample.temp_primary, sample.pressure, sample.temp_secondary, sample.humidity
                );

                let payload = codec::encode(
                    sample.temp_primary,
                    sample.pressure,
                    sample.temp_secondary,
                    sample.humidity,
                    PRODUCT_TAG,
                );

                if let Err(e) = beacon.publish(payload.to_vec()).await {
                    error!("Failed to publish advertisement: {}", e);
                }
            }
            Err(e) => error!("Sensor acquisition failed: {}", e),
        }

        sleep(Duration::from_secs(interval_secs)).await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    let config = match BroadcasterConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    // Radio and sensor bus are required collaborators; failing to bring
    // either up aborts startup.
    let session = bluer::Session::new().await?;
    let adapter = session.default_adapter().await?;
    adapter.set_powered(true).await?;

    let mut beacon = Beacon::new(adapter).await?;

    let sensors = match Bme280Source::new() {
        Ok(sensors) => sensors,
        Err(e) => {
            error!("Failed to initialize sensors: {}", e);
            return Err(e);
        }
    };

    info!(
        "Starting broadcast as {} every {}s",
        beacon.local_name(),
        config.broadcast_interval_secs
    );

    tokio::select! {
        _ = broadcast_loop(sensors, &mut beacon, config.broadcast_interval_secs) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Broadcaster terminated by user. Exiting gracefully.");
        }
    }

    beacon.stop();
    Ok(())
}
