use bluer::Address;
use std::collections::HashMap;
use std::env;

// Policy defaults; both are overridable from the environment. The
// admit/reject boundary semantics do not change with the values.
pub const DEFAULT_LOG_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_BROADCAST_INTERVAL_SECS: u64 = 2;

/// Receiver-side configuration, loaded once at startup
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub database_url: String,
    pub locations: HashMap<Address, String>,
    pub log_interval_secs: u64,
}

impl CollectorConfig {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        // Load environment variables
        dotenv::dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL environment variable not set")?;

        let locations = match env::var("SENSOR_LOCATIONS") {
            Ok(raw) => parse_locations(&raw)?,
            Err(_) => HashMap::new(),
        };

        let log_interval_secs = env_u64("LOG_INTERVAL_SECS", DEFAULT_LOG_INTERVAL_SECS)?;

        Ok(CollectorConfig {
            database_url,
            locations,
            log_interval_secs,
        })
    }
}

/// Sender-side configuration, loaded once at startup
#[derive(Debug, Clone)]
pub struct BroadcasterConfig {
    pub broadcast_interval_secs: u64,
}

impl BroadcasterConfig {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenv::dotenv().ok();

        let broadcast_interval_secs =
            env_u64("BROADCAST_INTERVAL_SECS", DEFAULT_BROADCAST_INTERVAL_SECS)?;

        Ok(BroadcasterConfig {
            broadcast_interval_secs,
        })
    }
}

/// Parse the sensor "phonebook" from its environment format
///
/// The format is a comma-separated list of `MAC=location` pairs, e.g.
/// `SENSOR_LOCATIONS=E1:BD:F2:F7:60:45=store_room,C3:1A:08:56:82:67=garden`.
/// Empty entries are skipped; a malformed address or pair is an error so a
/// typo cannot silently unmap a sensor.
pub fn parse_locations(raw: &str) -> Result<HashMap<Address, String>, Box<dyn std::error::Error>> {
    let mut locations = HashMap::new();

    for pair in raw.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }

        let (mac, label) = pair
            .split_once('=')
            .ok_or_else(|| format!("Invalid sensor location entry '{}'", pair))?;
        let mac = mac.trim();
        let label = label.trim();
        if label.is_empty() {
            return Err(format!("Empty location label for sensor '{}'", mac).into());
        }

        let address: Address = mac
            .parse()
            .map_err(|e| format!("Invalid sensor address '{}': {}", mac, e))?;
        locations.insert(address, label.to_string());
    }

    Ok(locations)
}

fn env_u64(key: &str, default: u64) -> Result<u64, Box<dyn std::error::Error>> {
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|e| format!("Invalid {} value '{}': {}", key, value, e).into()),
        Err(_) => Ok(default),
    }
}
