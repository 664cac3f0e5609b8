/// Durable storage of admitted readings
use async_trait::async_trait;
use tokio_postgres::Client;

use crate::database::connection;
use crate::models::SensorReading;
use crate::pipeline::{ReadingStore, StoreError};

/// Append-only PostgreSQL store for the collector
///
/// One row per admitted reading. The schema is created on connect if it
/// does not exist; anything beyond that (migration, analytics) is out of
/// scope for the collector.
pub struct PostgresStore {
    client: Client,
}

impl PostgresStore {
    /// Connect and ensure the readings table exists
    ///
    /// A failure here means the store collaborator is unavailable and the
    /// collector must not start half-initialized.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let client = connection::connect(database_url).await?;

        client
            .execute(
                "CREATE TABLE IF NOT EXISTS readings (
                    id BIGSERIAL PRIMARY KEY,
                    timestamp TIMESTAMPTZ NOT NULL,
                    mac_address TEXT NOT NULL,
                    location TEXT NOT NULL,
                    temp_primary REAL NOT NULL,
                    pressure INTEGER NOT NULL,
                    temp_secondary REAL NOT NULL,
                    humidity INTEGER NOT NULL,
                    rssi INTEGER NOT NULL
                )",
                &[],
            )
            .await?;

        Ok(PostgresStore { client })
    }
}

#[async_trait]
impl ReadingStore for PostgresStore {
    async fn append(&self, reading: &SensorReading) -> Result<(), StoreError> {
        self.client
            .execute(
                "INSERT INTO readings
                    (timestamp, mac_address, location, temp_primary, pressure,
                     temp_secondary, humidity, rssi)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                &[
                    &reading.timestamp,
                    &reading.identity.to_string(),
                    &reading.location,
                    &reading.temp_primary,
                    &(reading.pressure as i32),
                    &reading.temp_secondary,
                    &(reading.humidity as i32),
                    &(reading.rssi as i32),
                ],
            )
            .await?;
        Ok(())
    }
}
