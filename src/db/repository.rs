//! Storage seam for sensors and flood zones.
//!
//! Services and handlers only see these traits; [`PgSensorRepository`] and
//! [`PgFloodZoneRepository`] back them with Postgres.

use async_trait::async_trait;
use sqlx::PgPool;

use super::models::{
    FloodZone, FloodZoneChanges, FloodZoneFilter, NewFloodZone, NewReading, NewSensor, Page,
    PageRequest, Sensor, SensorChanges, SensorFilter, WaterLevelLog,
};
use super::queries;
use crate::errors::AppError;

#[async_trait]
pub trait SensorRepository: Send + Sync {
    async fn find(&self, id: i64) -> Result<Option<Sensor>, AppError>;

    async fn find_filtered(&self, filter: &SensorFilter) -> Result<Vec<Sensor>, AppError>;

    async fn page(
        &self,
        filter: &SensorFilter,
        page: PageRequest,
    ) -> Result<Page<Sensor>, AppError>;

    /// Whether any sensor other than `except` uses `code`.
    async fn code_taken(&self, code: &str, except: Option<i64>) -> Result<bool, AppError>;

    async fn create(&self, new: NewSensor) -> Result<Sensor, AppError>;

    async fn update(&self, id: i64, changes: SensorChanges) -> Result<Option<Sensor>, AppError>;

    /// Write a reading onto the sensor and append one log row in the same
    /// transaction. `None` when the sensor does not exist.
    async fn record_reading(
        &self,
        id: i64,
        reading: NewReading,
    ) -> Result<Option<Sensor>, AppError>;

    /// Most recent log rows first.
    async fn recent_logs(&self, id: i64, limit: i64) -> Result<Vec<WaterLevelLog>, AppError>;

    /// Hard delete, cascading to the sensor's logs.
    async fn delete(&self, id: i64) -> Result<bool, AppError>;
}

#[async_trait]
pub trait FloodZoneRepository: Send + Sync {
    async fn find(&self, id: i64) -> Result<Option<FloodZone>, AppError>;

    async fn find_filtered(&self, filter: &FloodZoneFilter) -> Result<Vec<FloodZone>, AppError>;

    async fn page(
        &self,
        filter: &FloodZoneFilter,
        page: PageRequest,
    ) -> Result<Page<FloodZone>, AppError>;

    async fn create(&self, new: NewFloodZone) -> Result<FloodZone, AppError>;

    async fn update(
        &self,
        id: i64,
        changes: FloodZoneChanges,
    ) -> Result<Option<FloodZone>, AppError>;

    async fn delete(&self, id: i64) -> Result<bool, AppError>;
}

#[derive(Clone)]
pub struct PgSensorRepository {
    pool: PgPool,
}

impl PgSensorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SensorRepository for PgSensorRepository {
    async fn find(&self, id: i64) -> Result<Option<Sensor>, AppError> {
        Ok(queries::get_sensor(&self.pool, id).await?)
    }

    async fn find_filtered(&self, filter: &SensorFilter) -> Result<Vec<Sensor>, AppError> {
        Ok(queries::find_sensors(&self.pool, filter).await?)
    }

    async fn page(
        &self,
        filter: &SensorFilter,
        page: PageRequest,
    ) -> Result<Page<Sensor>, AppError> {
        Ok(queries::page_sensors(&self.pool, filter, page).await?)
    }

    async fn code_taken(&self, code: &str, except: Option<i64>) -> Result<bool, AppError> {
        Ok(queries::sensor_code_taken(&self.pool, code, except).await?)
    }

    async fn create(&self, new: NewSensor) -> Result<Sensor, AppError> {
        Ok(queries::insert_sensor(&self.pool, &new).await?)
    }

    async fn update(&self, id: i64, changes: SensorChanges) -> Result<Option<Sensor>, AppError> {
        Ok(queries::update_sensor(&self.pool, id, &changes).await?)
    }

    async fn record_reading(
        &self,
        id: i64,
        reading: NewReading,
    ) -> Result<Option<Sensor>, AppError> {
        Ok(queries::record_reading(&self.pool, id, &reading).await?)
    }

    async fn recent_logs(&self, id: i64, limit: i64) -> Result<Vec<WaterLevelLog>, AppError> {
        Ok(queries::recent_logs(&self.pool, id, limit).await?)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        Ok(queries::delete_sensor(&self.pool, id).await?)
    }
}

#[derive(Clone)]
pub struct PgFloodZoneRepository {
    pool: PgPool,
}

impl PgFloodZoneRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FloodZoneRepository for PgFloodZoneRepository {
    async fn find(&self, id: i64) -> Result<Option<FloodZone>, AppError> {
        Ok(queries::get_zone(&self.pool, id).await?)
    }

    async fn find_filtered(&self, filter: &FloodZoneFilter) -> Result<Vec<FloodZone>, AppError> {
        Ok(queries::find_zones(&self.pool, filter).await?)
    }

    async fn page(
        &self,
        filter: &FloodZoneFilter,
        page: PageRequest,
    ) -> Result<Page<FloodZone>, AppError> {
        Ok(queries::page_zones(&self.pool, filter, page).await?)
    }

    async fn create(&self, new: NewFloodZone) -> Result<FloodZone, AppError> {
        Ok(queries::insert_zone(&self.pool, &new).await?)
    }

    async fn update(
        &self,
        id: i64,
        changes: FloodZoneChanges,
    ) -> Result<Option<FloodZone>, AppError> {
        Ok(queries::update_zone(&self.pool, id, &changes).await?)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        Ok(queries::delete_zone(&self.pool, id).await?)
    }
}
