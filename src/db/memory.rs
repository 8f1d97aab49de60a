//! In-memory repositories for service and router tests.

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::error::{DatabaseError, ErrorKind};
use sqlx::types::Json;
use tokio::sync::RwLock;

use super::models::{
    FloodZone, FloodZoneChanges, FloodZoneFilter, NewFloodZone, NewReading, NewSensor, Page,
    PageRequest, Sensor, SensorChanges, SensorFilter, SortOrder, WaterLevelLog,
};
use super::repository::{FloodZoneRepository, SensorRepository};
use crate::errors::AppError;

fn paginate<T>(mut rows: Vec<T>, page: PageRequest) -> Page<T> {
    let total = rows.len() as i64;
    let items = rows
        .drain(..)
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .collect();
    Page {
        items,
        total,
        request: page,
    }
}

/// Postgres' unique violation (SQLSTATE 23505), as the driver reports it.
#[derive(Debug)]
pub struct UniqueViolation {
    constraint: &'static str,
}

impl fmt::Display for UniqueViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} \"{}\"", self.message(), self.constraint)
    }
}

impl StdError for UniqueViolation {}

impl DatabaseError for UniqueViolation {
    fn message(&self) -> &str {
        "duplicate key value violates unique constraint"
    }

    fn code(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed("23505"))
    }

    fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
        self
    }

    fn constraint(&self) -> Option<&str> {
        Some(self.constraint)
    }

    fn kind(&self) -> ErrorKind {
        ErrorKind::UniqueViolation
    }
}

pub fn unique_violation(constraint: &'static str) -> AppError {
    AppError::DatabaseError(sqlx::Error::Database(Box::new(UniqueViolation { constraint })))
}

const SENSOR_CODE_KEY: &str = "sensors_code_key";

#[derive(Default)]
struct SensorStore {
    last_id: i64,
    last_log_id: i64,
    sensors: Vec<Sensor>,
    logs: Vec<WaterLevelLog>,
}

#[derive(Default)]
pub struct MemorySensorRepository {
    store: RwLock<SensorStore>,
    stale_code_check: bool,
}

impl MemorySensorRepository {
    /// `code_taken` always answers false, as if a concurrent insert landed
    /// between the check and the write. The code constraint still holds.
    pub fn with_stale_code_check() -> Self {
        Self {
            stale_code_check: true,
            ..Self::default()
        }
    }

    /// Every log row for a sensor, in insertion order.
    pub async fn all_logs(&self, sensor_id: i64) -> Vec<WaterLevelLog> {
        let store = self.store.read().await;
        store
            .logs
            .iter()
            .filter(|l| l.sensor_id == sensor_id)
            .cloned()
            .collect()
    }
}

fn sort_sensors(rows: &mut [Sensor], order: SortOrder) {
    match order {
        SortOrder::Id => rows.sort_by_key(|s| s.id),
        SortOrder::Name => rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id))),
    }
}

#[async_trait]
impl SensorRepository for MemorySensorRepository {
    async fn find(&self, id: i64) -> Result<Option<Sensor>, AppError> {
        let store = self.store.read().await;
        Ok(store.sensors.iter().find(|s| s.id == id).cloned())
    }

    async fn find_filtered(&self, filter: &SensorFilter) -> Result<Vec<Sensor>, AppError> {
        let store = self.store.read().await;
        let mut rows: Vec<Sensor> = store
            .sensors
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        sort_sensors(&mut rows, filter.order);
        Ok(rows)
    }

    async fn page(
        &self,
        filter: &SensorFilter,
        page: PageRequest,
    ) -> Result<Page<Sensor>, AppError> {
        let rows = self.find_filtered(filter).await?;
        Ok(paginate(rows, page))
    }

    async fn code_taken(&self, code: &str, except: Option<i64>) -> Result<bool, AppError> {
        if self.stale_code_check {
            return Ok(false);
        }
        let store = self.store.read().await;
        Ok(store
            .sensors
            .iter()
            .any(|s| s.code == code && Some(s.id) != except))
    }

    async fn create(&self, new: NewSensor) -> Result<Sensor, AppError> {
        let mut store = self.store.write().await;
        if store.sensors.iter().any(|s| s.code == new.code) {
            return Err(unique_violation(SENSOR_CODE_KEY));
        }
        store.last_id += 1;
        let now = Utc::now();
        let sensor = Sensor {
            id: store.last_id,
            name: new.name,
            code: new.code,
            latitude: new.latitude,
            longitude: new.longitude,
            status: new.status.as_str().to_string(),
            water_level: new.water_level,
            address: new.address,
            description: new.description,
            is_active: new.is_active,
            last_reading_at: new.last_reading_at,
            created_at: now,
            updated_at: now,
        };
        store.sensors.push(sensor.clone());
        Ok(sensor)
    }

    async fn update(&self, id: i64, changes: SensorChanges) -> Result<Option<Sensor>, AppError> {
        let mut store = self.store.write().await;
        if let Some(code) = &changes.code {
            if store.sensors.iter().any(|s| &s.code == code && s.id != id) {
                return Err(unique_violation(SENSOR_CODE_KEY));
            }
        }
        let Some(sensor) = store.sensors.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            sensor.name = name;
        }
        if let Some(code) = changes.code {
            sensor.code = code;
        }
        if let Some(latitude) = changes.latitude {
            sensor.latitude = latitude;
        }
        if let Some(longitude) = changes.longitude {
            sensor.longitude = longitude;
        }
        if let Some(status) = changes.status {
            sensor.status = status.as_str().to_string();
        }
        if let Some(water_level) = changes.water_level {
            sensor.water_level = water_level;
        }
        if let Some(address) = changes.address {
            sensor.address = address;
        }
        if let Some(description) = changes.description {
            sensor.description = description;
        }
        if let Some(is_active) = changes.is_active {
            sensor.is_active = is_active;
        }
        if let Some(at) = changes.last_reading_at {
            sensor.last_reading_at = Some(at);
        }
        sensor.updated_at = Utc::now();
        Ok(Some(sensor.clone()))
    }

    async fn record_reading(
        &self,
        id: i64,
        reading: NewReading,
    ) -> Result<Option<Sensor>, AppError> {
        let mut store = self.store.write().await;
        let Some(sensor) = store.sensors.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        sensor.water_level = reading.water_level;
        sensor.status = reading.status.as_str().to_string();
        sensor.last_reading_at = Some(reading.recorded_at);
        sensor.updated_at = Utc::now();
        let updated = sensor.clone();

        store.last_log_id += 1;
        let log = WaterLevelLog {
            id: store.last_log_id,
            sensor_id: id,
            water_level: reading.water_level,
            status: reading.status.as_str().to_string(),
            recorded_at: reading.recorded_at,
            created_at: Utc::now(),
        };
        store.logs.push(log);
        Ok(Some(updated))
    }

    async fn recent_logs(&self, id: i64, limit: i64) -> Result<Vec<WaterLevelLog>, AppError> {
        let mut logs = self.all_logs(id).await;
        logs.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at).then(b.id.cmp(&a.id)));
        logs.truncate(limit.max(0) as usize);
        Ok(logs)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let mut store = self.store.write().await;
        let before = store.sensors.len();
        store.sensors.retain(|s| s.id != id);
        if store.sensors.len() == before {
            return Ok(false);
        }
        store.logs.retain(|l| l.sensor_id != id);
        Ok(true)
    }
}

#[derive(Default)]
struct ZoneStore {
    last_id: i64,
    zones: Vec<FloodZone>,
}

#[derive(Default)]
pub struct MemoryFloodZoneRepository {
    store: RwLock<ZoneStore>,
}

#[async_trait]
impl FloodZoneRepository for MemoryFloodZoneRepository {
    async fn find(&self, id: i64) -> Result<Option<FloodZone>, AppError> {
        let store = self.store.read().await;
        Ok(store.zones.iter().find(|z| z.id == id).cloned())
    }

    async fn find_filtered(&self, filter: &FloodZoneFilter) -> Result<Vec<FloodZone>, AppError> {
        let store = self.store.read().await;
        let mut rows: Vec<FloodZone> = store
            .zones
            .iter()
            .filter(|z| filter.matches(z))
            .cloned()
            .collect();
        match filter.order {
            SortOrder::Id => rows.sort_by_key(|z| z.id),
            SortOrder::Name => rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id))),
        }
        Ok(rows)
    }

    async fn page(
        &self,
        filter: &FloodZoneFilter,
        page: PageRequest,
    ) -> Result<Page<FloodZone>, AppError> {
        let rows = self.find_filtered(filter).await?;
        Ok(paginate(rows, page))
    }

    async fn create(&self, new: NewFloodZone) -> Result<FloodZone, AppError> {
        let mut store = self.store.write().await;
        store.last_id += 1;
        let now = Utc::now();
        let zone = FloodZone {
            id: store.last_id,
            name: new.name,
            description: new.description,
            coordinates: Json(new.coordinates),
            risk_level: new.risk_level.as_str().to_string(),
            color: new.color,
            is_active: new.is_active,
            created_at: now,
            updated_at: now,
        };
        store.zones.push(zone.clone());
        Ok(zone)
    }

    async fn update(
        &self,
        id: i64,
        changes: FloodZoneChanges,
    ) -> Result<Option<FloodZone>, AppError> {
        let mut store = self.store.write().await;
        let Some(zone) = store.zones.iter_mut().find(|z| z.id == id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            zone.name = name;
        }
        if let Some(description) = changes.description {
            zone.description = description;
        }
        if let Some(coordinates) = changes.coordinates {
            zone.coordinates = Json(coordinates);
        }
        if let Some(risk_level) = changes.risk_level {
            zone.risk_level = risk_level.as_str().to_string();
        }
        if let Some(color) = changes.color {
            zone.color = color;
        }
        if let Some(is_active) = changes.is_active {
            zone.is_active = is_active;
        }
        zone.updated_at = Utc::now();
        Ok(Some(zone.clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let mut store = self.store.write().await;
        let before = store.zones.len();
        store.zones.retain(|z| z.id != id);
        Ok(store.zones.len() != before)
    }
}
