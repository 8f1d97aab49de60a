//! Sensor use cases on top of [`SensorRepository`].

use chrono::{DateTime, Utc};

use crate::db::models::{NewReading, Page, PageRequest, Sensor, SensorFilter};
use crate::db::repository::SensorRepository;
use crate::errors::AppError;
use crate::helpers::dec_to_f64;
use crate::services::classification::classify;
use crate::services::projection::{
    self, SensorDetail, SensorRecord, SensorStats, WaterLevelLogRecord,
};
use crate::services::validation::{
    self, CreateSensorRequest, RecordReadingRequest, UpdateSensorRequest, ValidationErrors,
    MSG_CODE_TAKEN,
};

pub const MSG_NOT_FOUND: &str = "Sensor tidak ditemukan.";

fn not_found() -> AppError {
    AppError::NotFound(MSG_NOT_FOUND.to_string())
}

pub async fn get(repo: &dyn SensorRepository, id: i64) -> Result<Sensor, AppError> {
    repo.find(id).await?.ok_or_else(not_found)
}

/// Sensor record with its latest `log_limit` readings, newest first.
pub async fn detail(
    repo: &dyn SensorRepository,
    id: i64,
    log_limit: i64,
) -> Result<SensorDetail, AppError> {
    let sensor = get(repo, id).await?;
    let logs = repo.recent_logs(id, log_limit).await?;
    Ok(SensorDetail {
        sensor: SensorRecord::from(&sensor),
        water_level_logs: logs.iter().map(WaterLevelLogRecord::from).collect(),
    })
}

/// Counts over active sensors.
pub async fn statistics(repo: &dyn SensorRepository) -> Result<SensorStats, AppError> {
    let active = repo.find_filtered(&SensorFilter::active()).await?;
    Ok(projection::sensor_stats(&active))
}

pub async fn list(
    repo: &dyn SensorRepository,
    filter: &SensorFilter,
    page: PageRequest,
) -> Result<Page<Sensor>, AppError> {
    repo.page(filter, page).await
}

/// Add a "code taken" error when another sensor already uses `code`.
async fn check_code(
    repo: &dyn SensorRepository,
    code: Option<&str>,
    except: Option<i64>,
    errs: &mut ValidationErrors,
) -> Result<(), AppError> {
    let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok(());
    };
    if repo.code_taken(code, except).await? {
        errs.add("code", MSG_CODE_TAKEN);
    }
    Ok(())
}

/// A write that lost a race for the code trips the UNIQUE constraint; it
/// reads back as the same 422 the pre-check gives.
fn code_conflict(err: AppError) -> AppError {
    match err {
        AppError::DatabaseError(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            tracing::warn!(constraint = ?e.constraint(), "Sensor code taken by a concurrent write");
            let mut errs = ValidationErrors::default();
            errs.add("code", MSG_CODE_TAKEN);
            AppError::Validation(errs)
        }
        other => other,
    }
}

pub async fn create(
    repo: &dyn SensorRepository,
    req: CreateSensorRequest,
    now: DateTime<Utc>,
) -> Result<Sensor, AppError> {
    let mut errs = ValidationErrors::default();
    check_code(repo, req.code.as_deref(), None, &mut errs).await?;
    let new = validation::sensor_create(req, now, &mut errs).ok_or(AppError::Validation(errs))?;

    let sensor = repo.create(new).await.map_err(code_conflict)?;
    tracing::info!(id = sensor.id, code = %sensor.code, status = %sensor.status, "Sensor created");
    Ok(sensor)
}

/// Partial update. A water level in the payload recomputes the status;
/// without one the stored status is left alone.
pub async fn update(
    repo: &dyn SensorRepository,
    id: i64,
    req: UpdateSensorRequest,
    now: DateTime<Utc>,
) -> Result<Sensor, AppError> {
    get(repo, id).await?;

    let mut errs = ValidationErrors::default();
    check_code(repo, req.code.as_deref(), Some(id), &mut errs).await?;
    let changes =
        validation::sensor_update(req, now, &mut errs).ok_or(AppError::Validation(errs))?;

    let sensor = repo
        .update(id, changes)
        .await
        .map_err(code_conflict)?
        .ok_or_else(not_found)?;
    tracing::info!(id, status = %sensor.status, "Sensor updated");
    Ok(sensor)
}

/// Record a new reading: level, status and reading time change on the
/// sensor and one log row is appended.
pub async fn record_reading(
    repo: &dyn SensorRepository,
    id: i64,
    req: RecordReadingRequest,
    now: DateTime<Utc>,
) -> Result<Sensor, AppError> {
    get(repo, id).await?;

    let mut errs = ValidationErrors::default();
    let water_level = validation::reading(req, &mut errs).ok_or(AppError::Validation(errs))?;
    let reading = NewReading {
        water_level,
        status: classify(dec_to_f64(water_level)),
        recorded_at: now,
    };

    let sensor = repo
        .record_reading(id, reading)
        .await?
        .ok_or_else(not_found)?;
    tracing::info!(
        id,
        water_level = %sensor.water_level,
        status = %sensor.status,
        "Sensor reading recorded"
    );
    Ok(sensor)
}

pub async fn delete(repo: &dyn SensorRepository, id: i64) -> Result<(), AppError> {
    if !repo.delete(id).await? {
        return Err(not_found());
    }
    tracing::info!(id, "Sensor deleted");
    Ok(())
}
