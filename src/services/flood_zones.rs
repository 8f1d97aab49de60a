//! Flood zone use cases on top of [`FloodZoneRepository`].

use crate::db::models::{FloodZone, FloodZoneFilter, Page, PageRequest};
use crate::db::repository::FloodZoneRepository;
use crate::errors::AppError;
use crate::services::projection::{self, ZoneStats};
use crate::services::validation::{
    self, CreateFloodZoneRequest, UpdateFloodZoneRequest, ValidationErrors,
};

pub const MSG_NOT_FOUND: &str = "Zona banjir tidak ditemukan.";

fn not_found() -> AppError {
    AppError::NotFound(MSG_NOT_FOUND.to_string())
}

pub async fn get(repo: &dyn FloodZoneRepository, id: i64) -> Result<FloodZone, AppError> {
    repo.find(id).await?.ok_or_else(not_found)
}

/// Counts over active zones.
pub async fn statistics(repo: &dyn FloodZoneRepository) -> Result<ZoneStats, AppError> {
    let active = repo.find_filtered(&FloodZoneFilter::active()).await?;
    Ok(projection::zone_stats(&active))
}

pub async fn list(
    repo: &dyn FloodZoneRepository,
    filter: &FloodZoneFilter,
    page: PageRequest,
) -> Result<Page<FloodZone>, AppError> {
    repo.page(filter, page).await
}

pub async fn create(
    repo: &dyn FloodZoneRepository,
    req: CreateFloodZoneRequest,
) -> Result<FloodZone, AppError> {
    let mut errs = ValidationErrors::default();
    let new = validation::zone_create(req, &mut errs).ok_or(AppError::Validation(errs))?;

    let zone = repo.create(new).await?;
    tracing::info!(
        id = zone.id,
        risk_level = %zone.risk_level,
        points = zone.coordinates.len(),
        "Flood zone created"
    );
    Ok(zone)
}

/// Partial update; omitted coordinates keep the current polygon.
pub async fn update(
    repo: &dyn FloodZoneRepository,
    id: i64,
    req: UpdateFloodZoneRequest,
) -> Result<FloodZone, AppError> {
    get(repo, id).await?;

    let mut errs = ValidationErrors::default();
    let changes = validation::zone_update(req, &mut errs).ok_or(AppError::Validation(errs))?;

    let zone = repo.update(id, changes).await?.ok_or_else(not_found)?;
    tracing::info!(id, risk_level = %zone.risk_level, "Flood zone updated");
    Ok(zone)
}

pub async fn delete(repo: &dyn FloodZoneRepository, id: i64) -> Result<(), AppError> {
    if !repo.delete(id).await? {
        return Err(not_found());
    }
    tracing::info!(id, "Flood zone deleted");
    Ok(())
}
