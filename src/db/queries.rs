use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::models::{
    FloodZone, FloodZoneChanges, FloodZoneFilter, NewFloodZone, NewReading, NewSensor, Page,
    PageRequest, Sensor, SensorChanges, SensorFilter, SortOrder, WaterLevelLog,
};

const SENSOR_COLUMNS: &str = "id, name, code, latitude, longitude, status, water_level, \
     address, description, is_active, last_reading_at, created_at, updated_at";

const ZONE_COLUMNS: &str =
    "id, name, description, coordinates, risk_level, color, is_active, created_at, updated_at";

const LOG_COLUMNS: &str = "id, sensor_id, water_level, status, recorded_at, created_at";

/// Turn a search term into an ILIKE pattern that matches it literally.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn order_clause(order: SortOrder) -> &'static str {
    match order {
        SortOrder::Id => " ORDER BY id",
        SortOrder::Name => " ORDER BY name, id",
    }
}

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

fn push_sensor_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &SensorFilter) {
    qb.push(" WHERE TRUE");
    if let Some(active) = filter.is_active {
        qb.push(" AND is_active = ").push_bind(active);
    }
    if let Some(status) = &filter.status {
        qb.push(" AND status = ").push_bind(status.clone());
    }
    if let Some(term) = &filter.search {
        let pattern = like_pattern(term);
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR code ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR address ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// Get a single sensor by ID.
pub async fn get_sensor(pool: &PgPool, id: i64) -> Result<Option<Sensor>, sqlx::Error> {
    let sql = format!("SELECT {} FROM sensors WHERE id = $1", SENSOR_COLUMNS);
    sqlx::query_as::<_, Sensor>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// All sensors matching a filter.
pub async fn find_sensors(pool: &PgPool, filter: &SensorFilter) -> Result<Vec<Sensor>, sqlx::Error> {
    let mut qb = QueryBuilder::new(format!("SELECT {} FROM sensors", SENSOR_COLUMNS));
    push_sensor_filter(&mut qb, filter);
    qb.push(order_clause(filter.order));
    qb.build_query_as::<Sensor>().fetch_all(pool).await
}

/// One page of sensors matching a filter, plus the total match count.
pub async fn page_sensors(
    pool: &PgPool,
    filter: &SensorFilter,
    page: PageRequest,
) -> Result<Page<Sensor>, sqlx::Error> {
    let mut count = QueryBuilder::new("SELECT COUNT(*) FROM sensors");
    push_sensor_filter(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::new(format!("SELECT {} FROM sensors", SENSOR_COLUMNS));
    push_sensor_filter(&mut qb, filter);
    qb.push(order_clause(filter.order));
    qb.push(" LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());
    let items = qb.build_query_as::<Sensor>().fetch_all(pool).await?;

    Ok(Page {
        items,
        total,
        request: page,
    })
}

/// Whether a sensor other than `except` already uses `code`.
pub async fn sensor_code_taken(
    pool: &PgPool,
    code: &str,
    except: Option<i64>,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(
             SELECT 1 FROM sensors
             WHERE code = $1 AND ($2::BIGINT IS NULL OR id <> $2)
         )",
    )
    .bind(code)
    .bind(except)
    .fetch_one(pool)
    .await
}

/// Insert a new sensor.
pub async fn insert_sensor(pool: &PgPool, new: &NewSensor) -> Result<Sensor, sqlx::Error> {
    let sql = format!(
        "INSERT INTO sensors (
            name, code, latitude, longitude, status, water_level,
            address, description, is_active, last_reading_at, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW(), NOW())
        RETURNING {}",
        SENSOR_COLUMNS
    );
    sqlx::query_as::<_, Sensor>(&sql)
        .bind(&new.name)
        .bind(&new.code)
        .bind(new.latitude)
        .bind(new.longitude)
        .bind(new.status.as_str())
        .bind(new.water_level)
        .bind(&new.address)
        .bind(&new.description)
        .bind(new.is_active)
        .bind(new.last_reading_at)
        .fetch_one(pool)
        .await
}

/// Apply a partial update. Returns `None` if the sensor does not exist.
pub async fn update_sensor(
    pool: &PgPool,
    id: i64,
    changes: &SensorChanges,
) -> Result<Option<Sensor>, sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new("UPDATE sensors SET updated_at = NOW()");
    if let Some(name) = &changes.name {
        qb.push(", name = ").push_bind(name.clone());
    }
    if let Some(code) = &changes.code {
        qb.push(", code = ").push_bind(code.clone());
    }
    if let Some(latitude) = changes.latitude {
        qb.push(", latitude = ").push_bind(latitude);
    }
    if let Some(longitude) = changes.longitude {
        qb.push(", longitude = ").push_bind(longitude);
    }
    if let Some(status) = changes.status {
        qb.push(", status = ").push_bind(status.as_str());
    }
    if let Some(water_level) = changes.water_level {
        qb.push(", water_level = ").push_bind(water_level);
    }
    if let Some(address) = &changes.address {
        qb.push(", address = ").push_bind(address.clone());
    }
    if let Some(description) = &changes.description {
        qb.push(", description = ").push_bind(description.clone());
    }
    if let Some(is_active) = changes.is_active {
        qb.push(", is_active = ").push_bind(is_active);
    }
    if let Some(at) = changes.last_reading_at {
        qb.push(", last_reading_at = ").push_bind(at);
    }
    qb.push(" WHERE id = ").push_bind(id);
    qb.push(" RETURNING ").push(SENSOR_COLUMNS);

    qb.build_query_as::<Sensor>().fetch_optional(pool).await
}

/// Store a new reading on the sensor and append it to the log, atomically.
///
/// Returns `None` (and writes nothing) if the sensor does not exist.
pub async fn record_reading(
    pool: &PgPool,
    id: i64,
    reading: &NewReading,
) -> Result<Option<Sensor>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let sql = format!(
        "UPDATE sensors
         SET water_level = $2, status = $3, last_reading_at = $4, updated_at = NOW()
         WHERE id = $1
         RETURNING {}",
        SENSOR_COLUMNS
    );
    let sensor = sqlx::query_as::<_, Sensor>(&sql)
        .bind(id)
        .bind(reading.water_level)
        .bind(reading.status.as_str())
        .bind(reading.recorded_at)
        .fetch_optional(&mut *tx)
        .await?;

    let Some(sensor) = sensor else {
        tx.rollback().await?;
        return Ok(None);
    };

    sqlx::query(
        "INSERT INTO water_level_logs (sensor_id, water_level, status, recorded_at, created_at, updated_at)
         VALUES ($1, $2, $3, $4, NOW(), NOW())",
    )
    .bind(id)
    .bind(reading.water_level)
    .bind(reading.status.as_str())
    .bind(reading.recorded_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(Some(sensor))
}

/// Latest log rows for a sensor, most recent first.
pub async fn recent_logs(
    pool: &PgPool,
    sensor_id: i64,
    limit: i64,
) -> Result<Vec<WaterLevelLog>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM water_level_logs
         WHERE sensor_id = $1
         ORDER BY recorded_at DESC, id DESC
         LIMIT $2",
        LOG_COLUMNS
    );
    sqlx::query_as::<_, WaterLevelLog>(&sql)
        .bind(sensor_id)
        .bind(limit)
        .fetch_all(pool)
        .await
}

/// Delete a sensor; its log rows go with it (ON DELETE CASCADE).
pub async fn delete_sensor(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sensors WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ---------------------------------------------------------------------------
// Flood zones
// ---------------------------------------------------------------------------

fn push_zone_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &FloodZoneFilter) {
    qb.push(" WHERE TRUE");
    if let Some(active) = filter.is_active {
        qb.push(" AND is_active = ").push_bind(active);
    }
    if let Some(risk) = &filter.risk_level {
        qb.push(" AND risk_level = ").push_bind(risk.clone());
    }
    if let Some(term) = &filter.search {
        let pattern = like_pattern(term);
        qb.push(" AND (name ILIKE ").push_bind(pattern.clone());
        if filter.search_description {
            qb.push(" OR description ILIKE ").push_bind(pattern);
        }
        qb.push(")");
    }
}

/// Get a single flood zone by ID.
pub async fn get_zone(pool: &PgPool, id: i64) -> Result<Option<FloodZone>, sqlx::Error> {
    let sql = format!("SELECT {} FROM flood_zones WHERE id = $1", ZONE_COLUMNS);
    sqlx::query_as::<_, FloodZone>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// All flood zones matching a filter.
pub async fn find_zones(
    pool: &PgPool,
    filter: &FloodZoneFilter,
) -> Result<Vec<FloodZone>, sqlx::Error> {
    let mut qb = QueryBuilder::new(format!("SELECT {} FROM flood_zones", ZONE_COLUMNS));
    push_zone_filter(&mut qb, filter);
    qb.push(order_clause(filter.order));
    qb.build_query_as::<FloodZone>().fetch_all(pool).await
}

/// One page of flood zones matching a filter, plus the total match count.
pub async fn page_zones(
    pool: &PgPool,
    filter: &FloodZoneFilter,
    page: PageRequest,
) -> Result<Page<FloodZone>, sqlx::Error> {
    let mut count = QueryBuilder::new("SELECT COUNT(*) FROM flood_zones");
    push_zone_filter(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::new(format!("SELECT {} FROM flood_zones", ZONE_COLUMNS));
    push_zone_filter(&mut qb, filter);
    qb.push(order_clause(filter.order));
    qb.push(" LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());
    let items = qb.build_query_as::<FloodZone>().fetch_all(pool).await?;

    Ok(Page {
        items,
        total,
        request: page,
    })
}

/// Insert a new flood zone.
pub async fn insert_zone(pool: &PgPool, new: &NewFloodZone) -> Result<FloodZone, sqlx::Error> {
    let sql = format!(
        "INSERT INTO flood_zones (
            name, description, coordinates, risk_level, color, is_active, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
        RETURNING {}",
        ZONE_COLUMNS
    );
    sqlx::query_as::<_, FloodZone>(&sql)
        .bind(&new.name)
        .bind(&new.description)
        .bind(Json(&new.coordinates))
        .bind(new.risk_level.as_str())
        .bind(&new.color)
        .bind(new.is_active)
        .fetch_one(pool)
        .await
}

/// Apply a partial update. Returns `None` if the zone does not exist.
pub async fn update_zone(
    pool: &PgPool,
    id: i64,
    changes: &FloodZoneChanges,
) -> Result<Option<FloodZone>, sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new("UPDATE flood_zones SET updated_at = NOW()");
    if let Some(name) = &changes.name {
        qb.push(", name = ").push_bind(name.clone());
    }
    if let Some(description) = &changes.description {
        qb.push(", description = ").push_bind(description.clone());
    }
    if let Some(coordinates) = &changes.coordinates {
        qb.push(", coordinates = ").push_bind(Json(coordinates.clone()));
    }
    if let Some(risk_level) = changes.risk_level {
        qb.push(", risk_level = ").push_bind(risk_level.as_str());
    }
    if let Some(color) = &changes.color {
        qb.push(", color = ").push_bind(color.clone());
    }
    if let Some(is_active) = changes.is_active {
        qb.push(", is_active = ").push_bind(is_active);
    }
    qb.push(" WHERE id = ").push_bind(id);
    qb.push(" RETURNING ").push(ZONE_COLUMNS);

    qb.build_query_as::<FloodZone>().fetch_optional(pool).await
}

/// Delete a flood zone.
pub async fn delete_zone(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM flood_zones WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Jakarta"), "%Jakarta%");
        assert_eq!(like_pattern("50%_"), "%50\\%\\_%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_sensor_filter_sql() {
        let filter = SensorFilter {
            status: Some("danger".to_string()),
            search: Some("Jakarta".to_string()),
            is_active: Some(true),
            order: SortOrder::Name,
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT id FROM sensors");
        push_sensor_filter(&mut qb, &filter);
        qb.push(order_clause(filter.order));
        assert_eq!(
            qb.sql(),
            "SELECT id FROM sensors WHERE TRUE AND is_active = $1 AND status = $2 \
             AND (name ILIKE $3 OR code ILIKE $4 OR address ILIKE $5) ORDER BY name, id"
        );
    }

    #[test]
    fn test_zone_filter_sql_name_only() {
        let filter = FloodZoneFilter {
            search: Some("Pluit".to_string()),
            ..FloodZoneFilter::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT id FROM flood_zones");
        push_zone_filter(&mut qb, &filter);
        assert_eq!(
            qb.sql(),
            "SELECT id FROM flood_zones WHERE TRUE AND (name ILIKE $1)"
        );
    }
}
