// Flood Monitor API v0.1
use axum::http::Method;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod db;
mod errors;
mod helpers;
mod routes;
mod services;

use config::AppConfig;
use db::repository::{PgFloodZoneRepository, PgSensorRepository};
use routes::AppState;

/// Maximum number of connections in the database pool.
const DB_POOL_MAX_CONNECTIONS: u32 = 5;
/// Minimum number of connections kept alive in the database pool.
const DB_POOL_MIN_CONNECTIONS: u32 = 2;

/// Flood Monitor API OpenAPI document.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Flood Monitor API",
        version = "0.1.0",
        description = "Flood monitoring for Jakarta: water-level sensors classified into \
            safe/warning/danger, hand-drawn flood-risk zones, and the map projections, \
            statistics and alerts the monitoring map renders.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Sensors", description = "Water level sensors and readings"),
        (name = "Flood Zones", description = "Flood risk zone polygons"),
        (name = "Map", description = "Map data, sidebar lists and dashboard"),
    ),
    paths(
        routes::health::health_check,
        routes::sensors::list_sensors,
        routes::sensors::get_markers,
        routes::sensors::get_sensor,
        routes::sensors::create_sensor,
        routes::sensors::update_sensor,
        routes::sensors::record_reading,
        routes::sensors::delete_sensor,
        routes::flood_zones::list_zones,
        routes::flood_zones::get_polygons,
        routes::flood_zones::get_zone,
        routes::flood_zones::create_zone,
        routes::flood_zones::update_zone,
        routes::flood_zones::delete_zone,
        routes::map::get_map_data,
        routes::map::get_sensor_list,
        routes::map::get_zone_list,
        routes::map::get_dashboard,
        routes::map::reduce_view_state,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::MessageResponse,
            services::projection::SensorMarker,
            services::projection::FloodZonePolygon,
            services::projection::SensorRecord,
            services::projection::SensorDetail,
            services::projection::FloodZoneRecord,
            services::projection::MapStats,
            services::projection::DashboardSummary,
            services::map::MapData,
            services::view_state::MapViewState,
            services::view_state::MapViewEvent,
            services::view_state::ViewTransition,
            services::classification::Status,
            services::classification::RiskLevel,
            services::validation::CreateSensorRequest,
            services::validation::UpdateSensorRequest,
            services::validation::RecordReadingRequest,
            services::validation::CreateFloodZoneRequest,
            services::validation::UpdateFloodZoneRequest,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

/// Seed demo sensors and zones into empty tables. Failures are logged and
/// do not stop startup.
async fn seed_demo_data(state: &AppState) {
    match services::seed::seed_sensors(state.sensors.as_ref(), chrono::Utc::now()).await {
        Ok(0) => tracing::info!("Sensors already present, skipping sensor seed"),
        Ok(n) => tracing::info!("Seeded {} demo sensors with reading history", n),
        Err(e) => tracing::error!("Failed to seed demo sensors: {}", e),
    }
    match services::seed::seed_zones(state.zones.as_ref()).await {
        Ok(0) => tracing::info!("Flood zones already present, skipping zone seed"),
        Ok(n) => tracing::info!("Seeded {} demo flood zones", n),
        Err(e) => tracing::error!("Failed to seed demo flood zones: {}", e),
    }
}

fn app(state: AppState, pool: PgPool) -> Router {
    // CORS: the browser map client reads and edits sensors and zones
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(Any);

    Router::new()
        .merge(routes::health::router(pool))
        .merge(routes::router(state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flood_monitor_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    // Set up database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(DB_POOL_MAX_CONNECTIONS)
        .min_connections(DB_POOL_MIN_CONNECTIONS)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations completed");

    let state = AppState {
        sensors: Arc::new(PgSensorRepository::new(pool.clone())),
        zones: Arc::new(PgFloodZoneRepository::new(pool.clone())),
        page_size: config.page_size,
        sensor_log_limit: config.sensor_log_limit,
    };

    if config.seed_demo_data {
        seed_demo_data(&state).await;
    }

    let app = app(state, pool);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        for expected in [
            "/api/health",
            "/api/sensors",
            "/api/sensors/markers",
            "/api/sensors/{id}",
            "/api/sensors/{id}/status",
            "/api/flood-zones",
            "/api/flood-zones/polygons",
            "/api/flood-zones/{id}",
            "/api/map/data",
            "/api/map/sensors",
            "/api/map/zones",
            "/api/map/dashboard",
            "/api/map/view-state",
        ] {
            assert!(paths.contains(&expected), "missing {}", expected);
        }
    }
}
