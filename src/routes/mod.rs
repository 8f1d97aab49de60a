pub mod flood_zones;
pub mod health;
pub mod map;
pub mod page;
pub mod sensors;

use std::sync::Arc;

use axum::routing::{get, patch, post};
use axum::Router;
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::models::Page;
use crate::db::repository::{FloodZoneRepository, SensorRepository};

/// Shared state for the API and page handlers.
#[derive(Clone)]
pub struct AppState {
    pub sensors: Arc<dyn SensorRepository>,
    pub zones: Arc<dyn FloodZoneRepository>,
    /// Rows per page on CRUD list endpoints
    pub page_size: u32,
    /// Log rows included in sensor detail
    pub sensor_log_limit: i64,
}

/// Standard success envelope.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Always true
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
    /// Number of items in `data`, on list endpoints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
            total: None,
        }
    }

    pub fn with_message(message: &str, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.to_string()),
            data,
            total: None,
        }
    }
}

impl<T> ApiResponse<Vec<T>> {
    pub fn counted(data: Vec<T>) -> Self {
        let total = data.len();
        Self {
            success: true,
            message: None,
            data,
            total: Some(total),
        }
    }
}

/// Success envelope without data (deletes).
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
        }
    }
}

/// One page of rows.
#[derive(Debug, Serialize, ToSchema)]
pub struct PageBody<T> {
    pub current_page: u32,
    pub per_page: u32,
    pub last_page: u32,
    /// Rows matching the filter across all pages
    pub total: i64,
    /// 1-based index of the first row on this page; null when empty
    pub from: Option<i64>,
    /// 1-based index of the last row on this page; null when empty
    pub to: Option<i64>,
    pub data: Vec<T>,
}

impl<T> From<Page<T>> for PageBody<T> {
    fn from(page: Page<T>) -> Self {
        let last_page = page.last_page();
        let (from, to) = if page.items.is_empty() {
            (None, None)
        } else {
            let first = page.request.offset() + 1;
            (Some(first), Some(first + page.items.len() as i64 - 1))
        };
        Self {
            current_page: page.request.page,
            per_page: page.request.per_page,
            last_page,
            total: page.total,
            from,
            to,
            data: page.items,
        }
    }
}

/// Paginated CRUD listing with statistics over the active set.
#[derive(Debug, Serialize, ToSchema)]
pub struct ListResponse<T, S> {
    pub success: bool,
    pub data: PageBody<T>,
    /// Rows on this page
    pub total: usize,
    pub stats: S,
}

impl<T, S> ListResponse<T, S> {
    pub fn new(page: Page<T>, stats: S) -> Self {
        let data = PageBody::from(page);
        Self {
            success: true,
            total: data.data.len(),
            data,
            stats,
        }
    }
}

/// Page and `/api` routes that run on repositories alone.
///
/// The health check needs the database pool and is merged separately.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(page::map_page))
        .route(
            "/api/sensors",
            get(sensors::list_sensors).post(sensors::create_sensor),
        )
        .route("/api/sensors/markers", get(sensors::get_markers))
        .route(
            "/api/sensors/:id",
            get(sensors::get_sensor)
                .put(sensors::update_sensor)
                .delete(sensors::delete_sensor),
        )
        .route("/api/sensors/:id/status", patch(sensors::record_reading))
        .route(
            "/api/flood-zones",
            get(flood_zones::list_zones).post(flood_zones::create_zone),
        )
        .route("/api/flood-zones/polygons", get(flood_zones::get_polygons))
        .route(
            "/api/flood-zones/:id",
            get(flood_zones::get_zone)
                .put(flood_zones::update_zone)
                .delete(flood_zones::delete_zone),
        )
        .route("/api/map/data", get(map::get_map_data))
        .route("/api/map/sensors", get(map::get_sensor_list))
        .route("/api/map/zones", get(map::get_zone_list))
        .route("/api/map/dashboard", get(map::get_dashboard))
        .route("/api/map/view-state", post(map::reduce_view_state))
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use tower::ServiceExt;

    use super::{router, AppState};
    use crate::db::memory::{MemoryFloodZoneRepository, MemorySensorRepository};

    pub fn app() -> Router {
        router(AppState {
            sensors: Arc::new(MemorySensorRepository::default()),
            zones: Arc::new(MemoryFloodZoneRepository::default()),
            page_size: 10,
            sensor_log_limit: 24,
        })
    }

    /// Send one request and return the status and body (JSON, or a string
    /// for non-JSON bodies).
    pub async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(&bytes).into()));
        (status, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::PageRequest;

    #[test]
    fn test_page_body_indices() {
        let page = Page {
            items: vec!["k", "l"],
            total: 12,
            request: PageRequest::new(Some(2), 10),
        };
        let body = PageBody::from(page);
        assert_eq!(body.current_page, 2);
        assert_eq!(body.last_page, 2);
        assert_eq!(body.from, Some(11));
        assert_eq!(body.to, Some(12));
    }

    #[test]
    fn test_list_response_total_counts_page_rows() {
        let page = Page {
            items: vec![1, 2, 3],
            total: 23,
            request: PageRequest::new(Some(3), 10),
        };
        let resp = ListResponse::new(page, ());
        assert_eq!(resp.total, 3);
        assert_eq!(resp.data.total, 23);
    }

    #[test]
    fn test_empty_page_has_no_indices() {
        let page: Page<i32> = Page {
            items: vec![],
            total: 0,
            request: PageRequest::new(None, 10),
        };
        let body = PageBody::from(page);
        assert_eq!(body.last_page, 1);
        assert_eq!(body.from, None);
        assert_eq!(body.to, None);
    }
}
