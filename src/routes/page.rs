//! The map page shell.
//!
//! `GET /` renders a minimal HTML document whose `#app` element carries the
//! page component name and its props as attribute-escaped JSON. The client
//! bundle hydrates from that attribute.

use axum::extract::{Query, State};
use axum::response::Html;
use chrono::Utc;
use serde::Serialize;

use super::AppState;
use crate::errors::AppError;
use crate::helpers::escape_html_attr;
use crate::services::geometry::{LatLng, MapBounds};
use crate::services::map;
use crate::services::projection::{FloodZonePolygon, MapStats, SensorMarker};
use crate::services::view_state::{MapViewState, ViewParams};

const COMPONENT: &str = "Maps/Index";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MapPageProps {
    markers: Vec<SensorMarker>,
    polygons: Vec<FloodZonePolygon>,
    stats: MapStats,
    center: LatLng,
    bounds: MapBounds,
    view_state: MapViewState,
}

#[derive(Debug, Serialize)]
struct PageObject<'a, P> {
    component: &'a str,
    props: P,
    url: &'a str,
}

fn render_shell(page_json: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="id">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Peta Monitoring Banjir</title>
<link rel="stylesheet" href="/build/app.css">
<script type="module" src="/build/app.js" defer></script>
</head>
<body>
<div id="app" data-page="{}"></div>
</body>
</html>
"#,
        escape_html_attr(page_json)
    )
}

/// Map page with unfiltered markers and polygons; the query string only
/// shapes the initial view state.
pub async fn map_page(
    State(state): State<AppState>,
    Query(params): Query<ViewParams>,
) -> Result<Html<String>, AppError> {
    let initial = map::initial(state.sensors.as_ref(), state.zones.as_ref(), Utc::now()).await?;

    let page = PageObject {
        component: COMPONENT,
        props: MapPageProps {
            markers: initial.data.markers,
            polygons: initial.data.polygons,
            stats: initial.data.stats,
            center: initial.center,
            bounds: initial.bounds,
            view_state: params.into_state(),
        },
        url: "/",
    };
    let json = serde_json::to_string(&page)
        .map_err(|e| AppError::InternalError(format!("Failed to serialize page props: {}", e)))?;

    Ok(Html(render_shell(&json)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use super::render_shell;
    use crate::routes::test_support::{app, send};

    /// Pull the `data-page` attribute back out of the shell and decode it.
    fn page_props(html: &str) -> serde_json::Value {
        let start = html.find("data-page=\"").unwrap() + "data-page=\"".len();
        let end = start + html[start..].find('"').unwrap();
        let attr = html[start..end]
            .replace("&quot;", "\"")
            .replace("&#039;", "'")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&amp;", "&");
        serde_json::from_str(&attr).unwrap()
    }

    #[test]
    fn test_shell_escapes_attribute() {
        let html = render_shell(r#"{"name":"<b>\"A&B\"</b>"}"#);
        assert!(html.contains("&lt;b&gt;"));
        assert!(!html.contains("<b>"));
        assert_eq!(page_props(&html)["name"], "<b>\"A&B\"</b>");
    }

    #[tokio::test]
    async fn test_empty_map_page_uses_default_view() {
        let app = app();
        let (status, body) = send(&app, "GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);
        let page = page_props(body.as_str().unwrap());
        assert_eq!(page["component"], "Maps/Index");
        let props = &page["props"];
        assert!(props["markers"].as_array().unwrap().is_empty());
        assert_eq!(props["center"]["lat"], -6.2088);
        assert_eq!(props["viewState"]["activeTab"], "zones");
        assert!(props["viewState"]["modal"].is_null());
    }

    #[tokio::test]
    async fn test_query_shapes_view_state_not_data() {
        let app = app();
        send(
            &app,
            "POST",
            "/api/sensors",
            Some(json!({
                "name": "Pos Pluit",
                "code": "PLT-01",
                "latitude": -6.11,
                "longitude": 106.79,
                "water_level": 30
            })),
        )
        .await;

        let (status, body) = send(&app, "GET", "/?status=danger&sensor=1&search=pluit", None).await;
        assert_eq!(status, StatusCode::OK);
        let props = page_props(body.as_str().unwrap())["props"].clone();
        assert_eq!(props["markers"].as_array().unwrap().len(), 1);
        assert_eq!(props["stats"]["totalSensors"], 1);
        assert_eq!(props["viewState"]["filters"]["status"], "danger");
        assert_eq!(props["viewState"]["filters"]["search"], "pluit");
        assert_eq!(props["viewState"]["selectedSensor"], 1);
        assert_eq!(props["viewState"]["activeTab"], "sensors");
    }
}
