//! Map page UI state as plain data.
//!
//! The page state is a single serializable value. Every interaction is an
//! event folded in by [`reduce`]. The server uses the same transitions to
//! build the initial state from the page's query string, and
//! `POST /api/map/view-state` folds client events with them.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::helpers::{filter_param, search_param};
use crate::services::classification::{RiskLevel, Status};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SidebarTab {
    Sensors,
    #[default]
    Zones,
}

/// The dialog currently open over the map, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Modal {
    CreateZone,
    #[serde(rename_all = "camelCase")]
    EditZone { zone_id: i64 },
    #[serde(rename_all = "camelCase")]
    DeleteZone { zone_id: i64 },
}

/// `None` filters serialize as `null` and mean "all".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct MapFilters {
    pub status: Option<Status>,
    pub risk_level: Option<RiskLevel>,
    pub search: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct MapViewState {
    pub active_tab: SidebarTab,
    pub filters: MapFilters,
    /// At most one of `selected_sensor` and `selected_zone` is set.
    pub selected_sensor: Option<i64>,
    pub selected_zone: Option<i64>,
    pub modal: Option<Modal>,
}

/// A map interaction, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MapViewEvent {
    #[serde(rename_all = "camelCase")]
    SelectSensor { sensor_id: i64 },
    #[serde(rename_all = "camelCase")]
    SelectZone { zone_id: i64 },
    ClearSelection,
    SwitchTab { tab: SidebarTab },
    FilterStatus { status: Option<Status> },
    #[serde(rename_all = "camelCase")]
    FilterRiskLevel { risk_level: Option<RiskLevel> },
    Search { text: String },
    OpenCreateZone,
    #[serde(rename_all = "camelCase")]
    OpenEditZone { zone_id: i64 },
    #[serde(rename_all = "camelCase")]
    OpenDeleteZone { zone_id: i64 },
    CloseModal,
    /// A zone was deleted; drop any reference to it.
    #[serde(rename_all = "camelCase")]
    ZoneDeleted { zone_id: i64 },
}

pub fn reduce(state: MapViewState, event: MapViewEvent) -> MapViewState {
    match event {
        MapViewEvent::SelectSensor { sensor_id } => MapViewState {
            active_tab: SidebarTab::Sensors,
            selected_sensor: Some(sensor_id),
            selected_zone: None,
            ..state
        },
        MapViewEvent::SelectZone { zone_id } => MapViewState {
            active_tab: SidebarTab::Zones,
            selected_sensor: None,
            selected_zone: Some(zone_id),
            ..state
        },
        MapViewEvent::ClearSelection => MapViewState {
            selected_sensor: None,
            selected_zone: None,
            ..state
        },
        MapViewEvent::SwitchTab { tab } => MapViewState {
            active_tab: tab,
            ..state
        },
        MapViewEvent::FilterStatus { status } => MapViewState {
            filters: MapFilters {
                status,
                ..state.filters
            },
            ..state
        },
        MapViewEvent::FilterRiskLevel { risk_level } => MapViewState {
            filters: MapFilters {
                risk_level,
                ..state.filters
            },
            ..state
        },
        MapViewEvent::Search { text } => MapViewState {
            filters: MapFilters {
                search: text.trim().to_string(),
                ..state.filters
            },
            ..state
        },
        MapViewEvent::OpenCreateZone => MapViewState {
            modal: Some(Modal::CreateZone),
            ..state
        },
        MapViewEvent::OpenEditZone { zone_id } => MapViewState {
            modal: Some(Modal::EditZone { zone_id }),
            ..state
        },
        MapViewEvent::OpenDeleteZone { zone_id } => MapViewState {
            modal: Some(Modal::DeleteZone { zone_id }),
            ..state
        },
        MapViewEvent::CloseModal => MapViewState {
            modal: None,
            ..state
        },
        MapViewEvent::ZoneDeleted { zone_id: id } => {
            let modal = match state.modal {
                Some(Modal::EditZone { zone_id } | Modal::DeleteZone { zone_id })
                    if zone_id == id =>
                {
                    None
                }
                other => other,
            };
            MapViewState {
                selected_zone: state.selected_zone.filter(|z| *z != id),
                modal,
                ..state
            }
        }
    }
}

/// Events applied in order to a starting state (default when omitted).
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ViewTransition {
    #[serde(default)]
    pub state: MapViewState,
    pub events: Vec<MapViewEvent>,
}

impl ViewTransition {
    pub fn apply(self) -> MapViewState {
        self.events.into_iter().fold(self.state, reduce)
    }
}

/// Query string of the map page.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ViewParams {
    /// Sensor to select on load
    pub sensor: Option<i64>,
    /// Zone to select on load (ignored when `sensor` is given)
    pub zone: Option<i64>,
    /// safe, warning, danger or all
    pub status: Option<String>,
    /// low, medium, high or all
    pub risk_level: Option<String>,
    pub search: Option<String>,
}

impl ViewParams {
    /// Events that reproduce these parameters from the default state.
    /// Unrecognised filter values are ignored.
    pub fn events(self) -> Vec<MapViewEvent> {
        let mut events = Vec::new();
        if let Some(status) = filter_param(self.status).and_then(|s| s.parse::<Status>().ok()) {
            events.push(MapViewEvent::FilterStatus {
                status: Some(status),
            });
        }
        if let Some(risk) =
            filter_param(self.risk_level).and_then(|r| r.parse::<RiskLevel>().ok())
        {
            events.push(MapViewEvent::FilterRiskLevel {
                risk_level: Some(risk),
            });
        }
        if let Some(search) = search_param(self.search) {
            events.push(MapViewEvent::Search { text: search });
        }
        match (self.sensor, self.zone) {
            (Some(sensor_id), _) => events.push(MapViewEvent::SelectSensor { sensor_id }),
            (None, Some(zone_id)) => events.push(MapViewEvent::SelectZone { zone_id }),
            (None, None) => {}
        }
        events
    }

    pub fn into_state(self) -> MapViewState {
        self.events()
            .into_iter()
            .fold(MapViewState::default(), reduce)
    }
}
