//! Bounding boxes and map framing.
//!
//! Zone bounds are the axis-aligned box around the polygon's vertices and
//! their "center" is the midpoint of that box, not the polygon centroid.
//! The client anchors popups and fly-to on this point, so keep it simple.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Map center used when there are no active sensors (central Jakarta).
pub const DEFAULT_CENTER: LatLng = LatLng {
    lat: -6.2088,
    lng: 106.8456,
};

/// Viewport used when there is nothing to frame (Jakarta metro area).
pub const DEFAULT_VIEWPORT: MapBounds = MapBounds {
    north_east: LatLng {
        lat: -6.0,
        lng: 107.0,
    },
    south_west: LatLng {
        lat: -6.4,
        lng: 106.6,
    },
};

/// A polygon vertex, serialized as a `[lat, lng]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate(pub f64, pub f64);

impl Coordinate {
    pub fn lat(&self) -> f64 {
        self.0
    }

    pub fn lng(&self) -> f64 {
        self.1
    }
}

impl From<Coordinate> for LatLng {
    fn from(c: Coordinate) -> Self {
        LatLng {
            lat: c.lat(),
            lng: c.lng(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Bounding box of a single polygon plus its midpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct Bounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
    pub center: LatLng,
}

/// Viewport covering everything drawn on the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MapBounds {
    pub north_east: LatLng,
    pub south_west: LatLng,
}

/// Running min/max over a set of points.
#[derive(Debug, Clone, Copy)]
struct Extent {
    north: f64,
    south: f64,
    east: f64,
    west: f64,
}

impl Extent {
    fn of<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = LatLng>,
    {
        points.into_iter().fold(None, |acc, p| {
            Some(match acc {
                None => Extent {
                    north: p.lat,
                    south: p.lat,
                    east: p.lng,
                    west: p.lng,
                },
                Some(e) => Extent {
                    north: e.north.max(p.lat),
                    south: e.south.min(p.lat),
                    east: e.east.max(p.lng),
                    west: e.west.min(p.lng),
                },
            })
        })
    }
}

/// Bounding box of a polygon's vertices and the midpoint of that box.
///
/// An empty list yields all zeros rather than failing.
pub fn summarize_bounds(coordinates: &[Coordinate]) -> Bounds {
    match Extent::of(coordinates.iter().copied().map(LatLng::from)) {
        Some(e) => Bounds {
            north: e.north,
            south: e.south,
            east: e.east,
            west: e.west,
            center: LatLng {
                lat: (e.north + e.south) / 2.0,
                lng: (e.east + e.west) / 2.0,
            },
        },
        None => Bounds {
            north: 0.0,
            south: 0.0,
            east: 0.0,
            west: 0.0,
            center: LatLng { lat: 0.0, lng: 0.0 },
        },
    }
}

/// Bounding box over every sensor position and every zone vertex together.
pub fn viewport_bounds<I>(points: I) -> MapBounds
where
    I: IntoIterator<Item = LatLng>,
{
    match Extent::of(points) {
        Some(e) => MapBounds {
            north_east: LatLng {
                lat: e.north,
                lng: e.east,
            },
            south_west: LatLng {
                lat: e.south,
                lng: e.west,
            },
        },
        None => DEFAULT_VIEWPORT,
    }
}

/// Arithmetic mean of the sensor positions.
pub fn map_center(positions: &[LatLng]) -> LatLng {
    if positions.is_empty() {
        return DEFAULT_CENTER;
    }
    let n = positions.len() as f64;
    let (lat_sum, lng_sum) = positions
        .iter()
        .fold((0.0, 0.0), |(lat, lng), p| (lat + p.lat, lng + p.lng));
    LatLng {
        lat: lat_sum / n,
        lng: lng_sum / n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kampung_melayu() -> Vec<Coordinate> {
        vec![
            Coordinate(-6.2200, 106.8600),
            Coordinate(-6.2200, 106.8700),
            Coordinate(-6.2300, 106.8700),
            Coordinate(-6.2300, 106.8600),
            Coordinate(-6.2200, 106.8600),
        ]
    }

    #[test]
    fn test_bounds_of_rectangle() {
        let b = summarize_bounds(&kampung_melayu());
        assert_eq!(b.north, -6.22);
        assert_eq!(b.south, -6.23);
        assert_eq!(b.east, 106.87);
        assert_eq!(b.west, 106.86);
        assert!((b.center.lat - -6.225).abs() < 1e-9);
        assert!((b.center.lng - 106.865).abs() < 1e-9);
    }

    #[test]
    fn test_center_is_box_midpoint_not_vertex_mean() {
        // Three vertices bunched at the west edge and one far east.
        let coords = vec![
            Coordinate(0.0, 0.0),
            Coordinate(1.0, 0.0),
            Coordinate(2.0, 0.0),
            Coordinate(1.0, 10.0),
        ];
        let b = summarize_bounds(&coords);
        assert_eq!(b.center.lat, 1.0);
        assert_eq!(b.center.lng, 5.0);
        // Vertex mean would give lng 2.5
        assert_ne!(b.center.lng, 2.5);
    }

    #[test]
    fn test_center_within_bounds() {
        let coords = vec![
            Coordinate(-6.1150, 106.7900),
            Coordinate(-6.1250, 106.8020),
            Coordinate(-6.1180, 106.7950),
        ];
        let b = summarize_bounds(&coords);
        assert!(b.south <= b.center.lat && b.center.lat <= b.north);
        assert!(b.west <= b.center.lng && b.center.lng <= b.east);
    }

    #[test]
    fn test_bounds_empty_is_zero() {
        let b = summarize_bounds(&[]);
        assert_eq!(b.north, 0.0);
        assert_eq!(b.south, 0.0);
        assert_eq!(b.east, 0.0);
        assert_eq!(b.west, 0.0);
        assert_eq!(b.center, LatLng { lat: 0.0, lng: 0.0 });
    }

    #[test]
    fn test_bounds_single_point() {
        let b = summarize_bounds(&[Coordinate(-6.2, 106.8)]);
        assert_eq!(b.north, b.south);
        assert_eq!(b.center, LatLng { lat: -6.2, lng: 106.8 });
    }

    #[test]
    fn test_viewport_union_of_sensors_and_zones() {
        let sensors = vec![LatLng {
            lat: -6.2589,
            lng: 106.7654,
        }];
        let zone_points = kampung_melayu().into_iter().map(LatLng::from);
        let vp = viewport_bounds(sensors.into_iter().chain(zone_points));
        assert_eq!(vp.north_east, LatLng { lat: -6.22, lng: 106.87 });
        assert_eq!(
            vp.south_west,
            LatLng {
                lat: -6.2589,
                lng: 106.7654
            }
        );
    }

    #[test]
    fn test_viewport_empty_uses_default() {
        assert_eq!(viewport_bounds(std::iter::empty()), DEFAULT_VIEWPORT);
    }

    #[test]
    fn test_map_center_mean() {
        let c = map_center(&[
            LatLng { lat: -6.0, lng: 106.0 },
            LatLng { lat: -6.4, lng: 107.0 },
        ]);
        assert!((c.lat - -6.2).abs() < 1e-9);
        assert!((c.lng - 106.5).abs() < 1e-9);
    }

    #[test]
    fn test_map_center_default() {
        assert_eq!(map_center(&[]), DEFAULT_CENTER);
    }

    #[test]
    fn test_viewport_serializes_camel_case() {
        let json = serde_json::to_value(DEFAULT_VIEWPORT).unwrap();
        assert_eq!(json["northEast"]["lat"], -6.0);
        assert_eq!(json["southWest"]["lng"], 106.6);
    }

    #[test]
    fn test_coordinate_serializes_as_pair() {
        let json = serde_json::to_string(&Coordinate(-6.2, 106.8)).unwrap();
        assert_eq!(json, "[-6.2,106.8]");
    }
}
