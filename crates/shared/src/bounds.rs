//! Geographic viewport rectangles.
//!
//! A viewport whose `east` edge is smaller than its `west` edge crosses the
//! antimeridian: its longitude span is `[west, 180] ∪ [-180, east]`.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::LatLng;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BoundsError {
    #[error("bounds contain a non-finite coordinate")]
    NonFinite,
    #[error("north ({north}) must be greater than south ({south})")]
    Inverted { north: f64, south: f64 },
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl ViewportBounds {
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Result<Self, BoundsError> {
        if ![north, south, east, west].iter().all(|v| v.is_finite()) {
            return Err(BoundsError::NonFinite);
        }
        for lat in [north, south] {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(BoundsError::LatitudeOutOfRange(lat));
            }
        }
        for lng in [east, west] {
            if !(-180.0..=180.0).contains(&lng) {
                return Err(BoundsError::LongitudeOutOfRange(lng));
            }
        }
        if north <= south {
            return Err(BoundsError::Inverted { north, south });
        }
        Ok(ViewportBounds {
            north,
            south,
            east,
            west,
        })
    }

    /// Build bounds from a map widget that reports continuous (unwrapped)
    /// longitudes, e.g. `east = 200` after panning across the antimeridian.
    /// Latitudes are clamped; a span of 360° or more covers the whole world.
    pub fn from_unwrapped(
        north: f64,
        south: f64,
        east: f64,
        west: f64,
    ) -> Result<Self, BoundsError> {
        if ![north, south, east, west].iter().all(|v| v.is_finite()) {
            return Err(BoundsError::NonFinite);
        }
        let north = north.clamp(-90.0, 90.0);
        let south = south.clamp(-90.0, 90.0);
        let (east, west) = if east - west >= 360.0 {
            (180.0, -180.0)
        } else {
            (wrap_longitude(east), wrap_longitude(west))
        };
        Self::new(north, south, east, west)
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.east < self.west
    }

    /// Inclusive containment test.
    pub fn contains(&self, point: LatLng) -> bool {
        if point.lat < self.south || point.lat > self.north {
            return false;
        }
        if self.crosses_antimeridian() {
            point.lng >= self.west || point.lng <= self.east
        } else {
            point.lng >= self.west && point.lng <= self.east
        }
    }

    pub fn center(&self) -> LatLng {
        let lat = (self.north + self.south) / 2.0;
        let lng = if self.crosses_antimeridian() {
            wrap_longitude((self.west + self.east + 360.0) / 2.0)
        } else {
            (self.west + self.east) / 2.0
        };
        LatLng::new(lat, lng)
    }

    /// The four query parameters of the hazard feed, in wire order.
    pub fn query_pairs(&self) -> [(&'static str, String); 4] {
        [
            ("north", self.north.to_string()),
            ("south", self.south.to_string()),
            ("east", self.east.to_string()),
            ("west", self.west.to_string()),
        ]
    }

    pub fn query_string(&self) -> String {
        self.query_pairs()
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl std::fmt::Display for ViewportBounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[N {} S {} E {} W {}]",
            self.north, self.south, self.east, self.west
        )
    }
}

/// Wrap a longitude into [-180, 180].
pub fn wrap_longitude(lng: f64) -> f64 {
    if (-180.0..=180.0).contains(&lng) {
        return lng;
    }
    let wrapped = (lng + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid maps 180 to -180; keep the eastern edge where it was
    if wrapped == -180.0 && lng > 0.0 {
        180.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sofia() -> ViewportBounds {
        ViewportBounds::new(43.0, 42.0, 24.0, 23.0).unwrap()
    }

    #[test]
    fn test_new_rejects_inverted_latitudes() {
        let err = ViewportBounds::new(42.0, 43.0, 24.0, 23.0).unwrap_err();
        assert_eq!(
            err,
            BoundsError::Inverted {
                north: 42.0,
                south: 43.0
            }
        );
    }

    #[test]
    fn test_new_rejects_equal_latitudes() {
        assert!(ViewportBounds::new(42.0, 42.0, 24.0, 23.0).is_err());
    }

    #[test]
    fn test_new_rejects_nan() {
        assert_eq!(
            ViewportBounds::new(f64::NAN, 42.0, 24.0, 23.0).unwrap_err(),
            BoundsError::NonFinite
        );
    }

    #[test]
    fn test_new_rejects_out_of_range_longitude() {
        assert_eq!(
            ViewportBounds::new(43.0, 42.0, 190.0, 23.0).unwrap_err(),
            BoundsError::LongitudeOutOfRange(190.0)
        );
    }

    #[test]
    fn test_contains_inclusive_edges() {
        let b = sofia();
        assert!(b.contains(LatLng::new(42.5, 23.5)));
        assert!(b.contains(LatLng::new(43.0, 24.0)));
        assert!(b.contains(LatLng::new(42.0, 23.0)));
        assert!(!b.contains(LatLng::new(43.01, 23.5)));
        assert!(!b.contains(LatLng::new(42.5, 22.99)));
    }

    #[test]
    fn test_antimeridian_wraparound() {
        let b = ViewportBounds::new(10.0, -10.0, -170.0, 170.0).unwrap();
        assert!(b.crosses_antimeridian());
        assert!(b.contains(LatLng::new(0.0, 175.0)));
        assert!(b.contains(LatLng::new(0.0, -175.0)));
        assert!(b.contains(LatLng::new(0.0, 180.0)));
        assert!(!b.contains(LatLng::new(0.0, 0.0)));
        assert!(!b.contains(LatLng::new(0.0, 160.0)));
    }

    #[test]
    fn test_center_across_antimeridian() {
        let b = ViewportBounds::new(10.0, -10.0, -170.0, 170.0).unwrap();
        let c = b.center();
        assert!(c.lat.abs() < 1e-9);
        assert!((c.lng.abs() - 180.0).abs() < 1e-9);

        let c = sofia().center();
        assert!((c.lat - 42.5).abs() < 1e-9);
        assert!((c.lng - 23.5).abs() < 1e-9);
    }

    #[test]
    fn test_query_string_order_and_format() {
        assert_eq!(sofia().query_string(), "north=43&south=42&east=24&west=23");
        let b = ViewportBounds::new(42.70125, 42.68, 23.3301, -0.5).unwrap();
        assert_eq!(
            b.query_string(),
            "north=42.70125&south=42.68&east=23.3301&west=-0.5"
        );
    }

    #[test]
    fn test_wrap_longitude() {
        assert_eq!(wrap_longitude(23.0), 23.0);
        assert_eq!(wrap_longitude(180.0), 180.0);
        assert!((wrap_longitude(190.0) - -170.0).abs() < 1e-9);
        assert!((wrap_longitude(-190.0) - 170.0).abs() < 1e-9);
        assert!((wrap_longitude(540.0) - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_from_unwrapped_crossing() {
        let b = ViewportBounds::from_unwrapped(10.0, -10.0, 190.0, 170.0).unwrap();
        assert!(b.crosses_antimeridian());
        assert!((b.east - -170.0).abs() < 1e-9);
        assert!((b.west - 170.0).abs() < 1e-9);
    }

    #[test]
    fn test_from_unwrapped_whole_world() {
        let b = ViewportBounds::from_unwrapped(95.0, -95.0, 400.0, -200.0).unwrap();
        assert_eq!(b.north, 90.0);
        assert_eq!(b.south, -90.0);
        assert_eq!(b.east, 180.0);
        assert_eq!(b.west, -180.0);
        assert!(!b.crosses_antimeridian());
    }
}
