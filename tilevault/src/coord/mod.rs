//! Geographic bounds and tile addressing math.
//!
//! Provides the rectangle geometry used for pack coverage decisions
//! (containment, intersection, coverage ratio) and the flipped-row
//! addressing convention used by the embedded tile databases.

use serde::{Deserialize, Serialize};

/// A geographic bounding box in degrees.
///
/// Latitude grows north, longitude grows east. A bounds value is assumed
/// to be normalized (`min_lat <= max_lat`, `min_lon <= max_lon`);
/// antimeridian-crossing regions are not modeled.
///
/// # Example
///
/// ```
/// use tilevault::coord::LatLonBounds;
///
/// let bounds = LatLonBounds::new(8.8, 38.6, 9.2, 39.0);
/// assert!(bounds.contains(9.0, 38.75));
/// assert!(!bounds.contains(10.0, 38.75));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLonBounds {
    /// Southern edge in degrees.
    pub min_lat: f64,
    /// Western edge in degrees.
    pub min_lon: f64,
    /// Northern edge in degrees.
    pub max_lat: f64,
    /// Eastern edge in degrees.
    pub max_lon: f64,
}

impl LatLonBounds {
    /// Create a new bounds value.
    pub fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }

    /// Check whether a point lies inside the bounds (edges inclusive).
    #[inline]
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lon)
    }

    /// Area of the rectangle in square degrees.
    ///
    /// Degenerate (zero-width or zero-height) bounds have zero area.
    #[inline]
    pub fn area(&self) -> f64 {
        let w = (self.max_lon - self.min_lon).max(0.0);
        let h = (self.max_lat - self.min_lat).max(0.0);
        w * h
    }

    /// Intersection with another bounds, or `None` if they do not overlap.
    pub fn intersection(&self, other: &LatLonBounds) -> Option<LatLonBounds> {
        let min_lat = self.min_lat.max(other.min_lat);
        let min_lon = self.min_lon.max(other.min_lon);
        let max_lat = self.max_lat.min(other.max_lat);
        let max_lon = self.max_lon.min(other.max_lon);

        if min_lat < max_lat && min_lon < max_lon {
            Some(LatLonBounds::new(min_lat, min_lon, max_lat, max_lon))
        } else {
            None
        }
    }

    /// Fraction of `region`'s area covered by these bounds, clamped to [0, 1].
    ///
    /// A degenerate region (zero area) counts as fully covered when its
    /// anchor point lies inside the bounds.
    pub fn coverage_of(&self, region: &LatLonBounds) -> f64 {
        let region_area = region.area();
        if region_area == 0.0 {
            return if self.contains(region.min_lat, region.min_lon) {
                1.0
            } else {
                0.0
            };
        }

        match self.intersection(region) {
            Some(overlap) => (overlap.area() / region_area).clamp(0.0, 1.0),
            None => 0.0,
        }
    }
}

/// Convert a requested tile row to the flipped vertical convention used
/// by the embedded tile databases.
///
/// Tile schemes addressed top-down (row 0 at the north edge) map to a
/// bottom-up store as `(2^zoom - 1) - row`.
#[inline]
pub fn flipped_row(zoom: u8, row: u32) -> u32 {
    let rows = 1u64 << zoom.min(32);
    (rows - 1).saturating_sub(u64::from(row)) as u32
}

/// Distance from `zoom` to the closest edge of `[min_zoom, max_zoom]`.
///
/// Zero when the zoom is inside the range. Used to rank packs whose zoom
/// range does not bracket the preferred zoom exactly.
#[inline]
pub fn zoom_range_distance(zoom: u8, min_zoom: u8, max_zoom: u8) -> u8 {
    if zoom < min_zoom {
        min_zoom - zoom
    } else if zoom > max_zoom {
        zoom - max_zoom
    } else {
        0
    }
}
