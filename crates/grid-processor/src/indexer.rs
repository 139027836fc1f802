//! Locating the grid cell that brackets a target location.

use serde::{Deserialize, Serialize};

use crate::types::GridAxes;

/// Indices of the 2x2 block of grid points bracketing a location.
///
/// `lon_hi` may be smaller than `lon_lo` when the block spans the date line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridCellBox {
    pub lat_lo: usize,
    pub lat_hi: usize,
    pub lon_lo: usize,
    pub lon_hi: usize,
}

impl GridCellBox {
    /// Whether the box wraps around the end of the longitude axis.
    pub fn wraps(&self) -> bool {
        self.lon_hi < self.lon_lo
    }

    /// Whether the target lies within the box on both axes.
    ///
    /// Coordinates on the box edges count as inside.
    pub fn brackets(&self, axes: &GridAxes, lat: f64, lon: f64) -> bool {
        let lat_ok = axes.lats[self.lat_lo] <= lat && lat <= axes.lats[self.lat_hi];

        let lon = axes.normalize_lon(lon);
        let lo = axes.lons[self.lon_lo];
        let mut hi = axes.lons[self.lon_hi];
        let mut target = lon;
        if self.wraps() {
            hi += 360.0;
            if target < lo {
                target += 360.0;
            }
        }
        let lon_ok = lo <= target && target <= hi;

        lat_ok && lon_ok
    }
}

/// Index of the axis value closest to `value`; ties resolve to the first.
pub fn nearest_index(axis: &[f64], value: f64) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, &v) in axis.iter().enumerate() {
        let dist = (v - value).abs();
        if dist < best_dist {
            best = i;
            best_dist = dist;
        }
    }
    best
}

/// Find the grid cell bracketing `(lat, lon)`.
///
/// A target exactly on a grid line resolves toward the southern/western
/// cell. Near the poles the latitude bracket collapses onto the edge row
/// instead of leaving the grid; longitude brackets wrap across the date
/// line. Targets outside the grid produce a box that does not bracket
/// them; callers decide whether to warn.
pub fn locate(axes: &GridAxes, lat: f64, lon: f64) -> GridCellBox {
    let lon = axes.normalize_lon(lon);
    let nlat = axes.n_lats();
    let nlon = axes.n_lons();

    let lat_n = nearest_index(&axes.lats, lat);
    let (lat_lo, lat_hi) = if lat > axes.lats[lat_n] {
        (lat_n, (lat_n + 1).min(nlat - 1))
    } else {
        (lat_n.saturating_sub(1), lat_n)
    };

    let lon_n = nearest_index(&axes.lons, lon);
    let (lon_lo, lon_hi) = if lon > axes.lons[lon_n] {
        (lon_n, (lon_n + 1) % nlon)
    } else {
        ((lon_n + nlon - 1) % nlon, lon_n)
    };

    GridCellBox {
        lat_lo,
        lat_hi,
        lon_lo,
        lon_hi,
    }
}
