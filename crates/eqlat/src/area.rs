//! Grid-cell areas on the unit sphere.

use ndarray::Array2;
use tracing::info;

/// Latitudes closer than this to the equator are treated as exactly 0.
const EQUATOR_SNAP: f64 = 0.001;

const FULL_SPHERE: f64 = 4.0 * std::f64::consts::PI;

/// Snap near-zero latitudes onto the equator.
pub fn snap_equator(lats: &[f64]) -> Vec<f64> {
    lats.iter()
        .map(|&lat| if lat.abs() < EQUATOR_SNAP { 0.0 } else { lat })
        .collect()
}

/// Area (steradians) of each `(lat, lon)` cell.
///
/// A cell spans half a resolution step either side of its center; bands
/// are clipped at the poles. When the summed area differs from 4π by more
/// than 1e-4 the whole array is rescaled to 4π.
pub fn cell_areas(lats: &[f64], n_lons: usize, lat_res: f64, lon_res: f64, quiet: bool) -> Array2<f64> {
    let lats = snap_equator(lats);
    let half = 0.5 * lat_res;
    let dlon = lon_res.to_radians();

    let mut area = Array2::from_shape_fn((lats.len(), n_lons), |(j, _)| {
        let south = (lats[j] - half).clamp(-90.0, 90.0).to_radians();
        let north = (lats[j] + half).clamp(-90.0, 90.0).to_radians();
        dlon * (south.sin() - north.sin()).abs()
    });

    let total = area.sum();
    if (total - FULL_SPHERE).abs() > 1.0e-4 {
        if !quiet {
            info!(total, expected = FULL_SPHERE, "Rescaling grid cell areas to the full sphere");
        }
        area *= FULL_SPHERE / total;
    }
    area
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{assert_approx_eq, global_lat_axis};

    #[test]
    fn test_polar_cells_are_clipped() {
        // 361 half-degree latitudes centered on the poles sum to exactly 4π
        let area = cell_areas(&global_lat_axis(0.5), 576, 0.5, 0.625, true);
        assert_approx_eq!(area.sum(), FULL_SPHERE, 1e-9);
        assert!(area[[0, 0]] < area[[180, 0]]);
    }

    #[test]
    fn test_rescaled_when_incomplete() {
        // Regional grid covering a quarter of the latitudes
        let lats: Vec<f64> = (0..10).map(|j| 0.5 * j as f64).collect();
        let area = cell_areas(&lats, 4, 0.5, 90.0, true);
        assert_approx_eq!(area.sum(), FULL_SPHERE, 1e-9);
    }

    #[test]
    fn test_equator_snap() {
        assert_eq!(snap_equator(&[-0.0004, 0.5]), vec![0.0, 0.5]);
    }
}
