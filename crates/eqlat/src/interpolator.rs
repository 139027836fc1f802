//! Lookup of equivalent latitude from (PV, PT) for one timestamp.

use grid_processor::lin_interp;
use ndarray::{Array2, Array3, Zip};

use crate::error::{EqLatError, Result};

/// Bilinear lookup table of equivalent latitude (degrees).
///
/// Rows follow the potential temperature grid, columns the potential
/// vorticity grid. Queries outside the table take the nearest edge value,
/// so results always stay within the table's range of [-90, 90].
#[derive(Debug, Clone, PartialEq)]
pub struct EqLatInterpolator {
    pv_grid: Vec<f64>,
    pt_grid: Vec<f64>,
    table: Array2<f64>,
}

/// Lower index and fraction of `x` within an increasing grid, clamped to the ends.
fn bracket(grid: &[f64], x: f64) -> (usize, f64) {
    let n = grid.len();
    if n == 1 || x <= grid[0] {
        return (0, 0.0);
    }
    if x >= grid[n - 1] {
        return (n - 2, 1.0);
    }
    let hi = grid.partition_point(|&v| v <= x);
    let lo = hi - 1;
    (lo, (x - grid[lo]) / (grid[hi] - grid[lo]))
}

impl EqLatInterpolator {
    /// Build from grids and a `(pt, pv)` table.
    pub fn new(pv_grid: Vec<f64>, pt_grid: Vec<f64>, table: Array2<f64>) -> Result<Self> {
        if table.dim() != (pt_grid.len(), pv_grid.len()) {
            return Err(EqLatError::ShapeMismatch {
                what: "equivalent latitude table",
                expected: vec![pt_grid.len(), pv_grid.len()],
                actual: table.shape().to_vec(),
            });
        }
        grid_processor::check_increasing("potential vorticity", &pv_grid)?;
        grid_processor::check_increasing("potential temperature", &pt_grid)?;
        Ok(Self { pv_grid, pt_grid, table })
    }

    pub fn pv_grid(&self) -> &[f64] {
        &self.pv_grid
    }

    pub fn pt_grid(&self) -> &[f64] {
        &self.pt_grid
    }

    /// Equivalent latitude for potential vorticity in PVU (1e-6 K m² kg⁻¹ s⁻¹)
    /// and potential temperature in K. NaN inputs give NaN.
    pub fn evaluate(&self, pv: f64, pt: f64) -> f64 {
        if pv.is_nan() || pt.is_nan() {
            return f64::NAN;
        }
        let (i, fx) = bracket(&self.pv_grid, pv);
        let (j, fy) = bracket(&self.pt_grid, pt);
        let j1 = (j + 1).min(self.pt_grid.len() - 1);
        let i1 = (i + 1).min(self.pv_grid.len() - 1);

        let low = lin_interp(self.table[[j, i]], self.table[[j, i1]], fx);
        let high = lin_interp(self.table[[j1, i]], self.table[[j1, i1]], fx);
        lin_interp(low, high, fy)
    }

    /// Equivalent latitude at every point of matching PV and PT fields.
    pub fn evaluate_field(&self, pv: &Array3<f64>, pt: &Array3<f64>) -> Result<Array3<f64>> {
        if pv.dim() != pt.dim() {
            return Err(EqLatError::ShapeMismatch {
                what: "potential temperature",
                expected: pv.shape().to_vec(),
                actual: pt.shape().to_vec(),
            });
        }
        Ok(Zip::from(pv).and(pt).map_collect(|&v, &t| self.evaluate(v, t)))
    }
}
