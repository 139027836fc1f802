//! One- and two-dimensional interpolation primitives.

use num_traits::Float;

/// Linear interpolation between two values by a fractional weight.
pub fn lin_interp<T: Float>(v0: T, v1: T, fac: T) -> T {
    v0 + (v1 - v0) * fac
}

/// Value at `x` of the line through `(x0, y0)` and `(x1, y1)`.
///
/// Extrapolates outside `[x0, x1]`. A degenerate segment returns `y0`.
pub fn linear_through<T: Float>(x0: T, y0: T, x1: T, y1: T, x: T) -> T {
    if x1 == x0 {
        return y0;
    }
    lin_interp(y0, y1, (x - x0) / (x1 - x0))
}

/// Piecewise-linear interpolation on increasing `xp`, clamped to the end
/// values outside the table.
pub fn interp_clamped<T: Float>(xp: &[T], fp: &[T], x: T) -> T {
    interp_with_edges(xp, fp, x, fp[0], fp[fp.len() - 1])
}

/// Piecewise-linear interpolation on increasing `xp`, NaN outside the table.
pub fn interp_or_nan<T: Float>(xp: &[T], fp: &[T], x: T) -> T {
    interp_with_edges(xp, fp, x, T::nan(), T::nan())
}

fn interp_with_edges<T: Float>(xp: &[T], fp: &[T], x: T, left: T, right: T) -> T {
    debug_assert_eq!(xp.len(), fp.len());
    let n = xp.len();
    if n == 0 || x.is_nan() {
        return T::nan();
    }
    if x < xp[0] {
        return left;
    }
    if x > xp[n - 1] {
        return right;
    }
    if x == xp[n - 1] {
        return fp[n - 1];
    }

    // First index with xp[i] > x
    let hi = xp.partition_point(|&v| v <= x);
    let lo = hi - 1;
    let fac = (x - xp[lo]) / (xp[hi] - xp[lo]);
    lin_interp(fp[lo], fp[hi], fac)
}

/// Bilinear interpolation inside one grid cell.
///
/// `corners` is `[[south_west, south_east], [north_west, north_east]]`.
/// A degenerate axis (identical bounds) takes the low corner on that axis.
/// Any NaN corner makes the result NaN.
pub fn bilinear_cell<T: Float>(
    corners: [[T; 2]; 2],
    lat_bounds: (T, T),
    lon_bounds: (T, T),
    lat: T,
    lon: T,
) -> T {
    if corners.iter().flatten().any(|v| v.is_nan()) {
        return T::nan();
    }

    let fac = |(lo, hi): (T, T), x: T| if hi == lo { T::zero() } else { (x - lo) / (hi - lo) };
    let fy = fac(lat_bounds, lat);
    let fx = fac(lon_bounds, lon);

    let south = lin_interp(corners[0][0], corners[0][1], fx);
    let north = lin_interp(corners[1][0], corners[1][1], fx);
    lin_interp(south, north, fy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;

    #[test]
    fn test_linear_through_extrapolates() {
        assert_eq!(linear_through(1000.0, 10.0, 900.0, 20.0, 950.0), 15.0);
        assert_eq!(linear_through(1000.0, 10.0, 900.0, 20.0, 1050.0), 5.0);
        assert_eq!(linear_through(1.0, 3.0, 1.0, 4.0, 7.0), 3.0);
    }

    #[test]
    fn test_interp_clamped_matches_table() {
        let xp = [0.0, 1.0, 3.0];
        let fp = [0.0, 10.0, 30.0];
        assert_eq!(interp_clamped(&xp, &fp, -1.0), 0.0);
        assert_eq!(interp_clamped(&xp, &fp, 0.5), 5.0);
        assert_eq!(interp_clamped(&xp, &fp, 1.0), 10.0);
        assert_eq!(interp_clamped(&xp, &fp, 2.0), 20.0);
        assert_eq!(interp_clamped(&xp, &fp, 3.0), 30.0);
        assert_eq!(interp_clamped(&xp, &fp, 9.0), 30.0);
    }

    #[test]
    fn test_interp_or_nan_outside() {
        let xp = [1.0_f64, 2.0];
        let fp = [1.0, 2.0];
        assert!(interp_or_nan(&xp, &fp, 0.9).is_nan());
        assert!(interp_or_nan(&xp, &fp, 2.1).is_nan());
        assert_eq!(interp_or_nan(&xp, &fp, 1.5), 1.5);
    }

    #[test]
    fn test_bilinear_cell() {
        // f = 2*lat + lon
        let corners = [[0.0 + 10.0, 0.0 + 12.0], [2.0 + 10.0, 2.0 + 12.0]];
        let v = bilinear_cell(corners, (0.0, 1.0), (10.0, 12.0), 0.25, 11.5);
        assert_approx_eq!(v, 0.5 + 11.5, 1e-12);

        let degenerate = bilinear_cell(corners, (0.0, 0.0), (10.0, 12.0), 0.0, 10.0);
        assert_eq!(degenerate, 10.0);

        let with_nan = bilinear_cell([[1.0, f64::NAN], [1.0, 1.0]], (0.0, 1.0), (0.0, 1.0), 0.1, 0.1);
        assert!(with_nan.is_nan());
    }
}
