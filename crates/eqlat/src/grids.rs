//! Non-uniform sampling grids for potential temperature and vorticity.

/// `start + i * step` for every `i` with the value strictly below `stop`.
fn stepped(start: f64, stop: f64, step: f64) -> impl Iterator<Item = f64> {
    let n = ((stop - start) / step).ceil().max(0.0) as usize;
    (0..n).map(move |i| start + i as f64 * step)
}

/// Sort and drop values that repeat within floating point noise.
fn sorted_unique(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(f64::total_cmp);
    values.dedup_by(|a, b| (*a - *b).abs() < 1.0e-9);
    values
}

/// Potential temperature levels (K) to interpolate PV onto.
///
/// Spacing grows with altitude: 2 K below 300 K, then 5, 10, 20, 30 and
/// finally 100 K above 1000 K. The grid starts at the truncated minimum
/// and stops below the truncated maximum.
pub fn potential_temperature_grid(min_pt: f64, max_pt: f64) -> Vec<f64> {
    let lo = min_pt.trunc();
    let hi = max_pt.trunc();

    let values = stepped(lo, 300.0, 2.0)
        .chain(stepped(300.0, 350.0, 5.0))
        .chain(stepped(350.0, 500.0, 10.0))
        .chain(stepped(500.0, 750.0, 20.0))
        .chain(stepped(750.0, 1000.0, 30.0))
        .chain(stepped(1000.0, hi, 100.0))
        .collect();
    sorted_unique(values)
}

/// Potential vorticity sample points (PVU), densest around zero.
///
/// Always contains 0 and covers at least `[min_pv - 50, max_pv]`.
pub fn potential_vorticity_grid(min_pv: f64, max_pv: f64) -> Vec<f64> {
    let hundredths = (-100..100).map(|k| k as f64 * 0.01);
    let tenths_neg = (-100..-10).map(|k| k as f64 * 0.1);
    let tenths_pos = (10..100).map(|k| k as f64 * 0.1);

    let values = stepped((min_pv - 50.0).trunc(), -1000.0, 50.0)
        .chain(stepped(-1000.0, -500.0, 20.0))
        .chain(stepped(-500.0, -100.0, 10.0))
        .chain(stepped(-100.0, -10.0, 1.0))
        .chain(tenths_neg)
        .chain(hundredths)
        .chain(tenths_pos)
        .chain(stepped(10.0, 100.0, 1.0))
        .chain(stepped(100.0, 500.0, 10.0))
        .chain(stepped(500.0, 1000.0, 20.0))
        .chain(stepped(1000.0, (max_pv + 50.0).trunc(), 50.0))
        .chain(std::iter::once(0.0))
        .collect();
    sorted_unique(values)
}

/// `n` evenly spaced values from `start` to `stop` inclusive.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            let mut values: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
            values[n - 1] = stop;
            values
        }
    }
}
