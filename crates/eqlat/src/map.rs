//! Per-timestamp equivalent latitude interpolators.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use tracing::info;

use crate::engine::{EqLatInput, EquivalentLatitudeEngine};
use crate::error::EqLatError;
use crate::interpolator::EqLatInterpolator;

/// Equivalent latitude interpolators keyed by timestamp.
///
/// Built once per run and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct EquivalentLatitudeMap {
    interpolators: BTreeMap<DateTime<Utc>, EqLatInterpolator>,
}

impl EquivalentLatitudeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute one interpolator per source, timestamps in parallel.
    ///
    /// `load` turns a source (typically a file path) into the engine input
    /// for that timestamp; it runs on the worker threads, so each timestamp
    /// only holds its own fields. `threads` of `None` uses rayon's default
    /// pool size.
    pub fn build<S, F, E>(
        engine: &EquivalentLatitudeEngine,
        sources: &[(DateTime<Utc>, S)],
        threads: Option<usize>,
        load: F,
    ) -> Result<Self, E>
    where
        S: Sync,
        F: Fn(&S) -> Result<EqLatInput, E> + Sync,
        E: From<EqLatError> + Send,
    {
        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(n) = threads {
            builder = builder.num_threads(n);
        }
        let pool = builder
            .build()
            .map_err(|e| EqLatError::ThreadPool(e.to_string()))?;

        info!(count = sources.len(), threads = pool.current_num_threads(), "Generating equivalent latitude functions");
        let start = std::time::Instant::now();

        let computed: Vec<(DateTime<Utc>, EqLatInterpolator)> = pool.install(|| {
            sources
                .par_iter()
                .map(|(time, source)| -> Result<(DateTime<Utc>, EqLatInterpolator), E> {
                    let input = load(source)?;
                    let interpolator = engine.compute(&input)?;
                    Ok((*time, interpolator))
                })
                .collect::<Result<_, E>>()
        })?;

        info!(
            count = computed.len(),
            elapsed_secs = start.elapsed().as_secs_f64(),
            "Equivalent latitude functions ready"
        );

        Ok(Self {
            interpolators: computed.into_iter().collect(),
        })
    }

    pub fn insert(&mut self, time: DateTime<Utc>, interpolator: EqLatInterpolator) {
        self.interpolators.insert(time, interpolator);
    }

    pub fn get(&self, time: &DateTime<Utc>) -> Option<&EqLatInterpolator> {
        self.interpolators.get(time)
    }

    /// The interpolator closest in time; ties go to the earlier one.
    pub fn nearest(&self, time: &DateTime<Utc>) -> Option<(&DateTime<Utc>, &EqLatInterpolator)> {
        let before = self.interpolators.range(..=*time).next_back();
        let after = self.interpolators.range(*time..).next();
        match (before, after) {
            (Some(b), Some(a)) => {
                if (*time - *b.0) <= (*a.0 - *time) {
                    Some(b)
                } else {
                    Some(a)
                }
            }
            (b, a) => b.or(a),
        }
    }

    pub fn times(&self) -> impl Iterator<Item = &DateTime<Utc>> {
        self.interpolators.keys()
    }

    pub fn len(&self) -> usize {
        self.interpolators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interpolators.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ndarray::Array2;

    fn flat(value: f64) -> EqLatInterpolator {
        EqLatInterpolator::new(vec![0.0, 1.0], vec![300.0, 400.0], Array2::from_elem((2, 2), value)).unwrap()
    }

    #[test]
    fn test_nearest() {
        let t0 = Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap();
        let t3 = Utc.with_ymd_and_hms(2018, 1, 1, 3, 0, 0).unwrap();
        let mut map = EquivalentLatitudeMap::new();
        assert!(map.nearest(&t0).is_none());
        map.insert(t0, flat(1.0));
        map.insert(t3, flat(2.0));

        let mid = Utc.with_ymd_and_hms(2018, 1, 1, 1, 30, 0).unwrap();
        assert_eq!(map.nearest(&mid).unwrap().0, &t0);
        let late = Utc.with_ymd_and_hms(2018, 1, 1, 2, 0, 0).unwrap();
        assert_eq!(map.nearest(&late).unwrap().0, &t3);
        assert_eq!(map.get(&t3).unwrap().evaluate(0.5, 350.0), 2.0);
        assert_eq!(map.len(), 2);
    }
}
