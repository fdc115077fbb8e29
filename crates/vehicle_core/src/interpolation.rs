//! Piecewise-linear lookup tables for engine and torque-converter curves.

use crate::error::{ConfigError, SimulationError};
use serde::Serialize;

/// Piecewise-linear lookup table with a closed abscissa domain.
///
/// Queries outside `[xs[0], xs[n-1]]` are not extrapolated; they fail with
/// [`SimulationError::OutOfDomain`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupTable {
    name: &'static str,
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl LookupTable {
    pub fn new(name: &'static str, xs: Vec<f64>, ys: Vec<f64>) -> Result<Self, ConfigError> {
        if xs.len() < 2 {
            return Err(ConfigError::TooFewPoints { table: name });
        }
        if ys.len() != xs.len() {
            return Err(ConfigError::TableLength {
                table: name,
                expected: xs.len(),
                actual: ys.len(),
            });
        }
        if xs.iter().chain(ys.iter()).any(|v| !v.is_finite()) {
            let value = xs
                .iter()
                .chain(ys.iter())
                .copied()
                .find(|v| !v.is_finite())
                .unwrap_or(f64::NAN);
            return Err(ConfigError::NonFinite { field: name, value });
        }
        if xs.windows(2).any(|w| w[1] <= w[0]) {
            return Err(ConfigError::NonIncreasing { table: name });
        }
        Ok(Self { name, xs, ys })
    }

    /// Builds a table whose abscissae are evenly spaced over `[start, end]`.
    pub fn evenly_spaced(
        name: &'static str,
        start: f64,
        end: f64,
        ys: Vec<f64>,
    ) -> Result<Self, ConfigError> {
        let n = ys.len();
        if n < 2 {
            return Err(ConfigError::TooFewPoints { table: name });
        }
        let step = (end - start) / (n - 1) as f64;
        let mut xs: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
        // Pin the last abscissa so the domain end is exact.
        xs[n - 1] = end;
        Self::new(name, xs, ys)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }

    pub fn covers(&self, min: f64, max: f64) -> bool {
        let (lo, hi) = self.domain();
        lo <= min && max <= hi
    }

    pub fn eval(&self, x: f64) -> Result<f64, SimulationError> {
        let (min, max) = self.domain();
        if !(min..=max).contains(&x) {
            return Err(SimulationError::OutOfDomain {
                table: self.name,
                x,
                min,
                max,
            });
        }

        // First index whose abscissa is >= x; x == min lands on segment 0.
        let upper = self.xs.partition_point(|&xi| xi < x).max(1);
        let lower = upper - 1;
        let (x0, x1) = (self.xs[lower], self.xs[upper]);
        let (y0, y1) = (self.ys[lower], self.ys[upper]);
        let t = (x - x0) / (x1 - x0);
        Ok(y0 + t * (y1 - y0))
    }
}

#[cfg(test)]
mod tests {
    use super::LookupTable;
    use crate::error::{ConfigError, SimulationError};

    fn table() -> LookupTable {
        LookupTable::new("torque", vec![0.0, 1.0, 3.0], vec![10.0, 20.0, 0.0]).expect("table")
    }

    #[test]
    fn eval_hits_nodes_exactly() {
        let t = table();
        assert_eq!(t.eval(0.0).unwrap(), 10.0);
        assert_eq!(t.eval(1.0).unwrap(), 20.0);
        assert_eq!(t.eval(3.0).unwrap(), 0.0);
    }

    #[test]
    fn eval_interpolates_linearly_between_nodes() {
        let t = table();
        assert!((t.eval(0.5).unwrap() - 15.0).abs() < 1e-12);
        assert!((t.eval(2.0).unwrap() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn eval_outside_domain_is_an_error() {
        let t = table();
        let err = t.eval(3.5).expect_err("above domain");
        assert_eq!(
            err,
            SimulationError::OutOfDomain {
                table: "torque",
                x: 3.5,
                min: 0.0,
                max: 3.0,
            }
        );
        assert!(t.eval(-1e-9).is_err());
        assert!(t.eval(f64::NAN).is_err());
    }

    #[test]
    fn new_rejects_malformed_tables() {
        assert_eq!(
            LookupTable::new("t", vec![0.0], vec![1.0]),
            Err(ConfigError::TooFewPoints { table: "t" })
        );
        assert_eq!(
            LookupTable::new("t", vec![0.0, 1.0], vec![1.0]),
            Err(ConfigError::TableLength {
                table: "t",
                expected: 2,
                actual: 1,
            })
        );
        assert_eq!(
            LookupTable::new("t", vec![0.0, 0.0], vec![1.0, 2.0]),
            Err(ConfigError::NonIncreasing { table: "t" })
        );
        assert!(matches!(
            LookupTable::new("t", vec![0.0, 1.0], vec![1.0, f64::INFINITY]),
            Err(ConfigError::NonFinite { .. })
        ));
    }

    #[test]
    fn evenly_spaced_spans_requested_domain() {
        let t = LookupTable::evenly_spaced("k", 0.0, 1.0, vec![4.0, 3.0, 2.0, 1.0]).unwrap();
        assert_eq!(t.domain(), (0.0, 1.0));
        assert!((t.eval(1.0 / 3.0).unwrap() - 3.0).abs() < 1e-12);
        assert!(t.covers(0.0, 0.9));
        assert!(!t.covers(-0.1, 0.9));
    }
}
