use std::collections::VecDeque;

use crate::cli::RulArgs;

const HISTORY_CAPACITY: usize = 256;

/// Extrapolates the blended SOH trend to the end-of-life threshold.
///
/// A least-squares slope over the recent SOH history projects when the cell
/// crosses the end-of-life line. No estimate is produced until enough history
/// exists, and a flat or improving trend yields none either.
pub struct RulEstimator {
    args: RulArgs,
    /// Recent `(elapsed hours, SOH percent)` observations, oldest first.
    history: VecDeque<(f64, f64)>,
}

impl RulEstimator {
    #[must_use]
    pub const fn new(args: RulArgs) -> Self {
        Self { args, history: VecDeque::new() }
    }

    pub fn record(&mut self, elapsed_hours: f64, soh: f64) {
        if self.history.len() == HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back((elapsed_hours, soh));
    }

    #[must_use]
    pub fn rul_days(&self) -> Option<f64> {
        let (_, latest_soh) = *self.history.back()?;
        if self.history.len() < self.args.min_history {
            return None;
        }
        if latest_soh <= self.args.eol_soh_percent {
            return Some(0.0);
        }

        let slope = self.slope()?;
        if slope >= -1e-9 {
            // Flat or improving: extrapolation is meaningless.
            return None;
        }
        let hours = (latest_soh - self.args.eol_soh_percent) / -slope;
        Some((hours / 24.0).min(self.args.max_days))
    }

    /// Least-squares SOH slope in percent per hour.
    #[allow(clippy::cast_precision_loss)]
    fn slope(&self) -> Option<f64> {
        let n = self.history.len() as f64;
        let (sum_t, sum_soh) = self
            .history
            .iter()
            .fold((0.0, 0.0), |(t, s), (hours, soh)| (t + hours, s + soh));
        let (mean_t, mean_soh) = (sum_t / n, sum_soh / n);
        let (numerator, denominator) =
            self.history.iter().fold((0.0, 0.0), |(num, den), (hours, soh)| {
                let dt = hours - mean_t;
                (num + dt * (soh - mean_soh), den + dt * dt)
            });
        (denominator > f64::EPSILON).then(|| numerator / denominator)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::health::test_args;

    fn estimator() -> RulEstimator {
        RulEstimator::new(test_args().rul)
    }

    #[test]
    fn test_no_estimate_without_history() {
        let mut estimator = estimator();
        for step in 0..10 {
            estimator.record(f64::from(step), 99.0);
        }
        assert!(estimator.rul_days().is_none());
    }

    #[test]
    fn test_flat_trend_yields_no_estimate() {
        let mut estimator = estimator();
        for step in 0..100 {
            estimator.record(f64::from(step), 95.0);
        }
        assert!(estimator.rul_days().is_none());
    }

    #[test]
    fn test_linear_decay_extrapolates_to_eol() {
        // 0.01% per hour from 95%: 15 points to the 80% line, 1500 hours.
        let mut estimator = estimator();
        for step in 0..100 {
            let hours = f64::from(step);
            estimator.record(hours, 95.0 - 0.01 * hours);
        }
        let days = estimator.rul_days().unwrap();
        // The latest sample sits at 94.01%, 1401 hours from the line.
        assert_abs_diff_eq!(days, 1401.0 / 24.0, epsilon = 1e-6);
    }

    #[test]
    fn test_past_eol_reports_zero() {
        let mut estimator = estimator();
        for step in 0..100 {
            estimator.record(f64::from(step), 79.0);
        }
        assert_abs_diff_eq!(estimator.rul_days().unwrap(), 0.0);
    }

    #[test]
    fn test_barely_decaying_trend_is_capped() {
        // 1e-5% per hour would extrapolate to centuries.
        let mut estimator = estimator();
        for step in 0..100 {
            let hours = f64::from(step);
            estimator.record(hours, 95.0 - 1e-5 * hours);
        }
        assert_abs_diff_eq!(estimator.rul_days().unwrap(), 3650.0);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut estimator = estimator();
        for step in 0..10_000 {
            estimator.record(f64::from(step), 95.0 - 0.001 * f64::from(step));
        }
        assert_eq!(estimator.history.len(), HISTORY_CAPACITY);
        assert!(estimator.rul_days().is_some());
    }
}
