use chrono::TimeDelta;

use crate::{cli::ThermalArgs, quantity::temperature::Celsius};

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Accumulates Arrhenius-weighted time above the baseline temperature.
///
/// Time at baseline + e-folding degrees counts e times as heavily as time
/// just above baseline, mirroring how calendar aging accelerates with
/// temperature. Time at or below the baseline is free.
pub struct ThermalTracker {
    args: ThermalArgs,
    stress_hours: f64,
}

impl ThermalTracker {
    #[must_use]
    pub const fn new(args: ThermalArgs) -> Self {
        Self { args, stress_hours: 0.0 }
    }

    pub fn update(&mut self, temperature: Option<Celsius>, dt: TimeDelta) {
        let Some(temperature) = temperature else { return };
        let excess = temperature.0 - self.args.baseline_celsius;
        if excess <= 0.0 {
            return;
        }
        let hours = dt.as_seconds_f64() / SECONDS_PER_HOUR;
        self.stress_hours += hours * (excess / self.args.e_folding_celsius).exp();
    }

    #[must_use]
    pub fn soh_thermal(&self) -> f64 {
        (100.0 - self.stress_hours / self.args.hours_per_percent).clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::health::test_args;

    fn tracker() -> ThermalTracker {
        ThermalTracker::new(test_args().thermal)
    }

    #[test]
    fn test_cool_operation_is_free() {
        let mut tracker = tracker();
        for _ in 0..1000 {
            tracker.update(Some(Celsius(25.0)), TimeDelta::hours(1));
            tracker.update(Some(Celsius(-10.0)), TimeDelta::hours(1));
        }
        assert_abs_diff_eq!(tracker.soh_thermal(), 100.0);
    }

    #[test]
    fn test_missing_temperature_is_skipped() {
        let mut tracker = tracker();
        tracker.update(None, TimeDelta::hours(1000));
        assert_abs_diff_eq!(tracker.soh_thermal(), 100.0);
    }

    #[test]
    fn test_heat_accumulates_exponentially() {
        // 100 hours at baseline + 10 °C weigh e·100 hours, i.e. e percent.
        let mut tracker = tracker();
        tracker.update(Some(Celsius(35.0)), TimeDelta::hours(100));
        assert_abs_diff_eq!(
            tracker.soh_thermal(),
            100.0 - std::f64::consts::E,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_hotter_is_worse_than_longer() {
        let mut hot = tracker();
        hot.update(Some(Celsius(55.0)), TimeDelta::hours(10));
        let mut warm = tracker();
        warm.update(Some(Celsius(35.0)), TimeDelta::hours(50));
        assert!(hot.soh_thermal() < warm.soh_thermal());
    }

    #[test]
    fn test_soh_is_floored_at_zero() {
        let mut tracker = tracker();
        tracker.update(Some(Celsius(105.0)), TimeDelta::hours(10_000));
        assert_abs_diff_eq!(tracker.soh_thermal(), 0.0);
    }
}
