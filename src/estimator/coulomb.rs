use chrono::TimeDelta;

use crate::quantity::{charge::AmpereHours, current::Amperes};

/// Running charge balance from integrated current.
///
/// The balance drifts without bound under sensor bias, so it is bounded to
/// ±50% of the rated capacity and callers periodically re-anchor it from a
/// converged filter SOC.
pub struct CoulombCounter {
    rated_capacity: AmpereHours,
    charging_efficiency: f64,
    balance: AmpereHours,
}

impl CoulombCounter {
    #[must_use]
    pub const fn new(rated_capacity: AmpereHours, charging_efficiency: f64) -> Self {
        Self { rated_capacity, charging_efficiency, balance: AmpereHours::ZERO }
    }

    /// Integrate one interval and return the signed charge delta.
    ///
    /// Discharge current (positive) drains the balance; charge current adds
    /// back scaled by the charging efficiency, since charging is lossy.
    pub fn step(&mut self, current: Amperes, dt: TimeDelta) -> AmpereHours {
        let drained = current * dt;
        let delta =
            if drained.0 > 0.0 { -drained } else { -(drained * self.charging_efficiency) };
        let half = self.rated_capacity * 0.5;
        self.balance = (self.balance + delta).clamp(-half, half);
        delta
    }

    #[must_use]
    pub const fn balance(&self) -> AmpereHours {
        self.balance
    }

    /// Zero the accumulator against the caller's converged SOC estimate and
    /// return the discarded balance so that downstream charge references can
    /// be rebased.
    pub const fn re_anchor(&mut self) -> AmpereHours {
        let discarded = self.balance;
        self.balance = AmpereHours::ZERO;
        discarded
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn counter() -> CoulombCounter {
        CoulombCounter::new(AmpereHours::from(2.0), 0.95)
    }

    #[test]
    fn test_discharge_drains() {
        let mut counter = counter();
        // 1 A discharge for half an hour.
        let delta = counter.step(Amperes::from(1.0), TimeDelta::minutes(30));
        assert_abs_diff_eq!(delta.0, -0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(counter.balance().0, -0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_charging_is_lossy() {
        let mut counter = counter();
        let delta = counter.step(Amperes::from(-1.0), TimeDelta::hours(1));
        assert_abs_diff_eq!(delta.0, 0.95, epsilon = 1e-9);
    }

    #[test]
    fn test_balance_is_clamped() {
        let mut counter = counter();
        // A stuck-high current reading must not run the balance away.
        for _ in 0..100 {
            counter.step(Amperes::from(10.0), TimeDelta::hours(1));
        }
        assert_abs_diff_eq!(counter.balance().0, -1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_re_anchor() {
        let mut counter = counter();
        counter.step(Amperes::from(1.0), TimeDelta::hours(1));
        let discarded = counter.re_anchor();
        assert_abs_diff_eq!(discarded.0, -1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(counter.balance().0, 0.0);
    }
}
