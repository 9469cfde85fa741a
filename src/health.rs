pub mod cycle;
pub mod resistance;
pub mod rul;
pub mod thermal;

use chrono::TimeDelta;

pub use self::{
    cycle::{CycleRecord, CycleTracker},
    resistance::ResistanceTracker,
    rul::RulEstimator,
    thermal::ThermalTracker,
};
use crate::{
    cli::HealthArgs,
    quantity::{
        charge::AmpereHours,
        current::Amperes,
        resistance::Ohms,
        temperature::Celsius,
        voltage::Volts,
    },
};

/// Health snapshot exposed to external collaborators.
#[derive(Copy, Clone, serde::Serialize)]
pub struct HealthState {
    pub soh_capacity: f64,
    pub soh_resistance: f64,
    pub soh_thermal: f64,
    pub soh_blended: f64,
    pub full_cycles: u32,
    pub rul_days: Option<f64>,
}

/// Layered aging model: capacity fade from full cycles, resistance growth
/// against a resting baseline, and cumulative thermal stress.
///
/// The blend is deliberately pessimistic: every signal may only pull the
/// blended estimate down. The estimate never increases except through
/// [`HealthTracker::reinitialize`] on a cell replacement.
pub struct HealthTracker {
    args: HealthArgs,
    nominal_r0: Ohms,
    rated_capacity: AmpereHours,
    cycle: CycleTracker,
    resistance: ResistanceTracker,
    thermal: ThermalTracker,
    rul: RulEstimator,
    soh_blended: f64,
}

impl HealthTracker {
    #[must_use]
    pub fn new(args: HealthArgs, nominal_r0: Ohms, rated_capacity: AmpereHours) -> Self {
        Self {
            args,
            nominal_r0,
            rated_capacity,
            cycle: CycleTracker::new(args.cycle, rated_capacity),
            resistance: ResistanceTracker::new(args.resistance, nominal_r0),
            thermal: ThermalTracker::new(args.thermal),
            rul: RulEstimator::new(args.rul),
            soh_blended: 100.0,
        }
    }

    /// Fold one sample into every aging signal.
    ///
    /// An invalid temperature skips only the thermal sub-update; everything
    /// else proceeds.
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        voltage: Volts,
        current: Amperes,
        temperature: Option<Celsius>,
        soc: f64,
        balance: AmpereHours,
        dt: TimeDelta,
        elapsed_hours: f64,
    ) {
        self.cycle.update(voltage, soc, balance);
        self.resistance.update(voltage, current);
        self.thermal.update(temperature, dt);

        self.soh_blended = self
            .soh_blended
            .min(self.cycle.soh_capacity())
            .min(self.resistance.soh_resistance())
            .min(self.thermal.soh_thermal());
        self.rul.record(elapsed_hours, self.soh_blended);
    }

    #[must_use]
    pub fn state(&self) -> HealthState {
        HealthState {
            soh_capacity: self.cycle.soh_capacity(),
            soh_resistance: self.resistance.soh_resistance(),
            soh_thermal: self.thermal.soh_thermal(),
            soh_blended: self.soh_blended,
            full_cycles: self.cycle.full_cycles(),
            rul_days: self.rul.rul_days(),
        }
    }

    #[must_use]
    pub const fn is_cycle_open(&self) -> bool {
        self.cycle.is_open()
    }

    /// Shift stored charge references after the coulomb accumulator is re-anchored.
    pub fn rebase(&mut self, shift: AmpereHours) {
        self.cycle.rebase(shift);
    }

    /// Explicit reset on cell replacement; the only path on which SOH may rise.
    pub fn reinitialize(&mut self) {
        *self = Self::new(self.args, self.nominal_r0, self.rated_capacity);
    }
}

#[cfg(test)]
pub(crate) fn test_args() -> HealthArgs {
    use crate::cli::{CycleArgs, ResistanceArgs, RulArgs, ThermalArgs};

    HealthArgs {
        cycle: CycleArgs {
            open_voltage: 4.1,
            open_soc_percent: 90.0,
            close_voltage: 3.3,
            close_soc_percent: 20.0,
            interim_depth_fraction: 0.8,
            interim_weight: 0.3,
        },
        resistance: ResistanceArgs {
            rest_current_ma: 50.0,
            load_current_ma: 500.0,
            rest_smoothing: 0.3,
            blend_weight: 0.3,
        },
        thermal: ThermalArgs {
            baseline_celsius: 25.0,
            e_folding_celsius: 10.0,
            hours_per_percent: 100.0,
        },
        rul: RulArgs { eol_soh_percent: 80.0, min_history: 32, max_days: 3650.0 },
    }
}
