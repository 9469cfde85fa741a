use crate::{
    cli::ResistanceArgs,
    prelude::*,
    quantity::{current::Amperes, resistance::Ohms, voltage::Volts},
};

/// Tracks series-resistance growth from voltage sag under load.
///
/// Rest samples maintain a smoothed resting-voltage baseline; once a load
/// sample arrives, the sag against that baseline divided by the current is a
/// DC resistance observation, compared against the fresh-cell nominal.
pub struct ResistanceTracker {
    args: ResistanceArgs,
    nominal_r0: Ohms,
    resting_voltage: Option<Volts>,
    soh_resistance: f64,
}

impl ResistanceTracker {
    #[must_use]
    pub const fn new(args: ResistanceArgs, nominal_r0: Ohms) -> Self {
        Self { args, nominal_r0, resting_voltage: None, soh_resistance: 100.0 }
    }

    pub fn update(&mut self, voltage: Volts, current: Amperes) {
        let magnitude = current.abs();
        if magnitude <= Amperes::from_milliamps(self.args.rest_current_ma) {
            self.resting_voltage = Some(match self.resting_voltage {
                Some(resting) => {
                    resting * (1.0 - self.args.rest_smoothing)
                        + voltage * self.args.rest_smoothing
                }
                None => voltage,
            });
        } else if magnitude >= Amperes::from_milliamps(self.args.load_current_ma)
            && let Some(resting) = self.resting_voltage
        {
            let resistance = (resting - voltage).abs() / magnitude;
            let sample = (100.0 * (self.nominal_r0.0 / resistance.0)).clamp(0.0, 100.0);
            let blended = self.soh_resistance * (1.0 - self.args.blend_weight)
                + sample * self.args.blend_weight;
            self.soh_resistance = self.soh_resistance.min(blended);
            trace!(%resistance, sample, soh = self.soh_resistance, "resistance observed");
        }
    }

    #[must_use]
    pub const fn soh_resistance(&self) -> f64 {
        self.soh_resistance
    }
}
