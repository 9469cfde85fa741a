use crate::{
    cli::FilterArgs,
    ocv::provider::OcvProvider,
    prelude::*,
    quantity::{current::Amperes, resistance::Ohms, temperature::Celsius, voltage::Volts},
};

/// Result of one predict/correct cycle.
#[derive(Copy, Clone)]
pub struct FilterUpdate {
    pub soc: f64,
    pub sigma: f64,
    pub r0: Ohms,
    /// Modelled terminal voltage; absent on predict-only cycles.
    pub v_predicted: Option<Volts>,
    /// Measured-minus-predicted residual; absent on predict-only cycles.
    pub innovation: Option<Volts>,
}

/// Scalar Kalman-style fusion of coulomb counting with voltage correction.
///
/// Pure coulomb counting drifts without bound under sensor bias, and
/// OCV-inverted SOC is corrupted by the ohmic drop under load; the filter
/// blends both continuously so the estimate shows no step at the rest/load
/// boundary.
pub struct SocFilter {
    args: FilterArgs,
    soc: f64,
    variance: f64,
    r0: Ohms,
    initialized: bool,
}

impl SocFilter {
    #[must_use]
    pub const fn new(args: FilterArgs, r0: Ohms) -> Self {
        Self { args, soc: 0.5, variance: args.initial_variance, r0, initialized: false }
    }

    /// Run one predict/correct cycle.
    ///
    /// `delta_soc` is the coulomb-counted SOC increment for the elapsed
    /// interval. While the OCV provider is not ready the cycle is
    /// predict-only and the variance inflates accordingly — by design, not a
    /// fault.
    pub fn step(
        &mut self,
        provider: &OcvProvider,
        delta_soc: f64,
        voltage: Volts,
        current: Amperes,
        temperature: Option<Celsius>,
    ) -> FilterUpdate {
        // Bootstrap from the first voltage reading via OCV inversion; the
        // fallback table is good enough to start from.
        if !self.initialized {
            self.soc = provider.soc_at(voltage, temperature);
            self.variance = self.args.initial_variance;
            self.initialized = true;
            debug!(soc = self.soc, "bootstrapped from voltage");
        }

        // Predict.
        self.soc = (self.soc + delta_soc).clamp(0.0, 1.0);
        self.variance =
            (self.variance + self.args.process_noise).min(self.args.variance_ceiling);

        // Correct.
        let mut v_predicted = None;
        let mut innovation = None;
        if provider.is_ready() {
            let (ocv, slope) = provider.ocv_at(self.soc, temperature);
            // Discharge current increases the ohmic drop.
            let predicted = ocv - current * self.r0;
            let residual = voltage - predicted;
            v_predicted = Some(predicted);
            innovation = Some(residual);

            // A flat OCV plateau carries no SOC information; correcting there
            // would divide by near-zero.
            if slope.0.abs() >= self.args.min_ocv_slope {
                let gain = self.variance * slope.0
                    / (slope.0 * slope.0 * self.variance + self.args.measurement_noise);
                self.soc = (self.soc + gain * residual.0).clamp(0.0, 1.0);
                self.variance *= 1.0 - gain * slope.0;
            }

            self.adapt_r0(residual, current);
        }

        self.variance =
            self.variance.clamp(self.args.variance_floor, self.args.variance_ceiling);

        FilterUpdate {
            soc: self.soc,
            sigma: self.variance.sqrt(),
            r0: self.r0,
            v_predicted,
            innovation,
        }
    }

    /// Nudge the series-resistance estimate toward `|innovation| / |current|`.
    ///
    /// Only near rest (small but non-negligible current): under heavy load the
    /// residual mixes in polarisation effects, and near zero current the
    /// division degenerates.
    fn adapt_r0(&mut self, innovation: Volts, current: Amperes) {
        let magnitude = current.abs();
        if magnitude < Amperes::from_milliamps(self.args.r0_min_current_ma)
            || magnitude > Amperes::from_milliamps(self.args.r0_rest_current_ma)
        {
            return;
        }
        let observed = innovation.abs() / magnitude;
        self.r0 = self.r0 * (1.0 - self.args.r0_smoothing) + observed * self.args.r0_smoothing;
    }

    /// Explicit reinitialization path, e.g. on a detected battery swap.
    pub fn reinitialize(&mut self, r0: Ohms) {
        self.soc = 0.5;
        self.variance = self.args.initial_variance;
        self.r0 = r0;
        self.initialized = false;
    }

    #[must_use]
    pub const fn soc(&self) -> f64 {
        self.soc
    }

    #[must_use]
    pub fn sigma(&self) -> f64 {
        self.variance.sqrt()
    }

    #[must_use]
    pub const fn r0(&self) -> Ohms {
        self.r0
    }
}
