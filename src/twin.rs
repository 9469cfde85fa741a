use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::{
    cli::TrackArgs,
    estimator::{CoulombCounter, SocFilter},
    health::{HealthState, HealthTracker},
    ocv::provider::{OcvProvider, ProviderStatus},
    prelude::*,
    quantity::{charge::AmpereHours, voltage::Volts},
    sample::Sample,
};

/// Longest interval, in seconds, a single sample is allowed to integrate
/// over. A stream gap larger than this would otherwise attribute the whole
/// outage to one current reading.
const MAX_SAMPLE_GAP_SECONDS: i64 = 10;

/// One output row per processed sample.
#[derive(Clone, Serialize)]
pub struct Estimate {
    pub timestamp: DateTime<Utc>,
    pub soc_percent: f64,
    pub soc_ekf_percent: f64,
    pub sigma_soc_percent: f64,
    pub v_predicted: Option<Volts>,
    pub innovation_mv: Option<f64>,
    pub r0_mohm: f64,
    pub full_cycles: u32,
    pub soh_capacity: f64,
    pub soh_resistance: f64,
    pub soh_thermal: f64,
    pub soh_blended: f64,
    pub rul_days: Option<f64>,
}

/// The live model of one physical cell.
///
/// Wires the coulomb counter, the fusion filter, and the aging trackers
/// together and drives them sample by sample.
pub struct CellTwin {
    provider: Arc<OcvProvider>,
    counter: CoulombCounter,
    filter: SocFilter,
    health: HealthTracker,
    rated_capacity: AmpereHours,
    charging_efficiency: f64,
    cadence: TimeDelta,
    re_anchor_every: u64,
    last_timestamp: Option<DateTime<Utc>>,
    started_at: Option<DateTime<Utc>>,
    samples_processed: u64,
}

impl CellTwin {
    #[must_use]
    pub fn new(args: &TrackArgs, provider: Arc<OcvProvider>) -> Self {
        let rated_capacity = args.cell.rated_capacity();
        #[allow(clippy::cast_possible_truncation)]
        let cadence = TimeDelta::milliseconds((args.cadence_seconds * 1000.0) as i64);
        Self {
            provider,
            counter: CoulombCounter::new(rated_capacity, args.cell.charging_efficiency),
            filter: SocFilter::new(args.filter, args.cell.nominal_r0),
            health: HealthTracker::new(args.health, args.cell.nominal_r0, rated_capacity),
            rated_capacity,
            charging_efficiency: args.cell.charging_efficiency,
            cadence,
            re_anchor_every: args.re_anchor_every,
            last_timestamp: None,
            started_at: None,
            samples_processed: 0,
        }
    }

    /// Fold one sample into the model and produce the next estimate.
    #[instrument(skip_all, fields(timestamp = %sample.timestamp), name = "stepping")]
    pub fn step(&mut self, sample: &Sample) -> Result<Estimate> {
        ensure!(
            sample.voltage.is_finite() && sample.voltage.0 > 0.0,
            "implausible voltage: {}",
            sample.voltage,
        );
        ensure!(sample.current_ma.is_finite(), "non-finite current: {}", sample.current_ma);

        let dt = self.interval(sample.timestamp);
        let started_at = *self.started_at.get_or_insert(sample.timestamp);
        let elapsed_hours = (sample.timestamp - started_at).as_seconds_f64() / 3600.0;
        let current = sample.current();
        let temperature = sample.temperature();

        let delta = self.counter.step(current, dt);
        let update = self.filter.step(
            &self.provider,
            delta / self.rated_capacity,
            sample.voltage,
            current,
            temperature,
        );

        self.samples_processed += 1;
        self.maybe_re_anchor();

        self.health.update(
            sample.voltage,
            current,
            temperature,
            update.soc,
            self.counter.balance(),
            dt,
            elapsed_hours,
        );
        self.last_timestamp = Some(sample.timestamp);

        let health = self.health.state();
        Ok(Estimate {
            timestamp: sample.timestamp,
            soc_percent: update.soc * 100.0,
            soc_ekf_percent: update.soc * 100.0,
            sigma_soc_percent: update.sigma * 100.0,
            v_predicted: update.v_predicted,
            innovation_mv: update.innovation.map(Volts::as_millivolts),
            r0_mohm: update.r0.as_milliohms(),
            full_cycles: health.full_cycles,
            soh_capacity: health.soh_capacity,
            soh_resistance: health.soh_resistance,
            soh_thermal: health.soh_thermal,
            soh_blended: health.soh_blended,
            rul_days: health.rul_days,
        })
    }

    /// Elapsed time covered by this sample.
    ///
    /// Out-of-order timestamps integrate nothing, and long gaps are capped so
    /// that one reading never stands in for minutes of unknown current.
    fn interval(&self, timestamp: DateTime<Utc>) -> TimeDelta {
        self.last_timestamp.map_or(self.cadence, |previous| {
            (timestamp - previous)
                .clamp(TimeDelta::zero(), TimeDelta::seconds(MAX_SAMPLE_GAP_SECONDS))
        })
    }

    /// Periodically zero the coulomb accumulator against the converged filter
    /// SOC so that sensor bias cannot accumulate. Skipped while a full cycle
    /// is open, since closing that cycle needs a consistent charge reference.
    fn maybe_re_anchor(&mut self) {
        if self.re_anchor_every == 0
            || self.samples_processed % self.re_anchor_every != 0
            || self.health.is_cycle_open()
        {
            return;
        }
        let discarded = self.counter.re_anchor();
        self.health.rebase(discarded);
        debug!(%discarded, "re-anchored the coulomb accumulator");
    }

    /// Full reset, e.g. after a physical cell replacement.
    pub fn reinitialize(&mut self) {
        self.counter = CoulombCounter::new(self.rated_capacity, self.charging_efficiency);
        self.filter.reinitialize(self.provider.r0());
        self.health.reinitialize();
        self.last_timestamp = None;
        self.started_at = None;
        self.samples_processed = 0;
        info!("reinitialized");
    }

    #[must_use]
    pub fn status(&self) -> ProviderStatus {
        self.provider.status()
    }

    #[must_use]
    pub const fn samples_processed(&self) -> u64 {
        self.samples_processed
    }

    #[must_use]
    pub const fn soc(&self) -> f64 {
        self.filter.soc()
    }

    #[must_use]
    pub const fn balance(&self) -> AmpereHours {
        self.counter.balance()
    }

    #[must_use]
    pub fn health_state(&self) -> HealthState {
        self.health.state()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::Duration;

    use super::*;
    use crate::{
        cli::{CellArgs, FilterArgs, ModelArgs},
        health::test_args,
        ocv::{provider::Source, simulation::ParameterSet, table::OcvTable},
        quantity::resistance::Ohms,
    };

    fn track_args() -> TrackArgs {
        TrackArgs {
            input: None,
            cadence_seconds: 2.0,
            re_anchor_every: 3600,
            summary: false,
            cell: CellArgs {
                rated_capacity_mah: 2000.0,
                charging_efficiency: 0.95,
                nominal_r0: Ohms::from(0.08),
            },
            model: ModelArgs {
                parameter_set: ParameterSet::Chen2020,
                cache_path: "unused.json".into(),
                build_timeout_seconds: 300,
            },
            filter: FilterArgs {
                process_noise: 1e-5,
                measurement_noise: 2.5e-5,
                initial_variance: 0.01,
                variance_floor: 1e-8,
                variance_ceiling: 0.25,
                min_ocv_slope: 1e-3,
                r0_min_current_ma: 50.0,
                r0_rest_current_ma: 500.0,
                r0_smoothing: 0.1,
            },
            health: test_args(),
        }
    }

    fn provider() -> Arc<OcvProvider> {
        Arc::new(OcvProvider::new(ParameterSet::Chen2020, AmpereHours::from(2.0)))
    }

    fn sample(at: DateTime<Utc>, voltage: f64, current_ma: f64) -> Sample {
        Sample { timestamp: at, voltage: Volts::from(voltage), current_ma, temperature: Some(25.0) }
    }

    #[test]
    fn test_rejects_implausible_samples() {
        let mut twin = CellTwin::new(&track_args(), provider());
        let at = Utc::now();
        assert!(twin.step(&sample(at, f64::NAN, 0.0)).is_err());
        assert!(twin.step(&sample(at, -1.0, 0.0)).is_err());
        assert!(twin.step(&sample(at, 3.8, f64::INFINITY)).is_err());
        assert_eq!(twin.samples_processed(), 0);
    }

    #[test]
    fn test_long_gap_is_capped() {
        let mut twin = CellTwin::new(&track_args(), provider());
        let at = Utc::now();
        let first = twin.step(&sample(at, 3.80, 1000.0)).unwrap();
        // An hour-long gap at 1 A would naively drop SOC by 50%; the cap
        // limits the integration to 10 seconds.
        let second = twin.step(&sample(at + Duration::hours(1), 3.80, 1000.0)).unwrap();
        assert!(
            (first.soc_percent - second.soc_percent).abs() < 1.0,
            "SOC jumped from {} to {}",
            first.soc_percent,
            second.soc_percent,
        );
    }

    #[test]
    fn test_out_of_order_sample_integrates_nothing() {
        let mut twin = CellTwin::new(&track_args(), provider());
        let at = Utc::now();
        twin.step(&sample(at, 3.80, 0.0)).unwrap();
        let balance_before = twin.balance();
        twin.step(&sample(at - Duration::seconds(5), 3.80, 1000.0)).unwrap();
        assert_abs_diff_eq!(twin.balance().0, balance_before.0);
    }

    #[test]
    fn test_table_swap_does_not_step_the_estimate() {
        let provider = provider();
        let mut twin = CellTwin::new(&track_args(), Arc::clone(&provider));
        let at = Utc::now();
        let before = twin.step(&sample(at, 3.80, 0.0)).unwrap();
        assert!(before.v_predicted.is_none(), "no correction before the model is ready");

        provider.install(OcvTable::fallback(), Source::Simulated, Ohms::from(0.062));

        let after = twin.step(&sample(at + Duration::seconds(2), 3.80, 0.0)).unwrap();
        assert!(after.v_predicted.is_some());
        assert!(
            (after.soc_percent - before.soc_percent).abs() < 5.0,
            "table swap stepped SOC from {} to {}",
            before.soc_percent,
            after.soc_percent,
        );
    }

    #[test]
    fn test_re_anchor_zeroes_the_balance() {
        let mut args = track_args();
        args.re_anchor_every = 3;
        let mut twin = CellTwin::new(&args, provider());
        let mut at = Utc::now();
        for _ in 0..3 {
            twin.step(&sample(at, 3.80, 1000.0)).unwrap();
            at += Duration::seconds(2);
        }
        assert_abs_diff_eq!(twin.balance().0, 0.0);
    }

    #[test]
    fn test_reinitialize_resets_the_model() {
        let mut twin = CellTwin::new(&track_args(), provider());
        let at = Utc::now();
        for step in 0..10 {
            twin.step(&sample(at + Duration::seconds(2 * step), 3.60, 1500.0)).unwrap();
        }
        twin.reinitialize();
        assert_eq!(twin.samples_processed(), 0);
        assert_abs_diff_eq!(twin.balance().0, 0.0);
        assert_abs_diff_eq!(twin.health_state().soh_blended, 100.0);
    }
}
