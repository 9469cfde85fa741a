use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::{
    ocv::simulation::ParameterSet,
    quantity::{charge::AmpereHours, resistance::Ohms},
};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Main command: replay a sample stream through the estimator and emit estimates.
    #[clap(name = "track")]
    Track(Box<TrackArgs>),

    /// Build or load the OCV model and render the table.
    #[clap(name = "ocv")]
    Ocv(Box<OcvArgs>),
}

#[derive(Parser)]
pub struct TrackArgs {
    /// JSON-lines sample file; reads the standard input when omitted.
    pub input: Option<PathBuf>,

    /// Expected sample cadence, used for the very first sample.
    #[clap(long = "cadence-seconds", default_value = "2.0", env = "CADENCE_SECONDS")]
    pub cadence_seconds: f64,

    /// Re-anchor the coulomb accumulator every this many samples.
    #[clap(long = "re-anchor-every", default_value = "3600", env = "RE_ANCHOR_EVERY")]
    pub re_anchor_every: u64,

    /// Render a summary table after the stream ends.
    #[clap(long)]
    pub summary: bool,

    #[clap(flatten)]
    pub cell: CellArgs,

    #[clap(flatten)]
    pub model: ModelArgs,

    #[clap(flatten)]
    pub filter: FilterArgs,

    #[clap(flatten)]
    pub health: HealthArgs,
}

#[derive(Parser)]
pub struct OcvArgs {
    #[clap(flatten)]
    pub cell: CellArgs,

    #[clap(flatten)]
    pub model: ModelArgs,
}

#[derive(Copy, Clone, Parser)]
pub struct CellArgs {
    /// Rated cell capacity in milliamp-hours.
    #[clap(long = "rated-capacity-mah", default_value = "2000", env = "RATED_CAPACITY_MAH")]
    pub rated_capacity_mah: f64,

    /// Charging efficiency: charging is lossy, so charge current is credited below unity.
    #[clap(long = "charging-efficiency", default_value = "0.95", env = "CHARGING_EFFICIENCY")]
    pub charging_efficiency: f64,

    /// Fresh-cell series resistance in ohms.
    #[clap(long = "nominal-r0-ohms", default_value = "0.08", env = "NOMINAL_R0_OHMS")]
    pub nominal_r0: Ohms,
}

impl CellArgs {
    #[must_use]
    pub const fn rated_capacity(&self) -> AmpereHours {
        AmpereHours::from_milliamp_hours(self.rated_capacity_mah)
    }
}

#[derive(Parser)]
pub struct ModelArgs {
    /// Published cell parameter set for the OCV simulation.
    #[clap(long = "parameter-set", value_enum, default_value = "chen2020", env = "PARAMETER_SET")]
    pub parameter_set: ParameterSet,

    /// OCV table cache, keyed by the parameter set and capacity.
    #[clap(long = "ocv-cache-path", default_value = "ocv-cache.json", env = "OCV_CACHE_PATH")]
    pub cache_path: PathBuf,

    /// Give up on the simulation build after this long and stay on the fallback table.
    #[clap(
        long = "ocv-build-timeout-seconds",
        default_value = "300",
        env = "OCV_BUILD_TIMEOUT_SECONDS"
    )]
    pub build_timeout_seconds: u64,
}

#[derive(Copy, Clone, Parser)]
pub struct FilterArgs {
    /// Per-sample SOC variance growth.
    #[clap(long = "process-noise", default_value = "1e-5", env = "PROCESS_NOISE")]
    pub process_noise: f64,

    /// Terminal-voltage measurement noise variance (V²).
    #[clap(long = "measurement-noise", default_value = "2.5e-5", env = "MEASUREMENT_NOISE")]
    pub measurement_noise: f64,

    /// SOC variance right after (re)initialization.
    #[clap(long = "initial-variance", default_value = "0.01", env = "INITIAL_VARIANCE")]
    pub initial_variance: f64,

    /// Variance floor, guards against filter overconfidence.
    #[clap(long = "variance-floor", default_value = "1e-8", env = "VARIANCE_FLOOR")]
    pub variance_floor: f64,

    /// Variance ceiling, bounds divergence while predict-only.
    #[clap(long = "variance-ceiling", default_value = "0.25", env = "VARIANCE_CEILING")]
    pub variance_ceiling: f64,

    /// Below this OCV slope (V per unit SOC) the correction step is skipped.
    #[clap(long = "min-ocv-slope", default_value = "1e-3", env = "MIN_OCV_SLOPE")]
    pub min_ocv_slope: f64,

    /// Below this current the R0 observation degenerates and is skipped.
    #[clap(long = "r0-min-current-ma", default_value = "50", env = "R0_MIN_CURRENT_MA")]
    pub r0_min_current_ma: f64,

    /// Above this current the cell is no longer near rest and R0 is not adapted.
    #[clap(long = "r0-rest-current-ma", default_value = "500", env = "R0_REST_CURRENT_MA")]
    pub r0_rest_current_ma: f64,

    /// EMA weight of a fresh R0 observation.
    #[clap(long = "r0-smoothing", default_value = "0.1", env = "R0_SMOOTHING")]
    pub r0_smoothing: f64,
}

#[derive(Copy, Clone, Parser)]
pub struct HealthArgs {
    #[clap(flatten)]
    pub cycle: CycleArgs,

    #[clap(flatten)]
    pub resistance: ResistanceArgs,

    #[clap(flatten)]
    pub thermal: ThermalArgs,

    #[clap(flatten)]
    pub rul: RulArgs,
}

#[derive(Copy, Clone, Parser)]
pub struct CycleArgs {
    /// Full-charge voltage threshold opening a cycle record.
    #[clap(long = "cycle-open-voltage", default_value = "4.1", env = "CYCLE_OPEN_VOLTAGE")]
    pub open_voltage: f64,

    /// Full-charge SOC threshold opening a cycle record.
    #[clap(long = "cycle-open-soc-percent", default_value = "90", env = "CYCLE_OPEN_SOC_PERCENT")]
    pub open_soc_percent: f64,

    /// Full-discharge voltage threshold closing the open cycle record.
    #[clap(long = "cycle-close-voltage", default_value = "3.3", env = "CYCLE_CLOSE_VOLTAGE")]
    pub close_voltage: f64,

    /// Full-discharge SOC threshold closing the open cycle record.
    #[clap(
        long = "cycle-close-soc-percent",
        default_value = "20",
        env = "CYCLE_CLOSE_SOC_PERCENT"
    )]
    pub close_soc_percent: f64,

    /// Minimum discharge depth, as a fraction of rated capacity, for the
    /// interim between-cycles capacity signal.
    #[clap(
        long = "interim-depth-fraction",
        default_value = "0.8",
        env = "INTERIM_DEPTH_FRACTION"
    )]
    pub interim_depth_fraction: f64,

    /// Blend weight of the interim capacity signal.
    #[clap(long = "interim-weight", default_value = "0.3", env = "INTERIM_WEIGHT")]
    pub interim_weight: f64,
}

#[derive(Copy, Clone, Parser)]
pub struct ResistanceArgs {
    /// Below this current the cell counts as resting and the baseline voltage is updated.
    #[clap(long = "rest-current-ma", default_value = "50", env = "REST_CURRENT_MA")]
    pub rest_current_ma: f64,

    /// Above this current the sag against the resting baseline yields a resistance sample.
    #[clap(long = "load-current-ma", default_value = "500", env = "LOAD_CURRENT_MA")]
    pub load_current_ma: f64,

    /// EMA weight of a fresh resting-voltage sample.
    #[clap(long = "rest-smoothing", default_value = "0.3", env = "REST_SMOOTHING")]
    pub rest_smoothing: f64,

    /// Blend weight of a fresh resistance-SOH sample.
    #[clap(
        long = "resistance-blend-weight",
        default_value = "0.3",
        env = "RESISTANCE_BLEND_WEIGHT"
    )]
    pub blend_weight: f64,
}

#[derive(Copy, Clone, Parser)]
pub struct ThermalArgs {
    /// Temperatures above this accumulate thermal stress.
    #[clap(long = "thermal-baseline-c", default_value = "25", env = "THERMAL_BASELINE_C")]
    pub baseline_celsius: f64,

    /// Arrhenius-like e-folding: stress doubles-ish every this many degrees.
    #[clap(long = "thermal-e-folding-c", default_value = "10", env = "THERMAL_E_FOLDING_C")]
    pub e_folding_celsius: f64,

    /// Hours of weighted above-baseline exposure per percentage point of degradation.
    #[clap(
        long = "thermal-hours-per-percent",
        default_value = "100",
        env = "THERMAL_HOURS_PER_PERCENT"
    )]
    pub hours_per_percent: f64,
}

#[derive(Copy, Clone, Parser)]
pub struct RulArgs {
    /// End-of-life SOH threshold the decay trend is extrapolated to.
    #[clap(long = "eol-soh-percent", default_value = "80", env = "EOL_SOH_PERCENT")]
    pub eol_soh_percent: f64,

    /// Samples of SOH history required before a trend is trusted.
    #[clap(long = "rul-min-history", default_value = "32", env = "RUL_MIN_HISTORY")]
    pub min_history: usize,

    /// RUL ceiling; extrapolations beyond this are not meaningful.
    #[clap(long = "rul-max-days", default_value = "3650", env = "RUL_MAX_DAYS")]
    pub max_days: f64,
}
