use std::path::Path;

use chrono::{DateTime, TimeDelta, Utc};

use crate::{
    ocv::{simulation::ParameterSet, table::OcvTable},
    prelude::*,
    quantity::{Quantity, charge::AmpereHours, resistance::Ohms, voltage::Volts},
};

/// Reject cached tables older than this many days.
const MAX_AGE_DAYS: i64 = 30;

/// Rated-capacity mismatch tolerance between the cache and the running cell.
const CAPACITY_TOLERANCE: AmpereHours = Quantity(0.1);

/// Persisted OCV table artifact, written once after a successful simulation
/// build and read on every cold start.
#[derive(serde::Serialize, serde::Deserialize)]
pub struct CacheFile {
    pub parameter_set: ParameterSet,
    pub rated_capacity: AmpereHours,
    pub r0: Ohms,
    pub generated_at: DateTime<Utc>,
    pub points: Vec<(f64, Volts)>,
}

impl CacheFile {
    /// Read the cache and validate it against the running configuration.
    ///
    /// Any miss — absent file, unreadable contents, stale age, or a
    /// parameter-set or capacity mismatch — returns [`None`] and the caller
    /// falls through to the simulation build.
    #[instrument(skip_all, fields(path = %path.display()), name = "Reading the OCV cache…")]
    pub fn read_matching(
        path: &Path,
        parameter_set: ParameterSet,
        rated_capacity: AmpereHours,
    ) -> Option<Self> {
        let this = match Self::read_fallibly_from(path) {
            Ok(this) => this?,
            Err(error) => {
                warn!(error = format!("{error:#}"), "failed to read the cache");
                return None;
            }
        };
        if this.parameter_set != parameter_set {
            info!(
                cached = %this.parameter_set,
                requested = %parameter_set,
                "parameter set changed",
            );
            return None;
        }
        if (this.rated_capacity - rated_capacity).abs() > CAPACITY_TOLERANCE {
            info!(cached = %this.rated_capacity, requested = %rated_capacity, "capacity changed");
            return None;
        }
        if Utc::now() - this.generated_at > TimeDelta::days(MAX_AGE_DAYS) {
            info!(generated_at = %this.generated_at, "cache is stale");
            return None;
        }
        Some(this)
    }

    fn read_fallibly_from(path: &Path) -> Result<Option<Self>> {
        if path.is_file() {
            Ok(Some(serde_json::from_slice(&std::fs::read(path)?)?))
        } else {
            Ok(None)
        }
    }

    #[instrument(skip_all, fields(path = %path.display()), name = "Writing the OCV cache…")]
    pub fn write_to(&self, path: &Path) {
        let result = serde_json::to_vec_pretty(self)
            .context("failed to serialize the cache")
            .and_then(|buffer| std::fs::write(path, buffer).context("failed to write the cache"));
        if let Err(error) = result {
            error!(error = format!("{error:#}"), "failed to save the cache");
        }
    }

    pub fn into_table(self) -> Result<OcvTable> {
        OcvTable::new(self.points).context("the cached OCV table is invalid")
    }
}
