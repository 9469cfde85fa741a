use std::{
    path::PathBuf,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use chrono::Utc;

use crate::{
    ocv::{cache::CacheFile, simulation, simulation::ParameterSet, table::OcvTable},
    prelude::*,
    quantity::{
        Quantity, charge::AmpereHours, resistance::Ohms, temperature::Celsius, voltage::Volts,
    },
};

/// OCV temperature coefficient around 25 °C (NMC/graphite typical).
const TEMPERATURE_COEFFICIENT: Volts = Quantity(-0.0008);

/// Where the active table came from.
#[derive(Copy, Clone, Debug, Eq, PartialEq, serde::Serialize, derive_more::Display)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    #[display("fallback")]
    Fallback,
    #[display("cached")]
    Cached,
    #[display("simulated")]
    Simulated,
}

#[derive(Clone)]
enum BuildState {
    Initializing,
    Ready,
    Error(String),
}

struct Inner {
    table: Arc<OcvTable>,
    source: Source,
    state: BuildState,
    r0: Ohms,
}

/// Status tuple exposed to external collaborators.
#[derive(Clone, serde::Serialize)]
pub struct ProviderStatus {
    pub is_ready: bool,
    pub source: Source,
    pub ocv_points: usize,
    pub ecm_r0: Ohms,
    pub parameter_set: ParameterSet,
    pub parameter_set_info: &'static str,
    pub status: String,
}

/// Serves the OCV(SOC) curve and the nominal series resistance.
///
/// Starts on the empirical fallback table and switches to a cached or freshly
/// simulated table in one swap; readers always observe a complete table.
pub struct OcvProvider {
    parameter_set: ParameterSet,
    rated_capacity: AmpereHours,
    inner: RwLock<Inner>,
}

impl OcvProvider {
    #[must_use]
    pub fn new(parameter_set: ParameterSet, rated_capacity: AmpereHours) -> Self {
        Self {
            parameter_set,
            rated_capacity,
            inner: RwLock::new(Inner {
                table: Arc::new(OcvTable::fallback()),
                source: Source::Fallback,
                state: BuildState::Initializing,
                r0: parameter_set.nominal_r0(),
            }),
        }
    }

    /// Load the cached table or run the simulation build in the background.
    ///
    /// The sample-processing path keeps running on the fallback table while
    /// this completes; a hung or failed build leaves the provider on the
    /// fallback table with an error status, which is non-fatal by design.
    pub fn spawn_build(
        self: &Arc<Self>,
        cache_path: PathBuf,
        timeout: Duration,
    ) -> tokio::task::JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            if let Some(cached) =
                CacheFile::read_matching(&cache_path, this.parameter_set, this.rated_capacity)
            {
                let r0 = cached.r0;
                match cached.into_table() {
                    Ok(table) => {
                        this.install(table, Source::Cached, r0);
                        return;
                    }
                    Err(error) => {
                        warn!(error = format!("{error:#}"), "discarding the invalid cache");
                    }
                }
            }

            let parameter_set = this.parameter_set;
            let build = tokio::time::timeout(
                timeout,
                tokio::task::spawn_blocking(move || simulation::build_table(parameter_set)),
            )
            .await;
            match build {
                Ok(Ok(Ok(table))) => {
                    let r0 = this.parameter_set.nominal_r0();
                    CacheFile {
                        parameter_set: this.parameter_set,
                        rated_capacity: this.rated_capacity,
                        r0,
                        generated_at: Utc::now(),
                        points: table.points().to_vec(),
                    }
                    .write_to(&cache_path);
                    this.install(table, Source::Simulated, r0);
                }
                Ok(Ok(Err(error))) => this.fail(format!("{error:#}")),
                Ok(Err(join_error)) => this.fail(format!("simulation task failed: {join_error}")),
                Err(_) => this.fail("simulation timed out".to_string()),
            }
        })
    }

    /// Swap in a new table; a single atomic replacement, never a partial update.
    pub(crate) fn install(&self, table: OcvTable, source: Source, r0: Ohms) {
        {
            let mut inner = self.write();
            inner.table = Arc::new(table);
            inner.source = source;
            inner.state = BuildState::Ready;
            inner.r0 = r0;
        }
        info!(%source, "OCV table installed");
    }

    pub(crate) fn fail(&self, reason: String) {
        error!(reason = %reason, "OCV model build failed, staying on the fallback table");
        self.write().state = BuildState::Error(reason);
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn table(&self) -> Arc<OcvTable> {
        Arc::clone(&self.read().table)
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.read().state, BuildState::Ready)
    }

    /// OCV and its local slope at the given SOC, temperature-corrected.
    #[must_use]
    pub fn ocv_at(&self, soc: f64, temperature: Option<Celsius>) -> (Volts, Volts) {
        let table = self.table();
        (table.ocv_at(soc) + temperature_correction(temperature), table.slope_at(soc))
    }

    /// Invert voltage → SOC, used for the voltage-only bootstrap estimate.
    #[must_use]
    pub fn soc_at(&self, voltage: Volts, temperature: Option<Celsius>) -> f64 {
        self.table().soc_at(voltage - temperature_correction(temperature))
    }

    #[must_use]
    pub fn r0(&self) -> Ohms {
        self.read().r0
    }

    #[must_use]
    pub fn status(&self) -> ProviderStatus {
        let inner = self.read();
        ProviderStatus {
            is_ready: matches!(inner.state, BuildState::Ready),
            source: inner.source,
            ocv_points: inner.table.len(),
            ecm_r0: inner.r0,
            parameter_set: self.parameter_set,
            parameter_set_info: self.parameter_set.info(),
            status: match &inner.state {
                BuildState::Initializing => "initializing".to_string(),
                BuildState::Ready => "ready".to_string(),
                BuildState::Error(reason) => format!("error:{reason}"),
            },
        }
    }

    /// Table export for visualization, available only once the provider is ready.
    #[must_use]
    pub fn export(&self) -> Option<Vec<(f64, Volts)>> {
        let inner = self.read();
        matches!(inner.state, BuildState::Ready).then(|| inner.table.points().to_vec())
    }
}

fn temperature_correction(temperature: Option<Celsius>) -> Volts {
    temperature.map_or(Volts::ZERO, |celsius| TEMPERATURE_COEFFICIENT * (celsius.0 - 25.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_on_fallback() {
        let provider = OcvProvider::new(ParameterSet::Chen2020, AmpereHours::from(2.0));
        let status = provider.status();
        assert!(!status.is_ready);
        assert_eq!(status.source, Source::Fallback);
        assert_eq!(status.status, "initializing");
        assert!(provider.export().is_none());
    }

    #[test]
    fn test_install_flips_source_and_ready() {
        let provider = OcvProvider::new(ParameterSet::Chen2020, AmpereHours::from(2.0));
        let table = simulation::build_table(ParameterSet::Chen2020).unwrap();
        provider.install(table, Source::Simulated, Ohms::from(0.062));
        let status = provider.status();
        assert!(status.is_ready);
        assert_eq!(status.source, Source::Simulated);
        assert_eq!(status.status, "ready");
        assert_eq!(status.ocv_points, 101);
        assert!(provider.export().is_some());
    }

    #[test]
    fn test_fail_keeps_fallback() {
        let provider = OcvProvider::new(ParameterSet::Chen2020, AmpereHours::from(2.0));
        provider.fail("boom".to_string());
        let status = provider.status();
        assert!(!status.is_ready);
        assert_eq!(status.source, Source::Fallback);
        assert_eq!(status.status, "error:boom");
    }

    #[test]
    fn test_temperature_correction() {
        let provider = OcvProvider::new(ParameterSet::Chen2020, AmpereHours::from(2.0));
        let (at_25, _) = provider.ocv_at(0.5, Some(Celsius(25.0)));
        let (at_35, _) = provider.ocv_at(0.5, Some(Celsius(35.0)));
        assert!((at_25 - at_35).0 > 0.007, "expected ≈8 mV drop, got {}", at_25 - at_35);
    }

    #[tokio::test]
    async fn test_spawn_build_simulates_and_caches() {
        let path = std::env::temp_dir().join("celltwin-test-provider-cache.json");
        let _ = std::fs::remove_file(&path);

        let provider = Arc::new(OcvProvider::new(ParameterSet::Chen2020, AmpereHours::from(2.0)));
        provider.spawn_build(path.clone(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(provider.status().source, Source::Simulated);
        assert!(provider.is_ready());

        // A second cold start hits the cache.
        let provider = Arc::new(OcvProvider::new(ParameterSet::Chen2020, AmpereHours::from(2.0)));
        provider.spawn_build(path.clone(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(provider.status().source, Source::Cached);
        let _ = std::fs::remove_file(&path);
    }
}
