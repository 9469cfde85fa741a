use itertools::Itertools;
use ordered_float::OrderedFloat;

use crate::{prelude::*, quantity::voltage::Volts};

/// Empirical OCV breakpoints (NMC/graphite literature values), used until the
/// simulated table is available and forever if the build fails.
const FALLBACK: [(f64, f64); 21] = [
    (0.00, 3.000),
    (0.05, 3.270),
    (0.10, 3.490),
    (0.15, 3.550),
    (0.20, 3.590),
    (0.25, 3.620),
    (0.30, 3.660),
    (0.35, 3.690),
    (0.40, 3.720),
    (0.45, 3.740),
    (0.50, 3.760),
    (0.55, 3.780),
    (0.60, 3.800),
    (0.65, 3.830),
    (0.70, 3.860),
    (0.75, 3.890),
    (0.80, 3.930),
    (0.85, 3.970),
    (0.90, 4.020),
    (0.95, 4.100),
    (1.00, 4.200),
];

/// Half-width of the central difference used for the local OCV slope.
const SLOPE_DELTA: f64 = 1e-4;

/// Ordered open-circuit-voltage curve over SOC ∈ [0, 1].
///
/// Immutable once built; lookups clamp to the table edges instead of
/// extrapolating.
pub struct OcvTable {
    points: Vec<(f64, Volts)>,
}

impl OcvTable {
    pub fn new(points: Vec<(f64, Volts)>) -> Result<Self> {
        ensure!(points.len() >= 2, "an OCV table needs at least two points");
        ensure!(
            points.iter().all(|(soc, ocv)| soc.is_finite() && ocv.is_finite()),
            "the OCV table contains non-finite values",
        );
        ensure!(points[0].0.abs() < 1e-6, "the OCV table must start at SOC 0");
        ensure!(
            (points[points.len() - 1].0 - 1.0).abs() < 1e-6,
            "the OCV table must end at SOC 1",
        );
        for ((soc_0, ocv_0), (soc_1, ocv_1)) in points.iter().tuple_windows() {
            ensure!(soc_0 < soc_1, "SOC points must be strictly increasing");
            ensure!(ocv_0 <= ocv_1, "OCV must be monotonically non-decreasing");
        }
        Ok(Self { points })
    }

    pub fn fallback() -> Self {
        Self { points: FALLBACK.iter().map(|(soc, ocv)| (*soc, Volts::from(*ocv))).collect() }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn points(&self) -> &[(f64, Volts)] {
        &self.points
    }

    /// Widest SOC gap between adjacent points, the resolution bound of any lookup.
    #[must_use]
    pub fn grid_step(&self) -> f64 {
        self.points
            .iter()
            .tuple_windows()
            .map(|((soc_0, _), (soc_1, _))| OrderedFloat(soc_1 - soc_0))
            .max()
            .map_or(0.0, |step| step.0)
    }

    /// Interpolate OCV at the given SOC, clamping to the table edges.
    #[must_use]
    pub fn ocv_at(&self, soc: f64) -> Volts {
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];
        let soc = soc.clamp(first.0, last.0);
        let index =
            self.points.partition_point(|(point, _)| *point <= soc).clamp(1, self.points.len() - 1);
        let (soc_0, ocv_0) = self.points[index - 1];
        let (soc_1, ocv_1) = self.points[index];
        ocv_0 + (ocv_1 - ocv_0) * ((soc - soc_0) / (soc_1 - soc_0))
    }

    /// Local slope dOCV/dSOC via central difference.
    #[must_use]
    pub fn slope_at(&self, soc: f64) -> Volts {
        let soc_hi = (soc + SLOPE_DELTA).min(1.0);
        let soc_lo = (soc - SLOPE_DELTA).max(0.0);
        (self.ocv_at(soc_hi) - self.ocv_at(soc_lo)) / (soc_hi - soc_lo)
    }

    /// Invert the curve: voltage → SOC, clamping to the table edges.
    #[must_use]
    pub fn soc_at(&self, ocv: Volts) -> f64 {
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];
        let ocv = ocv.clamp(first.1, last.1);
        let index = self
            .points
            .partition_point(|(_, point)| *point <= ocv)
            .clamp(1, self.points.len() - 1);
        let (soc_0, ocv_0) = self.points[index - 1];
        let (soc_1, ocv_1) = self.points[index];
        if ocv_1 <= ocv_0 {
            // Flat plateau: resolve to its left edge.
            soc_0
        } else {
            soc_0 + (soc_1 - soc_0) * ((ocv - ocv_0).0 / (ocv_1 - ocv_0).0)
        }
    }
}
