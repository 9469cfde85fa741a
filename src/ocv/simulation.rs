use std::time::Instant;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{
    ocv::table::OcvTable,
    prelude::*,
    quantity::{Quantity, resistance::Ohms, voltage::Volts},
};

/// Lower voltage cutoff of the quasi-static discharge sweep.
const CUTOFF: Volts = Quantity(3.0);

/// Stoichiometry steps swept before resampling.
const N_SWEEP: usize = 2000;

/// Uniform SOC points in the resampled table.
const N_POINTS: usize = 101;

/// Published cell parameter set driving the equilibrium model.
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    ValueEnum,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
pub enum ParameterSet {
    /// LG M50 21700 NMC/graphite, Chen et al. J. Electrochem. Soc. 167 (2020).
    #[display("Chen2020")]
    Chen2020,
}

impl ParameterSet {
    #[must_use]
    pub const fn info(self) -> &'static str {
        match self {
            Self::Chen2020 => "LG M50 21700 NMC/Graphite | Chen et al. J.Electrochem.Soc 2020",
        }
    }

    /// Literature ohmic resistance of the fresh cell.
    #[must_use]
    pub const fn nominal_r0(self) -> Ohms {
        match self {
            Self::Chen2020 => Quantity(0.062),
        }
    }

    /// Negative-electrode stoichiometry at 0% and 100% SOC.
    const fn anode_window(self) -> (f64, f64) {
        match self {
            Self::Chen2020 => (0.0279, 0.9014),
        }
    }

    /// Positive-electrode stoichiometry at 0% and 100% SOC.
    const fn cathode_window(self) -> (f64, f64) {
        match self {
            Self::Chen2020 => (0.9084, 0.2661),
        }
    }

    /// Graphite-SiOx open-circuit potential fit.
    fn anode_potential(self, stoichiometry: f64) -> f64 {
        match self {
            Self::Chen2020 => {
                let x = stoichiometry;
                1.9793 * (-39.3631 * x).exp() + 0.2482
                    - 0.0909 * (29.8538 * (x - 0.1234)).tanh()
                    - 0.04478 * (14.9159 * (x - 0.2769)).tanh()
                    - 0.0205 * (30.4444 * (x - 0.6103)).tanh()
            }
        }
    }

    /// NMC811 open-circuit potential fit.
    fn cathode_potential(self, stoichiometry: f64) -> f64 {
        match self {
            Self::Chen2020 => {
                let y = stoichiometry;
                -0.8090 * y + 4.4875
                    - 0.0428 * (18.5138 * (y - 0.5542)).tanh()
                    - 17.7326 * (15.7890 * (y - 0.3117)).tanh()
                    + 17.5842 * (15.9308 * (y - 0.3120)).tanh()
            }
        }
    }
}

/// Sample the equilibrium OCV curve by sweeping a quasi-static (C/20-style)
/// discharge from full down to the voltage cutoff, then resample it onto a
/// uniform SOC grid.
///
/// At negligible rate the terminal voltage equals the difference of the
/// electrode open-circuit potentials, so no kinetic model is needed.
#[instrument(name = "Simulating the OCV curve…", fields(parameter_set = %parameter_set))]
pub fn build_table(parameter_set: ParameterSet) -> Result<OcvTable> {
    let started_at = Instant::now();

    let (x_empty, x_full) = parameter_set.anode_window();
    let (y_empty, y_full) = parameter_set.cathode_window();

    // Sweep from full to empty; charge extracted is linear in stoichiometry.
    let mut swept: Vec<(f64, f64)> = Vec::with_capacity(N_SWEEP + 1);
    for step in 0..=N_SWEEP {
        #[allow(clippy::cast_precision_loss)]
        let depth = step as f64 / N_SWEEP as f64;
        let x = x_full + (x_empty - x_full) * depth;
        let y = y_full + (y_empty - y_full) * depth;
        let voltage = parameter_set.cathode_potential(y) - parameter_set.anode_potential(x);
        if voltage < CUTOFF.0 {
            break;
        }
        swept.push((depth, voltage));
    }
    ensure!(swept.len() >= 2, "the discharge sweep collapsed before the cutoff");

    // SOC is the extractable-charge fraction between full and the cutoff.
    let depth_at_cutoff = swept[swept.len() - 1].0;
    let mut curve: Vec<(f64, f64)> = swept
        .into_iter()
        .map(|(depth, voltage)| (1.0 - depth / depth_at_cutoff, voltage))
        .collect();
    curve.reverse();

    let mut points = Vec::with_capacity(N_POINTS);
    for index in 0..N_POINTS {
        #[allow(clippy::cast_precision_loss)]
        let soc = index as f64 / (N_POINTS - 1) as f64;
        points.push((soc, Volts::from(interpolate(&curve, soc))));
    }
    // The electrode fits may wiggle below numerical resolution; enforce the
    // non-decreasing invariant before validation.
    for index in 1..points.len() {
        points[index].1 = points[index].1.max(points[index - 1].1);
    }

    let table = OcvTable::new(points)?;
    info!(
        n_points = table.len(),
        elapsed_secs = started_at.elapsed().as_secs_f64(),
        "generated",
    );
    Ok(table)
}

fn interpolate(curve: &[(f64, f64)], soc: f64) -> f64 {
    let soc = soc.clamp(curve[0].0, curve[curve.len() - 1].0);
    let index = curve.partition_point(|(point, _)| *point <= soc).clamp(1, curve.len() - 1);
    let (soc_0, voltage_0) = curve[index - 1];
    let (soc_1, voltage_1) = curve[index];
    voltage_0 + (voltage_1 - voltage_0) * (soc - soc_0) / (soc_1 - soc_0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_table() {
        let table = build_table(ParameterSet::Chen2020).unwrap();
        assert_eq!(table.len(), N_POINTS);

        // The curve must span the cutoff up to the charged cell voltage.
        let bottom = table.ocv_at(0.0);
        let top = table.ocv_at(1.0);
        assert!((2.95..=3.1).contains(&bottom.0), "bottom voltage {bottom}");
        assert!((4.0..=4.25).contains(&top.0), "top voltage {top}");
    }

    #[test]
    fn test_simulated_curve_differs_from_fallback() {
        let simulated = build_table(ParameterSet::Chen2020).unwrap();
        let fallback = OcvTable::fallback();
        let max_difference = (1..100)
            .map(|index| {
                let soc = f64::from(index) / 100.0;
                (simulated.ocv_at(soc) - fallback.ocv_at(soc)).abs().0
            })
            .fold(0.0, f64::max);
        assert!(max_difference > 0.005, "max difference {max_difference}");
    }
}
