use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::quantity::{current::Amperes, temperature::Celsius, voltage::Volts};

/// One measurement tuple from the sensor node.
///
/// The transport delivers these at a roughly fixed cadence (1–2 s); the field
/// names follow the node's wire format.
#[derive(Copy, Clone, Debug, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,

    /// Terminal voltage.
    pub voltage: Volts,

    /// Cell current in milliamperes, positive while discharging.
    pub current_ma: f64,

    /// Cell temperature, possibly absent or unreadable.
    #[serde(default)]
    pub temperature: Option<f64>,
}

impl Sample {
    #[must_use]
    pub const fn current(&self) -> Amperes {
        Amperes::from_milliamps(self.current_ma)
    }

    /// Temperature reading, if present and plausible.
    #[must_use]
    pub fn temperature(&self) -> Option<Celsius> {
        self.temperature.map(Celsius).filter(|celsius| celsius.is_plausible())
    }
}
