use std::{
    fmt::{Display, Formatter},
    ops::Mul,
};

use chrono::TimeDelta;

use crate::quantity::{Quantity, charge::AmpereHours, resistance::Ohms, voltage::Volts};

/// Cell current, positive while discharging.
pub type Amperes = Quantity<f64, 0, 1, 0>;

impl Amperes {
    #[must_use]
    pub const fn from_milliamps(milliamps: f64) -> Self {
        Self(milliamps / 1000.0)
    }

    #[must_use]
    pub const fn as_milliamps(self) -> f64 {
        self.0 * 1000.0
    }
}

impl Display for Amperes {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.0} mA", self.as_milliamps())
    }
}

impl Mul<TimeDelta> for Amperes {
    type Output = AmpereHours;

    fn mul(self, rhs: TimeDelta) -> Self::Output {
        let hours = rhs.as_seconds_f64() / 3600.0;
        Quantity(self.0 * hours)
    }
}

impl Mul<Ohms> for Amperes {
    type Output = Volts;

    fn mul(self, rhs: Ohms) -> Self::Output {
        Quantity(self.0 * rhs.0)
    }
}
