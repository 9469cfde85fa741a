use std::{
    fmt::{Display, Formatter},
    ops::Div,
};

use crate::quantity::{Quantity, current::Amperes, resistance::Ohms};

pub type Volts = Quantity<f64, 1, 0, 0>;

impl Volts {
    #[must_use]
    pub const fn as_millivolts(self) -> f64 {
        self.0 * 1000.0
    }
}

impl Display for Volts {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3} V", self.0)
    }
}

impl Div<Amperes> for Volts {
    type Output = Ohms;

    fn div(self, rhs: Amperes) -> Self::Output {
        Quantity(self.0 / rhs.0)
    }
}
