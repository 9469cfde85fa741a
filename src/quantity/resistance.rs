use std::fmt::{Display, Formatter};

use crate::quantity::Quantity;

/// Effective series (ohmic) resistance.
pub type Ohms = Quantity<f64, 1, -1, 0>;

impl Ohms {
    #[must_use]
    pub const fn as_milliohms(self) -> f64 {
        self.0 * 1000.0
    }
}

impl Display for Ohms {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1} mΩ", self.as_milliohms())
    }
}
