use std::{
    fmt::{Display, Formatter},
    ops::Div,
};

use crate::quantity::Quantity;

pub type AmpereHours = Quantity<f64, 0, 1, 1>;

impl AmpereHours {
    #[must_use]
    pub const fn from_milliamp_hours(milliamp_hours: f64) -> Self {
        Self(milliamp_hours / 1000.0)
    }

    #[must_use]
    pub const fn as_milliamp_hours(self) -> f64 {
        self.0 * 1000.0
    }
}

impl Display for AmpereHours {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.0} mAh", self.as_milliamp_hours())
    }
}

impl Div<AmpereHours> for AmpereHours {
    type Output = f64;

    fn div(self, rhs: AmpereHours) -> Self::Output {
        self.0 / rhs.0
    }
}
