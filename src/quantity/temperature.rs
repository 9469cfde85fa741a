use std::fmt::{Display, Formatter};

/// Cell temperature. Not a [`crate::quantity::Quantity`] since temperatures
/// never participate in the dimensional algebra.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    PartialOrd,
    derive_more::From,
    derive_more::FromStr,
    derive_more::Sub,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct Celsius(pub f64);

impl Celsius {
    /// Whether the reading is usable: finite and within the sensor's physical range.
    #[must_use]
    pub fn is_plausible(self) -> bool {
        self.0.is_finite() && (-40.0..=120.0).contains(&self.0)
    }
}

impl Display for Celsius {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1} °C", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_plausible() {
        assert!(Celsius(25.0).is_plausible());
        assert!(!Celsius(f64::NAN).is_plausible());
        assert!(!Celsius(500.0).is_plausible());
    }
}
