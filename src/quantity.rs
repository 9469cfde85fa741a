pub mod charge;
pub mod current;
pub mod resistance;
pub mod temperature;
pub mod voltage;

use std::ops::{Div, Mul};

use serde::{Deserialize, Serialize};

/// Dimensional quantity with voltage, current, and time exponents.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
    derive_more::Add,
    derive_more::AddAssign,
    derive_more::From,
    derive_more::FromStr,
    derive_more::Neg,
    derive_more::Sub,
    derive_more::SubAssign,
    derive_more::Sum,
)]
pub struct Quantity<T, const VOLTAGE: isize, const CURRENT: isize, const TIME: isize>(pub T);

impl<T, const VOLTAGE: isize, const CURRENT: isize, const TIME: isize>
    Quantity<T, VOLTAGE, CURRENT, TIME>
where
    Self: PartialOrd,
{
    pub fn min(mut self, rhs: Self) -> Self {
        if rhs < self {
            self = rhs;
        }
        self
    }

    pub fn max(mut self, rhs: Self) -> Self {
        if rhs > self {
            self = rhs;
        }
        self
    }

    pub fn clamp(mut self, min: Self, max: Self) -> Self {
        if self < min {
            self = min;
        }
        if self > max {
            self = max;
        }
        self
    }
}

impl<const VOLTAGE: isize, const CURRENT: isize, const TIME: isize>
    Quantity<f64, VOLTAGE, CURRENT, TIME>
{
    pub const ZERO: Self = Self(0.0);

    #[must_use]
    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }
}

impl<T, const VOLTAGE: isize, const CURRENT: isize, const TIME: isize> Mul<T>
    for Quantity<T, VOLTAGE, CURRENT, TIME>
where
    T: Mul<T>,
{
    type Output = Quantity<T::Output, VOLTAGE, CURRENT, TIME>;

    fn mul(self, rhs: T) -> Self::Output {
        Quantity(self.0 * rhs)
    }
}

impl<T, const VOLTAGE: isize, const CURRENT: isize, const TIME: isize> Div<T>
    for Quantity<T, VOLTAGE, CURRENT, TIME>
where
    T: Div<T>,
{
    type Output = Quantity<T::Output, VOLTAGE, CURRENT, TIME>;

    fn div(self, rhs: T) -> Self::Output {
        Quantity(self.0 / rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub type Bare<T> = Quantity<T, 0, 0, 0>;

    #[test]
    fn test_min() {
        assert_eq!(Bare::from(1).min(Bare::from(2)), Bare::from(1));
        assert_eq!(Bare::from(2).min(Bare::from(1)), Bare::from(1));
    }

    #[test]
    fn test_max() {
        assert_eq!(Bare::from(1).max(Bare::from(2)), Bare::from(2));
        assert_eq!(Bare::from(2).max(Bare::from(1)), Bare::from(2));
    }

    #[test]
    fn test_clamp() {
        assert_eq!(Bare::from(1).clamp(Bare::from(2), Bare::from(3)), Bare::from(2));
        assert_eq!(Bare::from(4).clamp(Bare::from(2), Bare::from(3)), Bare::from(3));
        assert_eq!(Bare::from(2).clamp(Bare::from(1), Bare::from(3)), Bare::from(2));
    }
}
