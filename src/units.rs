//! Types for representing physical and monetary quantities.
//!
//! All quantities are hourly: the model has a time step of one hour, so a [`Power`] held for one
//! time step is numerically equal to the energy delivered in that step.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// Common functionality for all unit types
pub trait UnitType:
    fmt::Debug
    + Copy
    + PartialEq
    + PartialOrd
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<f64, Output = Self>
    + Div<f64, Output = Self>
    + Sum
{
    /// Create from an `f64` value
    fn new(value: f64) -> Self;

    /// The underlying `f64` value
    fn value(&self) -> f64;

    /// Whether the underlying value is finite
    fn is_finite(&self) -> bool {
        self.value().is_finite()
    }
}

macro_rules! unit_struct {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
        pub struct $name(pub f64);

        impl UnitType for $name {
            fn new(value: f64) -> Self {
                Self(value)
            }

            fn value(&self) -> f64 {
                self.0
            }
        }

        impl $name {
            /// Create from an `f64` value
            pub const fn new(value: f64) -> Self {
                Self(value)
            }

            /// The underlying `f64` value
            pub const fn value(&self) -> f64 {
                self.0
            }

            /// Whether the underlying value is finite
            pub fn is_finite(&self) -> bool {
                self.0.is_finite()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Add for $name {
            type Output = Self;

            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }
        }

        impl AddAssign for $name {
            fn add_assign(&mut self, rhs: Self) {
                self.0 += rhs.0;
            }
        }

        impl Sub for $name {
            type Output = Self;

            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }
        }

        impl SubAssign for $name {
            fn sub_assign(&mut self, rhs: Self) {
                self.0 -= rhs.0;
            }
        }

        impl Neg for $name {
            type Output = Self;

            fn neg(self) -> Self {
                Self(-self.0)
            }
        }

        impl Mul<f64> for $name {
            type Output = Self;

            fn mul(self, rhs: f64) -> Self {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $name {
            type Output = Self;

            fn div(self, rhs: f64) -> Self {
                Self(self.0 / rhs)
            }
        }

        impl Sum for $name {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }
    };
}

/// Multiplying two unit types yields a third
macro_rules! impl_mul {
    ($lhs:ident, $rhs:ident, $out:ident) => {
        impl Mul<$rhs> for $lhs {
            type Output = $out;

            fn mul(self, rhs: $rhs) -> $out {
                $out(self.0 * rhs.0)
            }
        }

        impl Mul<$lhs> for $rhs {
            type Output = $out;

            fn mul(self, rhs: $lhs) -> $out {
                $out(self.0 * rhs.0)
            }
        }
    };
}

unit_struct!(
    /// A dimensionless quantity, e.g. a proportion
    Dimensionless
);
unit_struct!(
    /// Power in MW (equivalently, MWh delivered over one hour)
    Power
);
unit_struct!(
    /// An amount of money
    Money
);
unit_struct!(
    /// A price per MWh of energy
    MoneyPerEnergy
);

impl_mul!(MoneyPerEnergy, Power, Money);
impl_mul!(Dimensionless, Power, Power);
impl_mul!(Dimensionless, MoneyPerEnergy, MoneyPerEnergy);

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn price_times_power_is_money() {
        let cost = MoneyPerEnergy(12.0) * Power(20.07);
        assert_approx_eq!(f64, cost.value(), 240.84);
    }

    #[test]
    fn fraction_of_power() {
        let reserve = Dimensionless(0.1) * Power(260.0);
        assert_approx_eq!(f64, reserve.value(), 26.0);
    }

    #[test]
    fn sum_of_units() {
        let total: Power = [Power(1.0), Power(2.5), Power(3.5)].into_iter().sum();
        assert_eq!(total, Power(7.0));
    }
}
