//! Simple zero-overhead unit of measure types
//!
//! A poor man's version of F#'s units of measure, in order to keep units
//! correct by construction.  Sampling works in either degrees of arc or in
//! linear distance, and these types keep the two from being mixed up.

use std::fmt::{Display, Formatter};
use std::ops::{Div, Mul, Sub};

use approx::{AbsDiffEq, RelativeEq, relative_eq};
use num_traits::{Float, Num};

macro_rules! unit_of_measure {
    ($u:ident, $suffix:literal) => {
        #[derive(Clone, Copy, Default, PartialEq, PartialOrd, Debug)]
        pub struct $u<N: Num>(pub N);

        impl<N> Sub for $u<N>
        where
            N: Num + Sub,
        {
            type Output = Self;

            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }
        }

        impl<N> Mul<N> for $u<N>
        where
            N: Num + Mul,
        {
            type Output = Self;

            fn mul(self, rhs: N) -> Self {
                Self(self.0 * rhs)
            }
        }

        impl<N> Div<N> for $u<N>
        where
            N: Num + Div,
        {
            type Output = Self;

            fn div(self, rhs: N) -> Self {
                Self(self.0 / rhs)
            }
        }

        impl<N> Display for $u<N>
        where
            N: Num + Display,
        {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}{}", self.0, $suffix)
            }
        }

        // Relative equality traits for approx support

        impl<N> AbsDiffEq for $u<N>
        where
            N: Num + Float + AbsDiffEq<N, Epsilon = N>,
        {
            type Epsilon = N;

            fn default_epsilon() -> Self::Epsilon {
                N::epsilon()
            }

            fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
                self.0.abs_diff_eq(&other.0, epsilon)
            }
        }

        impl<N> RelativeEq for $u<N>
        where
            N: Num + Float + AbsDiffEq<N, Epsilon = N> + RelativeEq<N>,
        {
            fn default_max_relative() -> Self::Epsilon {
                N::epsilon()
            }

            fn relative_eq(
                &self,
                other: &Self,
                epsilon: Self::Epsilon,
                max_relative: Self::Epsilon,
            ) -> bool {
                relative_eq!(
                    self.0,
                    other.0,
                    epsilon = epsilon,
                    max_relative = max_relative
                )
            }
        }
    };
}

// Distance units:
unit_of_measure![Meters, "m"];
unit_of_measure![Kilometers, "km"];

// Angular units:
unit_of_measure![Degrees, "°"];

impl<N> From<Kilometers<N>> for Meters<N>
where
    N: Num + From<u16>,
{
    fn from(value: Kilometers<N>) -> Meters<N> {
        Meters(N::from(1000u16) * value.0)
    }
}

impl Degrees<f64> {
    /// Reduces an angle to the range [-180°, 180°].
    ///
    /// Values already in range, including both -180° and 180°, are returned
    /// unchanged so that valid input coordinates survive a round trip.
    pub fn normalized(self) -> Self {
        if (-180.0..=180.0).contains(&self.0) {
            return self;
        }
        let mut x = self.0 % 360.0;
        if x > 180.0 {
            x -= 360.0;
        } else if x < -180.0 {
            x += 360.0;
        }
        Degrees(x)
    }
}
