//! Exact rational arithmetic over `i128` numerator/denominator pairs.
//!
//! Every operation is checked; overflow surfaces as an error instead of
//! wrapping, so a solved root is always exact.

use std::fmt;

use super::SolveError;

/// A rational number in lowest terms with a positive denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Rational {
    num: i128,
    den: i128,
}

impl Rational {
    pub const ZERO: Self = Self { num: 0, den: 1 };
    pub const ONE: Self = Self { num: 1, den: 1 };

    /// Creates a reduced rational from a numerator and denominator.
    pub fn new(num: i128, den: i128) -> Result<Self, SolveError> {
        if den == 0 {
            return Err(SolveError::DivisionByZero);
        }
        let negative = (num < 0) != (den < 0);
        let common = gcd(num.unsigned_abs(), den.unsigned_abs());
        let num_reduced =
            i128::try_from(num.unsigned_abs() / common).map_err(|_| SolveError::Overflow)?;
        let den_reduced =
            i128::try_from(den.unsigned_abs() / common).map_err(|_| SolveError::Overflow)?;
        Ok(Self {
            num: if negative { -num_reduced } else { num_reduced },
            den: den_reduced,
        })
    }

    pub const fn from_integer(num: i128) -> Self {
        Self { num, den: 1 }
    }

    /// Builds a rational from the digit strings of a decimal literal, e.g.
    /// `("3", "25")` for `3.25`. Either part may be empty.
    pub fn from_decimal(integer_part: &str, fraction_part: &str) -> Result<Self, SolveError> {
        let whole: i128 = if integer_part.is_empty() {
            0
        } else {
            integer_part.parse().map_err(|_| SolveError::Overflow)?
        };
        let places = u32::try_from(fraction_part.len()).map_err(|_| SolveError::Overflow)?;
        let scale = 10_i128.checked_pow(places).ok_or(SolveError::Overflow)?;
        let fraction: i128 = if fraction_part.is_empty() {
            0
        } else {
            fraction_part.parse().map_err(|_| SolveError::Overflow)?
        };
        let num = whole
            .checked_mul(scale)
            .and_then(|scaled| scaled.checked_add(fraction))
            .ok_or(SolveError::Overflow)?;
        Self::new(num, scale)
    }

    pub const fn is_zero(self) -> bool {
        self.num == 0
    }

    pub const fn is_integer(self) -> bool {
        self.den == 1
    }

    pub const fn numerator(self) -> i128 {
        self.num
    }

    pub const fn denominator(self) -> i128 {
        self.den
    }

    pub fn checked_add(self, other: Self) -> Result<Self, SolveError> {
        let left = self.num.checked_mul(other.den).ok_or(SolveError::Overflow)?;
        let right = other.num.checked_mul(self.den).ok_or(SolveError::Overflow)?;
        let num = left.checked_add(right).ok_or(SolveError::Overflow)?;
        let den = self.den.checked_mul(other.den).ok_or(SolveError::Overflow)?;
        Self::new(num, den)
    }

    pub fn checked_sub(self, other: Self) -> Result<Self, SolveError> {
        self.checked_add(other.checked_neg()?)
    }

    pub fn checked_mul(self, other: Self) -> Result<Self, SolveError> {
        let num = self.num.checked_mul(other.num).ok_or(SolveError::Overflow)?;
        let den = self.den.checked_mul(other.den).ok_or(SolveError::Overflow)?;
        Self::new(num, den)
    }

    pub fn checked_div(self, other: Self) -> Result<Self, SolveError> {
        if other.is_zero() {
            return Err(SolveError::DivisionByZero);
        }
        let num = self.num.checked_mul(other.den).ok_or(SolveError::Overflow)?;
        let den = self.den.checked_mul(other.num).ok_or(SolveError::Overflow)?;
        Self::new(num, den)
    }

    pub fn checked_neg(self) -> Result<Self, SolveError> {
        Ok(Self {
            num: self.num.checked_neg().ok_or(SolveError::Overflow)?,
            den: self.den,
        })
    }

    /// Integer exponentiation; negative exponents invert the base.
    pub fn checked_pow(self, exponent: i128) -> Result<Self, SolveError> {
        if exponent < 0 {
            if self.is_zero() {
                return Err(SolveError::DivisionByZero);
            }
            let inverted = Self::ONE.checked_div(self)?;
            return inverted.checked_pow(
                exponent.checked_neg().ok_or(SolveError::Overflow)?,
            );
        }

        let mut remaining = exponent.unsigned_abs();
        let mut result = Self::ONE;
        let mut base = self;
        while remaining > 0 {
            if remaining & 1 == 1 {
                result = result.checked_mul(base)?;
            }
            remaining >>= 1;
            if remaining > 0 {
                base = base.checked_mul(base)?;
            }
        }
        Ok(result)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

/// Greatest common divisor; `gcd(0, 0)` is defined as 1 so reduction never
/// divides by zero.
pub(super) const fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let remainder = a % b;
        a = b;
        b = remainder;
    }
    if a == 0 { 1 } else { a }
}
