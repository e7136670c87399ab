//! Lowering expression trees to univariate polynomials and solving them
//! exactly up to degree 2.

use std::collections::BTreeMap;

use super::SolveError;
use super::expr::{BinaryOp, Expr};
use super::rational::{Rational, gcd};

/// A univariate polynomial with rational coefficients.
///
/// `variable` is `None` for constants; `terms` maps exponent to a non-zero
/// coefficient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Polynomial {
    variable: Option<char>,
    terms: BTreeMap<u32, Rational>,
}

impl Polynomial {
    fn constant(value: Rational) -> Self {
        let mut terms = BTreeMap::new();
        if !value.is_zero() {
            terms.insert(0, value);
        }
        Self {
            variable: None,
            terms,
        }
    }

    fn variable_term(name: char) -> Self {
        let mut terms = BTreeMap::new();
        terms.insert(1, Rational::ONE);
        Self {
            variable: Some(name),
            terms,
        }
    }

    /// Lowers an expression tree, rejecting anything non-polynomial.
    pub fn from_expr(expr: &Expr) -> Result<Self, SolveError> {
        match expr {
            Expr::Number(value) => Ok(Self::constant(*value)),
            Expr::Variable(name) => Ok(Self::variable_term(*name)),
            Expr::Neg(operand) => Self::from_expr(operand)?.negate(),
            Expr::Binary { op, lhs, rhs } => {
                let lhs = Self::from_expr(lhs)?;
                let rhs = Self::from_expr(rhs)?;
                match op {
                    BinaryOp::Add => lhs.add(&rhs),
                    BinaryOp::Sub => lhs.add(&rhs.negate()?),
                    BinaryOp::Mul => lhs.mul(&rhs),
                    BinaryOp::Div => lhs.div(&rhs),
                    BinaryOp::Pow => lhs.pow(&rhs),
                }
            },
        }
    }

    /// Highest exponent with a non-zero coefficient, 0 for constants.
    pub fn degree(&self) -> u32 {
        self.terms.keys().next_back().copied().unwrap_or(0)
    }

    /// Exact roots rendered as display strings, ascending.
    ///
    /// Degree 0 yields no roots whether the constant is zero (identity) or
    /// not (contradiction); the distinction is invisible in the solution
    /// set, matching how symbolic algebra systems report it.
    pub fn roots(&self) -> Result<Vec<String>, SolveError> {
        let coefficients = self.integer_coefficients()?;
        match self.degree() {
            0 => Ok(Vec::new()),
            1 => {
                let slope = coefficients.get(&1).copied().unwrap_or(0);
                let offset = coefficients.get(&0).copied().unwrap_or(0);
                let root =
                    Rational::new(offset.checked_neg().ok_or(SolveError::Overflow)?, slope)?;
                Ok(vec![root.to_string()])
            },
            2 => quadratic_roots(&coefficients),
            degree => Err(SolveError::UnsupportedDegree(degree)),
        }
    }

    fn merge_variables(
        a: Option<char>,
        b: Option<char>,
    ) -> Result<Option<char>, SolveError> {
        match (a, b) {
            (Some(first), Some(second)) if first != second => {
                Err(SolveError::Multivariate { first, second })
            },
            (Some(name), _) => Ok(Some(name)),
            (None, other) => Ok(other),
        }
    }

    fn add(&self, other: &Self) -> Result<Self, SolveError> {
        let variable = Self::merge_variables(self.variable, other.variable)?;
        let mut terms = self.terms.clone();
        for (&exp, &coeff) in &other.terms {
            let entry = terms.entry(exp).or_insert(Rational::ZERO);
            *entry = entry.checked_add(coeff)?;
        }
        terms.retain(|_, coeff| !coeff.is_zero());
        Ok(Self { variable, terms })
    }

    fn negate(&self) -> Result<Self, SolveError> {
        let mut terms = BTreeMap::new();
        for (&exp, &coeff) in &self.terms {
            terms.insert(exp, coeff.checked_neg()?);
        }
        Ok(Self {
            variable: self.variable,
            terms,
        })
    }

    fn mul(&self, other: &Self) -> Result<Self, SolveError> {
        let variable = Self::merge_variables(self.variable, other.variable)?;
        let mut terms: BTreeMap<u32, Rational> = BTreeMap::new();
        for (&left_exp, &left_coeff) in &self.terms {
            for (&right_exp, &right_coeff) in &other.terms {
                let exp = left_exp
                    .checked_add(right_exp)
                    .ok_or(SolveError::Overflow)?;
                let product = left_coeff.checked_mul(right_coeff)?;
                let entry = terms.entry(exp).or_insert(Rational::ZERO);
                *entry = entry.checked_add(product)?;
            }
        }
        terms.retain(|_, coeff| !coeff.is_zero());
        Ok(Self { variable, terms })
    }

    fn div(&self, other: &Self) -> Result<Self, SolveError> {
        let Some(divisor) = other.as_constant() else {
            return Err(SolveError::NotPolynomial(
                "division by an expression containing the variable".to_string(),
            ));
        };
        if divisor.is_zero() {
            return Err(SolveError::DivisionByZero);
        }
        let mut terms = BTreeMap::new();
        for (&exp, &coeff) in &self.terms {
            terms.insert(exp, coeff.checked_div(divisor)?);
        }
        Ok(Self {
            variable: self.variable,
            terms,
        })
    }

    fn pow(&self, other: &Self) -> Result<Self, SolveError> {
        let Some(exponent) = other.as_constant() else {
            return Err(SolveError::NotPolynomial(
                "exponent contains the variable".to_string(),
            ));
        };
        if !exponent.is_integer() {
            return Err(SolveError::NotPolynomial(format!(
                "non-integer exponent {exponent}"
            )));
        }
        let raw = exponent.numerator();

        if let Some(base) = self.as_constant() {
            return Ok(Self::constant(base.checked_pow(raw)?));
        }
        if raw < 0 {
            return Err(SolveError::NotPolynomial(format!(
                "negative exponent {raw} on the variable"
            )));
        }

        // Exponentiation by squaring; keeps x^large cheap.
        let mut remaining = raw.unsigned_abs();
        let mut result = Self::constant(Rational::ONE);
        let mut base = self.clone();
        while remaining > 0 {
            if remaining & 1 == 1 {
                result = result.mul(&base)?;
            }
            remaining >>= 1;
            if remaining > 0 {
                base = base.mul(&base)?;
            }
        }
        Ok(result)
    }

    /// The constant value when no variable term remains.
    fn as_constant(&self) -> Option<Rational> {
        if self.terms.keys().all(|&exp| exp == 0) {
            Some(self.terms.get(&0).copied().unwrap_or(Rational::ZERO))
        } else {
            None
        }
    }

    /// Scales to primitive integer coefficients with a positive leading
    /// coefficient. Roots are unchanged by the scaling.
    fn integer_coefficients(&self) -> Result<BTreeMap<u32, i128>, SolveError> {
        let mut common_den: i128 = 1;
        for coeff in self.terms.values() {
            common_den = lcm(common_den, coeff.denominator())?;
        }

        let mut scaled: BTreeMap<u32, i128> = BTreeMap::new();
        for (&exp, coeff) in &self.terms {
            let value = coeff
                .numerator()
                .checked_mul(common_den / coeff.denominator())
                .ok_or(SolveError::Overflow)?;
            scaled.insert(exp, value);
        }

        let mut common: u128 = 0;
        for value in scaled.values() {
            common = gcd(common, value.unsigned_abs());
        }
        if common > 1 {
            let divisor = i128::try_from(common).map_err(|_| SolveError::Overflow)?;
            for value in scaled.values_mut() {
                *value /= divisor;
            }
        }

        let leading_negative = scaled.values().next_back().is_some_and(|&lead| lead < 0);
        if leading_negative {
            for value in scaled.values_mut() {
                *value = value.checked_neg().ok_or(SolveError::Overflow)?;
            }
        }
        Ok(scaled)
    }
}

fn lcm(a: i128, b: i128) -> Result<i128, SolveError> {
    let common = i128::try_from(gcd(a.unsigned_abs(), b.unsigned_abs()))
        .map_err(|_| SolveError::Overflow)?;
    (a / common).checked_mul(b).ok_or(SolveError::Overflow)
}

/// Solves `quad*x^2 + linear*x + constant = 0` exactly.
///
/// The leading coefficient is positive here, so the minus-branch root
/// always sorts before the plus-branch root.
fn quadratic_roots(coefficients: &BTreeMap<u32, i128>) -> Result<Vec<String>, SolveError> {
    let quad = coefficients.get(&2).copied().unwrap_or(0);
    let linear = coefficients.get(&1).copied().unwrap_or(0);
    let constant = coefficients.get(&0).copied().unwrap_or(0);

    let discriminant = linear
        .checked_mul(linear)
        .and_then(|squared| {
            quad.checked_mul(constant)
                .and_then(|product| product.checked_mul(4))
                .and_then(|scaled| squared.checked_sub(scaled))
        })
        .ok_or(SolveError::Overflow)?;

    let neg_linear = linear.checked_neg().ok_or(SolveError::Overflow)?;
    let denominator = quad.checked_mul(2).ok_or(SolveError::Overflow)?;

    if discriminant == 0 {
        let root = Rational::new(neg_linear, denominator)?;
        return Ok(vec![root.to_string()]);
    }

    let magnitude = discriminant.unsigned_abs();
    if discriminant > 0 {
        let floor = magnitude.isqrt();
        if floor.checked_mul(floor) == Some(magnitude) {
            let exact = i128::try_from(floor).map_err(|_| SolveError::Overflow)?;
            let minus = Rational::new(
                neg_linear.checked_sub(exact).ok_or(SolveError::Overflow)?,
                denominator,
            )?;
            let plus = Rational::new(
                neg_linear.checked_add(exact).ok_or(SolveError::Overflow)?,
                denominator,
            )?;
            return Ok(vec![minus.to_string(), plus.to_string()]);
        }
    }

    let (square_part, radicand) = extract_square(magnitude);
    let square_part = i128::try_from(square_part).map_err(|_| SolveError::Overflow)?;
    let common = i128::try_from(gcd(
        gcd(neg_linear.unsigned_abs(), square_part.unsigned_abs()),
        denominator.unsigned_abs(),
    ))
    .map_err(|_| SolveError::Overflow)?;

    let offset = neg_linear / common;
    let scale = square_part / common;
    let divisor = denominator / common;
    let imaginary = discriminant < 0;

    Ok(vec![
        format_surd(offset, scale, radicand, divisor, '-', imaginary),
        format_surd(offset, scale, radicand, divisor, '+', imaginary),
    ])
}

/// Renders one root of the form `(offset ± scale*sqrt(radicand))/divisor`,
/// dropping the parts that are trivial.
fn format_surd(
    offset: i128,
    scale: i128,
    radicand: u128,
    divisor: i128,
    sign: char,
    imaginary: bool,
) -> String {
    let radical = if imaginary {
        if radicand == 1 {
            "i".to_string()
        } else {
            format!("sqrt({radicand})*i")
        }
    } else {
        format!("sqrt({radicand})")
    };
    let term = if scale == 1 {
        radical
    } else {
        format!("{scale}*{radical}")
    };

    let numerator = if offset == 0 {
        if sign == '-' {
            format!("-{term}")
        } else {
            term
        }
    } else {
        format!("{offset} {sign} {term}")
    };

    if divisor == 1 {
        numerator
    } else if offset == 0 {
        format!("{numerator}/{divisor}")
    } else {
        format!("({numerator})/{divisor}")
    }
}

/// Splits `n` into its largest extractable square factor and the remainder,
/// so `sqrt(n) == square_part * sqrt(radicand)`.
fn extract_square(mut n: u128) -> (u128, u128) {
    let mut square_part: u128 = 1;
    let mut factor: u128 = 2;
    while factor < 1_000_000 && factor.saturating_mul(factor) <= n {
        let factor_squared = factor * factor;
        while n % factor_squared == 0 {
            n /= factor_squared;
            square_part *= factor;
        }
        factor += 1;
    }
    let floor = n.isqrt();
    if floor.checked_mul(floor) == Some(n) {
        square_part *= floor;
        n = 1;
    }
    (square_part, n)
}
