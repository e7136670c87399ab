//! Exact symbolic solving for equation-shaped input.
//!
//! Recognizes problems like:
//! - `2*x + 3 = 7` - linear, one rational root
//! - `x^2 - 5*x + 6 = 0` - quadratic, rational roots
//! - `x^2 = 2` - quadratic, surd roots rendered as `sqrt(...)` strings
//! - `x**2 = 4` - Python-style powers are normalized before parsing
//!
//! Anything else (no equation shape, unsupported functions, degree above 2,
//! more than one variable) is reported as not applicable or failed. The
//! result is advisory: the reasoning stage attaches it to the narrative
//! solution but never depends on it.

mod expr;
mod poly;
mod rational;

use thiserror::Error;

use crate::models::SymbolicResult;

use self::expr::{BinaryOp, Expr};
use self::poly::Polynomial;

/// Internal solver failures; each one is rendered into
/// [`SymbolicResult::Failed`] at the public boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum SolveError {
    /// The expression text could not be parsed.
    #[error("parse error at byte {position}: {message}")]
    Parse {
        /// Byte offset into the side being parsed.
        position: usize,
        /// What went wrong.
        message: String,
    },

    /// Exact arithmetic left the `i128` range.
    #[error("arithmetic overflow during exact computation")]
    Overflow,

    /// Division by zero in a constant expression.
    #[error("division by zero")]
    DivisionByZero,

    /// The equation mentions more than one variable.
    #[error("equation involves more than one variable ('{first}' and '{second}')")]
    Multivariate {
        /// First variable encountered.
        first: char,
        /// Conflicting variable.
        second: char,
    },

    /// The equation does not reduce to a polynomial.
    #[error("not a polynomial equation: {0}")]
    NotPolynomial(String),

    /// Polynomial degree beyond the exact solver.
    #[error("degree {0} is beyond the exact solver (maximum 2)")]
    UnsupportedDegree(u32),
}

/// Attempts to solve `problem_text` as a univariate equation.
///
/// Never fails: input that does not look like an equation comes back as
/// [`SymbolicResult::NotApplicable`], and equation-shaped input the solver
/// cannot handle comes back as [`SymbolicResult::Failed`].
///
/// # Examples
///
/// ```
/// use mathmentor::models::SymbolicResult;
/// use mathmentor::solver::try_solve;
///
/// let result = try_solve("2*x + 3 = 7");
/// match result {
///     SymbolicResult::Solved { solutions, .. } => assert_eq!(solutions, vec!["2"]),
///     other => panic!("expected a solution, got {other:?}"),
/// }
///
/// assert!(matches!(
///     try_solve("What is the chain rule?"),
///     SymbolicResult::NotApplicable { .. }
/// ));
/// ```
#[must_use]
pub fn try_solve(problem_text: &str) -> SymbolicResult {
    let normalized = problem_text.trim().replace("**", "^");

    let parts: Vec<&str> = normalized.split('=').collect();
    if parts.len() != 2 {
        let reason = if parts.len() < 2 {
            "no equals sign in problem text"
        } else {
            "more than one equals sign"
        };
        return SymbolicResult::NotApplicable {
            reason: reason.to_string(),
        };
    }

    if !has_variable_token(&normalized) {
        return SymbolicResult::NotApplicable {
            reason: "no standalone single-letter variable".to_string(),
        };
    }

    match solve_equation(parts[0], parts[1]) {
        Ok((equation, solutions)) => SymbolicResult::Solved {
            equation,
            solutions,
        },
        Err(e) => {
            tracing::debug!(error = %e, "Symbolic solve failed");
            SymbolicResult::Failed {
                error: e.to_string(),
            }
        },
    }
}

fn solve_equation(
    lhs_text: &str,
    rhs_text: &str,
) -> Result<(String, Vec<String>), SolveError> {
    let lhs = expr::parse(lhs_text)?;
    let rhs = expr::parse(rhs_text)?;
    let equation = format!("{lhs} = {rhs}");

    let difference = Expr::Binary {
        op: BinaryOp::Sub,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    };
    let polynomial = Polynomial::from_expr(&difference)?;
    let solutions = polynomial.roots()?;
    Ok((equation, solutions))
}

/// True when the text contains a standalone single lowercase letter,
/// delimited by anything non-alphanumeric.
///
/// This is the equation gate: `six = 6` has no variable token, while
/// `2*x + 3 = 7` does.
fn has_variable_token(text: &str) -> bool {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .any(|token| token.len() == 1 && token.chars().all(|c| c.is_ascii_lowercase()))
}
