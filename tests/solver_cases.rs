//! Exact-solver behavior across the supported equation shapes, as a case
//! table: what solves, what is out of scope, and what fails with which
//! diagnostic.
#![allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]

use mathmentor::SymbolicResult;
use mathmentor::solver::try_solve;
use test_case::test_case;

#[test_case("2*x + 3 = 7", &["2"] ; "linear with integer root")]
#[test_case("x/2 = 3", &["6"] ; "division by a constant")]
#[test_case("5 = 2*y + 1", &["2"] ; "variable on the right")]
#[test_case("x + x = 4", &["2"] ; "like terms combine")]
#[test_case("3.5*x = 7", &["2"] ; "decimal coefficient")]
#[test_case("7*x = 3", &["3/7"] ; "rational root stays exact")]
#[test_case("x^2 = 9", &["-3", "3"] ; "pure square")]
#[test_case("x**2 = 4", &["-2", "2"] ; "python power notation")]
#[test_case("x^2 - 5*x + 6 = 0", &["2", "3"] ; "factorable quadratic")]
#[test_case("9 = x^2", &["-3", "3"] ; "negative leading coefficient")]
#[test_case("(x + 1)^2 = 0", &["-1"] ; "expanded double root")]
#[test_case("x^2 - 2 = 0", &["-sqrt(2)", "sqrt(2)"] ; "surd roots")]
#[test_case("x^2 - 2*x - 1 = 0", &["1 - sqrt(2)", "1 + sqrt(2)"] ; "shifted surd roots")]
#[test_case("x^2 + 4 = 0", &["-2*i", "2*i"] ; "imaginary roots")]
#[test_case("x^2 + x + 1 = 0", &["(-1 - sqrt(3)*i)/2", "(-1 + sqrt(3)*i)/2"] ; "complex pair")]
fn solves_exactly(input: &str, expected: &[&str]) {
    match try_solve(input) {
        SymbolicResult::Solved { solutions, .. } => assert_eq!(solutions, expected),
        other => panic!("expected Solved for {input:?}, got {other:?}"),
    }
}

#[test_case("What is the derivative of x^2?" ; "no equals sign")]
#[test_case("a = b = c" ; "chained equality")]
#[test_case("2 = 2" ; "no variable")]
#[test_case("six plus one = seven" ; "words are not variables")]
#[test_case("2x = 4" ; "glued coefficient is not a variable token")]
fn stays_out_of_scope(input: &str) {
    assert!(matches!(
        try_solve(input),
        SymbolicResult::NotApplicable { .. }
    ));
}

#[test_case("x^3 = 8", "degree 3" ; "cubic degree")]
#[test_case("x + y = 2", "more than one variable" ; "two variables")]
#[test_case("x/0 = 1", "division by zero" ; "zero denominator")]
#[test_case("sqrt(x) = 2", "sqrt" ; "function call")]
#[test_case("2*(x + 1 = 4", "')'" ; "unbalanced parenthesis")]
#[test_case("170141183460469231731687303715884105728*x = 1", "overflow" ; "exact arithmetic overflow")]
fn fails_with_reason(input: &str, fragment: &str) {
    match try_solve(input) {
        SymbolicResult::Failed { error } => assert!(
            error.contains(fragment),
            "error {error:?} does not mention {fragment:?}"
        ),
        other => panic!("expected Failed for {input:?}, got {other:?}"),
    }
}

#[test]
fn normalizes_python_power_notation_in_the_equation() {
    match try_solve("x**2 = 4") {
        SymbolicResult::Solved { equation, .. } => assert_eq!(equation, "x^2 = 4"),
        other => panic!("expected Solved, got {other:?}"),
    }
}

#[test]
fn contradictions_solve_to_an_empty_set() {
    match try_solve("x - x = 5") {
        SymbolicResult::Solved { solutions, .. } => assert!(solutions.is_empty()),
        other => panic!("expected Solved with no roots, got {other:?}"),
    }
}
