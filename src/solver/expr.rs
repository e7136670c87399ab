//! Lexing and parsing of arithmetic expressions.
//!
//! Grammar, with `^` binding tightest and associating to the right:
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := factor (('*' | '/') factor)*
//! factor := ('+' | '-')* power
//! power  := atom ('^' factor)?
//! atom   := number | variable | '(' expr ')'
//! ```
//!
//! Numbers are exact rationals (decimal literals included), variables are
//! single ASCII lowercase letters. Multi-letter identifiers and function
//! calls are rejected so the solver never claims input it cannot handle
//! exactly.

use std::fmt;

use super::SolveError;
use super::rational::Rational;

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Expr {
    Number(Rational),
    Variable(char),
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Number(Rational),
    Variable(char),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Variable(name) => write!(f, "{name}"),
            Self::Plus => f.write_str("+"),
            Self::Minus => f.write_str("-"),
            Self::Star => f.write_str("*"),
            Self::Slash => f.write_str("/"),
            Self::Caret => f.write_str("^"),
            Self::LParen => f.write_str("("),
            Self::RParen => f.write_str(")"),
        }
    }
}

/// Parses `text` into an expression tree.
pub(super) fn parse(text: &str) -> Result<Expr, SolveError> {
    let tokens = lex(text)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: text.len(),
    };
    let expr = parser.parse_expr()?;
    if let Some((position, token)) = parser.current() {
        return Err(SolveError::Parse {
            position,
            message: format!("unexpected '{token}'"),
        });
    }
    Ok(expr)
}

fn lex(text: &str) -> Result<Vec<(usize, Token)>, SolveError> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (position, ch) = chars[i];
        match ch {
            c if c.is_whitespace() => i += 1,
            '+' => {
                tokens.push((position, Token::Plus));
                i += 1;
            },
            '-' => {
                tokens.push((position, Token::Minus));
                i += 1;
            },
            '*' => {
                tokens.push((position, Token::Star));
                i += 1;
            },
            '/' => {
                tokens.push((position, Token::Slash));
                i += 1;
            },
            '^' => {
                tokens.push((position, Token::Caret));
                i += 1;
            },
            '(' => {
                tokens.push((position, Token::LParen));
                i += 1;
            },
            ')' => {
                tokens.push((position, Token::RParen));
                i += 1;
            },
            c if c.is_ascii_digit() || c == '.' => {
                let mut integer_part = String::new();
                while i < chars.len() && chars[i].1.is_ascii_digit() {
                    integer_part.push(chars[i].1);
                    i += 1;
                }
                let mut fraction_part = String::new();
                if i < chars.len() && chars[i].1 == '.' {
                    i += 1;
                    while i < chars.len() && chars[i].1.is_ascii_digit() {
                        fraction_part.push(chars[i].1);
                        i += 1;
                    }
                }
                if integer_part.is_empty() && fraction_part.is_empty() {
                    return Err(SolveError::Parse {
                        position,
                        message: "expected digits around '.'".to_string(),
                    });
                }
                let value = Rational::from_decimal(&integer_part, &fraction_part)?;
                tokens.push((position, Token::Number(value)));
            },
            c if c.is_alphabetic() => {
                let mut word = String::new();
                while i < chars.len() && chars[i].1.is_alphabetic() {
                    word.push(chars[i].1);
                    i += 1;
                }
                let mut letters = word.chars();
                match (letters.next(), letters.next()) {
                    (Some(letter), None) if letter.is_ascii_lowercase() => {
                        tokens.push((position, Token::Variable(letter)));
                    },
                    _ => {
                        return Err(SolveError::Parse {
                            position,
                            message: format!("unsupported identifier '{word}'"),
                        });
                    },
                }
            },
            other => {
                return Err(SolveError::Parse {
                    position,
                    message: format!("unexpected character '{other}'"),
                });
            },
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn current(&self) -> Option<(usize, &Token)> {
        self.tokens.get(self.pos).map(|(p, t)| (*p, t))
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn advance(&mut self) -> Option<(usize, Token)> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_expr(&mut self) -> Result<Expr, SolveError> {
        let mut node = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_term()?;
            node = binary(op, node, rhs);
        }
        Ok(node)
    }

    fn parse_term(&mut self) -> Result<Expr, SolveError> {
        let mut node = self.parse_factor()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_factor()?;
            node = binary(op, node, rhs);
        }
        Ok(node)
    }

    fn parse_factor(&mut self) -> Result<Expr, SolveError> {
        let mut negate = false;
        loop {
            match self.peek() {
                Some(Token::Plus) => self.pos += 1,
                Some(Token::Minus) => {
                    negate = !negate;
                    self.pos += 1;
                },
                _ => break,
            }
        }
        let operand = self.parse_power()?;
        Ok(if negate {
            Expr::Neg(Box::new(operand))
        } else {
            operand
        })
    }

    fn parse_power(&mut self) -> Result<Expr, SolveError> {
        let base = self.parse_atom()?;
        if matches!(self.peek(), Some(Token::Caret)) {
            self.pos += 1;
            // Right-associative; the exponent may carry its own sign.
            let exponent = self.parse_factor()?;
            return Ok(binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn parse_atom(&mut self) -> Result<Expr, SolveError> {
        match self.advance() {
            Some((_, Token::Number(value))) => Ok(Expr::Number(value)),
            Some((_, Token::Variable(name))) => Ok(Expr::Variable(name)),
            Some((_, Token::LParen)) => {
                let inner = self.parse_expr()?;
                match self.advance() {
                    Some((_, Token::RParen)) => Ok(inner),
                    Some((position, token)) => Err(SolveError::Parse {
                        position,
                        message: format!("expected ')', found '{token}'"),
                    }),
                    None => Err(SolveError::Parse {
                        position: self.end,
                        message: "expected ')'".to_string(),
                    }),
                }
            },
            Some((position, token)) => Err(SolveError::Parse {
                position,
                message: format!("expected a number, variable, or '(', found '{token}'"),
            }),
            None => Err(SolveError::Parse {
                position: self.end,
                message: "unexpected end of expression".to_string(),
            }),
        }
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

impl BinaryOp {
    const fn precedence(self) -> u8 {
        match self {
            Self::Add | Self::Sub => 1,
            Self::Mul | Self::Div => 2,
            Self::Pow => 4,
        }
    }
}

impl Expr {
    fn precedence(&self) -> u8 {
        match self {
            Self::Number(value) => {
                if value.numerator() < 0 {
                    1
                } else if value.is_integer() {
                    5
                } else {
                    // Renders with a '/', so it binds like division.
                    2
                }
            },
            Self::Variable(_) => 5,
            Self::Neg(_) => 1,
            Self::Binary { op, .. } => op.precedence(),
        }
    }

    fn fmt_prec(&self, f: &mut fmt::Formatter<'_>, min_prec: u8) -> fmt::Result {
        let wrap = self.precedence() < min_prec;
        if wrap {
            f.write_str("(")?;
        }
        match self {
            Self::Number(value) => write!(f, "{value}")?,
            Self::Variable(name) => write!(f, "{name}")?,
            Self::Neg(operand) => {
                f.write_str("-")?;
                operand.fmt_prec(f, 2)?;
            },
            Self::Binary { op, lhs, rhs } => {
                let (left_min, right_min, symbol) = match op {
                    BinaryOp::Add => (1, 1, " + "),
                    BinaryOp::Sub => (1, 2, " - "),
                    BinaryOp::Mul => (2, 2, "*"),
                    BinaryOp::Div => (2, 3, "/"),
                    BinaryOp::Pow => (5, 4, "^"),
                };
                lhs.fmt_prec(f, left_min)?;
                f.write_str(symbol)?;
                rhs.fmt_prec(f, right_min)?;
            },
        }
        if wrap {
            f.write_str(")")?;
        }
        Ok(())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_prec(f, 0)
    }
}
