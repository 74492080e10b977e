//! Pattern-based isolation of a dependent variable in an implicit equation.
//!
//! Only two shapes are handled: a squared unknown with a numeric coefficient
//! (`c*z**2 + rest = other`) and an already isolated unknown (`z = expr`).
//! Anything else is reported as unsolvable.

use log::debug;
use num_traits::{One, Signed, Zero};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VizError};
use crate::expr::{Expr, Func, Rational};
use crate::format::pretty;
use crate::parser::parse_expr;

/// Which square root to produce for `var**2 = q`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchPolicy {
    /// `sqrt(abs(q))`: the non-negative sheet of the surface.
    #[default]
    Upper,
    /// `sqrt(abs(q)) * sign(q)`: negative where `q` is negative.
    Signed,
}

/// Resolution when both sides carry the squared unknown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TieBreak {
    /// Use the left coefficient; the remainder is `right - left`.
    PreferLeft,
}

pub const TIE_BREAK: TieBreak = TieBreak::PreferLeft;

/// Solve `equation` (text containing `=`) for `variable`, returning normalized text.
pub fn isolate(equation: &str, variable: &str, policy: BranchPolicy) -> Result<String> {
    let Some((left_text, right_text)) = equation.split_once('=') else {
        return Err(unsolvable(equation, variable));
    };
    let left = parse_expr(left_text.trim())?;
    let right = parse_expr(right_text.trim())?;

    let mut lhs = Terms::default();
    let mut rhs = Terms::default();
    lhs.collect(&left, Rational::one(), variable);
    rhs.collect(&right, Rational::one(), variable);

    if !lhs.has_square && !rhs.has_square {
        return match (left.as_variable(), right.as_variable()) {
            (Some(v), _) if v == variable && !right.contains_var(variable) => {
                Ok(right_text.trim().to_string())
            }
            (_, Some(v)) if v == variable && !left.contains_var(variable) => {
                Ok(left_text.trim().to_string())
            }
            _ => Err(unsolvable(equation, variable)),
        };
    }

    if lhs.mentions(variable) || rhs.mentions(variable) {
        debug!("`{variable}` survives outside its squared term in `{equation}`");
        return Err(unsolvable(equation, variable));
    }

    // coefficient * var**2 = other
    let (coefficient, other) = match (lhs.has_square, rhs.has_square, TIE_BREAK) {
        (true, false, _) => (lhs.square.clone(), rhs.minus(&lhs)),
        (false, true, _) => (rhs.square.clone(), lhs.minus(&rhs)),
        (true, true, TieBreak::PreferLeft) => (lhs.square.clone(), rhs.minus(&lhs)),
        (false, false, _) => return Err(unsolvable(equation, variable)),
    };
    if coefficient.is_zero() {
        debug!("squared coefficient of `{variable}` is zero in `{equation}`");
        return Err(unsolvable(equation, variable));
    }

    let solved = square_root(other.over(&coefficient), policy);
    Ok(pretty(&solved))
}

fn unsolvable(equation: &str, variable: &str) -> VizError {
    VizError::UnsolvableEquation {
        equation: equation.to_string(),
        variable: variable.to_string(),
    }
}

fn square_root(ratio: Expr, policy: BranchPolicy) -> Expr {
    let root = Expr::call(Func::Sqrt, Expr::call(Func::Abs, ratio.clone()));
    match policy {
        BranchPolicy::Upper => root,
        BranchPolicy::Signed => Expr::Mul(root.boxed(), Expr::call(Func::Sign, ratio).boxed()),
    }
}

/// One side of an equation split into a squared-unknown coefficient and
/// signed remainder terms.
#[derive(Debug, Default, Clone)]
struct Terms {
    has_square: bool,
    square: Rational,
    terms: Vec<(Rational, Expr)>,
    constant: Rational,
}

impl Terms {
    fn collect(&mut self, expr: &Expr, scale: Rational, var: &str) {
        if scale.is_zero() {
            return;
        }
        match expr {
            Expr::Constant(c) => self.constant += scale * c,
            Expr::Add(a, b) => {
                self.collect(a, scale.clone(), var);
                self.collect(b, scale, var);
            }
            Expr::Sub(a, b) => {
                self.collect(a, scale.clone(), var);
                self.collect(b, -scale, var);
            }
            Expr::Neg(a) => self.collect(a, -scale, var),
            Expr::Mul(a, b) => {
                if let Some(c) = constant_of(a) {
                    self.collect(b, scale * c, var);
                } else if let Some(c) = constant_of(b) {
                    self.collect(a, scale * c, var);
                } else {
                    self.push(scale, expr.clone());
                }
            }
            Expr::Div(a, b) => match constant_of(b) {
                Some(c) if !c.is_zero() => self.collect(a, scale / c, var),
                _ => self.push(scale, expr.clone()),
            },
            Expr::Pow(base, exp) if is_square_of(base, exp, var) => {
                self.has_square = true;
                self.square += scale;
            }
            _ => self.push(scale, expr.clone()),
        }
    }

    fn push(&mut self, scale: Rational, expr: Expr) {
        self.terms.push((scale, expr));
    }

    fn mentions(&self, var: &str) -> bool {
        self.terms.iter().any(|(_, t)| t.contains_var(var))
    }

    /// Remainder of `self - other`, ignoring the squared terms of both.
    fn minus(&self, other: &Terms) -> Terms {
        let mut out = Terms {
            constant: &self.constant - &other.constant,
            terms: self.terms.clone(),
            ..Terms::default()
        };
        out.terms
            .extend(other.terms.iter().map(|(s, t)| (-s.clone(), t.clone())));
        out
    }

    /// Build `self / coefficient`, keeping the divisor positive.
    fn over(mut self, coefficient: &Rational) -> Expr {
        if coefficient.is_negative() {
            self.constant = -self.constant;
            for (s, _) in &mut self.terms {
                *s = -s.clone();
            }
        }
        let divisor = coefficient.abs();
        let sum = self.into_sum();
        if divisor.is_one() {
            sum
        } else {
            Expr::Div(sum.boxed(), Expr::Constant(divisor).boxed())
        }
    }

    fn into_sum(self) -> Expr {
        let mut acc: Option<Expr> = None;
        let tail = (!self.constant.is_zero()).then(|| (self.constant, None));
        let parts = self
            .terms
            .into_iter()
            .filter(|(s, _)| !s.is_zero())
            .map(|(s, t)| (s, Some(t)))
            .chain(tail);

        for (scale, term) in parts {
            let magnitude = match term {
                Some(t) if scale.abs().is_one() => t,
                Some(t) => Expr::Mul(Expr::Constant(scale.abs()).boxed(), t.boxed()),
                None => Expr::Constant(scale.abs()),
            };
            acc = Some(match acc {
                None if scale.is_negative() => magnitude.negate(),
                None => magnitude,
                Some(prev) if scale.is_negative() => Expr::Sub(prev.boxed(), magnitude.boxed()),
                Some(prev) => Expr::Add(prev.boxed(), magnitude.boxed()),
            });
        }
        acc.unwrap_or_else(crate::expr::zero)
    }
}

fn is_square_of(base: &Expr, exp: &Expr, var: &str) -> bool {
    base.as_variable() == Some(var)
        && constant_of(exp).is_some_and(|e| e == Rational::from_integer(2.into()))
}

fn constant_of(expr: &Expr) -> Option<Rational> {
    match expr {
        Expr::Constant(c) => Some(c.clone()),
        Expr::Neg(inner) => constant_of(inner).map(|c| -c),
        Expr::Mul(a, b) => Some(constant_of(a)? * constant_of(b)?),
        Expr::Div(a, b) => {
            let d = constant_of(b)?;
            if d.is_zero() {
                None
            } else {
                Some(constant_of(a)? / d)
            }
        }
        _ => None,
    }
}
