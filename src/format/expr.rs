use crate::expr::{Expr, Rational};
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, Zero};

/// Namespace token the numeric backend expects in front of function calls.
pub const BACKEND_NAMESPACE: &str = "np";

// Binding strength, loosest first. Mirrors Python operator precedence.
const SUM: u8 = 1;
const PRODUCT: u8 = 2;
const UNARY: u8 = 3;
const POWER: u8 = 4;
const ATOM: u8 = 5;

/// Render an expression in normalized form: `**` powers, namespaced calls and exact constants.
pub fn pretty(expr: &Expr) -> String {
    pp(expr).0
}

fn pp(expr: &Expr) -> (String, u8) {
    match expr {
        Expr::Variable(v) => (v.clone(), ATOM),
        Expr::Constant(r) => constant(r),

        Expr::Add(a, b) => {
            let left = pp(a).0;
            let body = match split_neg(b) {
                Some(inner) => format!("{left}-{}", bracket(&inner, SUM + 1)),
                None => format!("{left}+{}", bracket(b, SUM)),
            };
            (body, SUM)
        }

        Expr::Sub(a, b) => {
            let left = pp(a).0;
            let body = match split_neg(b) {
                Some(inner) => format!("{left}+{}", bracket(&inner, SUM)),
                None => format!("{left}-{}", bracket(b, SUM + 1)),
            };
            (body, SUM)
        }

        Expr::Mul(a, b) => (
            format!("{}*{}", bracket(a, PRODUCT), bracket(b, PRODUCT + 1)),
            PRODUCT,
        ),

        Expr::Div(a, b) => (
            format!("{}/{}", bracket(a, PRODUCT), bracket(b, PRODUCT + 1)),
            PRODUCT,
        ),

        Expr::Pow(a, b) => (
            format!("{}**{}", bracket(a, POWER + 1), bracket(b, POWER)),
            POWER,
        ),

        Expr::Neg(a) => (format!("-{}", bracket(a, UNARY + 1)), UNARY),

        Expr::Call(func, arg) => (
            format!("{BACKEND_NAMESPACE}.{}({})", func.name(), pp(arg).0),
            ATOM,
        ),
    }
}

fn bracket(expr: &Expr, min_prec: u8) -> String {
    let (body, prec) = pp(expr);
    if prec < min_prec {
        format!("({body})")
    } else {
        body
    }
}

fn split_neg(expr: &Expr) -> Option<Expr> {
    match expr {
        Expr::Neg(inner) => Some(*inner.clone()),
        Expr::Constant(r) if r.is_negative() => Some(Expr::Constant(-r)),
        _ => None,
    }
}

fn constant(r: &Rational) -> (String, u8) {
    let text = show_rational(r);
    let prec = if r.is_negative() {
        UNARY
    } else if r.denom().is_one() || terminates(r.denom()) {
        ATOM
    } else {
        PRODUCT
    };
    (text, prec)
}

/// Exact text for a rational: an integer, a terminating decimal, or `n/d`.
pub fn show_rational(r: &Rational) -> String {
    let numer = r.numer();
    let denom = r.denom();
    if denom.is_one() {
        return numer.to_string();
    }
    if !terminates(denom) {
        return format!("{numer}/{denom}");
    }

    let mut digits = 0usize;
    let mut scale = BigInt::one();
    let ten = BigInt::from(10);
    while !(&scale % denom).is_zero() {
        scale *= &ten;
        digits += 1;
    }
    let scaled = (numer.abs() * (&scale / denom)).to_string();
    let padded = format!("{scaled:0>width$}", width = digits + 1);
    let (int_part, frac_part) = padded.split_at(padded.len() - digits);
    let sign = if numer.is_negative() { "-" } else { "" };
    format!("{sign}{int_part}.{frac_part}")
}

fn terminates(denom: &BigInt) -> bool {
    let mut rest = denom.clone();
    for p in [2u32, 5] {
        let p = BigInt::from(p);
        while !rest.is_zero() && rest.is_multiple_of(&p) {
            rest /= &p;
        }
    }
    rest.is_one()
}
