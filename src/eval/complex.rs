use num_complex::Complex64;
use num_traits::ToPrimitive;

use crate::error::{Result, VizError};
use crate::eval::grid::AxisRange;
use crate::expr::{Expr, Func};
use crate::parser::parse_expr;

/// Names read as the imaginary unit.
pub const IMAGINARY_UNITS: [&str; 3] = ["i", "I", "j"];

#[derive(Clone, Debug)]
enum CNode {
    Const(Complex64),
    Var,
    Neg(Box<CNode>),
    Add(Box<CNode>, Box<CNode>),
    Sub(Box<CNode>, Box<CNode>),
    Mul(Box<CNode>, Box<CNode>),
    Div(Box<CNode>, Box<CNode>),
    Pow(Box<CNode>, Box<CNode>),
    Call(Func, Box<CNode>),
}

/// A function of one complex variable.
#[derive(Clone, Debug)]
pub struct ComplexExpr {
    root: CNode,
}

impl ComplexExpr {
    pub fn compile(expr: &Expr, variable: &str) -> Result<Self> {
        Ok(Self {
            root: lower(expr, variable)?,
        })
    }

    pub fn from_text(text: &str, variable: &str) -> Result<Self> {
        Self::compile(&parse_expr(text)?, variable)
    }

    pub fn eval(&self, z: Complex64) -> Complex64 {
        eval(&self.root, z)
    }
}

/// Values of a complex function on a rectangle of the plane, row-major.
#[derive(Clone, Debug)]
pub struct ComplexGrid {
    pub re: Vec<f64>,
    pub im: Vec<f64>,
    pub values: Vec<Option<Complex64>>,
}

impl ComplexGrid {
    pub fn value_at(&self, i: usize, j: usize) -> Option<Complex64> {
        self.values.get(j * self.re.len() + i).copied().flatten()
    }
}

pub fn sample_complex(
    expr: &ComplexExpr,
    re_range: AxisRange,
    im_range: AxisRange,
    samples: usize,
) -> ComplexGrid {
    let re = re_range.linspace(samples);
    let im = im_range.linspace(samples);
    let mut values = Vec::with_capacity(re.len() * im.len());
    for y in &im {
        for x in &re {
            let w = expr.eval(Complex64::new(*x, *y));
            values.push((w.re.is_finite() && w.im.is_finite()).then_some(w));
        }
    }
    ComplexGrid { re, im, values }
}

fn lower(expr: &Expr, variable: &str) -> Result<CNode> {
    let bin = |a: &Expr, b: &Expr| -> Result<(Box<CNode>, Box<CNode>)> {
        Ok((Box::new(lower(a, variable)?), Box::new(lower(b, variable)?)))
    };
    let node = match expr {
        Expr::Variable(v) if v == variable => CNode::Var,
        Expr::Variable(v) if IMAGINARY_UNITS.contains(&v.as_str()) => CNode::Const(Complex64::i()),
        Expr::Variable(v) => {
            return Err(VizError::parse(
                expr.to_string(),
                format!("unknown variable `{v}`"),
            ))
        }
        Expr::Constant(c) => match c.to_f64() {
            Some(value) => CNode::Const(Complex64::new(value, 0.0)),
            None => {
                return Err(VizError::parse(
                    expr.to_string(),
                    "constant out of floating point range",
                ))
            }
        },
        Expr::Add(a, b) => {
            let (a, b) = bin(a, b)?;
            CNode::Add(a, b)
        }
        Expr::Sub(a, b) => {
            let (a, b) = bin(a, b)?;
            CNode::Sub(a, b)
        }
        Expr::Mul(a, b) => {
            let (a, b) = bin(a, b)?;
            CNode::Mul(a, b)
        }
        Expr::Div(a, b) => {
            let (a, b) = bin(a, b)?;
            CNode::Div(a, b)
        }
        Expr::Pow(a, b) => {
            let (a, b) = bin(a, b)?;
            CNode::Pow(a, b)
        }
        Expr::Neg(a) => CNode::Neg(Box::new(lower(a, variable)?)),
        Expr::Call(func, a) => CNode::Call(*func, Box::new(lower(a, variable)?)),
    };
    Ok(node)
}

fn eval(node: &CNode, z: Complex64) -> Complex64 {
    match node {
        CNode::Const(c) => *c,
        CNode::Var => z,
        CNode::Neg(a) => -eval(a, z),
        CNode::Add(a, b) => eval(a, z) + eval(b, z),
        CNode::Sub(a, b) => eval(a, z) - eval(b, z),
        CNode::Mul(a, b) => eval(a, z) * eval(b, z),
        CNode::Div(a, b) => eval(a, z) / eval(b, z),
        CNode::Pow(a, b) => power(eval(a, z), eval(b, z)),
        CNode::Call(func, a) => apply(*func, eval(a, z)),
    }
}

fn power(base: Complex64, exp: Complex64) -> Complex64 {
    if exp.im == 0.0 && exp.re.fract() == 0.0 && exp.re.abs() <= i32::MAX as f64 {
        base.powi(exp.re as i32)
    } else {
        base.powc(exp)
    }
}

fn apply(func: Func, w: Complex64) -> Complex64 {
    match func {
        Func::Sin => w.sin(),
        Func::Cos => w.cos(),
        Func::Tan => w.tan(),
        Func::Asin => w.asin(),
        Func::Acos => w.acos(),
        Func::Atan => w.atan(),
        Func::Sinh => w.sinh(),
        Func::Cosh => w.cosh(),
        Func::Tanh => w.tanh(),
        Func::Exp => w.exp(),
        Func::Log => w.ln(),
        Func::Log10 => w.log10(),
        Func::Sqrt => w.sqrt(),
        Func::Abs => Complex64::new(w.norm(), 0.0),
        Func::Sign => {
            let r = w.norm();
            if r == 0.0 {
                w
            } else {
                w / r
            }
        }
    }
}
