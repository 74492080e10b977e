use num_traits::ToPrimitive;

use crate::error::{Result, VizError};
use crate::expr::{Expr, Func};
use crate::parser::parse_expr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinOp {
    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BinOp::Add => a + b,
            BinOp::Sub => a - b,
            BinOp::Mul => a * b,
            BinOp::Div => a / b,
            BinOp::Pow => a.powf(b),
        }
    }
}

#[derive(Clone, Debug)]
enum Node {
    Const(f64),
    Var(usize),
    Neg(Box<Node>),
    Binary(BinOp, Box<Node>, Box<Node>),
    Call(Func, Box<Node>),
}

/// An expression lowered to `f64` arithmetic over a fixed list of variables.
#[derive(Clone, Debug)]
pub struct CompiledExpr {
    root: Node,
    variables: Vec<String>,
}

impl CompiledExpr {
    /// Lower `expr`; every variable it uses must appear in `variables`.
    pub fn compile(expr: &Expr, variables: &[&str]) -> Result<Self> {
        let names: Vec<String> = variables.iter().map(|v| v.to_string()).collect();
        let root = lower(expr, &names)?;
        Ok(Self {
            root,
            variables: names,
        })
    }

    pub fn from_text(text: &str, variables: &[&str]) -> Result<Self> {
        Self::compile(&parse_expr(text)?, variables)
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Value at a single point, coordinates in `variables` order.
    pub fn eval(&self, point: &[f64]) -> f64 {
        eval_node(&self.root, point)
    }

    /// Evaluate over whole columns at once. Every column must hold `len` samples.
    pub fn eval_columns(&self, columns: &[&[f64]], len: usize) -> Result<Vec<f64>> {
        if columns.len() != self.variables.len() {
            return Err(VizError::Domain(format!(
                "expected {} input columns, got {}",
                self.variables.len(),
                columns.len()
            )));
        }
        if let Some(bad) = columns.iter().find(|c| c.len() != len) {
            return Err(VizError::Domain(format!(
                "column holds {} samples, expected {len}",
                bad.len()
            )));
        }
        Ok(eval_vector(&self.root, columns, len))
    }
}

fn lower(expr: &Expr, names: &[String]) -> Result<Node> {
    let node = match expr {
        Expr::Variable(v) => match names.iter().position(|n| n == v) {
            Some(slot) => Node::Var(slot),
            None => {
                return Err(VizError::parse(
                    expr.to_string(),
                    format!("unknown variable `{v}`"),
                ))
            }
        },
        Expr::Constant(c) => match c.to_f64() {
            Some(value) => Node::Const(value),
            None => {
                return Err(VizError::parse(
                    expr.to_string(),
                    "constant out of floating point range",
                ))
            }
        },
        Expr::Add(a, b) => binary(BinOp::Add, a, b, names)?,
        Expr::Sub(a, b) => binary(BinOp::Sub, a, b, names)?,
        Expr::Mul(a, b) => binary(BinOp::Mul, a, b, names)?,
        Expr::Div(a, b) => binary(BinOp::Div, a, b, names)?,
        Expr::Pow(a, b) => binary(BinOp::Pow, a, b, names)?,
        Expr::Neg(a) => Node::Neg(Box::new(lower(a, names)?)),
        Expr::Call(func, a) => Node::Call(*func, Box::new(lower(a, names)?)),
    };
    Ok(node)
}

fn binary(op: BinOp, a: &Expr, b: &Expr, names: &[String]) -> Result<Node> {
    Ok(Node::Binary(
        op,
        Box::new(lower(a, names)?),
        Box::new(lower(b, names)?),
    ))
}

fn eval_node(node: &Node, point: &[f64]) -> f64 {
    match node {
        Node::Const(c) => *c,
        Node::Var(slot) => point.get(*slot).copied().unwrap_or(f64::NAN),
        Node::Neg(a) => -eval_node(a, point),
        Node::Binary(op, a, b) => op.apply(eval_node(a, point), eval_node(b, point)),
        Node::Call(func, a) => func.apply(eval_node(a, point)),
    }
}

fn eval_vector(node: &Node, columns: &[&[f64]], len: usize) -> Vec<f64> {
    match node {
        Node::Const(c) => vec![*c; len],
        Node::Var(slot) => columns[*slot].to_vec(),
        Node::Neg(a) => {
            let mut out = eval_vector(a, columns, len);
            out.iter_mut().for_each(|v| *v = -*v);
            out
        }
        Node::Binary(op, a, b) => {
            let mut left = eval_vector(a, columns, len);
            let right = eval_vector(b, columns, len);
            left.iter_mut()
                .zip(right)
                .for_each(|(l, r)| *l = op.apply(*l, r));
            left
        }
        Node::Call(func, a) => {
            let mut out = eval_vector(a, columns, len);
            out.iter_mut().for_each(|v| *v = func.apply(*v));
            out
        }
    }
}
