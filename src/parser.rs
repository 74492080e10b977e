use crate::error::{Result, VizError};
use crate::expr::{Expr, Func, Rational};
use nom::IResult;
use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{alpha1, alphanumeric1, char, digit0, digit1, multispace0, one_of};
use nom::combinator::{all_consuming, map, map_opt, not, opt, recognize};
use nom::error::VerboseError;
use nom::multi::{fold_many0, many0_count};
use nom::sequence::{delimited, pair, preceded, terminated, tuple};
use num_bigint::BigInt;

/// Namespaces accepted in front of a function name (`np.sin(x)`).
pub const NAMESPACES: [&str; 3] = ["numpy", "np", "math"];

const MAX_NESTING: usize = 256;
// Bounds the depth of both the recursive descent and the resulting tree.
const MAX_OPERATORS: usize = 256;
const MAX_DECIMAL_SCALE: i64 = 400;

pub fn parse_expr(input: &str) -> Result<Expr> {
    if nesting_depth(input) > MAX_NESTING {
        return Err(VizError::parse(input, "parentheses nested too deeply"));
    }
    if operator_count(input) > MAX_OPERATORS {
        return Err(VizError::parse(input, "too many operators"));
    }
    match all_consuming(ws(parse_add_sub))(input) {
        Ok((_, expr)) => Ok(expr),
        Err(e) => Err(VizError::parse(input, describe(e))),
    }
}

/// Parse an exact decimal or scientific literal such as `3.14159` or `2.5e-3`.
pub fn decimal_to_rational(text: &str) -> Option<Rational> {
    let (mantissa, exponent) = match text.find(|c: char| c == 'e' || c == 'E') {
        Some(idx) => (&text[..idx], text[idx + 1..].parse::<i64>().ok()?),
        None => (text, 0),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits = format!("{int_part}{frac_part}");
    if digits.is_empty() {
        return None;
    }
    let numer: BigInt = digits.parse().ok()?;
    let scale = exponent - frac_part.len() as i64;
    if scale.abs() > MAX_DECIMAL_SCALE {
        return None;
    }
    let ten = BigInt::from(10);
    let value = if scale >= 0 {
        Rational::from_integer(numer * num_traits::pow(ten, scale as usize))
    } else {
        Rational::new(numer, num_traits::pow(ten, (-scale) as usize))
    };
    Some(value)
}

fn describe(err: nom::Err<VerboseError<&str>>) -> String {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => match e.errors.first() {
            Some((rest, _)) if rest.trim().is_empty() => "unexpected end of expression".to_string(),
            Some((rest, _)) => format!("unexpected input at `{}`", rest.trim()),
            None => "invalid expression".to_string(),
        },
        nom::Err::Incomplete(_) => "incomplete expression".to_string(),
    }
}

fn operator_count(input: &str) -> usize {
    input.chars().filter(|c| matches!(c, '+' | '-' | '*' | '/' | '^')).count()
}

fn nesting_depth(input: &str) -> usize {
    let mut depth = 0usize;
    let mut max = 0usize;
    for c in input.chars() {
        match c {
            '(' => {
                depth += 1;
                max = max.max(depth);
            }
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    max
}

fn parse_add_sub(input: &str) -> IResult<&str, Expr, VerboseError<&str>> {
    let (rest, init) = parse_mul_div(input)?;
    fold_many0(
        pair(ws(alt((char('+'), char('-')))), parse_mul_div),
        move || init.clone(),
        |acc, (op, rhs)| match op {
            '+' => Expr::Add(acc.boxed(), rhs.boxed()),
            _ => Expr::Sub(acc.boxed(), rhs.boxed()),
        },
    )(rest)
}

fn parse_mul_div(input: &str) -> IResult<&str, Expr, VerboseError<&str>> {
    let (rest, init) = parse_unary(input)?;
    fold_many0(
        pair(
            ws(alt((terminated(char('*'), not(char('*'))), char('/')))),
            parse_unary,
        ),
        move || init.clone(),
        |acc, (op, rhs)| match op {
            '*' => Expr::Mul(acc.boxed(), rhs.boxed()),
            _ => Expr::Div(acc.boxed(), rhs.boxed()),
        },
    )(rest)
}

// Unary minus binds looser than `**`, so `-x**2` is `-(x**2)`.
fn parse_unary(input: &str) -> IResult<&str, Expr, VerboseError<&str>> {
    alt((
        map(preceded(ws(char('-')), parse_unary), |e| Expr::Neg(e.boxed())),
        preceded(ws(char('+')), parse_unary),
        parse_pow,
    ))(input)
}

fn parse_pow(input: &str) -> IResult<&str, Expr, VerboseError<&str>> {
    let (rest, base) = parse_primary(input)?;
    if let Ok((next, exp)) = preceded(ws(alt((tag("**"), tag("^")))), parse_unary)(rest) {
        Ok((next, Expr::Pow(base.boxed(), exp.boxed())))
    } else {
        Ok((rest, base))
    }
}

fn parse_primary(input: &str) -> IResult<&str, Expr, VerboseError<&str>> {
    alt((parse_parens, parse_call, parse_number, parse_identifier))(input)
}

fn parse_parens(input: &str) -> IResult<&str, Expr, VerboseError<&str>> {
    delimited(ws(char('(')), parse_add_sub, ws(char(')')))(input)
}

fn parse_call(input: &str) -> IResult<&str, Expr, VerboseError<&str>> {
    let (rest, func) = ws(preceded(
        opt(parse_namespace),
        map_opt(identifier, Func::from_name),
    ))(input)?;
    let (rest, arg) = delimited(ws(char('(')), parse_add_sub, ws(char(')')))(rest)?;
    Ok((rest, Expr::Call(func, arg.boxed())))
}

fn parse_namespace(input: &str) -> IResult<&str, &str, VerboseError<&str>> {
    terminated(alt((tag("numpy"), tag("np"), tag("math"))), char('.'))(input)
}

fn parse_number(input: &str) -> IResult<&str, Expr, VerboseError<&str>> {
    map_opt(
        ws(recognize(pair(
            alt((
                recognize(pair(digit1, opt(pair(char('.'), digit0)))),
                recognize(pair(char('.'), digit1)),
            )),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
        |s: &str| decimal_to_rational(s).map(Expr::Constant),
    )(input)
}

fn parse_identifier(input: &str) -> IResult<&str, Expr, VerboseError<&str>> {
    map(ws(identifier), |s: &str| Expr::Variable(s.to_string()))(input)
}

fn identifier(input: &str) -> IResult<&str, &str, VerboseError<&str>> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0_count(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O, VerboseError<&'a str>>
where
    F: FnMut(&'a str) -> IResult<&'a str, O, VerboseError<&'a str>>,
{
    delimited(multispace0, inner, multispace0)
}
