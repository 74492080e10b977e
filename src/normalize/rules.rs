//! Individual rewrite steps. Each one is a pure `&str -> String` function and
//! is safe to run on its own output.

use nom::branch::alt;
use nom::bytes::complete::tag_no_case;
use nom::character::complete::{char, multispace0, one_of};
use nom::combinator::{not, recognize};
use nom::error::VerboseError;
use nom::multi::separated_list1;
use nom::sequence::{delimited, tuple};
use nom::IResult;

use crate::expr::Func;
use crate::format::BACKEND_NAMESPACE;
use crate::parser::NAMESPACES;

/// Decimal literal substituted for the constant pi.
pub const PI_LITERAL: &str = "3.14159";

/// Drop a leading `z =`, `y =`, `w =`, `f(x) =`, `f(x, y) =` or `f(z) =`.
pub fn strip_assignment_prefix(input: &str) -> String {
    match assignment_prefix(input) {
        Ok((rest, _)) => rest.trim().to_string(),
        Err(_) => input.trim().to_string(),
    }
}

fn assignment_prefix(input: &str) -> IResult<&str, &str, VerboseError<&str>> {
    recognize(tuple((
        multispace0,
        alt((function_head, recognize(one_of("zZyYwW")))),
        multispace0,
        char('='),
        not(char('=')),
    )))(input)
}

fn function_head(input: &str) -> IResult<&str, &str, VerboseError<&str>> {
    recognize(tuple((
        tag_no_case("f"),
        multispace0,
        char('('),
        separated_list1(
            char(','),
            delimited(multispace0, one_of("xyzXYZ"), multispace0),
        ),
        char(')'),
    )))(input)
}

/// Map stray Unicode glyphs onto their ASCII spelling.
pub fn replace_unicode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '\u{2212}' | '\u{2013}' | '\u{2014}' => out.push('-'),
            '\u{1D465}' => out.push('x'),
            '\u{1D466}' => out.push('y'),
            '\u{1D467}' => out.push('z'),
            '\u{1D461}' => out.push('t'),
            '\u{00D7}' | '\u{00B7}' | '\u{22C5}' => out.push('*'),
            '\u{00F7}' => out.push('/'),
            '\u{00B2}' => out.push_str("^2"),
            '\u{00B3}' => out.push_str("^3"),
            '\u{00A0}' => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}

/// Rewrite `^` to `**` and bracket bare negative exponents: `(a)^-2` becomes `(a)**(-2)`.
///
/// A negative exponent that is itself raised to a power (`2^-x^2`) keeps its
/// sign unbracketed, so the whole tower stays in the exponent: `2**-x**2`.
/// Runs as one left-to-right scan, so the work is linear in the input length.
pub fn rewrite_carets(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 8);
    let mut i = 0;
    while i < chars.len() {
        let op_len = match chars[i] {
            '^' => 1,
            '*' if chars.get(i + 1) == Some(&'*') => 2,
            _ => {
                out.push(chars[i]);
                i += 1;
                continue;
            }
        };
        out.push_str("**");
        i += op_len;

        let mut j = skip_spaces(&chars, i);
        if chars.get(j) != Some(&'-') {
            continue;
        }
        j = skip_spaces(&chars, j + 1);
        let end = operand_end(&chars, j);
        if end == j || power_follows(&chars, end) {
            continue;
        }
        out.push_str("(-");
        out.extend(&chars[j..end]);
        out.push(')');
        i = end;
    }
    out
}

fn skip_spaces(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    i
}

fn power_follows(chars: &[char], at: usize) -> bool {
    let k = skip_spaces(chars, at);
    match chars.get(k) {
        Some('^') => true,
        Some('*') => chars.get(k + 1) == Some(&'*'),
        _ => false,
    }
}

// End of a simple exponent operand: a number, a dotted name, or a call.
fn operand_end(chars: &[char], start: usize) -> usize {
    let Some(&first) = chars.get(start) else {
        return start;
    };
    if first.is_ascii_digit() || first == '.' {
        return number_end(chars, start);
    }
    if !is_ident_start(first) {
        return start;
    }
    let mut i = start;
    while i < chars.len() && (is_ident_char(chars[i]) || chars[i] == '.') {
        i += 1;
    }
    if chars.get(i) == Some(&'(') {
        let mut depth = 0usize;
        while i < chars.len() {
            match chars[i] {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return i + 1;
                    }
                }
                _ => {}
            }
            i += 1;
        }
    }
    i
}

/// Put the backend namespace in front of known function calls and canonicalize aliases.
pub fn prefix_functions(input: &str) -> String {
    let tokens = tokenize(input);
    let mut out = String::with_capacity(input.len() + 16);
    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i] {
            Token::Ident(name) => {
                let qualified = NAMESPACES.contains(&name.as_str())
                    && matches!(tokens.get(i + 1), Some(Token::Other('.')))
                    && matches!(tokens.get(i + 2), Some(Token::Ident(_)));
                let (func_at, after_dot) = if qualified { (i + 2, true) } else { (i, false) };
                let preceded_by_dot = !after_dot && i > 0 && matches!(tokens[i - 1], Token::Other('.'));

                let call = match &tokens[func_at] {
                    Token::Ident(f) if !preceded_by_dot && opens_call(&tokens, func_at + 1) => {
                        Func::from_name(f)
                    }
                    _ => None,
                };
                match call {
                    Some(func) => {
                        out.push_str(BACKEND_NAMESPACE);
                        out.push('.');
                        out.push_str(func.name());
                        i = func_at + 1;
                    }
                    None => {
                        out.push_str(name);
                        i += 1;
                    }
                }
            }
            token => {
                token.write_to(&mut out);
                i += 1;
            }
        }
    }
    out
}

fn opens_call(tokens: &[Token], mut i: usize) -> bool {
    while let Some(Token::Other(c)) = tokens.get(i) {
        if *c == '(' {
            return true;
        }
        if !c.is_whitespace() {
            return false;
        }
        i += 1;
    }
    false
}

/// Replace `pi`, `Pi`, `PI`, `π` and `np.pi` by a decimal literal, adding `*`
/// where the constant is glued to a number, name or bracket.
pub fn replace_pi(input: &str) -> String {
    let tokens = tokenize(input);
    let mut out = String::with_capacity(input.len() + 8);
    let mut i = 0;
    while i < tokens.len() {
        let span = pi_span(&tokens, i);
        if span == 0 {
            tokens[i].write_to(&mut out);
            i += 1;
            continue;
        }
        if out
            .chars()
            .last()
            .is_some_and(|c| is_ident_char(c) || c == ')' || c == '.')
        {
            out.push('*');
        }
        out.push_str(PI_LITERAL);
        i += span;
        let glued = match tokens.get(i) {
            Some(Token::Number(_)) | Some(Token::Ident(_)) => true,
            Some(Token::Other(c)) => *c == '(' || *c == '\u{03C0}',
            None => false,
        };
        if glued {
            out.push('*');
        }
    }
    out
}

// Number of tokens making up a pi constant starting at `i`, or 0.
fn pi_span(tokens: &[Token], i: usize) -> usize {
    match &tokens[i] {
        Token::Other('\u{03C0}') => 1,
        Token::Ident(name) if matches!(name.as_str(), "pi" | "Pi" | "PI") => {
            if i > 0 && matches!(tokens[i - 1], Token::Other('.')) {
                0
            } else {
                1
            }
        }
        Token::Ident(ns) if NAMESPACES.contains(&ns.as_str()) => match (tokens.get(i + 1), tokens.get(i + 2)) {
            (Some(Token::Other('.')), Some(Token::Ident(name))) if name == "pi" => 3,
            _ => 0,
        },
        _ => 0,
    }
}

/// Append the missing `)` when opening brackets outnumber closing ones.
/// Surplus closers are left alone.
pub fn balance_parentheses(input: &str) -> String {
    let opened = input.matches('(').count();
    let closed = input.matches(')').count();
    if opened <= closed {
        return input.to_string();
    }
    let mut out = input.trim_end().to_string();
    out.push_str(&")".repeat(opened - closed));
    out
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(String),
    Ident(String),
    Other(char),
}

impl Token {
    fn write_to(&self, out: &mut String) {
        match self {
            Token::Number(s) | Token::Ident(s) => out.push_str(s),
            Token::Other(c) => out.push(*c),
        }
    }
}

// Numbers are scanned whole so the `e` of `1e5` never reads as a name.
fn tokenize(input: &str) -> Vec<Token> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(char::is_ascii_digit)) {
            let end = number_end(&chars, i);
            tokens.push(Token::Number(chars[i..end].iter().collect()));
            i = end;
        } else if is_ident_start(c) {
            let start = i;
            while i < chars.len() && is_ident_char(chars[i]) {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
        } else {
            tokens.push(Token::Other(c));
            i += 1;
        }
    }
    tokens
}

fn number_end(chars: &[char], start: usize) -> usize {
    let digits = |mut i: usize| {
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        i
    };
    let mut i = digits(start);
    if chars.get(i) == Some(&'.') {
        i = digits(i + 1);
    }
    if matches!(chars.get(i), Some('e' | 'E')) {
        let mut j = i + 1;
        if matches!(chars.get(j), Some('+' | '-')) {
            j += 1;
        }
        if chars.get(j).is_some_and(char::is_ascii_digit) {
            i = digits(j);
        }
    }
    i
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
