use mathviz::normalize::{
    balance_parentheses, normalize_expression, prefix_functions, replace_pi, replace_unicode,
    rewrite, rewrite_carets, strip_assignment_prefix, PIPELINE,
};
use mathviz::{parse_expr, CompiledExpr, VizError};
use approx::assert_relative_eq;

fn normalized(input: &str) -> String {
    normalize_expression(input).expect("normalize input")
}

#[test]
fn carets_become_double_stars() {
    let cases = vec![
        ("x^2 + y^2", "x**2 + y**2"),
        ("(x+1)^3", "(x+1)**3"),
        ("x**2", "x**2"),
        ("2^x^2", "2**x**2"),
    ];
    for (input, expected) in cases {
        let actual = normalized(input);
        assert_eq!(actual, expected, "caret rewrite mismatch for {input}");
        assert!(!actual.contains('^'));
    }
}

#[test]
fn bare_negative_exponents_are_bracketed() {
    assert_eq!(rewrite_carets("x^-2"), "x**(-2)");
    assert_eq!(rewrite_carets("x ** - y"), "x**(-y)");
    assert_eq!(rewrite_carets("2^-sin(x+1)"), "2**(-sin(x+1))");
    assert_eq!(rewrite_carets("x**(-2)"), "x**(-2)");
}

#[test]
fn normalization_is_idempotent() {
    let inputs = vec![
        "z = x^2 + y^2",
        "sin(x)^2 + cos(y)",
        "2pi*x",
        "1/((x^2+y^2)",
        "ln(x) + asin(x/2)",
        "f(x, y) = x² − y²",
        "np.exp(-x^2/2)",
        "x^-1 + math.sqrt(abs(x))",
        "1e5*exp(-x)",
    ];
    for input in inputs {
        let once = normalized(input);
        let twice = normalized(&once);
        assert_eq!(once, twice, "normalizing {input} twice changed the result");
    }
}

#[test]
fn assignment_prefixes_are_stripped() {
    let cases = vec![
        ("z = x*y", "x*y"),
        ("Z= x*y", "x*y"),
        ("y = sin(x)", "sin(x)"),
        ("w = z**2", "z**2"),
        ("f(x) = x + 1", "x + 1"),
        ("f(x, y) = x + y", "x + y"),
        ("f(z) = 1/z", "1/z"),
        ("y == x", "y == x"),
        ("x + y", "x + y"),
    ];
    for (input, expected) in cases {
        assert_eq!(strip_assignment_prefix(input), expected, "prefix mismatch for {input}");
    }
}

#[test]
fn unicode_glyphs_map_to_ascii() {
    assert_eq!(replace_unicode("x² − 1"), "x^2 - 1");
    assert_eq!(replace_unicode("2×x ÷ 3"), "2*x / 3");
    assert_eq!(replace_unicode("a·b⋅c"), "a*b*c");
    assert_eq!(replace_unicode("𝑥³ – 𝑦"), "x^3 - y");
    assert_eq!(normalized("x² − 1"), "x**2 - 1");
}

#[test]
fn known_functions_get_backend_prefix() {
    let cases = vec![
        ("sin(x) + np.cos(x)", "np.sin(x) + np.cos(x)"),
        ("ln(x)", "np.log(x)"),
        ("math.sqrt(x)", "np.sqrt(x)"),
        ("numpy.exp(x)", "np.exp(x)"),
        ("asin(x) + arccos(x)", "np.arcsin(x) + np.arccos(x)"),
        ("Abs(x)", "np.abs(x)"),
        ("sinh(x)", "np.sinh(x)"),
        ("sin (x)", "np.sin (x)"),
    ];
    for (input, expected) in cases {
        assert_eq!(prefix_functions(input), expected, "prefix mismatch for {input}");
    }
}

#[test]
fn prefixing_never_doubles_or_touches_plain_names() {
    assert_eq!(prefix_functions("np.sin(x)"), "np.sin(x)");
    assert_eq!(prefix_functions(&prefix_functions("cos(x)")), "np.cos(x)");
    assert_eq!(prefix_functions("sinx + cosine(x)"), "sinx + cosine(x)");
    assert_eq!(prefix_functions("obj.sin(x)"), "obj.sin(x)");
    assert_eq!(prefix_functions("1e5*exp(x)"), "1e5*np.exp(x)");
}

#[test]
fn pi_becomes_a_literal() {
    let cases = vec![
        ("pi*x", "3.14159*x"),
        ("2pi", "2*3.14159"),
        ("np.pi/2", "3.14159/2"),
        ("Pi + PI", "3.14159 + 3.14159"),
        ("π(x+1)", "3.14159*(x+1)"),
        ("x*π", "x*3.14159"),
        ("spin + pie", "spin + pie"),
    ];
    for (input, expected) in cases {
        assert_eq!(replace_pi(input), expected, "pi mismatch for {input}");
    }
}

#[test]
fn missing_closers_are_appended() {
    let fixed = normalized("1/((x^2+y^2)");
    assert_eq!(fixed, "1/((x**2+y**2))");
    assert_eq!(fixed.matches('(').count(), fixed.matches(')').count());
    assert!(parse_expr(&fixed).is_ok());
    assert_eq!(balance_parentheses("sin(x"), "sin(x)");
}

#[test]
fn surplus_closers_are_left_alone() {
    assert_eq!(balance_parentheses("(x))"), "(x))");
    assert!(matches!(normalize_expression("(x))"), Err(VizError::Parse { .. })));
}

#[test]
fn malformed_text_is_a_parse_error() {
    for input in ["x +* y", "", "sin()", "3 +"] {
        match normalize_expression(input) {
            Err(VizError::Parse { .. }) => {}
            other => panic!("expected parse error for {input:?}, got {other:?}"),
        }
    }
}

#[test]
fn pipeline_runs_steps_in_documented_order() {
    let names: Vec<&str> = PIPELINE.iter().map(|(name, _)| *name).collect();
    assert_eq!(
        names,
        [
            "strip_assignment_prefix",
            "replace_unicode",
            "rewrite_carets",
            "prefix_functions",
            "replace_pi",
            "balance_parentheses",
        ]
    );
    let text = rewrite("  y = sin(2pi*x)^2 ");
    assert_eq!(text, "np.sin(2*3.14159*x)**2");
    assert!(parse_expr(&text).is_ok());
    assert!(matches!(normalize_expression("sin(2pi x)"), Err(VizError::Parse { .. })));
}

#[test]
fn negative_exponent_towers_keep_their_meaning() {
    assert_eq!(normalized("2^-x^2"), "2**-x**2");
    assert_eq!(normalized("x^-2^2"), "x**-2**2");
    assert_eq!(normalized("2^-sin(x)^2"), "2**-np.sin(x)**2");
    assert_eq!(normalized(&normalized("2^-x^2")), "2**-x**2");
}

#[test]
fn caret_rewrite_preserves_values() {
    let half_pi = std::f64::consts::FRAC_PI_2;
    let cases: Vec<(&str, f64, f64)> = vec![
        ("2^-x^2", 1.0, 0.5),
        ("2^-x^2", 2.0, 0.0625),
        ("2^-x^2", 0.0, 1.0),
        ("x^-2^2", 2.0, 0.0625),
        ("x^-2^2", 1.0, 1.0),
        ("2^x^2", 2.0, 16.0),
        ("x^0.5^2", 16.0, 2.0),
        ("x^-2", 2.0, 0.25),
        ("x ^ - 3", 2.0, 0.125),
        ("(x+1)^3", 1.0, 8.0),
        ("(x+1)^-1", 3.0, 0.25),
        ("sin(x)^2 + cos(x)^2", 0.7, 1.0),
        ("2^-sin(x)", half_pi, 0.5),
        ("2^-sin(x)^2", half_pi, 0.5),
        ("exp(x)^-1", 1.0, (-1.0f64).exp()),
        ("x² + x³", 2.0, 12.0),
    ];
    for (input, x, expected) in cases {
        let text = normalized(input);
        let expr = CompiledExpr::from_text(&text, &["x"]).expect("compile");
        let actual = expr.eval(&[x]);
        assert!(
            (actual - expected).abs() < 1e-9,
            "{input} -> {text} at x={x}: got {actual}, expected {expected}"
        );
    }
    assert_relative_eq!(
        CompiledExpr::from_text(&normalized("2^-x^2"), &["x"]).expect("compile").eval(&[3.0]),
        2f64.powi(-9)
    );
}

#[test]
fn long_operator_chains_are_parse_errors() {
    let chains = [
        format!("{}x", "-".repeat(100_000)),
        format!("{}x", "x^".repeat(50_000)),
        format!("{}x", "x+".repeat(50_000)),
    ];
    for chain in &chains {
        assert!(matches!(normalize_expression(chain), Err(VizError::Parse { .. })));
    }
    let polynomial: Vec<String> = (0..40).map(|k| format!("{k}*x^{k}")).collect();
    assert!(normalize_expression(&polynomial.join(" + ")).is_ok());
}
