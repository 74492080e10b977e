use mathviz::expr::{rational, Expr, Func};
use mathviz::format::show_rational;
use mathviz::parser::decimal_to_rational;
use mathviz::{parse_expr, pretty, VizError};

fn round_trip(input: &str) -> String {
    pretty(&parse_expr(input).expect("parse input"))
}

#[test]
fn precedence_follows_python() {
    let expr = parse_expr("-x**2").expect("parse");
    assert_eq!(
        expr,
        Expr::Neg(Expr::Pow(Expr::var("x").boxed(), Expr::integer(2).boxed()).boxed())
    );
    let expr = parse_expr("2**3**2").expect("parse");
    assert_eq!(
        expr,
        Expr::Pow(
            Expr::integer(2).boxed(),
            Expr::Pow(Expr::integer(3).boxed(), Expr::integer(2).boxed()).boxed()
        )
    );
}

#[test]
fn namespaced_and_aliased_calls_parse() {
    for input in ["np.sin(x)", "numpy.sin(x)", "math.sin(x)", "sin(x)"] {
        assert_eq!(
            parse_expr(input).expect("parse"),
            Expr::call(Func::Sin, Expr::var("x")),
            "{input}"
        );
    }
    assert_eq!(
        parse_expr("ln(x)").expect("parse"),
        Expr::call(Func::Log, Expr::var("x"))
    );
}

#[test]
fn decimals_are_exact() {
    assert_eq!(decimal_to_rational("0.25"), Some(rational(1, 4)));
    assert_eq!(decimal_to_rational("2.5e-3"), Some(rational(1, 400)));
    assert_eq!(decimal_to_rational("1E2"), Some(rational(100, 1)));
    assert_eq!(decimal_to_rational("3.14159"), Some(rational(314159, 100000)));
}

#[test]
fn printer_emits_normalized_text() {
    let cases = vec![
        ("x^2 + y^2", "x**2+y**2"),
        ("x - (y - z)", "x-(y-z)"),
        ("x + -y", "x-y"),
        ("x**-2", "x**(-2)"),
        ("(-2)**x", "(-2)**x"),
        ("sin(x)^2", "np.sin(x)**2"),
        ("a/(b*c)", "a/(b*c)"),
        ("(a+b)*c", "(a+b)*c"),
        ("0.5*x", "0.5*x"),
        ("abs(x - 1)", "np.abs(x-1)"),
    ];
    for (input, expected) in cases {
        assert_eq!(round_trip(input), expected, "print mismatch for {input}");
    }
}

#[test]
fn printed_text_parses_back_to_the_same_tree() {
    for input in ["x**2+y**2-4", "np.sqrt(np.abs(x**2+y**2-4))", "-(x+1)*y", "1/3*x"] {
        let first = parse_expr(input).expect("parse");
        let again = parse_expr(&pretty(&first)).expect("reparse");
        assert_eq!(first, again, "{input}");
    }
}

#[test]
fn rationals_print_as_decimals_when_they_terminate() {
    assert_eq!(show_rational(&rational(1, 4)), "0.25");
    assert_eq!(show_rational(&rational(-5, 2)), "-2.5");
    assert_eq!(show_rational(&rational(1, 3)), "1/3");
    assert_eq!(show_rational(&rational(7, 1)), "7");
    assert_eq!(show_rational(&rational(3, 40)), "0.075");
}

#[test]
fn deep_nesting_is_rejected() {
    let deep = format!("{}x{}", "(".repeat(300), ")".repeat(300));
    assert!(parse_expr(&deep).is_err());
}

#[test]
fn operator_chains_are_bounded() {
    let tower = format!("{}2", "2**".repeat(40_000));
    assert!(matches!(parse_expr(&tower), Err(VizError::Parse { .. })));
    let signs = format!("{}x", "+-".repeat(50_000));
    assert!(matches!(parse_expr(&signs), Err(VizError::Parse { .. })));
    assert!(parse_expr(&format!("{}x", "-".repeat(100))).is_ok());
}

#[test]
fn variables_are_listed_in_order() {
    let expr = parse_expr("y*x + sin(y) + t").expect("parse");
    assert_eq!(expr.variables(), vec!["y", "x", "t"]);
    assert!(expr.contains_var("t"));
    assert!(!expr.contains_var("z"));
}
