use pest::Parser;
use pest_derive::Parser;

use crate::bindings::{BindingId, Bindings};
use crate::error::{ParseError, ParseErrorKind};
use crate::expression::{BinaryOperator, Expression, UnaryFunction};
use crate::real::Real;
use crate::scan;
use crate::FloatExt;

/// Matches the longest decimal literal at the start of the input, e.g. `15`
/// out of `15 23.7`.
#[derive(Parser)]
#[grammar_inline = r#"
real_literal = @{ (digits ~ ("." ~ ASCII_DIGIT*)? | "." ~ digits) ~ exponent? }
digits = _{ ASCII_DIGIT+ }
exponent = _{ ^"e" ~ ("+" | "-")? ~ digits }
"#]
struct LiteralParser;

/// How a run of same-tier operators nests.
#[derive(Clone, Copy)]
enum Grouping {
    /// `a - b - c` is `(a - b) - c`.
    Left,
    /// `a ^ b ^ c` is `a ^ (b ^ c)`.
    Right,
}

/// Operator classes from loosest to tightest binding.
const OPERATOR_TIERS: [(&[u8], Grouping); 3] = [
    (b"+-", Grouping::Left),
    (b"*/", Grouping::Left),
    (b"^", Grouping::Right),
];

impl Expression {
    /// Parse the expression from `input`.
    ///
    /// Single-character names are resolved against `bindings` and replaced by
    /// their [`BindingId`]s, so the returned tree reads whatever the table
    /// holds at evaluation time.
    ///
    /// Parsing is all-or-nothing: the first fault aborts and is reported with
    /// its character offset into `input`.
    pub fn parse(input: &str, bindings: &Bindings) -> Result<Self, ParseError> {
        DescentParser::new(input, Variables::Known(bindings)).parse()
    }

    /// Names of the variables `input` uses, uppercased, in order of first
    /// appearance.
    ///
    /// Any single ASCII letter that is not part of a function name counts as
    /// a variable, which lets a caller build its [`Bindings`] before calling
    /// [`Expression::parse`].
    pub fn parse_variable_names(input: &str) -> Result<Vec<char>, ParseError> {
        let mut parser = DescentParser::new(input, Variables::Collect(Bindings::new()));
        parser.parse()?;
        Ok(match parser.variables {
            Variables::Collect(found) => found.iter().map(|(name, _)| name).collect(),
            Variables::Known(_) => Vec::new(),
        })
    }
}

enum Variables<'a> {
    Known(&'a Bindings),
    Collect(Bindings),
}

impl Variables<'_> {
    fn resolve(&mut self, name: char) -> Option<BindingId> {
        match self {
            Self::Known(bindings) => bindings.find(name),
            Self::Collect(found) => name
                .is_ascii_alphabetic()
                .then(|| found.declare(name.to_ascii_uppercase(), 0.0)),
        }
    }
}

/// Recursive descent over substrings of `input`.
///
/// Every recursive call carries `origin`, the byte position of its substring
/// within `input`, so errors can be reported against the whole input.
struct DescentParser<'a> {
    input: &'a str,
    variables: Variables<'a>,
}

impl<'a> DescentParser<'a> {
    fn new(input: &'a str, variables: Variables<'a>) -> Self {
        Self { input, variables }
    }

    fn parse(&mut self) -> Result<Expression, ParseError> {
        // Substrings handed down by the recursion are always balanced, so
        // this only needs checking once.
        if let Some(pos) = scan::unmatched_bracket(self.input) {
            return Err(self.error(ParseErrorKind::UnmatchedBracket, pos));
        }
        self.parse_span(self.input, 0)
    }

    fn parse_span(&mut self, text: &'a str, origin: usize) -> Result<Expression, ParseError> {
        let Some((text, leading)) = scan::strip_spaces(text) else {
            return Err(self.error(ParseErrorKind::MissingParameter, origin));
        };
        let origin = origin + leading;

        if scan::is_fully_bracketed(text) {
            return self.parse_span(&text[1..text.len() - 1], origin + 1);
        }

        for (operators, grouping) in OPERATOR_TIERS {
            let points = scan::split_points(text, operators);
            if !points.is_empty() {
                return self.parse_chain(text, origin, &points, grouping);
            }
        }

        if let Some((function, len)) = UnaryFunction::match_prefix(text) {
            let only = self.parse_span(&text[len..], origin + len)?;
            return Ok(Expression::unary(function, only));
        }

        let mut chars = text.chars();
        if let (Some(name), None) = (chars.next(), chars.next()) {
            if let Some(id) = self.variables.resolve(name) {
                return Ok(Expression::Binding(id));
            }
        }

        // Numbers may carry leading tabs or newlines, which the space
        // stripping above leaves in place.
        let number = text.trim_start_matches(|c: char| c.is_ascii_whitespace());
        parse_literal::<Real>(number)
            .map(Expression::Literal)
            .map_err(|kind| self.error(kind, origin))
    }

    /// Parses `text` as a run of operands separated at `points`, which all
    /// hold operators of one tier.
    ///
    /// The run is handled in a loop rather than by splitting one operator at
    /// a time, so a long `1+1+...+1` costs one level of recursion. Operands
    /// are parsed left to right and the first fault wins.
    fn parse_chain(
        &mut self,
        text: &'a str,
        origin: usize,
        points: &[usize],
        grouping: Grouping,
    ) -> Result<Expression, ParseError> {
        let bytes = text.as_bytes();
        let first = self.parse_span(&text[..points[0]], origin)?;

        let mut links = Vec::with_capacity(points.len());
        for (i, &pos) in points.iter().enumerate() {
            let end = points.get(i + 1).copied().unwrap_or(text.len());
            let operand = self.parse_span(&text[pos + 1..end], origin + pos + 1)?;
            if let Some(op) = BinaryOperator::from_symbol(bytes[pos]) {
                links.push((op, operand));
            }
        }

        Ok(match grouping {
            Grouping::Left => links
                .into_iter()
                .fold(first, |lhs, (op, rhs)| Expression::binary(op, lhs, rhs)),
            Grouping::Right => {
                let Some((mut op, mut rhs)) = links.pop() else {
                    return Ok(first);
                };
                while let Some((prev, lhs)) = links.pop() {
                    rhs = Expression::binary(op, lhs, rhs);
                    op = prev;
                }
                Expression::binary(op, first, rhs)
            }
        })
    }

    /// Converts a byte position in the input to the character offset
    /// reported to callers.
    fn error(&self, kind: ParseErrorKind, byte_pos: usize) -> ParseError {
        let offset = self
            .input
            .get(..byte_pos)
            .map_or(byte_pos, |head| head.chars().count());
        ParseError::new(kind, offset)
    }
}

/// The whole of `text` must be one number.
///
/// The grammar accepts a signed exponent such as `1e-5`, but
/// [`Expression::parse`] never hands one over: the `-` is split off as
/// subtraction first, leaving `1e`, which is rejected.
fn parse_literal<T: FloatExt>(text: &str) -> Result<T, ParseErrorKind> {
    let matched = LiteralParser::parse(Rule::real_literal, text)
        .map_err(|_| ParseErrorKind::InvalidParameter)?
        .as_str();
    let value: T = matched
        .parse()
        .map_err(|_| ParseErrorKind::InvalidParameter)?;
    if value.is_infinite() {
        return Err(ParseErrorKind::ValueTooLarge);
    }
    // A valid number followed by anything else, e.g. `15 23.7`.
    if matched.len() < text.len() {
        return Err(ParseErrorKind::InvalidParameter);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(input: &str, bindings: &Bindings) -> String {
        Expression::parse(input, bindings)
            .unwrap()
            .display(bindings)
            .to_string()
    }

    fn fault(input: &str, bindings: &Bindings) -> (ParseErrorKind, usize) {
        let err = Expression::parse(input, bindings).unwrap_err();
        (err.kind, err.offset)
    }

    #[test]
    fn literal_prefixes() {
        assert_eq!(parse_literal::<f64>("15"), Ok(15.0));
        assert_eq!(parse_literal::<f64>("2.5e3"), Ok(2500.0));
        assert_eq!(parse_literal::<f64>(".5"), Ok(0.5));
        assert_eq!(parse_literal::<f64>("3."), Ok(3.0));
        assert_eq!(parse_literal::<f64>("1E-2"), Ok(0.01));
        assert_eq!(
            parse_literal::<f64>("15 23.7"),
            Err(ParseErrorKind::InvalidParameter)
        );
        assert_eq!(
            parse_literal::<f64>("2e"),
            Err(ParseErrorKind::InvalidParameter)
        );
        assert_eq!(
            parse_literal::<f64>("inf"),
            Err(ParseErrorKind::InvalidParameter)
        );
        assert_eq!(
            parse_literal::<f64>("1e400"),
            Err(ParseErrorKind::ValueTooLarge)
        );
        assert_eq!(
            parse_literal::<f32>("1e39"),
            Err(ParseErrorKind::ValueTooLarge)
        );
    }

    #[test]
    fn additive_and_multiplicative_group_left_to_right() {
        let none = Bindings::new();
        assert_eq!(shape("2-3-1", &none), "((2 - 3) - 1)");
        assert_eq!(shape("1+2-3+4", &none), "(((1 + 2) - 3) + 4)");
        assert_eq!(shape("8/4*3", &none), "((8 / 4) * 3)");
        assert_eq!(shape("2*3+4", &none), "((2 * 3) + 4)");
        assert_eq!(shape("2+3*4", &none), "(2 + (3 * 4))");
    }

    #[test]
    fn power_splits_on_first_caret() {
        let none = Bindings::new();
        assert_eq!(shape("2^3^2", &none), "(2 ^ (3 ^ 2))");
        assert_eq!(shape("(2^3)^2", &none), "((2 ^ 3) ^ 2)");
        assert_eq!(shape("2*3^2", &none), "(2 * (3 ^ 2))");
    }

    #[test]
    fn brackets_override_precedence() {
        let none = Bindings::new();
        assert_eq!(shape("(2+3)*4", &none), "((2 + 3) * 4)");
        assert_eq!(shape(" ( ( 7 ) ) ", &none), "7");
        assert_eq!(shape("(1)+(2)", &none), "(1 + 2)");
    }

    #[test]
    fn functions_and_variables() {
        let bindings = Bindings::xz();
        assert_eq!(shape("cos(x)", &bindings), "cos(x)");
        // Leaves print the name they were declared with.
        assert_eq!(shape("SIN X * cosine(Z)", &bindings), "(sin(x) * cos(z))");
        assert_eq!(shape("cos x^2", &bindings), "(cos(x) ^ 2)");
        assert_eq!(shape("arcTan(x / z)", &bindings), "atan((x / z))");
        assert_eq!(shape("log(log(x))", &bindings), "log(log(x))");
        assert_eq!(shape("asin(1) - acos 0", &bindings), "(asin(1) - acos(0))");
    }

    #[test]
    fn variable_leaves_share_a_binding() {
        let bindings = Bindings::xz();
        let expr = Expression::parse("x*X", &bindings).unwrap();
        assert_eq!(
            expr,
            Expression::binary(
                BinaryOperator::Mul,
                Expression::Binding(0),
                Expression::Binding(0)
            )
        );
    }

    #[test]
    fn unmatched_brackets() {
        let none = Bindings::new();
        assert_eq!(fault("(2+3", &none), (ParseErrorKind::UnmatchedBracket, 0));
        assert_eq!(fault("1+2)", &none), (ParseErrorKind::UnmatchedBracket, 3));
        assert_eq!(
            fault("1 * ((2 + 3)", &none),
            (ParseErrorKind::UnmatchedBracket, 4)
        );
    }

    #[test]
    fn missing_parameters() {
        let none = Bindings::new();
        assert_eq!(fault("", &none), (ParseErrorKind::MissingParameter, 0));
        assert_eq!(fault("   ", &none), (ParseErrorKind::MissingParameter, 0));
        assert_eq!(fault("2+", &none), (ParseErrorKind::MissingParameter, 2));
        assert_eq!(fault("2 *   ", &none), (ParseErrorKind::MissingParameter, 3));
        assert_eq!(fault("  -3", &none), (ParseErrorKind::MissingParameter, 2));
        assert_eq!(fault("cos", &none), (ParseErrorKind::MissingParameter, 3));
        assert_eq!(fault("cos()", &none), (ParseErrorKind::MissingParameter, 4));
        assert_eq!(fault("(1 + ())", &none), (ParseErrorKind::MissingParameter, 6));
    }

    #[test]
    fn invalid_parameters() {
        let bindings = Bindings::xz();
        assert_eq!(fault("15 23.7", &bindings), (ParseErrorKind::InvalidParameter, 0));
        assert_eq!(
            fault("1 + 15 23.7", &bindings),
            (ParseErrorKind::InvalidParameter, 4)
        );
        assert_eq!(fault("2 * y", &bindings), (ParseErrorKind::InvalidParameter, 4));
        assert_eq!(fault("(1)(2)", &bindings), (ParseErrorKind::InvalidParameter, 0));
        assert_eq!(fault("xz", &bindings), (ParseErrorKind::InvalidParameter, 0));
        assert_eq!(fault("2 + 1e400", &bindings), (ParseErrorKind::ValueTooLarge, 4));
    }

    #[test]
    fn offsets_count_characters() {
        let bindings: Bindings = [('é', 1.0)].into_iter().collect();
        assert_eq!(fault("é + q", &bindings), (ParseErrorKind::InvalidParameter, 4));
        assert_eq!(fault("é + ", &bindings), (ParseErrorKind::MissingParameter, 3));
    }

    #[test]
    fn left_operand_fails_first() {
        let none = Bindings::new();
        assert_eq!(fault("a + b", &none), (ParseErrorKind::InvalidParameter, 0));
        assert_eq!(fault("1 + a * b + c", &none), (ParseErrorKind::InvalidParameter, 4));
        assert_eq!(fault("2 ^ 3 ^ ", &none), (ParseErrorKind::MissingParameter, 7));
        assert_eq!(fault("1+-2", &none), (ParseErrorKind::MissingParameter, 2));
    }

    #[test]
    fn signed_exponent_is_split_as_subtraction() {
        let none = Bindings::new();
        assert_eq!(fault("1e-5", &none), (ParseErrorKind::InvalidParameter, 0));
        assert_eq!(fault("2 * 1e+5", &none), (ParseErrorKind::InvalidParameter, 4));
        assert_eq!(shape("1e5 - 1", &none), "(100000 - 1)");
    }

    #[test]
    fn numbers_accept_leading_tabs() {
        let none = Bindings::new();
        let sum = Expression::parse("2+\t5", &none).unwrap();
        assert_eq!(sum.evaluate(&none), 7.0);
        assert_eq!(shape("\n3 *\t4", &none), "(3 * 4)");
        assert_eq!(fault("2+5\t", &none), (ParseErrorKind::InvalidParameter, 2));
        assert_eq!(fault("\tx", &Bindings::xz()), (ParseErrorKind::InvalidParameter, 0));
    }

    #[test]
    fn long_chains_fit_a_small_stack() {
        let worker = std::thread::Builder::new()
            .stack_size(2 << 20)
            .spawn(|| {
                let none = Bindings::new();
                let sum = Expression::parse(&vec!["1"; 20_000].join("+"), &none).unwrap();
                assert!(sum.is_constant());
                let total = sum.evaluate(&none);

                let tower = Expression::parse(&vec!["1"; 20_000].join("^"), &none).unwrap();
                let power = tower.evaluate(&none);
                (total, power)
            })
            .unwrap();
        assert_eq!(worker.join().unwrap(), (20_000.0, 1.0));
    }

    #[test]
    fn parse_variable_names() {
        let err = Expression::parse_variable_names("x + cos(y) * X - z99").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidParameter);
        assert_eq!(err.offset, 17);

        let names = Expression::parse_variable_names("x + cos(y) * X - log(t^2)").unwrap();
        assert_eq!(names, vec!['X', 'Y', 'T']);

        let names = Expression::parse_variable_names("1 + 2").unwrap();
        assert!(names.is_empty());
    }
}
