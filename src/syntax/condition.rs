//! Condition evaluator for `if`/`elif`.
//!
//! ```text
//! condition = condition or condition | condition and condition
//!           | not condition | (condition)
//!           | true | false | 1 | 0
//!           | def <ident> | ndef <ident>
//!           | <str> == <str> | <str> != <str>
//!           | <str>
//! ```
//!
//! Strings are either bare text (trimmed) or `"quoted"` with escapes. A bare
//! string is true when it is not empty. Evaluation never mutates anything: the
//! only outside information is the `is_defined` callback.

use pest::{error::InputLocation, iterators::Pair, Parser};
use pest_derive::Parser;

use crate::diagnostics::ErrorContext;
use crate::syntax::args::process_string;
use crate::{err_ctx, err_msg, PreprocError};

#[derive(Parser)]
#[grammar = "syntax/condition.pest"]
struct ConditionParser;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parses and evaluates `text`. An empty (or all-whitespace) condition is
/// the empty bare string, which is false.
pub fn evaluate(text: &str, is_defined: impl Fn(&str) -> bool) -> Result<bool, PreprocError> {
    if text.trim().is_empty() {
        return Ok(false);
    }
    let mut pairs = ConditionParser::parse(Rule::condition, text)
        .map_err(|e| convert_parse_error(text, e))?;
    let disjunction = pairs
        .next()
        .and_then(|condition| condition.into_inner().next())
        .ok_or_else(|| err_msg!(Condition, "invalid condition \"{}\"", text.trim()))?;
    eval_pair(disjunction, &is_defined)
}

// ============================================================================
// EVALUATION
// ============================================================================

fn eval_pair(pair: Pair<Rule>, is_defined: &dyn Fn(&str) -> bool) -> Result<bool, PreprocError> {
    match pair.as_rule() {
        Rule::disjunction => {
            for conjunction in pair.into_inner().filter(|p| p.as_rule() == Rule::conjunction) {
                if eval_pair(conjunction, is_defined)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Rule::conjunction => {
            for negation in pair.into_inner().filter(|p| p.as_rule() == Rule::negation) {
                if !eval_pair(negation, is_defined)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Rule::negation => {
            let mut negate = false;
            let mut value = None;
            for inner in pair.into_inner() {
                if inner.as_rule() == Rule::not_op {
                    negate = !negate;
                } else {
                    value = Some(eval_pair(inner, is_defined)?);
                }
            }
            let value = value.ok_or_else(|| err_msg!(Condition, "\"not\" needs an operand"))?;
            Ok(value != negate)
        }
        Rule::group => match pair.into_inner().next() {
            Some(inner) => eval_pair(inner, is_defined),
            None => Err(err_msg!(Condition, "empty parentheses in condition")),
        },
        Rule::comparison => {
            let mut left = String::new();
            let mut right = String::new();
            let mut equal = true;
            let mut seen_op = false;
            for inner in pair.into_inner() {
                if inner.as_rule() == Rule::cmp_op {
                    equal = inner.as_str() == "==";
                    seen_op = true;
                } else if seen_op {
                    right = operand_value(inner);
                } else {
                    left = operand_value(inner);
                }
            }
            Ok((left == right) == equal)
        }
        Rule::defined | Rule::undefined => {
            let want_defined = pair.as_rule() == Rule::defined;
            let ident = pair
                .into_inner()
                .find(|p| p.as_rule() == Rule::identifier)
                .map(|p| p.as_str().to_string())
                .unwrap_or_default();
            Ok(is_defined(&ident) == want_defined)
        }
        Rule::boolean_atom => Ok(matches!(pair.as_str().trim(), "true" | "1")),
        Rule::bare => Ok(pair
            .into_inner()
            .next()
            .map(|operand| !operand_value(operand).trim().is_empty())
            .unwrap_or(false)),
        other => Err(err_msg!(
            Condition,
            "unexpected {:?} in condition \"{}\"",
            other,
            pair.as_str()
        )),
    }
}

fn operand_value(pair: Pair<Rule>) -> String {
    match pair.as_rule() {
        Rule::quoted => pair
            .into_inner()
            .next()
            .map(|inner| process_string(inner.as_str()))
            .unwrap_or_default(),
        _ => pair.as_str().trim().to_string(),
    }
}

fn convert_parse_error(text: &str, error: pest::error::Error<Rule>) -> PreprocError {
    let at = match error.location {
        InputLocation::Pos(pos) => pos,
        InputLocation::Span((start, _)) => start,
    };
    let fragment = text.get(at..).unwrap_or("").trim();
    let message = if fragment.is_empty() {
        format!("invalid condition \"{}\": unexpected end of condition", text.trim())
    } else {
        format!("invalid condition \"{}\": unexpected \"{}\"", text.trim(), fragment)
    };
    err_ctx!(
        Condition,
        message,
        ErrorContext::with_help(error.variant.message().into_owned())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(text: &str) -> bool {
        evaluate(text, |name| name == "foo" || name == "bar").unwrap()
    }

    #[test]
    fn literals_and_bare_strings() {
        assert!(eval("true"));
        assert!(eval("1"));
        assert!(!eval("false"));
        assert!(!eval("0"));
        assert!(eval("hello world"));
        assert!(!eval("   "));
        assert!(!eval("\"\""));
        assert!(!eval("\" \""));
        assert!(eval("\" x \""));
    }

    #[test]
    fn definitions() {
        assert!(eval("def foo"));
        assert!(!eval("def baz"));
        assert!(eval("ndef baz"));
        assert!(!eval("ndef bar"));
    }

    #[test]
    fn comparisons_trim_bare_text() {
        assert!(eval("abc == abc"));
        assert!(eval(" abc==abc "));
        assert!(!eval("abc == abd"));
        assert!(eval("abc != abd"));
        assert!(eval("two words == two words"));
        assert!(eval("\"a b\" == a b"));
        assert!(!eval("\" a\" == a"));
        assert!(eval("== "));
        assert!(!eval("x =="));
    }

    #[test]
    fn precedence_and_grouping() {
        assert!(eval("true or false and false"));
        assert!(!eval("(true or false) and false"));
        assert!(eval("not false and true"));
        assert!(!eval("not (false or true)"));
        assert!(eval("not not def foo"));
        assert!(eval("def baz or a == a"));
        assert!(eval("android"));
        assert!(eval("nothing and order"));
    }

    #[test]
    fn malformed_conditions_name_the_fragment() {
        let err = evaluate("(true or false", |_| false).unwrap_err();
        assert_eq!(err.error_type(), crate::diagnostics::ErrorType::Condition);
        assert!(err.to_string().contains("(true or false"));

        let err = evaluate("a == b )", |_| false).unwrap_err();
        assert!(err.to_string().contains("unexpected \")\""), "{}", err);

        assert!(evaluate("true and", |_| false).is_err());
    }
}
