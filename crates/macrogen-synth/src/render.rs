//! Literal rendering
//!
//! Renders a value in the literal form of the descriptor it replaces. A
//! value equal to the default reuses the original literal text, so
//! all-default synthesis reproduces the template byte for byte.

use macrogen_schema::{format_decimal, LiteralStyle, ParamValue, ParameterDescriptor};

/// Literal text for `value` at the site of `descriptor`'s default
#[must_use]
pub fn render(descriptor: &ParameterDescriptor, value: &ParamValue) -> String {
    if same_value(descriptor.default_value(), value) {
        return descriptor.default.text.clone();
    }

    match value {
        ParamValue::Float(v) => format_decimal(*v),
        ParamValue::Integer(i) => i.to_string(),
        ParamValue::Boolean(b) => b.to_string(),
        ParamValue::Choice(choice) => match descriptor.default.style {
            LiteralStyle::Bare => choice.clone(),
            LiteralStyle::Quoted(quote) => quote_string(choice, quote),
            LiteralStyle::Number | LiteralStyle::Bool => quote_string(choice, '"'),
        },
    }
}

/// String literal text, reusing the quote character of `original`
#[must_use]
pub fn requote(original: &str, value: &str) -> String {
    let quote = original
        .chars()
        .next()
        .filter(|c| matches!(c, '"' | '\'' | '`'))
        .unwrap_or('"');
    quote_string(value, quote)
}

/// Quote and escape `value`
#[must_use]
pub fn quote_string(value: &str, quote: char) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

fn same_value(default: &ParamValue, value: &ParamValue) -> bool {
    match (default, value) {
        (ParamValue::Choice(a), ParamValue::Choice(b)) => a == b,
        (ParamValue::Boolean(a), ParamValue::Boolean(b)) => a == b,
        #[allow(clippy::float_cmp)]
        _ => match (default.as_f64(), value.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}
