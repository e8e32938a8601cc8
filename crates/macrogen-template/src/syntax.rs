//! Lexical/syntax scanner for macro-script templates
//!
//! Templates are JavaScript. The scanner parses them with tree-sitter and
//! exposes the pieces the schema extractor needs: call sites in document
//! order, their arguments with exact byte ranges, and a light
//! classification of literal arguments.

use std::ops::Range;
use tree_sitter::{Node, Parser, Tree};

/// Parsed template with byte-offset annotations
pub struct SyntaxTree<'src> {
    source: &'src str,
    tree: Tree,
}

impl std::fmt::Debug for SyntaxTree<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntaxTree")
            .field("source_len", &self.source.len())
            .field("root", &self.tree.root_node().kind())
            .finish()
    }
}

/// Parse source text into a syntax tree
///
/// # Errors
/// - `ScanError::ParserInit` if the grammar cannot be loaded
/// - `ScanError::ParseFailed` if tree-sitter produced no tree
/// - `ScanError::Syntax` if the tree contains any error or missing node
pub fn scan(source: &str) -> Result<SyntaxTree<'_>, ScanError> {
    let language: tree_sitter::Language = tree_sitter_javascript::LANGUAGE.into();

    let mut parser = Parser::new();
    parser
        .set_language(&language)
        .map_err(|e| ScanError::ParserInit(e.to_string()))?;

    let tree = parser.parse(source, None).ok_or(ScanError::ParseFailed)?;

    let root = tree.root_node();
    if root.has_error() {
        let node = first_error(root).unwrap_or(root);
        let pos = node.start_position();
        return Err(ScanError::Syntax {
            line: pos.row + 1,
            column: pos.column + 1,
            snippet: snippet(source, node.byte_range()),
        });
    }

    Ok(SyntaxTree { source, tree })
}

impl<'src> SyntaxTree<'src> {
    /// Source text the tree was built from
    #[inline]
    #[must_use]
    pub fn source(&self) -> &'src str {
        self.source
    }

    /// Root node (`program`)
    #[inline]
    #[must_use]
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// All call expressions with a plain identifier callee, in document order
    ///
    /// Outer calls precede calls nested in their arguments, so the result is
    /// sorted by ascending start offset.
    #[must_use]
    pub fn call_sites(&self) -> Vec<CallSite> {
        let mut calls = Vec::new();
        collect_calls(self.tree.root_node(), self.source, &mut calls);
        calls
    }

    /// Text of a node
    #[inline]
    #[must_use]
    pub fn text_of(&self, node: Node<'_>) -> &'src str {
        node_text(node, self.source)
    }
}

/// One call expression in a template
#[derive(Debug, Clone, PartialEq)]
pub struct CallSite {
    /// Callee identifier
    pub callee: String,
    /// Byte range of the whole call
    pub range: Range<usize>,
    /// Byte range of the enclosing statement (or the call itself)
    pub statement: Range<usize>,
    /// Arguments in order
    pub arguments: Vec<Argument>,
}

impl CallSite {
    fn from_node(node: Node<'_>, source: &str) -> Option<Self> {
        let function = node.child_by_field_name("function")?;
        if function.kind() != "identifier" {
            return None;
        }
        let args_node = node.child_by_field_name("arguments")?;

        let mut cursor = args_node.walk();
        let arguments = args_node
            .named_children(&mut cursor)
            .filter(|n| n.kind() != "comment")
            .map(|n| Argument::from_node(n, source))
            .collect();

        Some(Self {
            callee: node_text(function, source).to_string(),
            range: node.byte_range(),
            statement: enclosing_statement(node),
            arguments,
        })
    }

    /// Positional argument
    #[inline]
    #[must_use]
    pub fn argument(&self, index: usize) -> Option<&Argument> {
        self.arguments.get(index)
    }
}

/// A call argument with its exact source range
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    /// Byte range in the template
    pub range: Range<usize>,
    /// Raw source text
    pub text: String,
    /// Classified literal form
    pub literal: Literal,
}

impl Argument {
    fn from_node(node: Node<'_>, source: &str) -> Self {
        Self {
            range: node.byte_range(),
            text: node_text(node, source).to_string(),
            literal: classify(node, source),
        }
    }
}

/// Literal classification of an argument
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Numeric literal, including a leading sign
    Number(f64),
    /// String literal with its decoded value and quote character
    Str { value: String, quote: char },
    /// `true` / `false`
    Bool(bool),
    /// Bare identifier or member path (`UNIT.LENGTH`)
    Token(String),
    /// Array literal
    Array(Vec<Argument>),
    /// Object literal as ordered key/value pairs
    Object(Vec<(String, Argument)>),
    /// Any other expression
    Other,
}

impl Literal {
    /// Numeric value, if numeric
    #[inline]
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// String value (strings and bare tokens)
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Str { value, .. } | Self::Token(value) => Some(value),
            _ => None,
        }
    }

    /// Quoted string value only
    #[inline]
    #[must_use]
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::Str { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Boolean value
    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Scanner errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScanError {
    #[error("parser initialization failed: {0}")]
    ParserInit(String),

    #[error("parse failed")]
    ParseFailed,

    #[error("syntax error at {line}:{column} near `{snippet}`")]
    Syntax {
        line: usize,
        column: usize,
        snippet: String,
    },
}

fn collect_calls(node: Node<'_>, source: &str, out: &mut Vec<CallSite>) {
    if node.kind() == "call_expression" {
        if let Some(call) = CallSite::from_node(node, source) {
            out.push(call);
        }
    }

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_calls(child, source, out);
    }
}

fn classify(node: Node<'_>, source: &str) -> Literal {
    let text = node_text(node, source);
    match node.kind() {
        "number" => parse_number(text).map_or(Literal::Other, Literal::Number),
        "unary_expression" => {
            let operator = node
                .child_by_field_name("operator")
                .map(|op| node_text(op, source));
            let argument = node.child_by_field_name("argument");
            match (operator, argument.map(|a| classify(a, source))) {
                (Some("-"), Some(Literal::Number(n))) => Literal::Number(-n),
                (Some("+"), Some(Literal::Number(n))) => Literal::Number(n),
                _ => Literal::Other,
            }
        }
        "string" => {
            let quote = text.chars().next().unwrap_or('"');
            let inner = text
                .get(1..text.len().saturating_sub(1))
                .unwrap_or_default();
            Literal::Str {
                value: unescape(inner),
                quote,
            }
        }
        "true" => Literal::Bool(true),
        "false" => Literal::Bool(false),
        "identifier" | "member_expression" | "null" | "undefined" => {
            Literal::Token(text.to_string())
        }
        "parenthesized_expression" => node
            .named_child(0)
            .map_or(Literal::Other, |inner| classify(inner, source)),
        "array" => {
            let mut cursor = node.walk();
            Literal::Array(
                node.named_children(&mut cursor)
                    .filter(|n| n.kind() != "comment")
                    .map(|n| Argument::from_node(n, source))
                    .collect(),
            )
        }
        "object" => {
            let mut cursor = node.walk();
            let pairs = node
                .named_children(&mut cursor)
                .filter(|n| n.kind() == "pair")
                .filter_map(|pair| {
                    let key = pair.child_by_field_name("key")?;
                    let value = pair.child_by_field_name("value")?;
                    let key = match classify(key, source) {
                        Literal::Str { value, .. } => value,
                        _ => node_text(key, source).to_string(),
                    };
                    Some((key, Argument::from_node(value, source)))
                })
                .collect();
            Literal::Object(pairs)
        }
        _ => Literal::Other,
    }
}

fn parse_number(text: &str) -> Option<f64> {
    let cleaned = text.replace('_', "");
    let radix = match cleaned.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    match radix {
        #[allow(clippy::cast_precision_loss)]
        Some(radix) => i64::from_str_radix(&cleaned[2..], radix).ok().map(|v| v as f64),
        None => cleaned.parse().ok(),
    }
}

fn unescape(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn enclosing_statement(node: Node<'_>) -> Range<usize> {
    let mut current = node;
    while let Some(parent) = current.parent() {
        match parent.kind() {
            "expression_statement" | "lexical_declaration" | "variable_declaration" => {
                return parent.byte_range();
            }
            "variable_declarator" | "assignment_expression" | "await_expression" => {
                current = parent;
            }
            _ => break,
        }
    }
    node.byte_range()
}

fn first_error<'t>(node: Node<'t>) -> Option<Node<'t>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() || child.is_missing() {
            if let Some(found) = first_error(child) {
                return Some(found);
            }
        }
    }
    None
}

fn node_text<'src>(node: Node<'_>, source: &'src str) -> &'src str {
    source.get(node.byte_range()).unwrap_or("")
}

fn snippet(source: &str, range: Range<usize>) -> String {
    let text = source.get(range).unwrap_or("");
    let line = text.lines().next().unwrap_or("");
    line.chars().take(40).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_calls_in_document_order() {
        let src = r#"
var L = parameter_float("L", "Span", 10.0, 1.0, 50.0, "m");
helper(parameter_int("n", "Bays", 6, 2, 50));
"#;
        let tree = scan(src).unwrap();
        let callees: Vec<_> = tree.call_sites().into_iter().map(|c| c.callee).collect();
        assert_eq!(callees, vec!["parameter_float", "helper", "parameter_int"]);
    }

    #[test]
    fn argument_ranges_are_exact() {
        let src = r#"parameter_float("L", "Span", 10.0, 1.0, 50.0, "m");"#;
        let tree = scan(src).unwrap();
        let call = &tree.call_sites()[0];
        let default = call.argument(2).unwrap();
        assert_eq!(&src[default.range.clone()], "10.0");
        assert_eq!(default.literal, Literal::Number(10.0));
        assert_eq!(call.statement, 0..src.len());
    }

    #[test]
    fn classifies_literals() {
        let src = r#"f(-2.5, 'steel', true, UNIT.LENGTH, ["a", "b"], {min: 1, "unit": "m"}, x + 1);"#;
        let tree = scan(src).unwrap();
        let args = &tree.call_sites()[0].arguments;
        assert_eq!(args[0].literal, Literal::Number(-2.5));
        assert_eq!(
            args[1].literal,
            Literal::Str {
                value: "steel".to_string(),
                quote: '\''
            }
        );
        assert_eq!(args[2].literal, Literal::Bool(true));
        assert_eq!(args[3].literal, Literal::Token("UNIT.LENGTH".to_string()));
        assert!(matches!(&args[4].literal, Literal::Array(items) if items.len() == 2));
        match &args[5].literal {
            Literal::Object(pairs) => {
                assert_eq!(pairs[0].0, "min");
                assert_eq!(pairs[1].0, "unit");
            }
            other => panic!("expected object, got {other:?}"),
        }
        assert_eq!(args[6].literal, Literal::Other);
    }

    #[test]
    fn member_callee_is_not_a_call_site() {
        let tree = scan("api.parameter_float(\"L\");").unwrap();
        assert!(tree.call_sites().is_empty());
    }

    #[test]
    fn statement_range_covers_declaration() {
        let src = "var h_1 = parameter_float(\"h_1\", \"Height 1\", 4.0);\n";
        let tree = scan(src).unwrap();
        let call = &tree.call_sites()[0];
        assert_eq!(&src[call.statement.clone()], src.trim_end());
    }

    #[test]
    fn syntax_error_reports_position() {
        let err = scan("parameter_float(\"L\", \n  10.0,, );").unwrap_err();
        match err {
            ScanError::Syntax { line, .. } => assert!(line >= 1),
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn empty_source_is_valid() {
        let tree = scan("").unwrap();
        assert!(tree.call_sites().is_empty());
    }

    #[test]
    fn hex_numbers_parse() {
        assert_eq!(parse_number("0x10"), Some(16.0));
        assert_eq!(parse_number("1_000"), Some(1000.0));
        assert_eq!(parse_number("1e3"), Some(1000.0));
    }
}
