use macrogen_template::{scan, Literal};
use proptest::prelude::*;

/// Source text of one argument and the literal it should classify as
fn argument() -> impl Strategy<Value = (String, Literal)> {
    prop_oneof![
        (-1000.0f64..1000.0).prop_map(|x| (format!("{x}"), Literal::Number(x))),
        "[a-zA-Z0-9 _]{0,12}".prop_map(|s| (
            format!("\"{s}\""),
            Literal::Str {
                value: s,
                quote: '"'
            }
        )),
        "[a-zA-Z0-9_]{0,12}".prop_map(|s| (
            format!("'{s}'"),
            Literal::Str {
                value: s,
                quote: '\''
            }
        )),
        any::<bool>().prop_map(|b| (b.to_string(), Literal::Bool(b))),
        "k_[a-z0-9]{0,8}".prop_map(|s| (s.clone(), Literal::Token(s))),
    ]
}

fn separator() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just(", "), Just(","), Just(" ,\n    "), Just(", /* x */ ")]
}

proptest! {
    #[test]
    fn prop_argument_ranges_slice_to_their_text(
        leading in "(\n|  |// note\n){0,3}",
        args in prop::collection::vec((argument(), separator()), 0..7),
    ) {
        let mut src = format!("{leading}var p = parameter_float(");
        for (i, ((text, _), sep)) in args.iter().enumerate() {
            if i > 0 {
                src.push_str(sep);
            }
            src.push_str(text);
        }
        src.push_str(");\n");

        let tree = scan(&src).unwrap();
        let calls = tree.call_sites();
        prop_assert_eq!(calls.len(), 1);
        let call = &calls[0];

        prop_assert_eq!(call.callee.as_str(), "parameter_float");
        prop_assert!(call.statement.start <= call.range.start);
        prop_assert!(call.range.end <= call.statement.end);
        prop_assert_eq!(call.arguments.len(), args.len());

        for (argument, ((text, literal), _)) in call.arguments.iter().zip(&args) {
            prop_assert_eq!(&src[argument.range.clone()], argument.text.as_str());
            prop_assert_eq!(&argument.text, text);
            prop_assert_eq!(&argument.literal, literal);
        }
    }
}
