//! Integration tests for synthesis over the fixture templates

use indexmap::IndexMap;
use macrogen_schema::{extract, ParamValue, ValidationError};
use macrogen_synth::{
    apply_edits, policy_by_name, synthesize, DuplicateBlock, EditOperation, EditOrigin,
    SynthError, Synthesizer,
};
use std::sync::Arc;
use macrogen_test_utils as fixtures;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const N_LINE: &str = r#"var n = parameter_int("n", "Number of posts", 3, 1, 10);"#;
const H2_LINE: &str = "var h_2 = parameter_float(\"h_2\", \"Height of post 2\", 2.5, 0.5, 10.0, \"m\");\n";
const H3_LINE: &str = "var h_3 = parameter_float(\"h_3\", \"Height of post 3\", 3.0, 0.5, 10.0, \"m\");\n";
const BAYS_LINE: &str = r#"var n = parameter_int("n", "Number of bays", 2, 1, 4);"#;
const W4_LINE: &str = "var w_4 = parameter_float(\"w_4\", \"Width of bay 4\", 5.5, 1.0, 12.0, \"m\");\n";
const COLUMNS_LINE: &str = r#"var n = parameter_int("n", "Number of columns", 3, 1);"#;
const C3_LINE: &str = "var c_3 = parameter_float(\"c_3\", \"Height of column 3\", 3.5, 1.0, 9.0, \"m\");\n";

fn values(pairs: &[(&str, ParamValue)]) -> IndexMap<String, ParamValue> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

fn with_policy(name: &str) -> Synthesizer {
    Synthesizer::new(policy_by_name(name).unwrap())
}

#[test]
fn span_change_touches_only_default_literal() {
    let source = fixtures::span_source();
    let schema = extract(&source).unwrap();
    let script = synthesize(
        &source,
        &schema,
        &values(&[("L", ParamValue::Float(15.5))]),
        "s1",
    )
    .unwrap();

    let expected = fixtures::SPAN_TEMPLATE.replacen(
        r#""Span", 10.0, 1.0"#,
        r#""Span", 15.5, 1.0"#,
        1,
    );
    assert_eq!(script.text(), expected);
    assert_eq!(script.block_id().as_str(), fixtures::SPAN_BLOCK);
    assert_eq!(script.session_id(), "s1");

    let range = schema.get("L").unwrap().default.range.clone();
    assert_eq!(&script.text()[..range.start], &fixtures::SPAN_TEMPLATE[..range.start]);
    assert_eq!(
        &script.text()[range.start + "15.5".len()..],
        &fixtures::SPAN_TEMPLATE[range.end..]
    );
}

#[test]
fn all_defaults_reproduce_template() {
    let sources = [
        fixtures::span_source(),
        fixtures::truss_source(),
        fixtures::superset_source(),
        fixtures::gapped_source(),
    ];
    for source in sources {
        let schema = extract(&source).unwrap();
        for policy in ["truncate", "duplicate"] {
            let synth = with_policy(policy);
            let defaults = synth
                .synthesize(&source, &schema, &schema.defaults(), "s")
                .unwrap();
            assert_eq!(defaults.text(), source.text(), "{} / {policy}", source.block_id());
            let empty = synth
                .synthesize(&source, &schema, &IndexMap::new(), "s")
                .unwrap();
            assert_eq!(empty.text(), source.text(), "{} / {policy}", source.block_id());
        }
    }
}

#[test]
fn superset_count_keeps_members_up_to_count() {
    let source = fixtures::superset_source();
    let schema = extract(&source).unwrap();
    assert_eq!(schema.builtin_count(schema.group("w").unwrap()), 2);

    for policy in ["truncate", "duplicate"] {
        let script = with_policy(policy)
            .synthesize(&source, &schema, &values(&[("n", ParamValue::Integer(3))]), "s")
            .unwrap();
        let expected = fixtures::SUPERSET_TEMPLATE
            .replace(BAYS_LINE, &BAYS_LINE.replace(", 2, 1, 4", ", 3, 1, 4"))
            .replace(W4_LINE, "");
        assert_eq!(script.text(), expected, "{policy}");
    }

    let all = with_policy("truncate")
        .synthesize(&source, &schema, &values(&[("n", ParamValue::Integer(4))]), "s")
        .unwrap();
    assert_eq!(
        all.text(),
        fixtures::SUPERSET_TEMPLATE.replace(BAYS_LINE, &BAYS_LINE.replace(", 2, 1, 4", ", 4, 1, 4"))
    );
}

#[test]
fn duplicate_fills_gaps_below_count() {
    let source = fixtures::gapped_source();
    let schema = extract(&source).unwrap();
    let script = with_policy("duplicate")
        .synthesize(&source, &schema, &values(&[("n", ParamValue::Integer(2))]), "s")
        .unwrap();

    let c2 = "var c_2 = parameter_float(\"c_2\", \"Height of column 2\", 3.5, 1.0, 9.0, \"m\");\n";
    let expected = fixtures::GAPPED_TEMPLATE
        .replace(COLUMNS_LINE, &COLUMNS_LINE.replace(", 3, 1)", ", 2, 1)"))
        .replace(C3_LINE, c2);
    assert_eq!(script.text(), expected);

    let reread = extract(&macrogen_template::TemplateSource::new("column_row_2d", script.text()))
        .unwrap();
    assert_eq!(reread.group("c").unwrap().members, vec!["c_1", "c_2"]);
}

#[test]
fn duplicate_generates_every_missing_index() {
    let source = fixtures::gapped_source();
    let schema = extract(&source).unwrap();
    let synth = with_policy("duplicate");
    let group = schema.group("c").unwrap();
    assert!(synth.generated_members(&schema, group, 3).is_empty());
    assert_eq!(synth.generated_members(&schema, group, 4), vec![2, 4]);
    assert!(with_policy("truncate").generated_members(&schema, group, 4).is_empty());

    let script = synth
        .synthesize(
            &source,
            &schema,
            &values(&[
                ("n", ParamValue::Integer(4)),
                ("c_2", ParamValue::Float(6.0)),
            ]),
            "s",
        )
        .unwrap();
    let reread = extract(&macrogen_template::TemplateSource::new("column_row_2d", script.text()))
        .unwrap();
    let mut members = reread.group("c").unwrap().members.clone();
    members.sort();
    assert_eq!(members, vec!["c_1", "c_2", "c_3", "c_4"]);
    assert_eq!(reread.get("c_2").unwrap().default.value, ParamValue::Float(6.0));
    assert_eq!(reread.get("c_4").unwrap().label, "Height of column 4");
}

#[test]
fn duplicate_count_is_bounded() {
    let source = fixtures::gapped_source();
    let schema = extract(&source).unwrap();
    let synth = Synthesizer::new(Arc::new(DuplicateBlock::new(4)));
    assert_eq!(synth.member_capacity(&schema, "n"), Some(4));

    let err = synth
        .synthesize(
            &source,
            &schema,
            &values(&[("n", ParamValue::Integer(1_000_000_000))]),
            "s",
        )
        .unwrap_err();
    assert!(matches!(
        err,
        SynthError::Validation(ValidationError::TooManyMembers { capacity: 4, .. })
    ));
}

#[test]
fn truncate_rejects_values_for_undeclared_members() {
    let source = fixtures::truss_source();
    let schema = extract(&source).unwrap();
    let err = with_policy("truncate")
        .synthesize(&source, &schema, &values(&[("h_7", ParamValue::Float(2.0))]), "s")
        .unwrap_err();
    assert!(matches!(err, SynthError::SchemaMismatch(ref m) if m.contains("h_7")));
}

#[test]
fn enumeration_and_boolean_values() {
    let source = fixtures::span_source();
    let schema = extract(&source).unwrap();
    let script = synthesize(
        &source,
        &schema,
        &values(&[
            ("material", ParamValue::Choice("Timber".to_string())),
            ("fixed", ParamValue::Boolean(true)),
        ]),
        "s",
    )
    .unwrap();
    let expected = fixtures::SPAN_TEMPLATE
        .replacen(r#""Material", "steel""#, r#""Material", "timber""#, 1)
        .replacen(r#""Fixed supports", false"#, r#""Fixed supports", true"#, 1);
    assert_eq!(script.text(), expected);
}

#[test]
fn unknown_parameter_is_schema_mismatch() {
    let source = fixtures::span_source();
    let schema = extract(&source).unwrap();
    let err = synthesize(&source, &schema, &values(&[("width", ParamValue::Float(1.0))]), "s")
        .unwrap_err();
    assert!(matches!(err, SynthError::SchemaMismatch(_)));
}

#[test]
fn out_of_range_value_is_validation_error() {
    let source = fixtures::span_source();
    let schema = extract(&source).unwrap();
    let err = synthesize(&source, &schema, &values(&[("L", ParamValue::Float(99.0))]), "s")
        .unwrap_err();
    assert!(matches!(
        err,
        SynthError::Validation(ValidationError::AboveMaximum { .. })
    ));
}

#[test]
fn foreign_schema_is_rejected() {
    let span = fixtures::span_source();
    let truss_schema = extract(&fixtures::truss_source()).unwrap();
    let err = synthesize(&span, &truss_schema, &IndexMap::new(), "s").unwrap_err();
    assert!(matches!(err, SynthError::SchemaMismatch(_)));
}

#[test]
fn truncate_removes_surplus_members() {
    let source = fixtures::truss_source();
    let schema = extract(&source).unwrap();
    let script = with_policy("truncate")
        .synthesize(
            &source,
            &schema,
            &values(&[
                ("n", ParamValue::Integer(2)),
                ("h_3", ParamValue::Float(9.0)),
            ]),
            "s",
        )
        .unwrap();

    let expected = fixtures::TRUSS_TEMPLATE
        .replace(N_LINE, &N_LINE.replace(", 3, 1, 10", ", 2, 1, 10"))
        .replace(H3_LINE, "");
    assert_eq!(script.text(), expected);
}

#[test]
fn truncate_rejects_counts_beyond_declared() {
    let source = fixtures::truss_source();
    let schema = extract(&source).unwrap();
    let synth = with_policy("truncate");
    assert_eq!(synth.member_capacity(&schema, "n"), Some(3));

    let err = synth
        .synthesize(&source, &schema, &values(&[("n", ParamValue::Integer(4))]), "s")
        .unwrap_err();
    assert!(matches!(
        err,
        SynthError::Validation(ValidationError::TooManyMembers { capacity: 3, .. })
    ));
}

#[test]
fn duplicate_generates_missing_members() {
    let source = fixtures::truss_source();
    let schema = extract(&source).unwrap();
    let script = with_policy("duplicate")
        .synthesize(
            &source,
            &schema,
            &values(&[
                ("n", ParamValue::Integer(5)),
                ("h_4", ParamValue::Float(4.5)),
            ]),
            "s",
        )
        .unwrap();

    let generated = concat!(
        "var h_4 = parameter_float(\"h_4\", \"Height of post 4\", 4.5, 0.5, 10.0, \"m\");\n",
        "var h_5 = parameter_float(\"h_5\", \"Height of post 5\", 3.0, 0.5, 10.0, \"m\");\n",
    );
    let expected = fixtures::TRUSS_TEMPLATE
        .replace(N_LINE, &N_LINE.replace(", 3, 1, 10", ", 5, 1, 10"))
        .replace(H3_LINE, &format!("{H3_LINE}{generated}"));
    assert_eq!(script.text(), expected);

    // The result is itself a valid template with five members
    let regenerated = extract(&macrogen_template::TemplateSource::new("truss_2d", script.text()))
        .unwrap();
    assert_eq!(regenerated.group("h").unwrap().members.len(), 5);
    assert_eq!(
        regenerated.get("h_4").unwrap().default.value,
        ParamValue::Float(4.5)
    );
}

#[test]
fn duplicate_also_truncates() {
    let source = fixtures::truss_source();
    let schema = extract(&source).unwrap();
    let script = with_policy("duplicate")
        .synthesize(&source, &schema, &values(&[("n", ParamValue::Integer(1))]), "s")
        .unwrap();
    let expected = fixtures::TRUSS_TEMPLATE
        .replace(N_LINE, &N_LINE.replace(", 3, 1, 10", ", 1, 1, 10"))
        .replace(H2_LINE, "")
        .replace(H3_LINE, "");
    assert_eq!(script.text(), expected);
}

#[test]
fn member_values_beyond_count_are_ignored() {
    let source = fixtures::truss_source();
    let schema = extract(&source).unwrap();
    let script = synthesize(
        &source,
        &schema,
        &values(&[("h_5", ParamValue::Float(7.0))]),
        "s",
    )
    .unwrap();
    assert_eq!(script.text(), fixtures::TRUSS_TEMPLATE);
}

#[test]
fn overlapping_edits_are_reported() {
    let err = apply_edits(
        "abcdef",
        &[
            EditOperation::replace(1..4, "x", EditOrigin::Parameter("a".to_string())),
            EditOperation::replace(3..5, "y", EditOrigin::Parameter("b".to_string())),
        ],
    )
    .unwrap_err();
    assert!(matches!(err, SynthError::EditConflict { .. }));
}

proptest! {
    #[test]
    fn value_order_does_not_matter(
        span in 2.0f64..60.0,
        h1 in 0.5f64..10.0,
        bracing in any::<bool>(),
    ) {
        let source = fixtures::truss_source();
        let schema = extract(&source).unwrap();
        let forward = values(&[
            ("L", ParamValue::Float(span)),
            ("h_1", ParamValue::Float(h1)),
            ("bracing", ParamValue::Boolean(bracing)),
        ]);
        let mut backward = forward.clone();
        backward.reverse();

        let a = synthesize(&source, &schema, &forward, "s").unwrap();
        let b = synthesize(&source, &schema, &backward, "s").unwrap();
        prop_assert_eq!(a.text(), b.text());
    }

    #[test]
    fn disjoint_edits_apply_in_any_order(
        cuts in proptest::collection::btree_set(0usize..40, 0..10),
        seed in any::<u64>(),
    ) {
        let text = "var a = parameter_float(\"a\", \"A\", 1.0);";
        let cuts: Vec<usize> = cuts.into_iter().filter(|c| *c <= text.len()).collect();
        let edits: Vec<EditOperation> = cuts
            .chunks(2)
            .enumerate()
            .map(|(i, pair)| {
                let start = pair[0];
                let end = pair.get(1).copied().unwrap_or(start);
                EditOperation::replace(start..end, format!("<{i}>"), EditOrigin::Parameter(i.to_string()))
            })
            .collect();

        let mut shuffled = edits.clone();
        if !shuffled.is_empty() {
            let len = shuffled.len();
            #[allow(clippy::cast_possible_truncation)]
            shuffled.rotate_left((seed as usize) % len);
        }
        shuffled.reverse();

        prop_assert_eq!(apply_edits(text, &edits).unwrap(), apply_edits(text, &shuffled).unwrap());
    }

    #[test]
    fn rendered_floats_read_back(v in 1.0f64..=50.0) {
        let source = fixtures::span_source();
        let schema = extract(&source).unwrap();
        let script = synthesize(&source, &schema, &values(&[("L", ParamValue::Float(v))]), "s").unwrap();
        let reread = extract(&macrogen_template::TemplateSource::new("beam_span", script.text())).unwrap();
        prop_assert_eq!(reread.get("L").unwrap().default.value.clone(), ParamValue::Float(v));
    }
}
