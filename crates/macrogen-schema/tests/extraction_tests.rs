//! Integration tests for schema extraction over the fixture templates

use macrogen_schema::{extract, LiteralStyle, ParamKind, ParamValue, Predicate, SchemaCache};
use macrogen_test_utils as fixtures;
use proptest::prelude::*;

#[test]
fn truss_schema_shape() {
    let source = fixtures::truss_source();
    let schema = extract(&source).unwrap();

    let names: Vec<_> = schema.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["L", "n", "h_1", "h_2", "h_3", "bracing", "d", "section"]
    );
    assert_eq!(schema.source_hash, source.hash());

    let group = schema.group("h").unwrap();
    assert_eq!(group.driver, "n");
    assert_eq!(group.members, vec!["h_1", "h_2", "h_3"]);
    assert_eq!(group.label_for(4), "Height of post 4");
    assert_eq!(schema.group_driven_by("n").map(|g| g.name.as_str()), Some("h"));
    assert_eq!(schema.group_of("h_7").map(|(_, k)| k), Some(7));

    let section = schema.get("section").unwrap();
    assert_eq!(section.kind, ParamKind::Enumeration);
    assert_eq!(section.default.style, LiteralStyle::Quoted('\''));
    assert_eq!(section.dependency.as_deref(), Some("L > 10"));

    let d = schema.get("d").unwrap();
    assert_eq!(d.dependency.as_deref(), Some("bracing == true"));
}

#[test]
fn ranges_point_into_source() {
    let source = fixtures::truss_source();
    let schema = extract(&source).unwrap();
    for d in schema.iter() {
        assert_eq!(source.slice(d.default.range.clone()), Some(d.default.text.as_str()));
        assert!(d.statement_range.start <= d.call_range.start);
        assert!(d.call_range.end <= d.statement_range.end);
        let stmt = source.slice(d.statement_range.clone()).unwrap();
        assert!(stmt.starts_with("var "), "{stmt}");
    }
}

#[test]
fn extraction_is_deterministic() {
    let source = fixtures::span_source();
    assert_eq!(extract(&source).unwrap(), extract(&source).unwrap());
}

#[test]
fn fixture_predicates_hold_for_defaults() {
    let schema = extract(&fixtures::truss_source()).unwrap();
    let defaults = schema.defaults();
    for d in schema.iter() {
        if let Some(text) = &d.dependency {
            let predicate = Predicate::parse(text).unwrap();
            assert!(predicate.evaluate(|n| defaults.get(n).cloned()).unwrap());
        }
    }
}

#[test]
fn member_helpers_follow_declared_indices() {
    let gapped = extract(&fixtures::gapped_source()).unwrap();
    let group = gapped.group("c").unwrap();
    assert_eq!(gapped.builtin_count(group), 3);
    assert_eq!(gapped.declared_max(group), 3);
    assert_eq!(gapped.last_member(group).unwrap().name, "c_3");
    assert_eq!(gapped.undeclared_members(group, 5), vec![2, 4, 5]);
    assert_eq!(gapped.descriptor_for("c_4").unwrap().name, "c_3");
    assert_eq!(gapped.descriptor_for("c_1").unwrap().name, "c_1");
    assert!(gapped.descriptor_for("d_1").is_none());

    let superset = extract(&fixtures::superset_source()).unwrap();
    let group = superset.group("w").unwrap();
    assert_eq!(superset.builtin_count(group), 2);
    assert_eq!(superset.declared_max(group), 4);
    assert!(superset.undeclared_members(group, 4).is_empty());
}

#[tokio::test]
async fn cache_shares_fixture_schemas() {
    let cache = SchemaCache::new(8);
    let a = cache.get_or_extract(&fixtures::span_source()).await.unwrap();
    let b = cache.get_or_extract(&fixtures::span_source()).await.unwrap();
    assert!(std::sync::Arc::ptr_eq(&a, &b));
}

proptest! {
    #[test]
    fn in_range_floats_validate(v in 1.0f64..=50.0) {
        let schema = extract(&fixtures::span_source()).unwrap();
        let span = schema.get("L").unwrap();
        prop_assert_eq!(span.validate(&ParamValue::Float(v)), Ok(ParamValue::Float(v)));
    }

    #[test]
    fn out_of_range_floats_fail(v in 50.0001f64..1e6) {
        let schema = extract(&fixtures::span_source()).unwrap();
        prop_assert!(schema.get("L").unwrap().validate(&ParamValue::Float(v)).is_err());
    }
}
