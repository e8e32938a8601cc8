//! Integration tests for matching and loading the catalog

use macrogen_catalog::{filter, materials, structure_types, Catalog, CatalogError, Requirements};
use macrogen_template::BlockId;
use macrogen_test_utils as fixtures;
use pretty_assertions::assert_eq;

fn ids(candidates: &[macrogen_catalog::BlockCandidate]) -> Vec<String> {
    candidates.iter().map(|c| c.id.to_string()).collect()
}

#[test]
fn two_d_trusses_in_catalog_order() {
    let all = fixtures::candidates();
    assert_eq!(all.len(), 20);

    let req = Requirements::new()
        .with_dimensionality("2D")
        .with_structure_type("truss");
    assert_eq!(
        ids(&filter(&all, &req)),
        vec![
            "truss_2d",
            "truss_warren_2d",
            "truss_howe_2d",
            "truss_fink_2d",
            "truss_bowstring_2d",
        ]
    );
}

#[test]
fn lower_case_dimensionality_matches() {
    let all = fixtures::candidates();
    let upper = filter(&all, &Requirements::new().with_dimensionality("2D"));
    let lower = filter(
        &all,
        &Requirements {
            dimensionality: Some("2d".to_string()),
            ..Requirements::default()
        },
    );
    assert_eq!(upper, lower);
    assert!(!upper.is_empty());
}

#[test]
fn empty_requirements_keep_everything() {
    let all = fixtures::candidates();
    assert_eq!(filter(&all, &Requirements::new()), all);
}

#[test]
fn any_material_behaves_as_unset() {
    let all = fixtures::candidates();
    let mut req = Requirements::new()
        .with_dimensionality("2D")
        .with_structure_type("truss");
    let before = filter(&all, &req);
    req.merge(Requirements::new().with_material("any"));
    assert_eq!(filter(&all, &req), before);
}

#[test]
fn prompt_listings() {
    let all = fixtures::candidates();
    assert_eq!(
        structure_types(&all, Some("2D")),
        vec!["arch", "beam", "cable", "frame", "truss"]
    );
    assert_eq!(materials(&all, Some("2D"), Some("truss")), vec!["steel", "timber"]);
}

#[tokio::test]
async fn loads_on_disk_layout() {
    let dir = tempfile::tempdir().unwrap();
    fixtures::write_catalog_dir(dir.path()).unwrap();

    let catalog = Catalog::load_dir(dir.path()).await.unwrap();
    assert_eq!(catalog.len(), 20);
    assert_eq!(catalog.template_count(), 2);

    let truss = catalog.template(&BlockId::new(fixtures::TRUSS_BLOCK)).unwrap();
    assert_eq!(truss.text(), fixtures::TRUSS_TEMPLATE);

    // 2D entries come first
    assert!(catalog.candidates()[..12]
        .iter()
        .all(|c| c.dimensionality == "2D"));
}

#[tokio::test]
async fn missing_database_yields_no_candidates() {
    let dir = tempfile::tempdir().unwrap();
    fixtures::write_catalog_dir(dir.path()).unwrap();
    std::fs::remove_file(dir.path().join("3D").join("3D_DB.json")).unwrap();
    std::fs::write(dir.path().join("2D").join("2D_DB.json"), "{ not json").unwrap();

    let catalog = Catalog::load_dir(dir.path()).await.unwrap();
    assert!(catalog.is_empty());
}

#[tokio::test]
async fn missing_root_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Catalog::load_dir(dir.path().join("nope")).await.unwrap_err();
    assert!(matches!(err, CatalogError::RootNotFound(_)));
}
