//! Testing utilities for the macrogen workspace
//!
//! Shared template and catalog fixtures.

#![allow(missing_docs)]

use macrogen_catalog::{BlockCandidate, Catalog};
use macrogen_template::TemplateSource;
use std::path::Path;

/// Simply supported beam: one float, one combobox, one check box
pub const SPAN_TEMPLATE: &str = r#"// Simply supported beam
var L = parameter_float("L", "Span", 10.0, 1.0, 50.0, "m");
var mat = combobox("material", "Material", "steel", ["steel", "timber", "concrete"]);
var fixed = parameter_check("fixed", "Fixed supports", false);

var n1 = nodes.create(0, 0, 0);
var n2 = nodes.create(L, 0, 0);
createMember(n1, n2, mat, fixed);
"#;

/// Truss with a dynamic array of post heights and dependent parameters
pub const TRUSS_TEMPLATE: &str = r#"// Planar truss with variable posts
var L = parameter_float("L", "Span", 12.0, 2.0, 60.0, "m");
var n = parameter_int("n", "Number of posts", 3, 1, 10);
var posts = dynamic_array("h", "Height of post {i}", "n");
var h_1 = parameter_float("h_1", "Height of post 1", 2.0, 0.5, 10.0, "m");
var h_2 = parameter_float("h_2", "Height of post 2", 2.5, 0.5, 10.0, "m");
var h_3 = parameter_float("h_3", "Height of post 3", 3.0, 0.5, 10.0, "m");
var bracing = parameter_check("bracing", "Diagonal bracing", true);
var d = parameter_float("d", "Brace offset", 0.5, 0.0, 2.0, "m", "bracing == true");
var section = combobox("section", "Section", 'IPE 200', ['IPE 200', 'HEA 160'], {dependency: "L > 10"});

for (var i = 1; i <= n; i++) {
    createPost(i, L / n);
}
"#;

/// Members declared up to the maximum; the default count uses two of them
pub const SUPERSET_TEMPLATE: &str = r#"// Bay frame, members declared up to the maximum
var n = parameter_int("n", "Number of bays", 2, 1, 4);
var bays = dynamic_array("w", "Width of bay {i}", "n");
var w_1 = parameter_float("w_1", "Width of bay 1", 4.0, 1.0, 12.0, "m");
var w_2 = parameter_float("w_2", "Width of bay 2", 4.5, 1.0, 12.0, "m");
var w_3 = parameter_float("w_3", "Width of bay 3", 5.0, 1.0, 12.0, "m");
var w_4 = parameter_float("w_4", "Width of bay 4", 5.5, 1.0, 12.0, "m");

for (var i = 1; i <= n; i++) {
    createBay(i);
}
"#;

/// Members 1 and 3 declared, 2 left to the expansion policy; the driver
/// has no upper bound
pub const GAPPED_TEMPLATE: &str = r#"// Column row
var n = parameter_int("n", "Number of columns", 3, 1);
var cols = dynamic_array("c", "Height of column {i}", "n");
var c_1 = parameter_float("c_1", "Height of column 1", 3.0, 1.0, 9.0, "m");
var c_3 = parameter_float("c_3", "Height of column 3", 3.5, 1.0, 9.0, "m");
createColumns(n);
"#;

pub const SPAN_BLOCK: &str = "beam_span";
pub const TRUSS_BLOCK: &str = "truss_2d";
pub const SUPERSET_BLOCK: &str = "frame_bays_2d";
pub const GAPPED_BLOCK: &str = "column_row_2d";

pub fn span_source() -> TemplateSource {
    TemplateSource::new(SPAN_BLOCK, SPAN_TEMPLATE)
}

pub fn truss_source() -> TemplateSource {
    TemplateSource::new(TRUSS_BLOCK, TRUSS_TEMPLATE)
}

pub fn superset_source() -> TemplateSource {
    TemplateSource::new(SUPERSET_BLOCK, SUPERSET_TEMPLATE)
}

pub fn gapped_source() -> TemplateSource {
    TemplateSource::new(GAPPED_BLOCK, GAPPED_TEMPLATE)
}

/// Twenty candidates across both dimensionalities
///
/// The 2D trusses, in order, are `truss_2d`, `truss_warren_2d`,
/// `truss_howe_2d`, `truss_fink_2d` and `truss_bowstring_2d`.
pub fn candidates() -> Vec<BlockCandidate> {
    vec![
        BlockCandidate::new(SPAN_BLOCK, "Simply supported beam", "2D", "Beam", "Steel"),
        BlockCandidate::new(TRUSS_BLOCK, "Planar truss", "2D", "Truss", "Steel")
            .with_description("Parallel chord truss with variable posts"),
        BlockCandidate::new("frame_portal_2d", "Portal frame", "2D", "Frame", "Steel"),
        BlockCandidate::new("truss_warren_2d", "Warren truss", "2D", "Truss", "Timber"),
        BlockCandidate::new("slab_3d", "Flat slab", "3D", "Slab", "Concrete"),
        BlockCandidate::new("beam_cantilever", "Cantilever", "2D", "Beam", "Timber"),
        BlockCandidate::new("truss_space_3d", "Space truss", "3D", "Truss", "Steel"),
        BlockCandidate::new("truss_howe_2d", "Howe truss", "2D", "truss", "Steel"),
        BlockCandidate::new("arch_2d", "Parabolic arch", "2D", "Arch", "Concrete"),
        BlockCandidate::new("frame_hall_3d", "Hall frame", "3D", "Frame", "Steel"),
        BlockCandidate::new("column_3d", "Column", "3D", "Column", "Concrete"),
        BlockCandidate::new("truss_fink_2d", "Fink truss", "2D", "TRUSS", "Timber"),
        BlockCandidate::new("beam_continuous", "Continuous beam", "2D", "Beam", "Concrete"),
        BlockCandidate::new("shell_3d", "Cylindrical shell", "3D", "Shell", "Concrete"),
        BlockCandidate::new("frame_multi_2d", "Multi-storey frame", "2D", "Frame", "Concrete"),
        BlockCandidate::new("truss_roof_3d", "Roof truss", "3D", "Truss", "Timber"),
        BlockCandidate::new("cable_2d", "Cable", "2D", "Cable", "Steel"),
        BlockCandidate::new("truss_bowstring_2d", "Bowstring truss", "2D", "Truss", "Steel")
            .with_application("Bridge"),
        BlockCandidate::new("wall_3d", "Shear wall", "3D", "Wall", "Concrete"),
        BlockCandidate::new("grid_3d", "Beam grid", "3D", "Grid", "Timber"),
    ]
}

/// Fixture catalog with templates for the span and truss blocks
pub fn catalog() -> Catalog {
    Catalog::new(candidates())
        .with_template(span_source())
        .with_template(truss_source())
}

/// Catalog holding only the two blocks that have templates
pub fn small_catalog() -> Catalog {
    Catalog::new(
        candidates()
            .into_iter()
            .filter(|c| c.id.as_str() == SPAN_BLOCK || c.id.as_str() == TRUSS_BLOCK)
            .collect(),
    )
    .with_template(span_source())
    .with_template(truss_source())
}

/// Catalog of the two array templates whose declared members differ from
/// their default count
pub fn array_catalog() -> Catalog {
    Catalog::new(vec![
        BlockCandidate::new(SUPERSET_BLOCK, "Bay frame", "2D", "Bay", "Steel"),
        BlockCandidate::new(GAPPED_BLOCK, "Column row", "2D", "Column", "Steel"),
    ])
    .with_template(superset_source())
    .with_template(gapped_source())
}

/// Write the fixture catalog in its on-disk layout under `root`
///
/// The truss template is written with an upper-case `.JS` extension.
pub fn write_catalog_dir(root: &Path) -> std::io::Result<()> {
    for dim in ["2D", "3D"] {
        let dir = root.join(dim);
        std::fs::create_dir_all(&dir)?;
        let elements: Vec<_> = candidates()
            .into_iter()
            .filter(|c| c.dimensionality == dim)
            .collect();
        let db = serde_json::json!({ "elements": elements });
        std::fs::write(dir.join(format!("{dim}_DB.json")), db.to_string())?;
    }
    std::fs::write(root.join("2D").join(format!("{SPAN_BLOCK}.js")), SPAN_TEMPLATE)?;
    std::fs::write(root.join("2D").join(format!("{TRUSS_BLOCK}.JS")), TRUSS_TEMPLATE)?;
    Ok(())
}
