//! Reference resolution against scanned catalogs.

mod common;

use pdfgfx::{
    resolve_references, scan_bytes, select_referenced, AssetReference, DocumentCatalog,
    DocumentId,
};

fn catalogs() -> Vec<DocumentCatalog> {
    vec![
        scan_bytes(DocumentId::new("first").unwrap(), &common::mixed_pdf()).unwrap(),
        scan_bytes(DocumentId::new("second").unwrap(), &common::single_image_pdf()).unwrap(),
    ]
}

#[test]
fn test_every_catalog_name_round_trips() {
    let catalogs = catalogs();
    let names: Vec<String> = catalogs
        .iter()
        .flat_map(|c| c.names())
        .map(|n| n.to_string())
        .collect();
    assert_eq!(names.len(), 4);

    let text = names
        .iter()
        .map(|n| format!("As shown in gfx/{}, the trend holds.", n))
        .collect::<Vec<_>>()
        .join("\n\n");

    let references = resolve_references(&text);
    assert_eq!(references.len(), names.len());
    for reference in &references {
        let hits: usize = catalogs
            .iter()
            .flat_map(|c| c.assets())
            .filter(|a| reference.matches(a))
            .count();
        assert_eq!(hits, 1, "{} should match exactly one asset", reference);
    }

    let selected = select_referenced(&text, &catalogs);
    let selected_names: Vec<String> = selected.iter().map(|a| a.name().to_string()).collect();
    assert_eq!(selected_names, names);
}

#[test]
fn test_reference_parses_back_to_name() {
    for catalog in catalogs() {
        for asset in catalog.assets() {
            let name = asset.name();
            let reference: AssetReference = name.to_string().parse().unwrap();
            assert_eq!(reference, AssetReference::from(name));
            assert!(reference.matches(asset));
        }
    }
}

#[test]
fn test_uppercase_prefix_needs_matching_case() {
    let catalogs = catalogs();
    let asset = &catalogs[1].assets()[0];
    let upper = asset.name().to_string().replace(
        asset.hash_prefix(),
        &asset.hash_prefix().to_uppercase(),
    );
    let expected = if asset.hash_prefix().chars().any(|c| c.is_ascii_alphabetic()) {
        0
    } else {
        1
    };
    assert_eq!(select_referenced(&upper, &catalogs).len(), expected);
}
