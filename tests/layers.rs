use assert_matches::assert_matches;

use sotka_indicators::error::SotkaError;
use sotka_indicators::layers::{JsonFileLayerSource, LayerMapping, LayerMappingSource};
use sotka_indicators::parser::parse_indicator_list;

#[test]
fn load_mapping_from_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("layers.json");
    std::fs::write(
        &path,
        r#"[
            {"sotka_layer_id": "Kunta", "local_layer_name": "oskari:kunnat2013"},
            {"sotka_layer_id": "Maakunta", "local_layer_name": "oskari:maakunta"}
        ]"#,
    )
    .unwrap();

    let mapping = LayerMapping::load(&JsonFileLayerSource::new(&path)).unwrap();
    assert_eq!(mapping.len(), 2);
    assert_eq!(mapping.resolve("MAAKUNTA"), Some("oskari:maakunta"));
}

#[test]
fn missing_file_is_read_error() {
    let source = JsonFileLayerSource::new("/nonexistent/layers.json");
    assert_matches!(source.load_rows(), Err(SotkaError::LayerMappingRead(_)));
}

#[test]
fn malformed_file_is_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("layers.json");
    std::fs::write(&path, r#"{"Kunta": "oskari:kunnat2013"}"#).unwrap();

    assert_matches!(
        LayerMapping::load(&JsonFileLayerSource::new(&path)),
        Err(SotkaError::LayerMappingParse(_))
    );
}

#[test]
fn source_ids_resolve_case_insensitively() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("layers.json");
    std::fs::write(
        &path,
        r#"[{"sotka_layer_id": "HEALTH01", "local_layer_name": "oskari:health"}]"#,
    )
    .unwrap();
    let mapping = LayerMapping::load(&JsonFileLayerSource::new(&path)).unwrap();

    let listing = r#"[
        {"id": 1, "title": "a", "classifications": {"region": {"values": ["HEALTH01"]}}},
        {"id": 2, "title": "b", "classifications": {"region": {"values": ["health01"]}}}
    ]"#;
    let indicators = parse_indicator_list(listing, &mapping).unwrap();

    assert_eq!(
        indicators[0].layers[0].local_layer,
        indicators[1].layers[0].local_layer
    );
    assert_eq!(indicators[0].layers[0].local_layer.as_deref(), Some("oskari:health"));
}
