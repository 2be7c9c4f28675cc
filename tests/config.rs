use std::time::Duration;

use assert_matches::assert_matches;

use sotka_indicators::config::{
    CacheEntry, Config, ConfigLoader, LayerMappingsConfig, LayerMappingsEntry, TestModeEntry,
};
use sotka_indicators::error::SotkaError;
use sotka_indicators::layers::LayerRow;

#[test]
fn parse_full_config() {
    let content = r#"{
        "schema_version": 1,
        "base_url": "http://localhost:9000/rest/1.1",
        "timeout_secs": 5,
        "retries": 2,
        "workers": 4,
        "layer_mappings": [
            {"sotka_layer_id": "Kunta", "local_layer_name": "oskari:kunnat2013"}
        ],
        "cache": {"enabled": false, "max_age_secs": 60},
        "test_mode": {"skip_enrichment_above": 200}
    }"#;
    let config: Config = serde_json::from_str(content).unwrap();
    let resolved = ConfigLoader::resolve_config(config).unwrap();

    assert_eq!(resolved.http.base_url, "http://localhost:9000/rest/1.1");
    assert_eq!(resolved.http.timeout, Duration::from_secs(5));
    assert_eq!(resolved.http.retries, 2);
    assert_eq!(resolved.aggregator.workers, 4);
    assert_eq!(
        resolved.aggregator.test_mode.map(|t| t.skip_enrichment_above),
        Some(200)
    );
    assert!(!resolved.cache.enabled);
    assert_eq!(resolved.cache.max_age, Duration::from_secs(60));
    assert_matches!(
        resolved.layer_mappings,
        LayerMappingsConfig::Inline(ref rows) if rows.len() == 1
    );
}

#[test]
fn layer_mappings_as_file_path() {
    let config = Config {
        layer_mappings: Some(LayerMappingsEntry::File("layers.json".to_string())),
        cache: Some(CacheEntry {
            enabled: None,
            max_age_secs: None,
        }),
        test_mode: Some(TestModeEntry {
            skip_enrichment_above: 10,
        }),
        ..Config::default()
    };
    let resolved = ConfigLoader::resolve_config(config).unwrap();
    assert_eq!(
        resolved.layer_mappings,
        LayerMappingsConfig::File("layers.json".into())
    );
    assert!(resolved.cache.enabled);
    assert_eq!(resolved.cache.max_age, Duration::from_secs(24 * 60 * 60));
}

#[test]
fn zero_workers_rejected() {
    let config = Config {
        workers: Some(0),
        ..Config::default()
    };
    assert_matches!(
        ConfigLoader::resolve_config(config),
        Err(SotkaError::ConfigParse(_))
    );
}

#[test]
fn unknown_schema_rejected() {
    let config = Config {
        schema_version: Some(2),
        ..Config::default()
    };
    assert_matches!(
        ConfigLoader::resolve_config(config),
        Err(SotkaError::ConfigParse(_))
    );
}

#[test]
fn explicit_missing_file_is_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("missing.json");
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, SotkaError::ConfigRead(_));
}

#[test]
fn mapping_file_relative_to_config() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("sotka.json");
    std::fs::write(&path, r#"{"layer_mappings": "layers.json"}"#).unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(
        resolved.layer_mappings,
        LayerMappingsConfig::File(temp.path().join("layers.json"))
    );
}

#[test]
fn inline_rows_deserialize() {
    let entry: LayerMappingsEntry =
        serde_json::from_str(r#"[{"sotka_layer_id": "Erva", "local_layer_name": "oskari:erva"}]"#)
            .unwrap();
    assert_matches!(entry, LayerMappingsEntry::Inline(rows) => {
        assert_eq!(rows, vec![LayerRow {
            sotka_layer_id: "Erva".to_string(),
            local_layer_name: "oskari:erva".to_string(),
        }]);
    });
}
