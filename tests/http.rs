use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use httpmock::prelude::*;
use serde_json::json;

use sotka_indicators::aggregator::{AggregatorOptions, IndicatorAggregator};
use sotka_indicators::domain::IndicatorId;
use sotka_indicators::error::SotkaError;
use sotka_indicators::layers::{LayerMapping, LayerRow};
use sotka_indicators::sotka::{HttpSettings, SotkaClient, SotkaHttpClient};

fn client_for(server: &MockServer, retries: usize) -> SotkaHttpClient {
    SotkaHttpClient::new(HttpSettings {
        base_url: server.url("/rest/1.1"),
        timeout: Duration::from_secs(5),
        retries,
    })
    .unwrap()
}

#[test]
fn fetches_listing_and_metadata() {
    let server = MockServer::start();
    let listing = server.mock(|when, then| {
        when.method(GET).path("/rest/1.1/indicators");
        then.status(200).json_body(json!([{"id": 4, "title": {"fi": "Työttömät"}}]));
    });
    let metadata = server.mock(|when, then| {
        when.method(GET).path("/rest/1.1/indicators/4");
        then.status(200)
            .json_body(json!({"id": 4, "range": {"start": 1990, "end": 2013}}));
    });

    let client = client_for(&server, 0);
    let body = client.fetch_indicators().unwrap();
    assert!(body.contains("Työttömät"));
    let body = client.fetch_indicator_metadata(&IndicatorId::new(4)).unwrap();
    assert!(body.contains("1990"));

    listing.assert_calls(1);
    metadata.assert_calls(1);
}

#[test]
fn server_error_maps_to_status() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/rest/1.1/indicators/9");
        then.status(500).body("Internal Server Error");
    });

    let client = client_for(&server, 0);
    let err = client
        .fetch_indicator_metadata(&IndicatorId::new(9))
        .unwrap_err();

    assert_matches!(
        err,
        SotkaError::SotkaStatus { status: 500, ref message } if message == "Internal Server Error"
    );
}

#[test]
fn retries_retryable_statuses() {
    let server = MockServer::start();
    let metadata = server.mock(|when, then| {
        when.method(GET).path("/rest/1.1/indicators/9");
        then.status(503);
    });

    let client = client_for(&server, 2);
    let err = client
        .fetch_indicator_metadata(&IndicatorId::new(9))
        .unwrap_err();

    assert_matches!(err, SotkaError::SotkaStatus { status: 503, .. });
    metadata.assert_calls(3);
}

#[test]
fn unreachable_host_is_http_error() {
    let client = SotkaHttpClient::new(HttpSettings {
        base_url: "http://127.0.0.1:1/rest/1.1".to_string(),
        timeout: Duration::from_secs(2),
        retries: 0,
    })
    .unwrap();

    assert_matches!(client.fetch_indicators(), Err(SotkaError::SotkaHttp(_)));
}

#[test]
fn metadata_500_is_isolated_end_to_end() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/rest/1.1/indicators");
        then.status(200).json_body(json!([
            {"id": 1, "title": {"fi": "A"}, "classifications": {"region": {"values": ["Kunta"]}}},
            {"id": 2, "title": {"fi": "B"}}
        ]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/rest/1.1/indicators/1");
        then.status(200)
            .json_body(json!({"id": 1, "range": {"start": 2000, "end": 2020}}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/rest/1.1/indicators/2");
        then.status(500);
    });

    let layers = Arc::new(LayerMapping::from_rows(vec![LayerRow {
        sotka_layer_id: "kunta".to_string(),
        local_layer_name: "oskari:kunnat2013".to_string(),
    }]));
    let aggregator =
        IndicatorAggregator::new(client_for(&server, 0), layers, AggregatorOptions::default());
    let indicators = aggregator.indicators().unwrap();

    assert_eq!(indicators.len(), 2);
    assert!(indicators[0].has_years());
    assert_eq!(
        indicators[0].layers[0].local_layer.as_deref(),
        Some("oskari:kunnat2013")
    );
    assert!(!indicators[1].has_years());
}

#[test]
fn listing_500_is_systemic_end_to_end() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/rest/1.1/indicators");
        then.status(500);
    });

    let aggregator = IndicatorAggregator::new(
        client_for(&server, 0),
        Arc::new(LayerMapping::default()),
        AggregatorOptions::default(),
    );

    assert_matches!(
        aggregator.indicators(),
        Err(SotkaError::IndicatorListing { .. })
    );
}
