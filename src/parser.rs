//! Parsing of SotkaNET indicator listing and metadata responses.

use serde_json::Value;

use crate::domain::{Indicator, IndicatorId, IndicatorLayer, LocalizedText, YearRange};
use crate::error::SotkaError;
use crate::layers::LayerMapping;

/// Parses the full indicator listing into preliminary records. Rows without
/// a usable id or title are skipped.
pub fn parse_indicator_list(
    json: &str,
    layers: &LayerMapping,
) -> Result<Vec<Indicator>, SotkaError> {
    let raw: Value = serde_json::from_str(json).map_err(|err| SotkaError::Parse(err.to_string()))?;
    let items = raw
        .as_array()
        .ok_or_else(|| SotkaError::Parse("indicator listing is not an array".to_string()))?;

    let mut indicators = Vec::with_capacity(items.len());
    for item in items {
        let Some(id) = item.get("id").and_then(indicator_id) else {
            tracing::warn!(row = %item, "skipping indicator listing row without id");
            continue;
        };
        let Some(name) = item.get("title").and_then(localized) else {
            tracing::warn!(%id, "skipping indicator listing row without title");
            continue;
        };
        let mut indicator = Indicator::new(id, name);
        indicator.organization = organization(item);
        indicator.description = item.get("description").and_then(localized);
        indicator.layers = region_layers(item, layers);
        indicators.push(indicator);
    }
    Ok(indicators)
}

/// Parses one indicator's metadata. `Ok(None)` means the response carried no
/// usable data for the indicator.
pub fn parse_indicator_metadata(
    json: &str,
    layers: &LayerMapping,
) -> Result<Option<Indicator>, SotkaError> {
    let raw: Value = serde_json::from_str(json).map_err(|err| SotkaError::Parse(err.to_string()))?;
    let object = match &raw {
        Value::Null => return Ok(None),
        Value::Object(map) if map.is_empty() => return Ok(None),
        Value::Object(_) => &raw,
        other => {
            return Err(SotkaError::Parse(format!(
                "indicator metadata is not an object: {other}"
            )));
        }
    };
    let Some(id) = object.get("id").and_then(indicator_id) else {
        return Ok(None);
    };

    let name = object
        .get("title")
        .and_then(localized)
        .unwrap_or_default();
    let mut indicator = Indicator::new(id, name);
    indicator.organization = organization(object);
    indicator.description = object.get("description").and_then(localized);
    indicator.layers = region_layers(object, layers);
    indicator.years = year_range(object)?;
    Ok(Some(indicator))
}

fn indicator_id(value: &Value) -> Option<IndicatorId> {
    match value {
        Value::Number(number) => number.as_u64().map(IndicatorId::new),
        Value::String(text) => text.parse().ok(),
        _ => None,
    }
}

/// Accepts either a language map or a plain string (stored as Finnish).
fn localized(value: &Value) -> Option<LocalizedText> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(LocalizedText::single("fi", text)),
        Value::Object(map) => {
            let mut text = LocalizedText::new();
            for (lang, value) in map {
                if let Some(value) = value.as_str().filter(|v| !v.trim().is_empty()) {
                    text.insert(lang, value);
                }
            }
            (!text.is_empty()).then_some(text)
        }
        _ => None,
    }
}

fn organization(item: &Value) -> Option<LocalizedText> {
    item.get("organization")
        .and_then(|org| org.get("title"))
        .and_then(localized)
}

fn region_layers(item: &Value, layers: &LayerMapping) -> Vec<IndicatorLayer> {
    item.get("classifications")
        .and_then(|v| v.get("region"))
        .and_then(|v| v.get("values"))
        .and_then(|v| v.as_array())
        .map(|values| {
            values
                .iter()
                .filter_map(|v| v.as_str())
                .map(|source_id| IndicatorLayer {
                    source_layer_id: source_id.to_string(),
                    local_layer: layers.resolve(source_id).map(str::to_string),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn year_range(item: &Value) -> Result<Option<YearRange>, SotkaError> {
    let Some(range) = item.get("range") else {
        return Ok(None);
    };
    let start = range.get("start").and_then(|v| v.as_i64());
    let end = range.get("end").and_then(|v| v.as_i64());
    match (start, end) {
        (Some(start), Some(end)) => {
            let start = i32::try_from(start)
                .map_err(|_| SotkaError::Parse(format!("year out of range: {start}")))?;
            let end = i32::try_from(end)
                .map_err(|_| SotkaError::Parse(format!("year out of range: {end}")))?;
            YearRange::new(start, end).map(Some)
        }
        (None, None) => Ok(None),
        _ => Err(SotkaError::Parse("incomplete year range".to_string())),
    }
}
