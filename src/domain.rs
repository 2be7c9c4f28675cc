use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SotkaError;

/// Languages tried, in order, when the requested one is missing.
const FALLBACK_LANGUAGES: [&str; 3] = ["fi", "en", "sv"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndicatorId(u64);

impl IndicatorId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for IndicatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for IndicatorId {
    type Err = SotkaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value
            .trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| SotkaError::InvalidIndicatorId(value.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedText(BTreeMap<String, String>);

impl LocalizedText {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(lang: &str, text: &str) -> Self {
        let mut value = Self::new();
        value.insert(lang, text);
        value
    }

    pub fn insert(&mut self, lang: &str, text: &str) {
        self.0.insert(lang.to_string(), text.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Text in `lang`, falling back to the platform languages and then to
    /// whatever translation exists.
    pub fn get(&self, lang: &str) -> Option<&str> {
        self.0
            .get(lang)
            .or_else(|| FALLBACK_LANGUAGES.iter().find_map(|l| self.0.get(*l)))
            .or_else(|| self.0.values().next())
            .map(String::as_str)
    }
}

impl fmt::Display for LocalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get("fi").unwrap_or(""))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawYearRange")]
pub struct YearRange {
    min: i32,
    max: i32,
}

#[derive(Deserialize)]
struct RawYearRange {
    min: i32,
    max: i32,
}

impl TryFrom<RawYearRange> for YearRange {
    type Error = SotkaError;

    fn try_from(raw: RawYearRange) -> Result<Self, Self::Error> {
        YearRange::new(raw.min, raw.max)
    }
}

impl YearRange {
    pub fn new(min: i32, max: i32) -> Result<Self, SotkaError> {
        if min > max {
            return Err(SotkaError::InvalidYearRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> i32 {
        self.min
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.min..=self.max).contains(&year)
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorLayer {
    pub source_layer_id: String,
    pub local_layer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indicator {
    pub id: IndicatorId,
    pub name: LocalizedText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<LocalizedText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<LocalizedText>,
    #[serde(default)]
    pub layers: Vec<IndicatorLayer>,
    #[serde(default)]
    pub years: Option<YearRange>,
}

impl Indicator {
    pub fn new(id: IndicatorId, name: LocalizedText) -> Self {
        Self {
            id,
            name,
            organization: None,
            description: None,
            layers: Vec::new(),
            years: None,
        }
    }

    /// Overlays the fields present in `info`. Absent fields keep the current
    /// value and the id never changes.
    pub fn merge(&mut self, info: Indicator) {
        if !info.name.is_empty() {
            self.name = info.name;
        }
        if let Some(organization) = info.organization {
            self.organization = Some(organization);
        }
        if let Some(description) = info.description {
            self.description = Some(description);
        }
        if !info.layers.is_empty() {
            self.layers = info.layers;
        }
        if let Some(years) = info.years {
            self.years = Some(years);
        }
    }

    pub fn has_years(&self) -> bool {
        self.years.is_some()
    }

    pub fn display_name(&self) -> &str {
        self.name.get("fi").unwrap_or("")
    }
}
