//! Dynamic attribute filters (room count, floor area, ...) carried in the
//! query string.
//!
//! Values are comma-joined on write and re-split on read. Individual elements
//! are percent-encoded, a literal `,` inside an element included, so the join
//! separator stays unambiguous.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

const ELEMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b',')
    .add(b'=')
    .add(b'?')
    .add(b'<')
    .add(b'>');

/// Value of one dynamic filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Scalar(String),
    Multi(Vec<String>),
    Range { min: Option<f64>, max: Option<f64> },
}

impl FilterValue {
    pub fn scalar(value: impl Into<String>) -> Self {
        FilterValue::Scalar(value.into())
    }

    pub fn multi<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FilterValue::Multi(values.into_iter().map(Into::into).collect())
    }

    pub fn range(min: Option<f64>, max: Option<f64>) -> Self {
        FilterValue::Range { min, max }
    }

    /// A value that would serialize to nothing
    pub fn is_empty(&self) -> bool {
        match self {
            FilterValue::Scalar(value) => value.is_empty(),
            FilterValue::Multi(values) => values.iter().all(|v| v.is_empty()),
            FilterValue::Range { min, max } => min.is_none() && max.is_none(),
        }
    }

    /// Encoded query value, e.g. `2,3` or `100,` for an open range
    pub fn encode(&self) -> String {
        match self {
            FilterValue::Scalar(value) => encode_element(value),
            FilterValue::Multi(values) => values
                .iter()
                .filter(|v| !v.is_empty())
                .map(|v| encode_element(v))
                .collect::<Vec<_>>()
                .join(","),
            FilterValue::Range { min, max } => format!(
                "{},{}",
                min.map(|v| v.to_string()).unwrap_or_default(),
                max.map(|v| v.to_string()).unwrap_or_default()
            ),
        }
    }

    /// Decode a raw (still percent-encoded) query value.
    ///
    /// With a known kind the value is shaped accordingly; without one a value
    /// holding a `,` becomes `Multi`, anything else `Scalar`.
    pub fn decode(raw: &str, kind: Option<FilterKind>) -> Option<FilterValue> {
        let elements: Vec<String> = raw.split(',').map(decode_element).collect();
        let value = match kind {
            Some(FilterKind::Range) => {
                let min = elements.first().and_then(|v| parse_number(v));
                let max = elements.get(1).and_then(|v| parse_number(v));
                FilterValue::Range { min, max }
            }
            Some(FilterKind::MultiSelect) => FilterValue::Multi(
                elements.into_iter().filter(|v| !v.is_empty()).collect(),
            ),
            Some(FilterKind::Select) => FilterValue::Scalar(elements.join(",")),
            None if elements.len() > 1 => FilterValue::Multi(
                elements.into_iter().filter(|v| !v.is_empty()).collect(),
            ),
            None => FilterValue::Scalar(elements.into_iter().next().unwrap_or_default()),
        };

        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

fn encode_element(value: &str) -> String {
    utf8_percent_encode(value, ELEMENT).to_string()
}

fn decode_element(value: &str) -> String {
    let spaced = value.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().trim().to_string()
}

fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// How a dynamic filter is edited and encoded
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    Select,
    MultiSelect,
    Range,
}

/// Dynamic filter offered for a property type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterDefinition {
    pub slug: String,
    pub title: String,
    pub kind: FilterKind,
    #[serde(default)]
    pub options: Vec<crate::models::Selection>,
}

/// Attribute filters keyed by slug, kept sorted so the query is canonical
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectedFilters {
    values: BTreeMap<String, FilterValue>,
}

impl SelectedFilters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a query string (with or without a leading `?`).
    pub fn from_query(query: &str, definitions: Option<&[FilterDefinition]>) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut filters = Self::new();

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode_element(raw_key);
            if key.is_empty() {
                continue;
            }
            let kind = definitions
                .and_then(|defs| defs.iter().find(|d| d.slug == key))
                .map(|d| d.kind);
            match FilterValue::decode(raw_value, kind) {
                Some(value) => {
                    filters.values.insert(key, value);
                }
                None => debug!("Ignoring empty query parameter {}", key),
            }
        }

        filters
    }

    /// Encoded query without the leading `?`; empty when nothing is selected
    pub fn to_query(&self) -> String {
        self.values
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, value)| format!("{}={}", encode_element(key), value.encode()))
            .collect::<Vec<_>>()
            .join("&")
    }

    pub fn get(&self, slug: &str) -> Option<&FilterValue> {
        self.values.get(slug)
    }

    /// Set a filter; an empty value removes it. Returns whether anything changed.
    pub fn set(&mut self, slug: impl Into<String>, value: FilterValue) -> bool {
        let slug = slug.into();
        if value.is_empty() {
            return self.values.remove(&slug).is_some();
        }
        if self.values.get(&slug) == Some(&value) {
            return false;
        }
        self.values.insert(slug, value);
        true
    }

    pub fn remove(&mut self, slug: &str) -> bool {
        self.values.remove(slug).is_some()
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.values.is_empty();
        self.values.clear();
        changed
    }

    /// Drop filters not defined for the current property type
    pub fn retain_defined(&mut self, definitions: &[FilterDefinition]) -> Vec<String> {
        let dropped: Vec<String> = self
            .values
            .keys()
            .filter(|key| !definitions.iter().any(|d| &d.slug == *key))
            .cloned()
            .collect();
        for key in &dropped {
            self.values.remove(key);
        }
        dropped
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FilterValue)> {
        self.values.iter()
    }
}

impl<K: Into<String>> FromIterator<(K, FilterValue)> for SelectedFilters {
    fn from_iter<T: IntoIterator<Item = (K, FilterValue)>>(iter: T) -> Self {
        let mut filters = Self::new();
        for (key, value) in iter {
            filters.set(key, value);
        }
        filters
    }
}
