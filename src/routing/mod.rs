//! Canonical browse URLs.
//!
//! ```text
//! /{tx}-{property_type}[-{category}]/{location}[/{area}][?{filters}]
//! ```
//!
//! `location` is the city slug, `{slug}-province`, `{slug}-country`, or
//! `iran-country` when nothing is picked.

use crate::error::{Error, Result};
use crate::filters::SelectedFilters;
use crate::models::{FilterField, FilterState};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TRANSACTION_TYPE: &str = "sale";
pub const DEFAULT_PROPERTY_TYPE: &str = "housing";
pub const DEFAULT_LOCATION: &str = "iran-country";

/// Characters escaped inside a path segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'?')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Transaction and property type are split on `-`, so they escape it too
const HEAD_TOKEN: &AsciiSet = &SEGMENT.add(b'-');

const COUNTRY_SUFFIX: &str = "-country";
const PROVINCE_SUFFIX: &str = "-province";

/// Location segment classified by suffix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "level", content = "slug", rename_all = "snake_case")]
pub enum LocationToken {
    Country(String),
    Province(String),
    City(String),
}

impl LocationToken {
    pub fn parse(segment: &str) -> Option<Self> {
        let token = if let Some(slug) = segment.strip_suffix(COUNTRY_SUFFIX) {
            LocationToken::Country(slug.to_string())
        } else if let Some(slug) = segment.strip_suffix(PROVINCE_SUFFIX) {
            LocationToken::Province(slug.to_string())
        } else {
            LocationToken::City(segment.to_string())
        };
        if token.slug().is_empty() {
            None
        } else {
            Some(token)
        }
    }

    pub fn field(&self) -> FilterField {
        match self {
            LocationToken::Country(_) => FilterField::Country,
            LocationToken::Province(_) => FilterField::Province,
            LocationToken::City(_) => FilterField::City,
        }
    }

    pub fn slug(&self) -> &str {
        match self {
            LocationToken::Country(slug) | LocationToken::Province(slug) | LocationToken::City(slug) => slug,
        }
    }

    /// Encoded path segment
    pub fn segment(&self) -> String {
        let slug = encode(self.slug(), SEGMENT);
        match self {
            LocationToken::Country(_) => format!("{}{}", slug, COUNTRY_SUFFIX),
            LocationToken::Province(_) => format!("{}{}", slug, PROVINCE_SUFFIX),
            LocationToken::City(_) => slug,
        }
    }
}

/// Slugs recovered from a browse path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedRoute {
    pub transaction_type: String,
    pub property_type: String,
    pub category: String,
    pub location: Option<LocationToken>,
    pub area: String,
}

impl Default for ParsedRoute {
    fn default() -> Self {
        Self {
            transaction_type: DEFAULT_TRANSACTION_TYPE.to_string(),
            property_type: DEFAULT_PROPERTY_TYPE.to_string(),
            category: String::new(),
            location: None,
            area: String::new(),
        }
    }
}

impl ParsedRoute {
    /// Slug the URL carries for a field; empty when the URL says nothing
    pub fn slug(&self, field: FilterField) -> &str {
        match field {
            FilterField::TransactionType => &self.transaction_type,
            FilterField::PropertyType => &self.property_type,
            FilterField::Category => &self.category,
            FilterField::Area => &self.area,
            location => match &self.location {
                Some(token) if token.field() == location => token.slug(),
                _ => "",
            },
        }
    }
}

/// Path part of the canonical URL
pub fn build_path(state: &FilterState) -> String {
    let mut head = format!(
        "{}-{}",
        encode(state.transaction_type.slug_or(DEFAULT_TRANSACTION_TYPE), HEAD_TOKEN),
        encode(state.property_type.slug_or(DEFAULT_PROPERTY_TYPE), HEAD_TOKEN)
    );
    if !state.category.is_empty() {
        head.push('-');
        head.push_str(&encode(&state.category.slug, SEGMENT));
    }

    let location = match state.authoritative_location() {
        Some((FilterField::City, city)) => LocationToken::City(city.slug.clone()).segment(),
        Some((FilterField::Province, province)) => LocationToken::Province(province.slug.clone()).segment(),
        Some((_, country)) => LocationToken::Country(country.slug.clone()).segment(),
        None => DEFAULT_LOCATION.to_string(),
    };

    let mut path = format!("/{}/{}", head, location);
    if !state.area.is_empty() {
        path.push('/');
        path.push_str(&encode(&state.area.slug, SEGMENT));
    }
    path
}

/// Canonical URL: path plus the serialized filters
pub fn build_url(state: &FilterState, filters: &SelectedFilters) -> String {
    let path = build_path(state);
    let query = filters.to_query();
    if query.is_empty() {
        path
    } else {
        format!("{}?{}", path, query)
    }
}

/// Split a browse path back into slugs. A query suffix, if present, is ignored.
pub fn parse_path(path: &str) -> Result<ParsedRoute> {
    let path = path.split(|c: char| c == '?' || c == '#').next().unwrap_or_default();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if segments.len() > 3 {
        return Err(Error::InvalidRoute(format!(
            "expected at most 3 path segments, got {}: {}",
            segments.len(),
            path
        )));
    }

    let mut route = ParsedRoute::default();
    let Some(head) = segments.first() else {
        return Ok(route);
    };

    // split before decoding so escaped dashes stay inside their token
    let mut tokens = head.split('-');
    match tokens.next() {
        Some(tx) if !tx.is_empty() => route.transaction_type = decode(tx),
        _ => return Err(Error::InvalidRoute(format!("missing transaction type: {}", path))),
    }
    if let Some(pt) = tokens.next().filter(|pt| !pt.is_empty()) {
        route.property_type = decode(pt);
    }
    route.category = decode(&tokens.collect::<Vec<_>>().join("-"));

    route.location = segments.get(1).and_then(|s| LocationToken::parse(&decode(s)));
    if let Some(area) = segments.get(2) {
        route.area = decode(area);
    }

    Ok(route)
}

fn encode(slug: &str, set: &'static AsciiSet) -> String {
    utf8_percent_encode(slug, set).to_string()
}

fn decode(segment: &str) -> String {
    percent_decode_str(segment).decode_utf8_lossy().into_owned()
}

/// Path and query of a URL that may also carry scheme and host
pub fn split_url(url: &str) -> (String, String) {
    let target = match url::Url::parse(url) {
        Ok(parsed) => {
            let query = parsed.query().unwrap_or_default().to_string();
            return (parsed.path().to_string(), query);
        }
        Err(_) => url,
    };
    let target = target.split('#').next().unwrap_or_default();
    match target.split_once('?') {
        Some((path, query)) => (path.to_string(), query.to_string()),
        None => (target.to_string(), String::new()),
    }
}
