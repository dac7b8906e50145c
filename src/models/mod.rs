use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A picked value for one filter field: display title plus URL slug
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Selection {
    #[serde(alias = "name", default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
}

impl Selection {
    pub fn new(title: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            slug: slug.into(),
        }
    }

    /// Selection known only by slug, title still to be resolved
    pub fn from_slug(slug: impl Into<String>) -> Self {
        Self {
            title: String::new(),
            slug: slug.into(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.slug.is_empty()
    }

    pub fn slug_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        if self.slug.is_empty() {
            fallback
        } else {
            &self.slug
        }
    }
}

/// Field of [`FilterState`]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    TransactionType,
    PropertyType,
    Category,
    Country,
    Province,
    City,
    Area,
}

impl FilterField {
    pub const ALL: [FilterField; 7] = [
        FilterField::TransactionType,
        FilterField::PropertyType,
        FilterField::Category,
        FilterField::Country,
        FilterField::Province,
        FilterField::City,
        FilterField::Area,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterField::TransactionType => "transaction_type",
            FilterField::PropertyType => "property_type",
            FilterField::Category => "category",
            FilterField::Country => "country",
            FilterField::Province => "province",
            FilterField::City => "city",
            FilterField::Area => "area",
        }
    }

    /// Fields cleared unconditionally when this one changes
    pub fn descendants(&self) -> &'static [FilterField] {
        match self {
            FilterField::Country => &[FilterField::Province, FilterField::City, FilterField::Area],
            FilterField::Province => &[FilterField::City, FilterField::Area],
            FilterField::City => &[FilterField::Area],
            _ => &[],
        }
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FilterField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|field| field.as_str() == normalized)
            .ok_or_else(|| format!("unknown filter field: {}", s))
    }
}

/// Structured search context: deal kind, property kind and location chain
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterState {
    pub transaction_type: Selection,
    pub property_type: Selection,
    pub category: Selection,
    pub country: Selection,
    pub province: Selection,
    pub city: Selection,
    pub area: Selection,
}

impl FilterState {
    pub fn get(&self, field: FilterField) -> &Selection {
        match field {
            FilterField::TransactionType => &self.transaction_type,
            FilterField::PropertyType => &self.property_type,
            FilterField::Category => &self.category,
            FilterField::Country => &self.country,
            FilterField::Province => &self.province,
            FilterField::City => &self.city,
            FilterField::Area => &self.area,
        }
    }

    pub fn get_mut(&mut self, field: FilterField) -> &mut Selection {
        match field {
            FilterField::TransactionType => &mut self.transaction_type,
            FilterField::PropertyType => &mut self.property_type,
            FilterField::Category => &mut self.category,
            FilterField::Country => &mut self.country,
            FilterField::Province => &mut self.province,
            FilterField::City => &mut self.city,
            FilterField::Area => &mut self.area,
        }
    }

    pub fn slug(&self, field: FilterField) -> &str {
        &self.get(field).slug
    }

    /// Most specific non-empty of city, province, country
    pub fn authoritative_location(&self) -> Option<(FilterField, &Selection)> {
        [FilterField::City, FilterField::Province, FilterField::Country]
            .into_iter()
            .map(|field| (field, self.get(field)))
            .find(|(_, selection)| !selection.is_empty())
    }

    /// Slugs of every field, in [`FilterField::ALL`] order
    pub fn slugs(&self) -> [&str; 7] {
        FilterField::ALL.map(|field| self.slug(field))
    }
}

/// Location of a listing as returned by the ads endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ListingLocation {
    #[serde(default)]
    pub country: Option<Selection>,
    #[serde(default)]
    pub province: Option<Selection>,
    #[serde(default)]
    pub city: Option<Selection>,
    #[serde(default)]
    pub area: Option<Selection>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Property ad as shown on the browse page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub slug: String,
    pub transaction_type: String,
    pub property_type: String,
    #[serde(default)]
    pub category: String,
    pub price: i64,
    #[serde(default)]
    pub area_sqm: Option<f64>,
    #[serde(default)]
    pub rooms: Option<f32>,
    #[serde(default)]
    pub location: ListingLocation,
    #[serde(default)]
    pub images: Vec<String>,
    pub published_at: DateTime<Utc>,
}

/// One page of search results
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ListingPage {
    #[serde(default)]
    pub items: Vec<Listing>,
    #[serde(default)]
    pub total: u64,
}
