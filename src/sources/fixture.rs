use crate::error::{Error, Result};
use crate::filters::{FilterDefinition, FilterKind, FilterValue};
use crate::models::{FilterField, Listing, ListingLocation, ListingPage, Selection};
use crate::sources::traits::{ListingSource, ReferenceSource, TitleResolver};
use crate::sources::types::{CategoryGroup, CategoryTree, ListingQuery};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::BTreeMap;
use tracing::info;

fn sel(title: &str, slug: &str) -> Selection {
    Selection::new(title, slug)
}

/// Bundled reference data and a handful of ads, for offline use and tests
pub struct StaticSource {
    transaction_types: Vec<Selection>,
    property_types: Vec<Selection>,
    countries: Vec<Selection>,
    provinces: BTreeMap<String, Vec<Selection>>,
    cities: BTreeMap<String, Vec<Selection>>,
    areas: BTreeMap<String, Vec<Selection>>,
    categories: BTreeMap<String, CategoryTree>,
    definitions: BTreeMap<String, Vec<FilterDefinition>>,
    listings: Vec<Listing>,
}

impl StaticSource {
    pub fn new() -> Self {
        info!("📋 Using bundled reference data");

        let provinces = BTreeMap::from([(
            "iran".to_string(),
            vec![sel("Tehran", "tehran"), sel("Fars", "fars"), sel("Isfahan", "isfahan")],
        )]);
        let cities = BTreeMap::from([
            ("tehran".to_string(), vec![sel("Tehran", "tehran"), sel("Rey", "rey")]),
            ("fars".to_string(), vec![sel("Shiraz", "shiraz"), sel("Marvdasht", "marvdasht")]),
            ("isfahan".to_string(), vec![sel("Isfahan", "isfahan"), sel("Kashan", "kashan")]),
        ]);
        let areas = BTreeMap::from([
            (
                "tehran".to_string(),
                vec![sel("Velenjak", "velenjak"), sel("Niavaran", "niavaran"), sel("Tajrish", "tajrish")],
            ),
            ("shiraz".to_string(), vec![sel("Eram", "eram"), sel("Zand", "zand")]),
        ]);

        let group = |items: Vec<Selection>| CategoryGroup { subgroup: items };
        let categories = BTreeMap::from([
            (
                "housing".to_string(),
                CategoryTree::from([
                    (
                        "sale".to_string(),
                        group(vec![sel("Apartment", "apartment"), sel("Villa", "villa"), sel("Old House", "old-house")]),
                    ),
                    ("rent".to_string(), group(vec![sel("Apartment", "apartment"), sel("Suite", "suite")])),
                ]),
            ),
            (
                "commercial".to_string(),
                CategoryTree::from([
                    ("sale".to_string(), group(vec![sel("Office", "office"), sel("Shop", "shop")])),
                    (
                        "rent".to_string(),
                        group(vec![sel("Office", "office"), sel("Shop", "shop"), sel("Warehouse", "warehouse")]),
                    ),
                ]),
            ),
            (
                "land".to_string(),
                CategoryTree::from([
                    ("sale".to_string(), group(vec![sel("Agricultural", "agricultural"), sel("Residential Land", "residential-land")])),
                    ("rent".to_string(), group(vec![])),
                ]),
            ),
        ]);

        let def = |slug: &str, title: &str, kind: FilterKind| FilterDefinition {
            slug: slug.to_string(),
            title: title.to_string(),
            kind,
            options: vec![],
        };
        let mut rooms = def("rooms", "Rooms", FilterKind::MultiSelect);
        rooms.options = (1..=5).map(|n| sel(&n.to_string(), &n.to_string())).collect();
        let definitions = BTreeMap::from([
            (
                "housing".to_string(),
                vec![
                    rooms,
                    def("price", "Price", FilterKind::Range),
                    def("size", "Floor area", FilterKind::Range),
                    def("elevator", "Elevator", FilterKind::Select),
                ],
            ),
            (
                "commercial".to_string(),
                vec![def("price", "Price", FilterKind::Range), def("size", "Floor area", FilterKind::Range)],
            ),
            ("land".to_string(), vec![def("price", "Price", FilterKind::Range)]),
        ]);

        Self {
            transaction_types: vec![sel("Sale", "sale"), sel("Rent", "rent")],
            property_types: vec![sel("Housing", "housing"), sel("Commercial", "commercial"), sel("Land", "land")],
            countries: vec![sel("Iran", "iran")],
            provinces,
            cities,
            areas,
            categories,
            definitions,
            listings: sample_listings(),
        }
    }

    fn titles_for(&self, field: FilterField) -> Vec<&Selection> {
        match field {
            FilterField::TransactionType => self.transaction_types.iter().collect(),
            FilterField::PropertyType => self.property_types.iter().collect(),
            FilterField::Country => self.countries.iter().collect(),
            FilterField::Province => self.provinces.values().flatten().collect(),
            FilterField::City => self.cities.values().flatten().collect(),
            FilterField::Area => self.areas.values().flatten().collect(),
            FilterField::Category => self
                .categories
                .values()
                .flat_map(|tree| tree.values())
                .flat_map(|group| group.subgroup.iter())
                .collect(),
        }
    }
}

impl Default for StaticSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReferenceSource for StaticSource {
    async fn provinces(&self, country: &str) -> Result<Vec<Selection>> {
        Ok(self.provinces.get(country).cloned().unwrap_or_default())
    }

    async fn cities(&self, province: &str) -> Result<Vec<Selection>> {
        Ok(self.cities.get(province).cloned().unwrap_or_default())
    }

    async fn areas(&self, city: &str) -> Result<Vec<Selection>> {
        Ok(self.areas.get(city).cloned().unwrap_or_default())
    }

    async fn categories(&self, property_type: &str) -> Result<CategoryTree> {
        Ok(self.categories.get(property_type).cloned().unwrap_or_default())
    }

    async fn filter_definitions(&self, property_type: &str) -> Result<Vec<FilterDefinition>> {
        Ok(self.definitions.get(property_type).cloned().unwrap_or_default())
    }

    fn source_name(&self) -> &'static str {
        "static"
    }
}

#[async_trait]
impl TitleResolver for StaticSource {
    async fn resolve_title(&self, field: FilterField, slug: &str) -> Result<String> {
        self.titles_for(field)
            .into_iter()
            .find(|s| s.slug == slug)
            .map(|s| s.title.clone())
            .ok_or_else(|| Error::NotFound {
                field: field.to_string(),
                slug: slug.to_string(),
            })
    }
}

fn matches_filter(listing: &Listing, slug: &str, value: &FilterValue) -> bool {
    let number = match slug {
        "price" => Some(listing.price as f64),
        "size" => listing.area_sqm,
        "rooms" => listing.rooms.map(f64::from),
        _ => None,
    };
    match (value, number) {
        (FilterValue::Range { min, max }, Some(n)) => {
            min.map_or(true, |m| n >= m) && max.map_or(true, |m| n <= m)
        }
        (FilterValue::Multi(values), Some(n)) => values.iter().any(|v| v.parse::<f64>().ok() == Some(n)),
        (FilterValue::Scalar(v), Some(n)) => v.parse::<f64>().ok() == Some(n),
        // attributes the bundled ads do not carry never exclude
        (_, None) => true,
    }
}

fn location_matches(location: &Option<Selection>, slug: &str) -> bool {
    slug.is_empty() || location.as_ref().is_some_and(|l| l.slug == slug)
}

#[async_trait]
impl ListingSource for StaticSource {
    async fn search_listings(&self, query: &ListingQuery) -> Result<ListingPage> {
        let state = &query.state;
        let tx = state.transaction_type.slug_or(crate::routing::DEFAULT_TRANSACTION_TYPE);
        let pt = state.property_type.slug_or(crate::routing::DEFAULT_PROPERTY_TYPE);

        let matching: Vec<&Listing> = self
            .listings
            .iter()
            .filter(|l| l.transaction_type == tx && l.property_type == pt)
            .filter(|l| state.category.is_empty() || l.category == state.category.slug)
            .filter(|l| location_matches(&l.location.country, &state.country.slug))
            .filter(|l| location_matches(&l.location.province, &state.province.slug))
            .filter(|l| location_matches(&l.location.city, &state.city.slug))
            .filter(|l| location_matches(&l.location.area, &state.area.slug))
            .filter(|l| query.filters.iter().all(|(slug, value)| matches_filter(l, slug, value)))
            .collect();

        let page_size = query.page_size.max(1) as usize;
        let start = (query.page.max(1) as usize - 1) * page_size;
        Ok(ListingPage {
            total: matching.len() as u64,
            items: matching.into_iter().skip(start).take(page_size).cloned().collect(),
        })
    }
}

fn sample_listings() -> Vec<Listing> {
    let tehran = ListingLocation {
        country: Some(sel("Iran", "iran")),
        province: Some(sel("Tehran", "tehran")),
        city: Some(sel("Tehran", "tehran")),
        area: None,
        latitude: Some(35.6892),
        longitude: Some(51.3890),
    };
    let shiraz = ListingLocation {
        country: Some(sel("Iran", "iran")),
        province: Some(sel("Fars", "fars")),
        city: Some(sel("Shiraz", "shiraz")),
        area: None,
        latitude: Some(29.5918),
        longitude: Some(52.5837),
    };
    let in_area = |base: &ListingLocation, area: Selection| ListingLocation {
        area: Some(area),
        ..base.clone()
    };
    let published = |day: u32| Utc.with_ymd_and_hms(2024, 5, day, 9, 0, 0).single().unwrap_or_default();

    let listing = |id: &str, title: &str, tx: &str, category: &str, price: i64, sqm: f64, rooms: f32, location: ListingLocation, day: u32| Listing {
        id: id.to_string(),
        title: title.to_string(),
        slug: id.replace('_', "-"),
        transaction_type: tx.to_string(),
        property_type: "housing".to_string(),
        category: category.to_string(),
        price,
        area_sqm: Some(sqm),
        rooms: Some(rooms),
        location,
        images: vec![],
        published_at: published(day),
    };

    vec![
        listing("ad_velenjak_1", "Bright apartment in Velenjak", "sale", "apartment", 48_000_000_000, 120.0, 2.0, in_area(&tehran, sel("Velenjak", "velenjak")), 2),
        listing("ad_velenjak_2", "Family apartment near the park", "sale", "apartment", 71_500_000_000, 165.0, 3.0, in_area(&tehran, sel("Velenjak", "velenjak")), 4),
        listing("ad_niavaran_1", "Villa with garden in Niavaran", "sale", "villa", 240_000_000_000, 410.0, 5.0, in_area(&tehran, sel("Niavaran", "niavaran")), 7),
        listing("ad_tajrish_1", "Furnished suite in Tajrish", "rent", "suite", 350_000_000, 55.0, 1.0, in_area(&tehran, sel("Tajrish", "tajrish")), 9),
        listing("ad_eram_1", "Apartment by Eram garden", "rent", "apartment", 180_000_000, 95.0, 2.0, in_area(&shiraz, sel("Eram", "eram")), 11),
        listing("ad_shiraz_1", "Old house in central Shiraz", "sale", "old-house", 16_900_000_000, 210.0, 4.0, shiraz.clone(), 13),
    ]
}
