use crate::filters::FilterDefinition;
use crate::models::{FilterField, Selection};
use crate::sources::types::CategoryTree;
use serde::Serialize;
use std::fmt;

/// Option list that depends on an upstream field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Categories,
    Provinces,
    Cities,
    Areas,
    FilterDefinitions,
}

impl Target {
    pub const ALL: [Target; 5] = [
        Target::Categories,
        Target::FilterDefinitions,
        Target::Provinces,
        Target::Cities,
        Target::Areas,
    ];

    /// Field whose slug keys the fetch
    pub fn parent(&self) -> FilterField {
        match self {
            Target::Categories | Target::FilterDefinitions => FilterField::PropertyType,
            Target::Provinces => FilterField::Country,
            Target::Cities => FilterField::Province,
            Target::Areas => FilterField::City,
        }
    }

    /// Option list backing a field's dropdown
    pub fn for_field(field: FilterField) -> Option<Target> {
        match field {
            FilterField::Category => Some(Target::Categories),
            FilterField::Province => Some(Target::Provinces),
            FilterField::City => Some(Target::Cities),
            FilterField::Area => Some(Target::Areas),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Categories => "categories",
            Target::Provinces => "provinces",
            Target::Cities => "cities",
            Target::Areas => "areas",
            Target::FilterDefinitions => "filter_definitions",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An issued options request. Only the latest ticket per target is honoured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub target: Target,
    pub param: String,
    token: u64,
}

impl FetchTicket {
    pub fn token(&self) -> u64 {
        self.token
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchPayload {
    Locations(Vec<Selection>),
    Categories(CategoryTree),
    Definitions(Vec<FilterDefinition>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// No parent slug, nothing to fetch
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

/// What a dropdown shows for one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum FieldStatus {
    Empty,
    Loading,
    Loaded,
    Selected,
    Failed(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Slot<T> {
    pub(crate) param: String,
    pub(crate) phase: Phase,
    pub(crate) data: T,
    issued: u64,
}

impl<T: Default> Slot<T> {
    pub(crate) fn new() -> Self {
        Self {
            param: String::new(),
            phase: Phase::Idle,
            data: T::default(),
            issued: 0,
        }
    }

    /// Whether the slot is out of date for the given parent slug
    pub(crate) fn is_stale_for(&self, param: &str) -> bool {
        self.param != param || (!param.is_empty() && self.phase == Phase::Idle)
    }

    /// Start a new request generation; any older ticket becomes stale.
    pub(crate) fn begin(&mut self, target: Target, param: &str) -> Option<FetchTicket> {
        self.issued += 1;
        self.param = param.to_string();
        self.data = T::default();
        if param.is_empty() {
            self.phase = Phase::Idle;
            return None;
        }
        self.phase = Phase::Loading;
        Some(FetchTicket {
            target,
            param: self.param.clone(),
            token: self.issued,
        })
    }

    pub(crate) fn is_current(&self, ticket: &FetchTicket) -> bool {
        ticket.token == self.issued
    }

    pub(crate) fn complete(&mut self, data: T) {
        self.data = data;
        self.phase = Phase::Loaded;
    }

    pub(crate) fn fail(&mut self, error: String) {
        self.data = T::default();
        self.phase = Phase::Failed(error);
    }

    pub(crate) fn is_loaded_for(&self, param: &str) -> bool {
        self.phase == Phase::Loaded && self.param == param
    }
}
