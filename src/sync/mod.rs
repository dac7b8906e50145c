//! Keeps [`FilterState`], the browser URL and the dependent option lists
//! consistent.
//!
//! Edits go through [`Synchronizer::set_field`], which cascades resets in the
//! reducer, returns tickets for the option lists that must reload and pushes
//! the canonical URL. URL changes made elsewhere (first load, back/forward)
//! come back in through [`Synchronizer::reconcile_from_url`].
//!
//! Option requests carry a per-list token. A response is applied only if its
//! token is the latest one issued for that list, so the last request issued
//! wins regardless of resolution order.

mod options;

pub use options::{FetchPayload, FetchTicket, FieldStatus, Phase, Target};

use crate::error::Result;
use crate::filters::{FilterDefinition, FilterValue, SelectedFilters};
use crate::models::{FilterField, FilterState, Selection};
use crate::navigation::{Navigator, PushOptions};
use crate::routing::{self, LocationToken, DEFAULT_TRANSACTION_TYPE};
use crate::sources::types::CategoryTree;
use crate::sources::{ReferenceSource, TitleResolver};
use crate::store::{Action, Store};
use options::Slot;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Location fields above area, least specific first
const LOCATION_CHAIN: [FilterField; 3] = [FilterField::Country, FilterField::Province, FilterField::City];

/// When edits reach the URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Every edit pushes the canonical URL
    #[default]
    Immediate,
    /// Edits stay in memory until [`Synchronizer::apply`]
    Deferred,
}

pub struct Synchronizer<S, N> {
    store: Arc<Store>,
    source: S,
    navigator: N,
    mode: SyncMode,
    filters: SelectedFilters,
    /// State and filters as of the last URL sync, restored by `discard`
    synced: (Arc<FilterState>, SelectedFilters),
    categories: Slot<CategoryTree>,
    provinces: Slot<Vec<Selection>>,
    cities: Slot<Vec<Selection>>,
    areas: Slot<Vec<Selection>>,
    definitions: Slot<Vec<FilterDefinition>>,
    /// Drop filters the next property type does not define once its definitions land
    prune_filters: bool,
    /// Query read from the URL before definitions were known, re-read once they load
    pending_query: Option<String>,
}

impl<S, N> Synchronizer<S, N>
where
    S: ReferenceSource + TitleResolver,
    N: Navigator,
{
    pub fn new(store: Arc<Store>, source: S, navigator: N) -> Self {
        let synced = (store.get_state(), SelectedFilters::new());
        Self {
            store,
            source,
            navigator,
            mode: SyncMode::Immediate,
            filters: SelectedFilters::new(),
            synced,
            categories: Slot::new(),
            provinces: Slot::new(),
            cities: Slot::new(),
            areas: Slot::new(),
            definitions: Slot::new(),
            prune_filters: false,
            pending_query: None,
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn state(&self) -> Arc<FilterState> {
        self.store.get_state()
    }

    pub fn selected_filters(&self) -> &SelectedFilters {
        &self.filters
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    pub fn navigator_mut(&mut self) -> &mut N {
        &mut self.navigator
    }

    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    /// Switch modes. Leaving deferred mode applies pending edits.
    pub fn set_mode(&mut self, mode: SyncMode) {
        let pending = self.mode == SyncMode::Deferred && mode == SyncMode::Immediate;
        self.mode = mode;
        if pending {
            self.push_current();
        }
    }

    /// Canonical URL for the current state and filters
    pub fn canonical_url(&self) -> String {
        routing::build_url(&self.store.get_state(), &self.filters)
    }

    /// Pick a value for a field.
    ///
    /// Location descendants are cleared synchronously. A slug the loaded
    /// option list does not offer is treated as empty. Returns the tickets
    /// for option lists that must now load.
    pub fn set_field(&mut self, field: FilterField, value: Selection) -> Vec<FetchTicket> {
        let value = self.normalize(field, value);
        let slug = value.slug.clone();
        if !self.store.dispatch(Action::SetField { field, value }) {
            return Vec::new();
        }
        info!("{} set to {:?}", field, slug);

        if field == FilterField::PropertyType {
            self.prune_filters = true;
        }
        let tickets = self.sync_dependents();
        self.sync_url();
        tickets
    }

    /// [`set_field`](Self::set_field) followed by loading the affected option lists
    pub async fn select(&mut self, field: FilterField, value: Selection) {
        let tickets = self.set_field(field, value);
        self.load(tickets).await;
    }

    /// Set an attribute filter; an empty value removes it
    pub fn set_filter(&mut self, slug: &str, value: FilterValue) -> bool {
        self.pending_query = None;
        let changed = self.filters.set(slug, value);
        if changed {
            self.sync_url();
        }
        changed
    }

    pub fn remove_filter(&mut self, slug: &str) -> bool {
        self.pending_query = None;
        let changed = self.filters.remove(slug);
        if changed {
            self.sync_url();
        }
        changed
    }

    pub fn clear_filters(&mut self) -> bool {
        self.pending_query = None;
        let changed = self.filters.clear();
        if changed {
            self.sync_url();
        }
        changed
    }

    /// Back to the empty state with no filters
    pub fn reset(&mut self) -> Vec<FetchTicket> {
        self.store.dispatch(Action::Reset);
        self.filters.clear();
        self.prune_filters = false;
        self.pending_query = None;
        let tickets = self.sync_dependents();
        self.sync_url();
        tickets
    }

    /// Push the canonical URL regardless of mode. Returns it.
    pub fn apply(&mut self) -> String {
        self.push_current()
    }

    /// Drop edits made since the last URL sync
    pub fn discard(&mut self) -> Vec<FetchTicket> {
        let (state, filters) = self.synced.clone();
        self.store.dispatch(Action::Replace((*state).clone()));
        self.filters = filters;
        self.pending_query = None;
        debug!("Discarded pending filter edits");
        self.sync_dependents()
    }

    /// Re-issue a failed options request
    pub fn retry(&mut self, target: Target) -> Option<FetchTicket> {
        if matches!(self.phase(target), Phase::Failed(_)) {
            info!("Retrying {}", target);
            self.begin(target)
        } else {
            None
        }
    }

    /// Run the fetch a ticket describes. Does not touch synchronizer state.
    pub async fn fetch(&self, ticket: &FetchTicket) -> Result<FetchPayload> {
        let param = ticket.param.as_str();
        Ok(match ticket.target {
            Target::Categories => FetchPayload::Categories(self.source.categories(param).await?),
            Target::Provinces => FetchPayload::Locations(self.source.provinces(param).await?),
            Target::Cities => FetchPayload::Locations(self.source.cities(param).await?),
            Target::Areas => FetchPayload::Locations(self.source.areas(param).await?),
            Target::FilterDefinitions => {
                FetchPayload::Definitions(self.source.filter_definitions(param).await?)
            }
        })
    }

    /// Apply a fetch result. Returns false when the ticket was superseded.
    pub fn resolve(&mut self, ticket: FetchTicket, result: Result<FetchPayload>) -> bool {
        if !self.is_current(&ticket) {
            debug!(
                "Discarding stale {} response for {:?} (token {})",
                ticket.target,
                ticket.param,
                ticket.token()
            );
            return false;
        }

        let payload = match result {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to load {} for {:?}: {}", ticket.target, ticket.param, e);
                self.fail(ticket.target, e.to_string());
                return true;
            }
        };

        match (ticket.target, payload) {
            (Target::Categories, FetchPayload::Categories(tree)) => {
                self.categories.complete(tree);
                if self.retain_category() {
                    self.sync_url();
                }
            }
            (Target::Provinces, FetchPayload::Locations(items)) => self.provinces.complete(items),
            (Target::Cities, FetchPayload::Locations(items)) => self.cities.complete(items),
            (Target::Areas, FetchPayload::Locations(items)) => self.areas.complete(items),
            (Target::FilterDefinitions, FetchPayload::Definitions(defs)) => {
                self.definitions.complete(defs);
                self.reshape_filters();
            }
            (target, _) => {
                warn!("Mismatched payload for {}", target);
                self.fail(target, "mismatched payload".to_string());
                return true;
            }
        }
        debug!("Loaded {} for {:?}", ticket.target, ticket.param);
        true
    }

    /// Fetch and resolve tickets in order
    pub async fn load(&mut self, tickets: Vec<FetchTicket>) {
        for ticket in tickets {
            let result = self.fetch(&ticket).await;
            self.resolve(ticket, result);
        }
    }

    /// Reconcile with the navigator's current location
    pub async fn reconcile_from_url(&mut self) -> Result<bool> {
        let path = self.navigator.current_path();
        let query = self.navigator.search_params();
        self.reconcile_with(&path, &query).await
    }

    /// Bring state and filters in line with a URL.
    ///
    /// Only fields whose URL slug differs from the state are looked up. A more
    /// specific location pins the hierarchy: with a city in the URL, province
    /// and country are never looked up. They are kept while the pinned slug
    /// matches the state and cleared when it moves. Fields more specific than
    /// the URL's location are cleared, and an area is only read under a city.
    /// Returns whether anything changed; a second call with the same URL
    /// changes nothing.
    pub async fn reconcile_with(&mut self, path: &str, query: &str) -> Result<bool> {
        let route = routing::parse_path(path)?;
        let current = self.store.get_state();
        let mut next = (*current).clone();
        let mut lookups: Vec<(FilterField, String)> = Vec::new();

        let mut plan = |next: &mut FilterState, field: FilterField, url_slug: &str| {
            if url_slug.is_empty() {
                *next.get_mut(field) = Selection::empty();
            } else if next.slug(field) != url_slug {
                lookups.push((field, url_slug.to_string()));
            }
        };

        plan(&mut next, FilterField::TransactionType, &route.transaction_type);
        plan(&mut next, FilterField::PropertyType, &route.property_type);
        plan(&mut next, FilterField::Category, &route.category);

        match &route.location {
            Some(token) => {
                let field = token.field();
                if next.slug(field) != token.slug() {
                    // a new pin makes the stored ancestors meaningless
                    for ancestor in LOCATION_CHAIN.iter().take_while(|f| **f != field) {
                        *next.get_mut(*ancestor) = Selection::empty();
                    }
                }
                plan(&mut next, field, token.slug());
                for descendant in field.descendants() {
                    if *descendant != FilterField::Area {
                        *next.get_mut(*descendant) = Selection::empty();
                    }
                }
                debug!("{} pins the location", field);
            }
            None => {
                for field in LOCATION_CHAIN {
                    *next.get_mut(field) = Selection::empty();
                }
            }
        }
        if matches!(route.location, Some(LocationToken::City(_))) {
            plan(&mut next, FilterField::Area, &route.area);
        } else {
            if !route.area.is_empty() {
                debug!("Ignoring area {:?} outside a city", route.area);
            }
            next.area = Selection::empty();
        }

        for (field, slug) in lookups {
            match self.source.resolve_title(field, &slug).await {
                Ok(title) => *next.get_mut(field) = Selection::new(title, slug),
                Err(e) => {
                    warn!("Unknown {} {:?} in URL, treating as empty: {}", field, slug, e);
                    *next.get_mut(field) = Selection::empty();
                }
            }
        }

        let definitions = self
            .definitions
            .is_loaded_for(&next.property_type.slug)
            .then_some(self.definitions.data.as_slice());
        let filters = SelectedFilters::from_query(query, definitions);
        self.pending_query = definitions.is_none().then(|| query.to_string());
        let filters_changed = filters.to_query() != self.filters.to_query();
        if filters_changed {
            self.filters = filters;
        }

        let state_changed = next != *current && self.store.dispatch(Action::Replace(next));
        if state_changed || filters_changed {
            info!("Reconciled filters from {}", path);
        }

        let tickets = self.sync_dependents();
        self.load(tickets).await;
        self.synced = (self.store.get_state(), self.filters.clone());

        Ok(state_changed || filters_changed)
    }

    /// Options the dropdown for `field` offers right now
    pub fn options(&self, field: FilterField) -> Vec<Selection> {
        match field {
            FilterField::Category => {
                let tx = self.store.get_state().transaction_type.slug_or(DEFAULT_TRANSACTION_TYPE).to_string();
                self.categories
                    .data
                    .get(&tx)
                    .map(|group| group.subgroup.clone())
                    .unwrap_or_default()
            }
            FilterField::Province => self.provinces.data.clone(),
            FilterField::City => self.cities.data.clone(),
            FilterField::Area => self.areas.data.clone(),
            _ => Vec::new(),
        }
    }

    pub fn filter_definitions(&self) -> &[FilterDefinition] {
        &self.definitions.data
    }

    pub fn phase(&self, target: Target) -> Phase {
        match target {
            Target::Categories => self.categories.phase.clone(),
            Target::Provinces => self.provinces.phase.clone(),
            Target::Cities => self.cities.phase.clone(),
            Target::Areas => self.areas.phase.clone(),
            Target::FilterDefinitions => self.definitions.phase.clone(),
        }
    }

    pub fn status(&self, field: FilterField) -> FieldStatus {
        let selected = !self.store.get_state().get(field).is_empty();
        let Some(target) = Target::for_field(field) else {
            return if selected { FieldStatus::Selected } else { FieldStatus::Empty };
        };
        match self.phase(target) {
            Phase::Idle => FieldStatus::Empty,
            Phase::Loading => FieldStatus::Loading,
            Phase::Failed(error) => FieldStatus::Failed(error),
            Phase::Loaded if selected => FieldStatus::Selected,
            Phase::Loaded => FieldStatus::Loaded,
        }
    }

    fn normalize(&self, field: FilterField, value: Selection) -> Selection {
        if value.slug.is_empty() {
            return Selection::empty();
        }
        let Some(target) = Target::for_field(field) else {
            return value;
        };
        let parent = self.store.get_state().slug(target.parent()).to_string();
        if !self.is_loaded_for(target, &parent) {
            return value;
        }
        match self.options(field).into_iter().find(|o| o.slug == value.slug) {
            Some(offered) if value.title.is_empty() => offered,
            Some(_) => value,
            None => {
                warn!("{} {:?} is not among the loaded options, clearing", field, value.slug);
                Selection::empty()
            }
        }
    }

    fn is_loaded_for(&self, target: Target, param: &str) -> bool {
        match target {
            Target::Categories => self.categories.is_loaded_for(param),
            Target::Provinces => self.provinces.is_loaded_for(param),
            Target::Cities => self.cities.is_loaded_for(param),
            Target::Areas => self.areas.is_loaded_for(param),
            Target::FilterDefinitions => self.definitions.is_loaded_for(param),
        }
    }

    fn is_current(&self, ticket: &FetchTicket) -> bool {
        match ticket.target {
            Target::Categories => self.categories.is_current(ticket),
            Target::Provinces => self.provinces.is_current(ticket),
            Target::Cities => self.cities.is_current(ticket),
            Target::Areas => self.areas.is_current(ticket),
            Target::FilterDefinitions => self.definitions.is_current(ticket),
        }
    }

    fn begin(&mut self, target: Target) -> Option<FetchTicket> {
        let state = self.store.get_state();
        let param = state.slug(target.parent());
        let ticket = match target {
            Target::Categories => self.categories.begin(target, param),
            Target::Provinces => self.provinces.begin(target, param),
            Target::Cities => self.cities.begin(target, param),
            Target::Areas => self.areas.begin(target, param),
            Target::FilterDefinitions => self.definitions.begin(target, param),
        };
        match &ticket {
            Some(t) => debug!("Requesting {} for {:?} (token {})", target, t.param, t.token()),
            None => debug!("{} disabled, no {} selected", target, target.parent()),
        }
        ticket
    }

    fn fail(&mut self, target: Target, error: String) {
        match target {
            Target::Categories => self.categories.fail(error),
            Target::Provinces => self.provinces.fail(error),
            Target::Cities => self.cities.fail(error),
            Target::Areas => self.areas.fail(error),
            Target::FilterDefinitions => self.definitions.fail(error),
        }
    }

    /// Issue requests for every option list whose parent slug moved
    fn sync_dependents(&mut self) -> Vec<FetchTicket> {
        let state = self.store.get_state();
        let mut tickets = Vec::new();
        for target in Target::ALL {
            let param = state.slug(target.parent());
            let stale = match target {
                Target::Categories => self.categories.is_stale_for(param),
                Target::Provinces => self.provinces.is_stale_for(param),
                Target::Cities => self.cities.is_stale_for(param),
                Target::Areas => self.areas.is_stale_for(param),
                Target::FilterDefinitions => self.definitions.is_stale_for(param),
            };
            if stale {
                tickets.extend(self.begin(target));
            }
        }
        self.retain_category();
        tickets
    }

    /// Clear the category if the loaded subgroups for the current pair lack it
    fn retain_category(&mut self) -> bool {
        let state = self.store.get_state();
        if state.category.is_empty() || !self.categories.is_loaded_for(&state.property_type.slug) {
            return false;
        }
        let allowed = self
            .options(FilterField::Category)
            .into_iter()
            .map(|s| s.slug)
            .collect();
        let changed = self.store.dispatch(Action::RetainCategory { allowed });
        if changed {
            info!(
                "Category {:?} not offered for {}-{}, cleared",
                state.category.slug, state.transaction_type.slug, state.property_type.slug
            );
        }
        changed
    }

    /// Re-type filters against fresh definitions, pruning after a property type change
    fn reshape_filters(&mut self) {
        let definitions = self.definitions.data.clone();
        let source = self
            .pending_query
            .take()
            .unwrap_or_else(|| self.filters.to_query());
        let mut reshaped = SelectedFilters::from_query(&source, Some(&definitions));
        if std::mem::take(&mut self.prune_filters) {
            let dropped = reshaped.retain_defined(&definitions);
            if !dropped.is_empty() {
                info!("Dropped filters not offered for this property type: {}", dropped.join(", "));
            }
        }
        let query_changed = reshaped.to_query() != self.filters.to_query();
        self.filters = reshaped;
        if query_changed {
            self.sync_url();
        }
    }

    fn sync_url(&mut self) {
        if self.mode == SyncMode::Immediate {
            self.push_current();
        }
    }

    fn push_current(&mut self) -> String {
        let state = self.store.get_state();
        let url = routing::build_url(&state, &self.filters);
        if url != self.navigator.current_url() {
            info!("Navigating to {}", url);
            self.navigator.push_url(&url, PushOptions { scroll: false });
        }
        self.synced = (state, self.filters.clone());
        url
    }
}
