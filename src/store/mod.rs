//! Injected container for the shared [`FilterState`].
//!
//! State is held behind an `Arc` in a `watch` channel; a dispatch that leaves
//! the state equal keeps the same `Arc` and wakes no subscriber.

use crate::models::{FilterField, FilterState, Selection};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Pick a value for a field, clearing its location descendants when the slug changes
    SetField { field: FilterField, value: Selection },
    /// Clear the category unless its slug is among the allowed ones
    RetainCategory { allowed: Vec<String> },
    /// Swap in a whole state, used when rehydrating from the URL
    Replace(FilterState),
    Reset,
}

/// Pure transition function behind [`Store::dispatch`]
pub fn reduce(state: &FilterState, action: &Action) -> FilterState {
    let mut next = state.clone();
    match action {
        Action::SetField { field, value } => {
            let value = if value.slug.is_empty() {
                Selection::empty()
            } else {
                value.clone()
            };
            let slug_changed = next.get(*field).slug != value.slug;
            *next.get_mut(*field) = value;
            if slug_changed {
                for descendant in field.descendants() {
                    *next.get_mut(*descendant) = Selection::empty();
                }
            }
        }
        Action::RetainCategory { allowed } => {
            if !next.category.is_empty() && !allowed.iter().any(|slug| *slug == next.category.slug) {
                next.category = Selection::empty();
            }
        }
        Action::Replace(state) => next = state.clone(),
        Action::Reset => next = FilterState::default(),
    }
    // an area only exists inside a city
    if next.city.is_empty() {
        next.area = Selection::empty();
    }
    next
}

pub struct Store {
    sender: watch::Sender<Arc<FilterState>>,
}

impl Store {
    pub fn new(initial: FilterState) -> Self {
        let (sender, _) = watch::channel(Arc::new(initial));
        Self { sender }
    }

    pub fn get_state(&self) -> Arc<FilterState> {
        self.sender.borrow().clone()
    }

    /// Apply an action. Returns whether the state changed.
    pub fn dispatch(&self, action: Action) -> bool {
        let changed = self.sender.send_if_modified(|state| {
            let next = reduce(state, &action);
            if next == **state {
                return false;
            }
            *state = Arc::new(next);
            true
        });
        debug!(?action, changed, "Dispatched filter action");
        changed
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<FilterState>> {
        self.sender.subscribe()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(FilterState::default())
    }
}
