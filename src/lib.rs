pub mod config;
pub mod error;
pub mod filters;
pub mod models;
pub mod navigation;
pub mod query;
pub mod routing;
pub mod sources;
pub mod store;
pub mod sync;

pub use error::{Error, Result};
pub use filters::{FilterDefinition, FilterKind, FilterValue, SelectedFilters};
pub use models::{FilterField, FilterState, Selection};
pub use navigation::{MemoryNavigator, Navigator, PushOptions};
pub use routing::{build_path, build_url, parse_path, LocationToken, ParsedRoute};
pub use store::{Action, Store};
pub use sync::{FetchTicket, FieldStatus, Phase, SyncMode, Synchronizer, Target};
