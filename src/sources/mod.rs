pub mod api;
pub mod cached;
pub mod fixture;
pub mod traits;
pub mod types;

pub use api::ApiSource;
pub use cached::CachedSource;
pub use fixture::StaticSource;
pub use traits::{ListingSource, ReferenceSource, TitleResolver};
pub use types::{CategoryGroup, CategoryTree, ListingQuery};
