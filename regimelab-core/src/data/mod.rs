//! Market-data collaborators: provider trait, reference providers, the bar
//! cache and the ticker universe file.

pub mod cache;
pub mod csv_provider;
pub mod provider;
pub mod universe;
pub mod yahoo;

pub use cache::{BarCache, CacheKey, CachedProvider, MemoryCache};
pub use csv_provider::CsvProvider;
pub use provider::{DataError, DataProvider};
pub use universe::Universe;
pub use yahoo::YahooProvider;
