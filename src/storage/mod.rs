pub mod cache_store;
pub mod sqlite;
pub mod state_store;
pub mod traits;

pub use cache_store::CacheStore;
pub use sqlite::{SqliteKeyValueStore, SqliteStorage};
pub use state_store::{SourceStateStore, STATE_NAMESPACE};
pub use traits::KeyValueStore;
