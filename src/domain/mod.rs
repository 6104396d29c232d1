pub mod cache_entry;
pub mod content_item;
pub mod fixture;
pub mod source_state;

pub use cache_entry::CacheEntry;
pub use content_item::ContentItem;
pub use fixture::{Match, RawMatch, RawTeam, Team};
pub use source_state::SourceState;
