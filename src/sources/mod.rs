pub mod feed_rs_parser;
pub mod http_fetcher;
pub mod registry;
pub mod tag_parser;
pub mod text;
pub mod traits;

pub use feed_rs_parser::FeedRsParser;
pub use http_fetcher::HttpFeedFetcher;
pub use registry::{ContentSource, ParserKind, SourceRegistry};
pub use tag_parser::TagPatternParser;
pub use traits::{FeedFetcher, FeedParser, ParserOptions};
