pub mod cache;
pub mod feed;
pub mod quota;
pub mod scheduler;
pub mod source;
pub mod types;

pub use cache::FetchCache;
pub use feed::{FeedSample, ServedFrom, TrafficFeed};
pub use quota::{QuotaSnapshot, TokenBucket};
pub use scheduler::{FetchDecision, QuotaPolicy, ValidationError};
pub use source::{TrafficError, TrafficSource};
pub use types::{HistoricalTrafficRow, RealtimeSnapshot, TrafficRow};
