//! Domain models and types for railpos.
//!
//! The domain layer provides:
//! - **Feed messages** ([`FeedMessage`], [`FeedEntity`]) decoded from GTFS-realtime
//! - **Documents** ([`Document`]) ready for indexing
//! - **Error types** ([`RailposError`], [`FeedError`], [`ElasticsearchError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, RailposError>`]:
//!
//! ```rust
//! use railpos::domain::{RailposError, Result};
//!
//! fn example() -> Result<()> {
//!     Err(RailposError::Configuration("feed.url cannot be empty".to_string()))
//! }
//! ```

pub mod document;
pub mod errors;
pub mod feed;
pub mod result;

// Re-export commonly used types for convenience
pub use document::{Document, GeoPoint};
pub use errors::{ElasticsearchError, FeedError, MalformedRecord, RailposError};
pub use feed::{FeedEntity, FeedMessage, Position, VehiclePosition};
pub use result::Result;
