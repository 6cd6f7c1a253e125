//! Core business logic: domain types, the merge/diff pipeline and digest rendering

pub mod asset;
pub mod config;
pub mod diff;
pub mod digest;
pub mod log;
pub mod market;
pub mod merge;
pub mod pipeline;

// Re-export main types for cleaner imports
pub use asset::{DiffedAsset, EnrichedAsset, TrackedAsset};
pub use market::{ClientError, MarketDataProvider};
pub use merge::{FetchStage, MetadataSource, PipelineError};
pub use pipeline::{AssetQuery, Pipeline};
