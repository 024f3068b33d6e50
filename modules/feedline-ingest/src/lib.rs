pub mod hash;
pub mod locks;
pub mod normalizer;
pub mod pipeline;
pub mod resolver;
pub mod selector;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use hash::{generate_content_hash, generate_content_hash_with};
pub use locks::CreatorLocks;
pub use normalizer::{normalize, normalize_json, normalize_multiple, parse_feed, RawPayload};
pub use pipeline::{BatchSummary, IngestPipeline, ItemError};
pub use resolver::{
    DedupOutcome, DuplicateResolver, IngestResult, IngestStatus, MatchKind, Resolution,
};
pub use selector::{select_primary, Candidate};
pub use store::{
    DuplicateStore, GroupHandover, GroupPlan, NewContentRecord, PgContentStore, UpsertOutcome,
};
