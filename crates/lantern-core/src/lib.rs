//! Core selection logic for the lantern traversal engine.
//!
//! Pure data types and algorithms: messages, the bounded working set and
//! priority queue, the similarity heuristic, and the cluster selector.
//! Zero I/O — no timers, no persistence, no opinions about transport.

pub mod cluster;
pub mod config;
pub mod message;
pub mod queue;
pub mod selector;
pub mod similarity;
pub mod working_set;

pub use cluster::{ClusterDefect, MessageCluster, RelatedMessage, verify_cluster};
pub use config::{ConfigError, EngineConfig, SimilarityWeights};
pub use message::{MAX_CONTENT_CHARS, Message, validate_content};
pub use queue::PriorityQueue;
pub use selector::select_cluster;
pub use similarity::{
    THIRTY_DAYS_SECS, length_similarity, semantic_affinity, similarity, temporal_proximity,
};
pub use working_set::{InsertOutcome, WorkingSet};
