//! Core annotation graph for CorFlow.
//! Corpora, transcriptions, tiers and segments live in one arena-backed
//! graph that keeps containment order and structural links consistent.

pub mod levels;
pub mod logging;
pub mod model;
pub mod store;

pub use levels::timing::{round_time, TimeOrdered, TIME_PRECISION_DECIMALS};
pub use levels::transcription::Speaker;
pub use levels::{DEFAULT_GAP_MARKER, DEFAULT_SEGMENT_PREFIX};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::entity::{Entity, EntityDraft, EntityId, EntityKind, EntityValidationError};
pub use model::metadata::{
    MetaGroup, Metadata, DEFAULT_META_SEPARATOR, DIVISION_OMNI, DIVISION_TECH,
};
pub use regex::Regex;
pub use store::{AllChildren, AnnotationGraph, ErrorKind, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
