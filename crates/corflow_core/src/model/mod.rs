//! Value types for the annotation hierarchy.
//!
//! # Responsibility
//! - Define entity values, kinds and handles.
//! - Define the layered metadata store.
//!
//! # Invariants
//! - Model types never reference each other by pointer; graph relations live
//!   in `store`.

pub mod entity;
pub mod metadata;
