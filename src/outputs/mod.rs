//! Serializers for the two published snapshot formats.
//!
//! # Submodules
//!
//! - [`json`]: Pretty-printed JSON array of records
//! - [`csv`]: CSV with the fixed [`FIELDNAMES`](crate::models::FIELDNAMES) header
//!
//! Both render to bytes without touching the filesystem; the
//! [`checkpoint`](crate::checkpoint) module decides when and where to write.
//! Rendering is deterministic: the same records always produce the same bytes.

pub mod csv;
pub mod json;
