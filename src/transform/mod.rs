//! Deterministic image transformation.
//!
//! | Concern | Module |
//! |---|---|
//! | Format allow-list, content-type table, decode/encode | [`codec`] |
//! | Fixed-order operation application | [`pipeline`] |
//!
//! The pipeline applies operations in one fixed order regardless of how the
//! request spelled them; the same bytes and plan always produce the same
//! output bytes. Reordering the steps changes visual output and is a
//! correctness bug.

pub mod codec;
pub mod pipeline;

pub use codec::{OutputFormat, TransformError};
pub use pipeline::{TransformResult, apply};
