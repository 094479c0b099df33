//! # imgvary
//!
//! On-demand image variant service. Given a stored original and a compact
//! URL-encoded operation string, imgvary produces a derived variant, serves
//! it, and persists it so repeated requests for the same (original,
//! operations) pair skip recomputation.
//!
//! # Request Anatomy
//!
//! ```text
//! /images/sample.jpg/format=webp,width=300,height=300,grayscale=true
//!  └────────┬──────┘ └──────────────────┬────────────────────────┘
//!      image path          operations (trailing path segment)
//! ```
//!
//! The operations segment is parsed into a typed plan, applied in one fixed
//! order (resize → grayscale → rotate → flip → format/quality), and the
//! result is cached under the literal key `<image path>|<raw operations>`.
//! Same bytes, same plan → byte-identical output, so the cache needs no
//! invalidation story beyond deleting entries.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`ops`] | Operation string parsing and the parse-then-validate boundary producing a [`ops::TransformPlan`] |
//! | [`transform`] | Deterministic pipeline: lenient decode, fixed-order operations, per-format encode |
//! | [`store`] | `OriginStore`/`VariantStore` traits, filesystem implementations, variant cache keys |
//! | [`handler`] | Request orchestration: envelopes, status mapping, fire-and-forget variant writes |
//! | [`config`] | Sparse TOML configuration with env-var overrides |
//!
//! # Design Decisions
//!
//! ## Compatibility Over Convention
//!
//! Two behaviors are preserved from the service this replaces even though
//! they look wrong, because cached variants and live URLs depend on them:
//! negative or malformed dimensions turn the *whole* request into a
//! pass-through no-op rather than an error, and the `jpeg`/`jpg` output
//! formats serve crossed content types (`jpeg` → `image/jpg`, `jpg` →
//! `image/jpeg`). Both are isolated behind named functions and named tests
//! so a future change is a conscious one.
//!
//! ## Raw Cache Keys
//!
//! Variants are keyed by the operations segment exactly as received, not a
//! canonical form: `width=1,height=2` and `height=2,width=1` are distinct
//! cache entries. Canonicalizing would orphan every variant already stored
//! under the literal spelling.
//!
//! ## Storage Behind Traits
//!
//! The pipeline touches storage only through the narrow `OriginStore` and
//! `VariantStore` traits, injected at handler construction. The filesystem
//! implementations mirror the object-bucket layout of a real deployment;
//! tests substitute recording mocks and never touch global state.
//!
//! ## Coarse Status Mapping
//!
//! The boundary speaks three statuses: 200, 403 (non-read verb), 500
//! (everything else, opaque). Distinctions that matter operationally —
//! origin miss vs. decode failure vs. cache write trouble — show up in the
//! `tracing` output, not in the response.

pub mod config;
pub mod handler;
pub mod ops;
pub mod store;
pub mod transform;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use config::ServiceConfig;
pub use handler::{Handler, Request, Response};
pub use ops::{OperationSet, Quality, TransformPlan, TransformRequest};
pub use store::{FsOriginStore, FsVariantStore, OriginStore, StoredObject, VariantStore};
pub use transform::{OutputFormat, TransformError, TransformResult};
