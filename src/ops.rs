//! Operation string parsing and validation.
//!
//! The trailing path segment of a variant request is a comma-separated list
//! of `key=value` operations, e.g. `format=webp,width=300,height=300`.
//! Parsing happens in two stages:
//!
//! 1. [`OperationSet::parse`] — lexical: split the raw segment into
//!    `(key, value)` pairs, verbatim, rejecting tokens without a `=`.
//! 2. [`OperationSet::plan`] — semantic: coerce the recognized keys into a
//!    typed [`TransformRequest`], or decide the request is a no-op.
//!
//! The two-stage split keeps every presence/validity check in one place
//! instead of scattering string probing through the pipeline. Values are
//! used exactly as received: no trimming, no case folding. Unrecognized
//! keys are kept in the set but never influence the plan, so new operation
//! names can be introduced without breaking older deployments.

use crate::transform::codec::OutputFormat;
use thiserror::Error;
use tracing::{debug, warn};

/// Keys the planner understands. Everything else is carried but ignored.
pub const RECOGNIZED_KEYS: &[&str] = &[
    "width",
    "height",
    "grayscale",
    "rotate",
    "flip",
    "format",
    "quality",
];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum OpsError {
    /// A token in the operations segment had no `=` separator.
    #[error("invalid operation token '{0}': expected key=value")]
    InvalidToken(String),
}

/// Quality setting for lossy image encoding (1-100). Clamped on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

/// The raw operations segment, tokenized but not yet interpreted.
///
/// Pair order matches the segment; lookups return the first occurrence of a
/// key, so a duplicated key cannot override an earlier value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationSet {
    pairs: Vec<(String, String)>,
}

impl OperationSet {
    /// Tokenize a raw operations segment.
    ///
    /// An empty segment yields an empty set (pass-through request). A token
    /// without `=` rejects the whole segment.
    pub fn parse(raw: &str) -> Result<Self, OpsError> {
        if raw.is_empty() {
            return Ok(Self::default());
        }

        let mut pairs = Vec::new();
        for token in raw.split(',') {
            let Some((key, value)) = token.split_once('=') else {
                return Err(OpsError::InvalidToken(token.to_string()));
            };
            pairs.push((key.to_string(), value.to_string()));
        }
        Ok(Self { pairs })
    }

    /// First value recorded for `key`, verbatim.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Interpret the set as a typed transform plan.
    ///
    /// Dimension policy (kept bug-for-bug compatible with the original
    /// service):
    /// - both `width` and `height` present and non-negative → resize
    /// - exactly one of the pair present → resize skipped, other
    ///   operations still apply
    /// - either value negative or unparseable → the *whole* request becomes
    ///   a pass-through no-op
    ///
    /// Malformed `rotate`/`quality` values are treated as absent.
    pub fn plan(&self) -> TransformPlan {
        if self.is_empty() {
            return TransformPlan::PassThrough;
        }

        for (key, _) in &self.pairs {
            if !RECOGNIZED_KEYS.contains(&key.as_str()) {
                debug!(key = %key, "unrecognized operation ignored");
            }
        }

        let resize = match (self.get("width"), self.get("height")) {
            (Some(w), Some(h)) => match (parse_dimension(w), parse_dimension(h)) {
                (Some(w), Some(h)) => Some((w, h)),
                _ => {
                    warn!(width = w, height = h, "invalid dimensions, request is a no-op");
                    return TransformPlan::PassThrough;
                }
            },
            (None, None) => None,
            // Partial dimensions disable resizing rather than defaulting
            // the missing side.
            _ => None,
        };

        TransformPlan::Apply(TransformRequest {
            resize,
            grayscale: self.get("grayscale") == Some("true"),
            rotate: self.get("rotate").and_then(|v| match v.parse::<i32>() {
                Ok(deg) => Some(deg),
                Err(_) => {
                    debug!(rotate = v, "unparseable rotate value ignored");
                    None
                }
            }),
            flip: self.get("flip") == Some("true"),
            format: self.get("format").and_then(OutputFormat::parse),
            quality: self.get("quality").and_then(|v| match v.parse::<u32>() {
                Ok(q) => Some(Quality::new(q)),
                Err(_) => {
                    debug!(quality = v, "unparseable quality value ignored");
                    None
                }
            }),
        })
    }
}

/// Validated, typed description of the work a request asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformRequest {
    /// Exact target dimensions; present only when both width and height
    /// were supplied and non-negative.
    pub resize: Option<(u32, u32)>,
    /// True iff the raw value was the literal string `true`.
    pub grayscale: bool,
    /// Arbitrary degrees, clockwise. Not constrained to multiples of 90.
    pub rotate: Option<i32>,
    /// Vertical flip (upside-down), literal `true` only.
    pub flip: bool,
    pub format: Option<OutputFormat>,
    pub quality: Option<Quality>,
}

/// A dimension is valid only if it fits `u32` exactly: negative,
/// unparseable, and out-of-range values all invalidate the request the
/// same way.
fn parse_dimension(value: &str) -> Option<u32> {
    value
        .parse::<i64>()
        .ok()
        .and_then(|v| u32::try_from(v).ok())
}

/// Outcome of validation: either a transform to apply, or a well-defined
/// pass-through (empty operation set, or dimensions that invalidate the
/// whole request).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformPlan {
    PassThrough,
    Apply(TransformRequest),
}
