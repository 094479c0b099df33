//! Request orchestration.
//!
//! The handler is the only component that sees the request envelope. It
//! owns no logic of its own beyond wiring: split the path, validate the
//! operations, fetch the original, run the pipeline, write the variant,
//! shape the response. Both stores are injected at construction — the
//! handler holds no ambient clients and is fully exercisable with the
//! recording mocks in [`crate::store`].
//!
//! Status mapping is deliberately coarse, matching the original service:
//! 200 on success, 403 for anything that is not a read, 500 for every
//! failure. Failures are logged with context here and never leak internal
//! detail to the caller.

use crate::config::ServiceConfig;
use crate::ops::{OperationSet, OpsError};
use crate::store::{OriginStore, StoreError, VariantStore, variant_key};
use crate::transform::{self, TransformError};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{error, warn};

/// Inbound request: a read verb and a path whose trailing segment is the
/// operations string, e.g. `/images/sample.jpg/format=webp,width=300,height=300`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub path: String,
}

impl Request {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            path: path.into(),
        }
    }
}

/// Response envelope, serialized with the wire field names the fronting
/// infrastructure expects (`statusCode`, `isBase64Encoded`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Response {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
    #[serde(
        rename = "isBase64Encoded",
        default,
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub is_base64_encoded: bool,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
}

impl Response {
    fn success(bytes: &[u8], content_type: &str) -> Self {
        Self {
            status_code: 200,
            body: BASE64.encode(bytes),
            is_base64_encoded: true,
            headers: HashMap::from([("Content-Type".to_string(), content_type.to_string())]),
        }
    }

    fn plain(status_code: u16, message: &str) -> Self {
        Self {
            status_code,
            body: message.to_string(),
            is_base64_encoded: false,
            headers: HashMap::new(),
        }
    }
}

#[derive(Error, Debug)]
enum HandlerError {
    /// Origin miss or empty body. Same 500 as everything else at the
    /// boundary (source behavior), but logged on its own line.
    #[error("image not found: {0}")]
    ImageNotFound(String),
    #[error(transparent)]
    Ops(#[from] OpsError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error(transparent)]
    Store(StoreError),
}

/// Orchestrates one request end to end. Stateless: safe to share across
/// concurrently handled requests.
#[derive(Debug)]
pub struct Handler<O, V = crate::store::FsVariantStore> {
    origin: O,
    variants: Option<V>,
    config: ServiceConfig,
}

impl<O: OriginStore, V: VariantStore> Handler<O, V> {
    pub fn new(origin: O, variants: Option<V>, config: ServiceConfig) -> Self {
        Self {
            origin,
            variants,
            config,
        }
    }

    /// Handle one request. Never panics outward and never returns an
    /// error: every failure is converted to an opaque envelope here.
    pub fn handle(&self, request: &Request) -> Response {
        if request.method != "GET" {
            return Response::plain(403, "Method Not Allowed");
        }

        match self.process(request) {
            Ok(response) => response,
            Err(HandlerError::ImageNotFound(path)) => {
                warn!(path = %path, "origin image missing or empty");
                Response::plain(500, "Internal Server Error")
            }
            Err(err) => {
                error!(path = %request.path, error = %err, "request failed");
                Response::plain(500, "Internal Server Error")
            }
        }
    }

    fn process(&self, request: &Request) -> Result<Response, HandlerError> {
        let (image_path, raw_ops) =
            split_variant_path(&request.path, self.config.path_prefix_segments);

        let plan = OperationSet::parse(&raw_ops)?.plan();

        let origin = self.origin.get(image_path.as_str()).map_err(|e| match e {
            StoreError::NotFound(path) => HandlerError::ImageNotFound(path),
            other => HandlerError::Store(other),
        })?;
        if origin.bytes.is_empty() {
            return Err(HandlerError::ImageNotFound(image_path));
        }

        let result = transform::apply(&origin.bytes, origin.content_type.as_deref(), &plan)?;

        // Fire-and-forget relative to the response: a failed cache write
        // must not fail a request whose transform succeeded.
        if let Some(variants) = &self.variants {
            let key = variant_key(&image_path, &raw_ops);
            if let Err(err) = variants.put(&key, &result.bytes, &result.content_type) {
                warn!(key = %key, error = %err, "variant cache write failed");
            }
        }

        Ok(Response::success(&result.bytes, &result.content_type))
    }
}

/// Split a request path into (image path, raw operations string).
///
/// The last segment is always the operations string; the segments after
/// the configured prefix offset, joined with `/`, form the image path. A
/// trailing slash therefore means "no operations".
fn split_variant_path(path: &str, prefix_segments: usize) -> (String, String) {
    let mut segments: Vec<&str> = path.split('/').collect();
    let raw_ops = segments.pop().unwrap_or("");
    let image_path = if segments.len() > prefix_segments {
        segments[prefix_segments..].join("/")
    } else {
        String::new()
    };
    (image_path, raw_ops.to_string())
}
