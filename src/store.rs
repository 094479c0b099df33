//! Storage collaborators behind narrow traits.
//!
//! The pipeline never talks to storage directly; the handler is given an
//! [`OriginStore`] (read-only source of originals) and optionally a
//! [`VariantStore`] (write-only sink for derived variants). Both are
//! injected at construction so the core has no ambient clients and tests
//! can substitute recording mocks.
//!
//! The filesystem implementations stand in for the object buckets of a
//! real deployment: [`FsOriginStore`] reads originals under a root
//! directory, [`FsVariantStore`] lays variants out as
//! `<root>/<image path>/<operations>` — the same shape the derived bucket
//! uses for its object keys.

use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// An original image as the origin store returned it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    /// Content type the store declared for the object, if any.
    pub content_type: Option<String>,
}

/// Read-only source of original image bytes.
pub trait OriginStore: Send + Sync {
    fn get(&self, path: &str) -> Result<StoredObject, StoreError>;
}

/// Write-only sink for derived variants. Failures here are non-fatal to
/// the request that produced the variant.
pub trait VariantStore: Send + Sync {
    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StoreError>;
}

/// Cache key for a variant: the origin path joined with the *raw*
/// operations segment, exactly as received.
///
/// Two operation strings that are semantically identical but textually
/// different (key order, say) address distinct entries. Known limitation,
/// kept: canonicalizing the key would orphan every variant stored under
/// the literal form.
pub fn variant_key(image_path: &str, raw_ops: &str) -> String {
    format!("{image_path}|{raw_ops}")
}

/// Extension → content type for originals served off the filesystem.
const EXTENSION_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("webp", "image/webp"),
    ("gif", "image/gif"),
];

fn content_type_for_path(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    EXTENSION_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, t)| (*t).to_string())
}

/// Reject keys that would escape the store root.
fn is_clean_relative(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Originals under a local directory.
#[derive(Debug, Clone)]
pub struct FsOriginStore {
    root: PathBuf,
}

impl FsOriginStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl OriginStore for FsOriginStore {
    fn get(&self, path: &str) -> Result<StoredObject, StoreError> {
        let relative = Path::new(path);
        if path.is_empty() || !is_clean_relative(relative) {
            return Err(StoreError::NotFound(path.to_string()));
        }
        let full = self.root.join(relative);
        let bytes = match std::fs::read(&full) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(path.to_string()));
            }
            Err(e) => return Err(StoreError::Io(e)),
        };
        Ok(StoredObject {
            bytes,
            content_type: content_type_for_path(&full),
        })
    }
}

/// Variants under a local directory.
///
/// The `|` key separator maps to a path separator, so
/// `images/sample.jpg|width=100,height=100` lands at
/// `<root>/images/sample.jpg/width=100,height=100`. The declared content
/// type is recorded in a `.content-type` sidecar next to the variant.
#[derive(Debug, Clone)]
pub struct FsVariantStore {
    root: PathBuf,
}

impl FsVariantStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn variant_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let relative: PathBuf = key.split('|').collect();
        if key.is_empty() || !is_clean_relative(&relative) {
            return Err(StoreError::Backend(format!("unusable variant key: {key}")));
        }
        Ok(self.root.join(relative))
    }
}

impl VariantStore for FsVariantStore {
    fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StoreError> {
        let path = self.variant_path(key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, bytes)?;
        std::fs::write(sidecar_path(&path), content_type)?;
        Ok(())
    }
}

fn sidecar_path(variant: &Path) -> PathBuf {
    let mut name = variant
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".content-type");
    variant.with_file_name(name)
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Origin store serving a fixed map of objects, recording lookups.
    #[derive(Default)]
    pub struct MockOriginStore {
        objects: HashMap<String, StoredObject>,
        pub lookups: Mutex<Vec<String>>,
        pub fail: bool,
    }

    impl MockOriginStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_object(mut self, path: &str, bytes: Vec<u8>, content_type: Option<&str>) -> Self {
            self.objects.insert(
                path.to_string(),
                StoredObject {
                    bytes,
                    content_type: content_type.map(str::to_string),
                },
            );
            self
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }
    }

    impl OriginStore for MockOriginStore {
        fn get(&self, path: &str) -> Result<StoredObject, StoreError> {
            self.lookups.lock().unwrap().push(path.to_string());
            if self.fail {
                return Err(StoreError::Backend("origin unavailable".to_string()));
            }
            self.objects
                .get(path)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(path.to_string()))
        }
    }

    /// Variant store recording every put; optionally failing all of them.
    #[derive(Default)]
    pub struct MockVariantStore {
        pub puts: Mutex<Vec<(String, Vec<u8>, String)>>,
        pub fail: bool,
    }

    impl MockVariantStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn stored_keys(&self) -> Vec<String> {
            self.puts
                .lock()
                .unwrap()
                .iter()
                .map(|(k, _, _)| k.clone())
                .collect()
        }
    }

    impl VariantStore for MockVariantStore {
        fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StoreError> {
            if self.fail {
                return Err(StoreError::Backend("variant store down".to_string()));
            }
            self.puts.lock().unwrap().push((
                key.to_string(),
                bytes.to_vec(),
                content_type.to_string(),
            ));
            Ok(())
        }
    }

    #[test]
    fn variant_key_joins_path_and_raw_ops() {
        assert_eq!(
            variant_key("images/sample.jpg", "width=100,height=100,grayscale=true"),
            "images/sample.jpg|width=100,height=100,grayscale=true"
        );
    }

    #[test]
    fn variant_key_keeps_raw_ops_uncanonicalized() {
        // Same operations, different spelling → different entries.
        let a = variant_key("a.jpg", "width=1,height=2");
        let b = variant_key("a.jpg", "height=2,width=1");
        assert_ne!(a, b);
    }

    #[test]
    fn fs_origin_reads_bytes_and_content_type() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("images")).unwrap();
        std::fs::write(tmp.path().join("images/cat.png"), b"pngbytes").unwrap();

        let store = FsOriginStore::new(tmp.path());
        let obj = store.get("images/cat.png").unwrap();
        assert_eq!(obj.bytes, b"pngbytes");
        assert_eq!(obj.content_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn fs_origin_unknown_extension_has_no_content_type() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("blob.bin"), b"data").unwrap();

        let store = FsOriginStore::new(tmp.path());
        assert_eq!(store.get("blob.bin").unwrap().content_type, None);
    }

    #[test]
    fn fs_origin_missing_object_is_not_found() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = FsOriginStore::new(tmp.path());
        assert!(matches!(
            store.get("images/nope.jpg"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn fs_origin_rejects_traversal() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = FsOriginStore::new(tmp.path().join("root"));
        assert!(matches!(
            store.get("../secret.jpg"),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(store.get(""), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn fs_variant_put_writes_bytes_and_sidecar() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = FsVariantStore::new(tmp.path());

        store
            .put("images/sample.jpg|width=100,height=100", b"variant", "image/jpeg")
            .unwrap();

        let variant = tmp.path().join("images/sample.jpg/width=100,height=100");
        assert_eq!(std::fs::read(&variant).unwrap(), b"variant");
        let sidecar = tmp
            .path()
            .join("images/sample.jpg/width=100,height=100.content-type");
        assert_eq!(std::fs::read_to_string(sidecar).unwrap(), "image/jpeg");
    }

    #[test]
    fn fs_variant_rejects_traversal_key() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = FsVariantStore::new(tmp.path());
        assert!(matches!(
            store.put("../escape|ops", b"x", "image/png"),
            Err(StoreError::Backend(_))
        ));
    }
}
