//! Lookup of extension configuration objects.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Identity of a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub kind: String,
    #[serde(default)]
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}/{}", self.kind, self.name)
        } else {
            write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
        }
    }
}

/// A configuration object as hook logic sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredObject {
    #[serde(flatten)]
    pub key: ObjectKey,
    #[serde(default)]
    pub spec: serde_json::Value,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read store file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid store file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("duplicate object {0}")]
    Duplicate(ObjectKey),
}

/// Read access to configuration objects, by identity.
pub trait ConfigStore: Send + Sync {
    fn get(&self, key: &ObjectKey) -> Result<Option<StoredObject>, StoreError>;

    /// All objects of `kind`, optionally restricted to one namespace.
    fn list(&self, kind: &str, namespace: Option<&str>) -> Result<Vec<StoredObject>, StoreError>;
}

/// Read-only in-process store.
///
/// Built once (from objects or a JSON file) and never mutated afterwards, so
/// lookups need no locking.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    objects: BTreeMap<ObjectKey, StoredObject>,
}

impl MemoryStore {
    /// An empty store.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from objects; two objects with the same key are an error.
    pub fn from_objects(
        objects: impl IntoIterator<Item = StoredObject>,
    ) -> Result<Self, StoreError> {
        let mut map = BTreeMap::new();
        for object in objects {
            let key = object.key.clone();
            if map.insert(key.clone(), object).is_some() {
                return Err(StoreError::Duplicate(key));
            }
        }
        Ok(Self { objects: map })
    }

    /// Load a JSON array of `{"kind", "namespace", "name", "spec"}` objects.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let raw = std::fs::read(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let objects: Vec<StoredObject> =
            serde_json::from_slice(&raw).map_err(|source| StoreError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let store = Self::from_objects(objects)?;
        debug!(?path, objects = store.len(), "loaded configuration store");
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl ConfigStore for MemoryStore {
    fn get(&self, key: &ObjectKey) -> Result<Option<StoredObject>, StoreError> {
        Ok(self.objects.get(key).cloned())
    }

    fn list(&self, kind: &str, namespace: Option<&str>) -> Result<Vec<StoredObject>, StoreError> {
        Ok(self
            .objects
            .values()
            .filter(|object| object.key.kind == kind)
            .filter(|object| namespace.is_none_or(|ns| object.key.namespace == ns))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn route(namespace: &str, name: &str) -> StoredObject {
        StoredObject {
            key: ObjectKey::new("AIGatewayRoute", namespace, name),
            spec: json!({ "backend": name }),
        }
    }

    #[test]
    fn get_by_identity() {
        let store = MemoryStore::from_objects([route("default", "chat"), route("prod", "chat")]).unwrap();

        let found = store
            .get(&ObjectKey::new("AIGatewayRoute", "prod", "chat"))
            .unwrap()
            .expect("object should exist");
        assert_eq!(found.key.namespace, "prod");
        assert!(store
            .get(&ObjectKey::new("AIGatewayRoute", "staging", "chat"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn list_filters_kind_and_namespace() {
        let mut objects = vec![route("a", "one"), route("a", "two"), route("b", "three")];
        objects.push(StoredObject {
            key: ObjectKey::new("Backend", "a", "one"),
            spec: serde_json::Value::Null,
        });
        let store = MemoryStore::from_objects(objects).unwrap();

        assert_eq!(store.list("AIGatewayRoute", None).unwrap().len(), 3);
        assert_eq!(store.list("AIGatewayRoute", Some("a")).unwrap().len(), 2);
        assert_eq!(store.list("Backend", Some("b")).unwrap().len(), 0);
    }

    #[test]
    fn duplicates_are_rejected() {
        let err = MemoryStore::from_objects([route("a", "x"), route("a", "x")]).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(key) if key.name == "x"));
    }

    #[test]
    fn loads_json_file() {
        let path = std::env::temp_dir().join(format!("extsrv-store-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"[
                {"kind": "AIGatewayRoute", "namespace": "default", "name": "chat", "spec": {"schema": "OpenAI"}},
                {"kind": "Backend", "name": "cluster-scoped"}
            ]"#,
        )
        .unwrap();

        let store = MemoryStore::from_json_file(&path).unwrap();
        assert_eq!(store.len(), 2);
        let backend = store
            .get(&ObjectKey::new("Backend", "", "cluster-scoped"))
            .unwrap()
            .unwrap();
        assert!(backend.spec.is_null());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let path = std::env::temp_dir().join(format!("extsrv-store-bad-{}.json", std::process::id()));
        std::fs::write(&path, b"{not json").unwrap();

        assert!(matches!(
            MemoryStore::from_json_file(&path),
            Err(StoreError::Parse { .. })
        ));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn key_display() {
        assert_eq!(ObjectKey::new("Backend", "", "x").to_string(), "Backend/x");
        assert_eq!(ObjectKey::new("Backend", "ns", "x").to_string(), "Backend/ns/x");
    }
}
