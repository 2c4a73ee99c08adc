use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::error::{CoreError, CoreErrorCode};

pub const CONFIG_DOCUMENT: &str = "stack_size_config";
pub const INDEX_DOCUMENT: &str = "stack_size_index";
pub const BASELINE_DOCUMENT: &str = "stack_size_vanilla_defaults";

/// Host key/value document store. Writes replace the whole document.
pub trait DataStore {
    fn read(&self, name: &str) -> Result<Option<String>, CoreError>;
    fn write(&mut self, name: &str, contents: &str) -> Result<(), CoreError>;
    fn exists(&self, name: &str) -> bool;
}

pub fn read_document<T: DeserializeOwned>(
    store: &dyn DataStore,
    name: &str,
) -> Result<Option<T>, CoreError> {
    let Some(raw) = store.read(name)? else {
        return Ok(None);
    };
    if raw.trim().is_empty() || raw.trim() == "null" {
        return Ok(None);
    }
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| CoreError::parse(format!("failed to parse document {name}: {e}")))
}

pub fn write_document<T: Serialize>(
    store: &mut dyn DataStore,
    name: &str,
    value: &T,
) -> Result<(), CoreError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| CoreError::parse(format!("failed to serialize document {name}: {e}")))?;
    store.write(name, &rendered)
}

/// One `<name>.json` file per document inside a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn open(root: &Path) -> Result<Self, CoreError> {
        fs::create_dir_all(root).map_err(|e| {
            CoreError::new(
                CoreErrorCode::Io,
                format!("failed to create data directory {}: {e}", root.display()),
            )
        })?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.json"))
    }
}

impl DataStore for DirStore {
    fn read(&self, name: &str) -> Result<Option<String>, CoreError> {
        let path = self.path_for(name);
        if !path.is_file() {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|e| CoreError::io(format!("failed to read {}: {e}", path.display())))
    }

    fn write(&mut self, name: &str, contents: &str) -> Result<(), CoreError> {
        let path = self.path_for(name);
        fs::write(&path, contents)
            .map_err(|e| CoreError::io(format!("failed to write {}: {e}", path.display())))
    }

    fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_file()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    documents: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.documents.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }
}

impl DataStore for MemoryStore {
    fn read(&self, name: &str) -> Result<Option<String>, CoreError> {
        Ok(self.documents.get(name).cloned())
    }

    fn write(&mut self, name: &str, contents: &str) -> Result<(), CoreError> {
        self.documents.insert(name.to_string(), contents.to_string());
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        self.documents.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::{DataStore, DirStore, MemoryStore, read_document, write_document};

    #[test]
    fn dir_store_round_trips_documents() {
        let root = temp_test_dir("dir_store");
        let mut store = DirStore::open(&root).expect("data dir should be created");

        assert!(!store.exists("numbers"));
        write_document(&mut store, "numbers", &vec![1, 2, 3]).expect("write");
        assert!(store.exists("numbers"));
        assert!(store.path_for("numbers").ends_with("numbers.json"));

        let back: Option<Vec<i32>> = read_document(&store, "numbers").expect("read");
        assert_eq!(back, Some(vec![1, 2, 3]));

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn null_document_reads_as_absent() {
        let mut store = MemoryStore::new();
        store.write("index", "null").expect("write");
        let back: Option<Vec<i32>> = read_document(&store, "index").expect("read");
        assert_eq!(back, None);
    }

    fn temp_test_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "stack_size_{}_{}_{}",
            prefix,
            std::process::id(),
            nanos
        ))
    }
}
