use std::path::PathBuf;

use stacksize_core::ItemCategory;
use stacksize_core::core_api::migrations::{self, MigrationOutcome, backup_document_name};
use stacksize_core::core_api::{
    CoreError, CoreErrorCode, DataStore, Engine, INDEX_DOCUMENT, ItemIndex, MemoryCatalog,
    MemoryStore, SchemaVersion, read_document,
};

const WOOD: i32 = -151838493;
const STONES: i32 = -2099697608;

const INDEX_3_1_2: &str = r#"{
  "item_categories": {
    "Resources": [
      { "item_id": -151838493, "shortname": "wood", "vanilla_stack_size": 500, "custom_stack_size": 500 },
      { "item_id": -2099697608, "shortname": "stones", "vanilla_stack_size": 1000, "custom_stack_size": 2000 }
    ]
  },
  "version": "3.1.2"
}"#;

/// Refuses every backup document; everything else lands in memory.
#[derive(Debug, Default, Clone)]
struct NoBackupStore {
    inner: MemoryStore,
}

impl DataStore for NoBackupStore {
    fn read(&self, name: &str) -> Result<Option<String>, CoreError> {
        self.inner.read(name)
    }

    fn write(&mut self, name: &str, contents: &str) -> Result<(), CoreError> {
        if name.contains("_backup_") {
            return Err(CoreError::io(format!("disk full while writing {name}")));
        }
        self.inner.write(name, contents)
    }

    fn exists(&self, name: &str) -> bool {
        self.inner.exists(name)
    }
}

/// Accepts backup writes but never keeps them.
#[derive(Debug, Default, Clone)]
struct LossyStore {
    inner: MemoryStore,
}

impl DataStore for LossyStore {
    fn read(&self, name: &str) -> Result<Option<String>, CoreError> {
        self.inner.read(name)
    }

    fn write(&mut self, name: &str, contents: &str) -> Result<(), CoreError> {
        if name.contains("_backup_") {
            return Ok(());
        }
        self.inner.write(name, contents)
    }

    fn exists(&self, name: &str) -> bool {
        self.inner.exists(name)
    }
}

fn fixture_catalog() -> MemoryCatalog {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../tests/fixtures/catalog.json");
    MemoryCatalog::load(&path).unwrap_or_else(|e| panic!("failed to load {:?}: {}", path, e))
}

fn parse_index(json: &str) -> ItemIndex {
    serde_json::from_str(json).expect("index fixture should parse")
}

fn custom(index: &ItemIndex, item_id: i32) -> u32 {
    index
        .entry(ItemCategory::Resources, item_id)
        .map(|entry| entry.custom_stack_size)
        .expect("entry should exist")
}

#[test]
fn old_index_drops_custom_values_equal_to_baseline() {
    let mut store = MemoryStore::new();
    store.write(INDEX_DOCUMENT, INDEX_3_1_2).expect("write");

    let session = Engine::new()
        .open(fixture_catalog(), store)
        .expect("session should open");

    match session.migration() {
        Ok(MigrationOutcome::Migrated {
            from,
            to,
            changed_entries,
            backup,
            ..
        }) => {
            assert_eq!(*from, SchemaVersion::new(3, 1, 2));
            assert_eq!(*to, SchemaVersion::CURRENT);
            assert_eq!(*changed_entries, 1);
            assert_eq!(backup, "stack_size_index_backup_3.1.2");
        }
        other => panic!("expected a migration, got {:?}", other),
    }
    assert_eq!(custom(session.index(), WOOD), 0);
    assert_eq!(custom(session.index(), STONES), 2000);
    assert_eq!(session.index().version, SchemaVersion::CURRENT);

    let persisted: ItemIndex = read_document(session.store(), INDEX_DOCUMENT)
        .expect("read")
        .expect("index document");
    assert_eq!(persisted.version, SchemaVersion::CURRENT);

    let backup: ItemIndex = read_document(session.store(), &backup_document_name(SchemaVersion::new(3, 1, 2)))
        .expect("read")
        .expect("backup document");
    assert_eq!(custom(&backup, WOOD), 500);
}

#[test]
fn unversioned_index_is_treated_as_oldest() {
    let mut index = parse_index(
        r#"{ "item_categories": { "Resources": [
            { "item_id": -151838493, "shortname": "wood", "vanilla_stack_size": 500, "custom_stack_size": 500 }
        ] } }"#,
    );
    assert_eq!(index.version, SchemaVersion::default());

    let mut store = MemoryStore::new();
    let outcome = migrations::migrate(&mut index, &mut store).expect("migration");
    assert!(matches!(outcome, MigrationOutcome::Migrated { .. }));
    assert!(store.exists("stack_size_index_backup_0.0.0"));
    assert_eq!(custom(&index, WOOD), 0);
}

#[test]
fn current_index_needs_no_migration() {
    let mut index = parse_index(INDEX_3_1_2);
    index.version = SchemaVersion::CURRENT;
    let before = index.clone();

    let mut store = MemoryStore::new();
    let outcome = migrations::migrate(&mut index, &mut store).expect("migration");
    assert_eq!(outcome, MigrationOutcome::UpToDate);
    assert_eq!(index, before);
    assert_eq!(store.names().count(), 0);
}

#[test]
fn failed_backup_leaves_index_document_byte_identical() {
    let mut store = NoBackupStore::default();
    store.write(INDEX_DOCUMENT, INDEX_3_1_2).expect("write");

    let session = Engine::new()
        .open(fixture_catalog(), store)
        .expect("a failed migration must not fail the session");

    let err = session
        .migration()
        .as_ref()
        .expect_err("migration should abort");
    assert_eq!(err.code, CoreErrorCode::MigrationBackupFailed);
    assert_eq!(
        session.store().inner.get(INDEX_DOCUMENT),
        Some(INDEX_3_1_2)
    );
    assert_eq!(session.index().version, SchemaVersion::new(3, 1, 2));
    assert_eq!(custom(session.index(), WOOD), 500);
}

#[test]
fn unverifiable_backup_aborts_the_migration() {
    let mut index = parse_index(INDEX_3_1_2);
    let before = index.clone();
    let mut store = LossyStore::default();
    store.write(INDEX_DOCUMENT, INDEX_3_1_2).expect("write");

    let err = migrations::migrate(&mut index, &mut store).expect_err("migration should abort");
    assert_eq!(err.code, CoreErrorCode::MigrationBackupFailed);
    assert_eq!(index, before);
    assert_eq!(store.inner.get(INDEX_DOCUMENT), Some(INDEX_3_1_2));
}
