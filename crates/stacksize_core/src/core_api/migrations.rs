use log::{error, info};

use super::error::{CoreError, CoreErrorCode};
use super::index::ItemIndex;
use super::store::{DataStore, INDEX_DOCUMENT, write_document};
use super::types::SchemaVersion;

/// One breaking change to the item index layout. Applies to every index
/// whose version is at or below `from`.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub from: SchemaVersion,
    pub name: &'static str,
    apply: fn(&mut ItemIndex) -> usize,
}

/// Ordered oldest first.
pub const MIGRATIONS: &[Migration] = &[Migration {
    from: SchemaVersion::new(3, 1, 2),
    name: "clear-custom-equal-to-vanilla",
    apply: clear_custom_equal_to_vanilla,
}];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    UpToDate,
    Migrated {
        from: SchemaVersion,
        to: SchemaVersion,
        steps: Vec<&'static str>,
        changed_entries: usize,
        backup: String,
    },
}

pub fn pending(version: SchemaVersion) -> impl Iterator<Item = &'static Migration> {
    MIGRATIONS
        .iter()
        .filter(move |migration| version <= migration.from)
}

pub fn backup_document_name(version: SchemaVersion) -> String {
    format!("{INDEX_DOCUMENT}_backup_{version}")
}

/// Brings `index` up to [`SchemaVersion::CURRENT`].
///
/// A verified backup of the untouched index is written before any step
/// runs. If the backup cannot be written and read back identically the
/// index is left exactly as it was, in memory and in the store.
pub fn migrate(
    index: &mut ItemIndex,
    store: &mut dyn DataStore,
) -> Result<MigrationOutcome, CoreError> {
    let from = index.version;
    let steps: Vec<&Migration> = pending(from).collect();
    if steps.is_empty() {
        if from < SchemaVersion::CURRENT {
            index.version = SchemaVersion::CURRENT;
            write_document(store, INDEX_DOCUMENT, index)?;
        }
        return Ok(MigrationOutcome::UpToDate);
    }

    info!(
        "item index version {from} needs {} migration step(s); backing up before migrating",
        steps.len()
    );
    let backup = backup_document_name(from);
    if let Err(e) = write_verified_backup(index, store, &backup) {
        error!(
            "item index backup to {backup} failed, migration aborted and data left untouched: {}",
            e.message
        );
        return Err(e);
    }

    let mut migrated = index.clone();
    let mut changed_entries = 0;
    for step in &steps {
        let changed = (step.apply)(&mut migrated);
        info!("migration {} updated {changed} entries", step.name);
        changed_entries += changed;
    }
    migrated.version = SchemaVersion::CURRENT;
    write_document(store, INDEX_DOCUMENT, &migrated)?;
    *index = migrated;

    info!(
        "item index migrated from {from} to {}; backup {backup} must be removed manually",
        SchemaVersion::CURRENT
    );
    Ok(MigrationOutcome::Migrated {
        from,
        to: SchemaVersion::CURRENT,
        steps: steps.iter().map(|step| step.name).collect(),
        changed_entries,
        backup,
    })
}

fn write_verified_backup(
    index: &ItemIndex,
    store: &mut dyn DataStore,
    name: &str,
) -> Result<(), CoreError> {
    let rendered = serde_json::to_string_pretty(index).map_err(|e| {
        CoreError::new(
            CoreErrorCode::MigrationBackupFailed,
            format!("failed to serialize index backup: {e}"),
        )
    })?;
    store.write(name, &rendered).map_err(|e| {
        CoreError::new(
            CoreErrorCode::MigrationBackupFailed,
            format!("failed to write {name}: {}", e.message),
        )
    })?;

    let read_back = store.read(name).ok().flatten();
    if !store.exists(name) || read_back.as_deref() != Some(rendered.as_str()) {
        return Err(CoreError::new(
            CoreErrorCode::MigrationBackupFailed,
            format!("backup {name} could not be verified after writing"),
        ));
    }
    Ok(())
}

/// A custom value equal to the cached baseline carries no information.
fn clear_custom_equal_to_vanilla(index: &mut ItemIndex) -> usize {
    let mut changed = 0;
    for entry in index.item_categories.values_mut().flatten() {
        if entry.custom_stack_size != 0 && entry.custom_stack_size == entry.vanilla_stack_size {
            entry.custom_stack_size = 0;
            changed += 1;
        }
    }
    changed
}
