use std::time::Duration;

use log::{debug, info, warn};

use crate::category::ItemCategory;
use crate::guard::{self, GuardOptions, GuardOutcome, TransferReport};
use crate::inventory::{Container, ItemFactory, ItemStack};

use super::baseline::{BaselineFetch, BaselineOrigin, BaselineStatus, BaselineTable, FetchPoll};
use super::commands::{Command, CommandReply, StackValue};
use super::config::{IgnorePolicy, OverrideConfig};
use super::error::{CoreError, CoreErrorCode};
use super::index::{ItemIndex, ItemIndexEntry};
use super::item_catalog::ItemCatalog;
use super::messages::{Audience, MessageKey, decorate, format_message};
use super::migrations::{self, MigrationOutcome};
use super::resolve::{Resolution, clamp_stack_size, resolve};
use super::store::{
    BASELINE_DOCUMENT, CONFIG_DOCUMENT, DataStore, INDEX_DOCUMENT, read_document, write_document,
};
use super::types::{CategoryReportRow, ItemIdentity, ItemKey, ItemReportRow, PassReport, SchemaVersion};

#[derive(Debug, Default, Clone, Copy)]
pub struct Engine;

/// Sole owner of the configuration, the item index and the baseline table.
/// Every mutation of those tables, and of the live catalog, goes through
/// `&mut Session`.
#[derive(Debug)]
pub struct Session<C, S> {
    catalog: C,
    store: S,
    config: OverrideConfig,
    index: ItemIndex,
    baseline: BaselineTable,
    baseline_status: BaselineStatus,
    pending_fetch: Option<BaselineFetch>,
    migration: Result<MigrationOutcome, CoreError>,
}

/// What the application pass does with one catalog item.
enum Placement {
    Untouched,
    Baseline(u32),
    Resolved(Resolution),
}

impl Engine {
    pub fn new() -> Self {
        Self
    }

    /// Loads (or creates) the persisted documents and migrates the index.
    ///
    /// Missing configuration keys are backfilled and the configuration is
    /// rewritten. A migration failure is logged and the session continues
    /// with the unmigrated index; unreadable documents fail the open.
    pub fn open<C: ItemCatalog, S: DataStore>(
        &self,
        catalog: C,
        mut store: S,
    ) -> Result<Session<C, S>, CoreError> {
        let mut config = load_config(&store)?;
        config.version = SchemaVersion::CURRENT;
        write_document(&mut store, CONFIG_DOCUMENT, &config)?;

        let (baseline, baseline_status) =
            match read_document::<BaselineTable>(&store, BASELINE_DOCUMENT)? {
                Some(table) if !table.is_empty() => {
                    debug!("loaded {} baseline stack sizes", table.len());
                    (table, BaselineStatus::Ready)
                }
                _ => (BaselineTable::new(), BaselineStatus::Pending),
            };

        let mut index = match read_document::<ItemIndex>(&store, INDEX_DOCUMENT)? {
            Some(mut index) if !index.is_empty() => {
                index.normalize();
                index
            }
            _ => {
                let index = ItemIndex::build(&catalog, &baseline);
                info!("built item index with {} entries", index.len());
                write_document(&mut store, INDEX_DOCUMENT, &index)?;
                index
            }
        };

        let migration = migrations::migrate(&mut index, &mut store);
        if let Err(e) = &migration {
            warn!(
                "continuing with item index version {}: {}",
                index.version, e.message
            );
        }

        Ok(Session {
            catalog,
            store,
            config,
            index,
            baseline,
            baseline_status,
            pending_fetch: None,
            migration,
        })
    }
}

fn load_config(store: &dyn DataStore) -> Result<OverrideConfig, CoreError> {
    let raw = store.read(CONFIG_DOCUMENT)?;
    let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
        info!("no configuration found, writing defaults");
        return Ok(OverrideConfig::default());
    };
    let (config, integrity) = OverrideConfig::from_json_with_backfill(&raw)?;
    for key in &integrity.backfilled {
        let recovered = CoreError::new(
            CoreErrorCode::ConfigMissingKey,
            format!("configuration key {key} was missing, default restored"),
        );
        info!("{recovered}");
    }
    Ok(config)
}

impl<C: ItemCatalog, S: DataStore> Session<C, S> {
    pub fn config(&self) -> &OverrideConfig {
        &self.config
    }

    pub fn index(&self) -> &ItemIndex {
        &self.index
    }

    pub fn baseline(&self) -> &BaselineTable {
        &self.baseline
    }

    pub fn baseline_status(&self) -> BaselineStatus {
        self.baseline_status
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut C {
        &mut self.catalog
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Result of the index migration attempted when the session opened.
    pub fn migration(&self) -> &Result<MigrationOutcome, CoreError> {
        &self.migration
    }

    pub fn guard_options(&self) -> GuardOptions {
        GuardOptions {
            leave_weapon_state: self.config.leave_weapon_state,
        }
    }

    pub fn decorate(&self, text: &str, audience: Audience) -> String {
        decorate(text, audience, self.config.hide_message_prefix)
    }

    // Lifecycle

    /// Catalog is loaded: settle the baseline, top up the index and apply.
    pub fn on_world_ready(&mut self) -> Result<PassReport, CoreError> {
        if self.baseline.is_empty() && self.pending_fetch.is_none() {
            self.baseline = BaselineTable::snapshot(&self.catalog);
            info!(
                "captured {} baseline stack sizes from the catalog",
                self.baseline.len()
            );
            write_document(&mut self.store, BASELINE_DOCUMENT, &self.baseline)?;
            self.baseline_status = BaselineStatus::Ready;
        }
        let added = self.index.top_up(&self.catalog, &self.baseline);
        if added > 0 {
            info!("added {added} new catalog items to the item index");
        }
        self.refresh_baselines()?;
        self.apply_all()
    }

    pub fn on_checkpoint(&mut self) -> Result<(), CoreError> {
        self.save_config()?;
        self.save_index()
    }

    /// Saves, then puts the catalog back to baseline when configured to.
    pub fn on_shutdown(&mut self) -> Result<Option<PassReport>, CoreError> {
        self.on_checkpoint()?;
        if self.config.revert_on_unload {
            return Ok(Some(self.revert_all()));
        }
        Ok(None)
    }

    // Resolution

    /// Baseline lookup order: table, cached index value, live catalog.
    pub fn baseline_for(&self, identity: &ItemIdentity) -> (u32, BaselineOrigin) {
        if let Some(size) = self.baseline.get(&identity.shortname) {
            return (size, BaselineOrigin::Table);
        }
        if let Some(entry) = self.index.entry(identity.category, identity.item_id)
            && entry.vanilla_stack_size > 0
        {
            return (entry.vanilla_stack_size, BaselineOrigin::IndexCache);
        }
        let live = self.catalog.stack_size(identity.item_id).unwrap_or(0);
        (live, BaselineOrigin::LiveCatalog)
    }

    pub fn resolve_identity(&self, identity: &ItemIdentity) -> Resolution {
        let (baseline, _) = self.baseline_for(identity);
        let custom = self
            .index
            .entry(identity.category, identity.item_id)
            .map_or(0, |entry| entry.custom_stack_size);
        resolve(identity, baseline, custom, &self.config)
    }

    pub fn resolve(&self, item_id: i32) -> Resolution {
        match self.catalog.find_by_id(item_id) {
            Some(identity) => self.resolve_identity(&identity),
            None => Resolution::Degraded {
                baseline: self
                    .index
                    .find_by_id(item_id)
                    .map_or(0, |(_, entry)| entry.vanilla_stack_size),
                fault: CoreError::new(
                    CoreErrorCode::ResolutionFault,
                    format!("item {item_id} is not in the catalog"),
                ),
            },
        }
    }

    /// Value the application pass writes for `item_id`. Items the pass
    /// leaves untouched report their current live value.
    pub fn effective_stack_size(&self, item_id: i32) -> u32 {
        match self.catalog.find_by_id(item_id) {
            Some(identity) => self.effective_or_live(&identity),
            None => self.resolve(item_id).stack_size(),
        }
    }

    /// Value the application pass writes for `identity`, or `None` when
    /// the pass leaves the item untouched.
    pub fn effective_for(&self, identity: &ItemIdentity) -> Option<u32> {
        match self.placement(identity) {
            Placement::Untouched => None,
            Placement::Baseline(value) => Some(value),
            Placement::Resolved(resolution) => Some(resolution.stack_size()),
        }
    }

    fn effective_or_live(&self, identity: &ItemIdentity) -> u32 {
        self.effective_for(identity).unwrap_or_else(|| {
            let (baseline, _) = self.baseline_for(identity);
            self.catalog
                .stack_size(identity.item_id)
                .unwrap_or_else(|| clamp_stack_size(baseline))
        })
    }

    /// Exemptions first (durability, then the ignore list), then the
    /// precedence chain.
    fn placement(&self, identity: &ItemIdentity) -> Placement {
        let exempt_durability =
            identity.has_durability && !self.config.allow_stacking_with_durability;
        if exempt_durability || self.config.is_ignored(identity) {
            if !exempt_durability && self.config.ignore_policy == IgnorePolicy::LeaveUntouched {
                return Placement::Untouched;
            }
            let (baseline, _) = self.baseline_for(identity);
            return Placement::Baseline(clamp_stack_size(baseline));
        }
        Placement::Resolved(self.resolve_identity(identity))
    }

    // Passes

    /// Writes the resolved stack size of every catalog item into the live
    /// catalog. Repeating the pass with unchanged inputs changes nothing.
    pub fn apply_all(&mut self) -> Result<PassReport, CoreError> {
        let mut report = PassReport::default();
        let mut created = 0;

        for identity in self.catalog.identities() {
            if self.insert_entry(&identity) {
                created += 1;
            }
            let value = match self.placement(&identity) {
                Placement::Untouched => {
                    report.skipped += 1;
                    continue;
                }
                Placement::Baseline(value) => {
                    report.forced_baseline += 1;
                    value
                }
                Placement::Resolved(resolution) => {
                    if let Resolution::Degraded { baseline, fault } = &resolution {
                        warn!(
                            "using baseline {baseline} for {}: {}",
                            identity.shortname, fault.message
                        );
                        report.degraded += 1;
                    }
                    resolution.stack_size()
                }
            };

            if self.catalog.set_stack_size(identity.item_id, value) {
                report.updated += 1;
            } else {
                warn!("catalog rejected stack size {value} for {}", identity.shortname);
            }
        }

        if created > 0 {
            debug!("created {created} item index entries during application pass");
            self.save_index()?;
        }
        Ok(report)
    }

    /// Puts every catalog item back to its baseline. Ignored items are left
    /// alone under [`IgnorePolicy::LeaveUntouched`], as in the forward pass.
    pub fn revert_all(&mut self) -> PassReport {
        let mut report = PassReport::default();
        for identity in self.catalog.identities() {
            if self.config.is_ignored(&identity)
                && self.config.ignore_policy == IgnorePolicy::LeaveUntouched
            {
                report.skipped += 1;
                continue;
            }
            let (baseline, _) = self.baseline_for(&identity);
            if self
                .catalog
                .set_stack_size(identity.item_id, clamp_stack_size(baseline))
            {
                report.updated += 1;
            }
        }
        report
    }

    // Index and baseline maintenance

    /// Returns the index entry for `identity`, creating and persisting it
    /// when absent.
    pub fn ensure_entry(&mut self, identity: &ItemIdentity) -> Result<ItemIndexEntry, CoreError> {
        if self.insert_entry(identity) {
            self.save_index()?;
        }
        self.index
            .entry(identity.category, identity.item_id)
            .cloned()
            .ok_or_else(|| {
                CoreError::new(
                    CoreErrorCode::ResolutionFault,
                    format!("no index entry for {}", identity.shortname),
                )
            })
    }

    /// Rewrites cached baselines from the table without touching custom
    /// values, then persists the index.
    pub fn refresh_baselines(&mut self) -> Result<usize, CoreError> {
        let refreshed = self.index.refresh_baselines(&self.catalog, &self.baseline);
        debug!("refreshed {refreshed} cached baselines");
        self.save_index()?;
        Ok(refreshed)
    }

    /// Discards the item index and recreates it from the catalog.
    ///
    /// Every custom stack size stored in the index is lost. Overrides in the
    /// configuration are not affected.
    pub fn rebuild_index(&mut self) -> Result<usize, CoreError> {
        let discarded = self.index.custom_value_count();
        if discarded > 0 {
            warn!("rebuilding item index discards {discarded} custom stack sizes");
        }
        let mut rebuilt = ItemIndex::empty(SchemaVersion::CURRENT);
        for identity in self.catalog.identities() {
            let (vanilla, _) = self.baseline_for(&identity);
            rebuilt.insert_if_absent(&identity, vanilla);
        }
        self.index = rebuilt;
        self.save_index()?;
        Ok(self.index.len())
    }

    /// Reverts first so no applied override is captured as a baseline, then
    /// snapshots the catalog and applies again.
    pub fn regenerate_baseline(&mut self) -> Result<PassReport, CoreError> {
        self.revert_all();
        self.baseline = BaselineTable::snapshot(&self.catalog);
        write_document(&mut self.store, BASELINE_DOCUMENT, &self.baseline)?;
        self.baseline_status = BaselineStatus::Ready;
        info!("regenerated {} baseline stack sizes", self.baseline.len());
        self.refresh_baselines()?;
        self.apply_all()
    }

    // Remote baseline

    /// Starts a background fetch. Until it resolves, resolution keeps using
    /// cached or live values.
    pub fn begin_baseline_fetch<F>(&mut self, fetch: F)
    where
        F: FnOnce() -> Result<BaselineTable, CoreError> + Send + 'static,
    {
        self.pending_fetch = Some(BaselineFetch::spawn(fetch));
        if self.baseline_status != BaselineStatus::Ready {
            self.baseline_status = BaselineStatus::Pending;
        }
    }

    /// Non-blocking; applies a finished fetch on the caller's turn.
    pub fn poll_baseline_fetch(&mut self) -> Result<BaselineStatus, CoreError> {
        let Some(fetch) = self.pending_fetch.take() else {
            return Ok(self.baseline_status);
        };
        match fetch.try_complete() {
            FetchPoll::Pending => {
                self.pending_fetch = Some(fetch);
                Ok(self.baseline_status)
            }
            FetchPoll::Finished(result) => self.finish_baseline_fetch(result),
        }
    }

    pub fn wait_baseline_fetch(&mut self, timeout: Duration) -> Result<BaselineStatus, CoreError> {
        let Some(fetch) = self.pending_fetch.take() else {
            return Ok(self.baseline_status);
        };
        self.finish_baseline_fetch(fetch.wait(timeout))
    }

    fn finish_baseline_fetch(
        &mut self,
        result: Result<BaselineTable, CoreError>,
    ) -> Result<BaselineStatus, CoreError> {
        match result {
            Ok(table) => {
                info!("baseline fetch delivered {} stack sizes", table.len());
                self.baseline.merge(table);
                write_document(&mut self.store, BASELINE_DOCUMENT, &self.baseline)?;
                self.baseline_status = BaselineStatus::Ready;
                self.refresh_baselines()?;
                self.apply_all()?;
            }
            Err(e) => {
                warn!(
                    "baseline fetch failed, falling back to cached and live values: {}",
                    e.message
                );
                if self.baseline.is_empty() {
                    self.baseline_status = BaselineStatus::Unavailable;
                }
            }
        }
        Ok(self.baseline_status)
    }

    // Commands

    /// Runs one operator command. Lookups happen before any mutation, so a
    /// rejected command leaves every table untouched.
    pub fn execute(&mut self, command: Command) -> Result<CommandReply, CoreError> {
        debug!("executing {}", command.name());
        let report = match command {
            Command::SetStack { item, value } => {
                let identity = self.lookup(&item)?;
                match value {
                    StackValue::Absolute(size) => {
                        self.insert_entry(&identity);
                        if let Some(entry) = self.index.entry_mut(identity.category, identity.item_id) {
                            entry.custom_stack_size = size;
                        }
                        self.save_index()?;
                    }
                    StackValue::Multiplier(multiplier) => {
                        self.config.individual_multipliers.remove(&ItemKey::ById(identity.item_id));
                        self.config
                            .individual_multipliers
                            .insert(ItemKey::ByShortname(identity.shortname.clone()), multiplier);
                        self.save_config()?;
                    }
                }
                self.apply_all()?
            }
            Command::SetStackLimit { item, limit } => {
                let identity = self.lookup(&item)?;
                self.config.individual_hard_limits.remove(&ItemKey::ById(identity.item_id));
                let key = ItemKey::ByShortname(identity.shortname.clone());
                if limit == 0 {
                    self.config.individual_hard_limits.remove(&key);
                } else {
                    self.config.individual_hard_limits.insert(key, limit);
                }
                self.save_config()?;
                self.apply_all()?
            }
            Command::ClearStack { item } => {
                let identity = self.lookup(&item)?;
                self.config.clear_individual(&identity);
                if let Some(entry) = self.index.entry_mut(identity.category, identity.item_id) {
                    entry.custom_stack_size = 0;
                }
                self.save_config()?;
                self.save_index()?;
                self.apply_all()?
            }
            Command::SetStackCategory { category, value } => {
                match value {
                    StackValue::Multiplier(multiplier) => {
                        self.config.category_multipliers.insert(category, multiplier);
                        self.config.category_hard_limits.insert(category, 0);
                    }
                    StackValue::Absolute(limit) => {
                        self.config.category_hard_limits.insert(category, limit);
                    }
                }
                self.save_config()?;
                self.apply_all()?
            }
            Command::SetAllStacks { multiplier } => {
                for category in ItemCategory::INDEXED {
                    self.config.category_multipliers.insert(category, multiplier);
                    self.config.category_hard_limits.insert(category, 0);
                }
                self.save_config()?;
                self.apply_all()?
            }
            Command::IgnoreItem { item } => {
                let identity = self.lookup(&item)?;
                let (baseline, _) = self.baseline_for(&identity);
                let baseline = clamp_stack_size(baseline);
                if !self.catalog.set_stack_size(identity.item_id, baseline) {
                    warn!(
                        "catalog rejected stack size {baseline} for {}",
                        identity.shortname
                    );
                }
                self.config.ignored_items.insert(identity.shortname);
                self.save_config()?;
                self.apply_all()?
            }
            Command::UnignoreItem { item } => {
                let identity = self.lookup(&item)?;
                self.config.ignored_items.remove(&identity.shortname);
                self.save_config()?;
                self.apply_all()?
            }
            Command::ItemSearch { needle } => return Ok(CommandReply::Items(self.search(&needle))),
            Command::ListCategories => return Ok(CommandReply::Categories(self.list_categories())),
            Command::ListCategoryItems { category } => {
                return Ok(CommandReply::Items(self.list_category_items(category)));
            }
            Command::RegenerateIndex => {
                self.rebuild_index()?;
                self.apply_all()?
            }
            Command::RegenerateBaseline => self.regenerate_baseline()?,
            Command::Apply => self.apply_all()?,
            Command::Revert => self.revert_all(),
        };

        Ok(CommandReply::Done {
            message: format_message(MessageKey::OperationSuccessful, &[]),
            report,
        })
    }

    /// Case-insensitive match on shortname or display name.
    pub fn search(&self, needle: &str) -> Vec<ItemReportRow> {
        let needle = needle.trim().to_lowercase();
        self.catalog
            .identities()
            .iter()
            .filter(|identity| {
                identity.shortname.to_lowercase().contains(&needle)
                    || identity.display_name.to_lowercase().contains(&needle)
            })
            .map(|identity| self.report_row(identity))
            .collect()
    }

    pub fn list_categories(&self) -> Vec<CategoryReportRow> {
        ItemCategory::INDEXED
            .iter()
            .map(|&category| CategoryReportRow {
                category,
                item_count: self.index.category_len(category),
            })
            .collect()
    }

    pub fn list_category_items(&self, category: ItemCategory) -> Vec<ItemReportRow> {
        self.catalog
            .identities()
            .iter()
            .filter(|identity| identity.category == category)
            .map(|identity| self.report_row(identity))
            .collect()
    }

    fn report_row(&self, identity: &ItemIdentity) -> ItemReportRow {
        let (baseline, _) = self.baseline_for(identity);
        let custom = self
            .index
            .entry(identity.category, identity.item_id)
            .map_or(0, |entry| entry.custom_stack_size);
        ItemReportRow {
            item_id: identity.item_id,
            shortname: identity.shortname.clone(),
            category: identity.category,
            baseline,
            custom,
            effective: self.effective_or_live(identity),
        }
    }

    fn lookup(&self, item: &str) -> Result<ItemIdentity, CoreError> {
        self.catalog.find(item).ok_or_else(|| {
            CoreError::invalid_argument(format_message(MessageKey::InvalidItemShortnameOrId, &[]))
        })
    }

    /// Creates an in-memory index entry; the caller persists.
    fn insert_entry(&mut self, identity: &ItemIdentity) -> bool {
        if self.index.entry(identity.category, identity.item_id).is_some() {
            return false;
        }
        let (vanilla, origin) = self.baseline_for(identity);
        if origin == BaselineOrigin::LiveCatalog && self.baseline_status != BaselineStatus::Ready {
            debug!(
                "caching live stack size {vanilla} as baseline for {}",
                identity.shortname
            );
        }
        self.index.insert_if_absent(identity, vanilla)
    }

    fn save_config(&mut self) -> Result<(), CoreError> {
        write_document(&mut self.store, CONFIG_DOCUMENT, &self.config)
    }

    fn save_index(&mut self) -> Result<(), CoreError> {
        write_document(&mut self.store, INDEX_DOCUMENT, &self.index)
    }
}

impl<C: ItemCatalog + ItemFactory, S: DataStore> Session<C, S> {
    pub fn split_item(&self, item: &mut ItemStack, amount: u32) -> GuardOutcome<ItemStack> {
        guard::split_stack(self.guard_options(), &self.catalog, item, amount)
    }

    pub fn transfer_into_container(
        &self,
        moving: &mut ItemStack,
        container: &mut Container,
        target_slot: Option<usize>,
    ) -> GuardOutcome<TransferReport> {
        guard::transfer_into_container(
            self.guard_options(),
            &self.catalog,
            moving,
            container,
            target_slot,
        )
    }

    pub fn can_stack(&self, item: &ItemStack, target: &ItemStack) -> bool {
        let stackable = self.catalog.stack_size(item.item_id).unwrap_or(1);
        guard::can_stack(item, target, stackable)
    }
}
