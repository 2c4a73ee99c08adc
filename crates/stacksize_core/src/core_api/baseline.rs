use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError, bounded};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::error::{CoreError, CoreErrorCode};
use super::item_catalog::ItemCatalog;

/// Unmodified stack size per shortname. Read-only ground truth: the engine
/// never writes override results into it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BaselineTable {
    sizes: BTreeMap<String, u32>,
}

impl BaselineTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the catalog's current values. Only meaningful while no override
    /// has been applied to the catalog.
    pub fn snapshot<C: ItemCatalog + ?Sized>(catalog: &C) -> Self {
        let sizes = catalog
            .identities()
            .into_iter()
            .filter_map(|identity| {
                catalog
                    .stack_size(identity.item_id)
                    .map(|size| (identity.shortname, size))
            })
            .collect();
        Self { sizes }
    }

    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        serde_json::from_str(json)
            .map_err(|e| CoreError::parse(format!("failed to parse baseline table: {e}")))
    }

    pub fn get(&self, shortname: &str) -> Option<u32> {
        self.sizes.get(shortname).copied()
    }

    pub fn insert(&mut self, shortname: impl Into<String>, size: u32) {
        self.sizes.insert(shortname.into(), size);
    }

    /// Entries from `other` win.
    pub fn merge(&mut self, other: BaselineTable) {
        self.sizes.extend(other.sizes);
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaselineStatus {
    Ready,
    Pending,
    Unavailable,
}

/// Where the baseline used for one resolution came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaselineOrigin {
    Table,
    IndexCache,
    LiveCatalog,
}

#[derive(Debug)]
pub enum FetchPoll {
    Pending,
    Finished(Result<BaselineTable, CoreError>),
}

/// One-shot baseline fetch running off the main turn. The worker posts its
/// terminal result on a channel; the owning session picks it up.
#[derive(Debug)]
pub struct BaselineFetch {
    receiver: Receiver<Result<BaselineTable, CoreError>>,
}

impl BaselineFetch {
    pub fn spawn<F>(fetch: F) -> Self
    where
        F: FnOnce() -> Result<BaselineTable, CoreError> + Send + 'static,
    {
        let (sender, receiver) = bounded(1);
        let spawned = thread::Builder::new()
            .name("baseline-fetch".to_string())
            .spawn(move || {
                let result = fetch();
                if sender.send(result).is_err() {
                    debug!("baseline fetch finished after its session was dropped");
                }
            });
        if let Err(e) = spawned {
            warn!("failed to start baseline fetch worker: {e}");
        }
        Self { receiver }
    }

    pub fn try_complete(&self) -> FetchPoll {
        match self.receiver.try_recv() {
            Ok(result) => FetchPoll::Finished(result),
            Err(TryRecvError::Empty) => FetchPoll::Pending,
            Err(TryRecvError::Disconnected) => FetchPoll::Finished(Err(worker_gone())),
        }
    }

    /// Timing out is terminal, the same as a failed fetch.
    pub fn wait(&self, timeout: Duration) -> Result<BaselineTable, CoreError> {
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(CoreError::new(
                CoreErrorCode::BaselineUnavailable,
                format!("baseline fetch timed out after {} ms", timeout.as_millis()),
            )),
            Err(RecvTimeoutError::Disconnected) => Err(worker_gone()),
        }
    }
}

fn worker_gone() -> CoreError {
    CoreError::new(
        CoreErrorCode::BaselineUnavailable,
        "baseline fetch worker exited without a result",
    )
}
