mod baseline;
mod commands;
mod config;
mod engine;
mod error;
mod index;
mod item_catalog;
mod messages;
pub mod migrations;
mod resolve;
mod store;
mod types;

pub use baseline::{BaselineFetch, BaselineOrigin, BaselineStatus, BaselineTable, FetchPoll};
pub use commands::{Command, CommandReply, StackValue};
pub use config::{ConfigIntegrity, IgnorePolicy, OverrideConfig};
pub use engine::{Engine, Session};
pub use error::{CoreError, CoreErrorCode};
pub use index::{ItemIndex, ItemIndexEntry};
pub use item_catalog::{ContentTemplate, HeldTemplate, ItemCatalog, ItemDefinition, MemoryCatalog};
pub use messages::{Audience, MESSAGE_PREFIX, MessageKey, decorate, format_message};
pub use migrations::MigrationOutcome;
pub use resolve::{MAX_STACK_SIZE, Resolution, Rule, clamp_stack_size, resolve};
pub use store::{
    BASELINE_DOCUMENT, CONFIG_DOCUMENT, DataStore, DirStore, INDEX_DOCUMENT, MemoryStore,
    read_document, write_document,
};
pub use types::{
    CategoryReportRow, ItemIdentity, ItemKey, ItemReportRow, PassReport, SchemaVersion,
};
