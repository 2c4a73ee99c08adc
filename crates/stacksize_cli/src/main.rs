use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::{debug, info};
use stacksize_core::core_api::{
    Audience, BaselineTable, Command, CommandReply, CoreError, CoreErrorCode, DirStore, Engine,
    MemoryCatalog, Session,
};
use stacksize_render::{JsonStyle, render_reply_json, render_reply_text};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Live item catalog (JSON).
    #[arg(long, value_name = "CATALOG.json")]
    catalog: PathBuf,
    /// Directory holding the configuration, index and baseline documents.
    #[arg(long = "data-dir", value_name = "DIR", default_value = "data")]
    data_dir: PathBuf,
    /// Authoritative baseline table, fetched in the background.
    #[arg(long = "baseline-source", value_name = "PATH")]
    baseline_source: Option<PathBuf>,
    #[arg(long = "fetch-timeout-ms", value_name = "MS", default_value_t = 5000)]
    fetch_timeout_ms: u64,
    #[arg(long, global = true)]
    json: bool,
    /// Write the adjusted stack sizes back into the catalog file.
    #[arg(long = "save-catalog", global = true)]
    save_catalog: bool,
    /// Reply as a player would see it.
    #[arg(long, global = true)]
    player: bool,
    #[command(subcommand)]
    command: CommandArg,
}

#[derive(Debug, Subcommand)]
enum CommandArg {
    /// Custom stack size, or a multiplier when suffixed with x.
    SetStack {
        #[arg(allow_hyphen_values = true)]
        item: String,
        value: String,
    },
    /// Individual hard limit; 0 removes it.
    SetStackLimit {
        #[arg(allow_hyphen_values = true)]
        item: String,
        value: String,
    },
    /// Drop every individual override for one item.
    ClearStack {
        #[arg(allow_hyphen_values = true)]
        item: String,
    },
    /// Category multiplier, or `limit=<n>` for a hard limit.
    SetStackCategory { category: String, value: String },
    SetAllStacks { value: String },
    IgnoreItem {
        #[arg(allow_hyphen_values = true)]
        item: String,
    },
    UnignoreItem {
        #[arg(allow_hyphen_values = true)]
        item: String,
    },
    ItemSearch { needle: String },
    ListCategories,
    ListCategoryItems { category: String },
    /// Rebuild the item index; custom stack sizes stored in it are lost.
    RegenerateIndex,
    RegenerateBaseline,
    Apply,
    Revert,
}

impl CommandArg {
    fn to_command(&self) -> Result<Command, CoreError> {
        let (name, args): (&str, Vec<&str>) = match self {
            CommandArg::SetStack { item, value } => {
                ("set-stack", vec![item.as_str(), value.as_str()])
            }
            CommandArg::SetStackLimit { item, value } => {
                ("set-stack-limit", vec![item.as_str(), value.as_str()])
            }
            CommandArg::ClearStack { item } => ("clear-stack", vec![item.as_str()]),
            CommandArg::SetStackCategory { category, value } => {
                ("set-stack-category", vec![category.as_str(), value.as_str()])
            }
            CommandArg::SetAllStacks { value } => ("set-all-stacks", vec![value.as_str()]),
            CommandArg::IgnoreItem { item } => ("ignore-item", vec![item.as_str()]),
            CommandArg::UnignoreItem { item } => ("unignore-item", vec![item.as_str()]),
            CommandArg::ItemSearch { needle } => ("item-search", vec![needle.as_str()]),
            CommandArg::ListCategories => ("list-categories", vec![]),
            CommandArg::ListCategoryItems { category } => {
                ("list-category-items", vec![category.as_str()])
            }
            CommandArg::RegenerateIndex => ("regenerate-index", vec![]),
            CommandArg::RegenerateBaseline => ("regenerate-baseline", vec![]),
            CommandArg::Apply => ("apply", vec![]),
            CommandArg::Revert => ("revert", vec![]),
        };
        Command::parse(name, &args)
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let audience = if cli.player {
        Audience::Player
    } else {
        Audience::Console
    };

    let catalog = MemoryCatalog::load(&cli.catalog).unwrap_or_else(|e| {
        eprintln!("Error loading catalog {}: {e}", cli.catalog.display());
        process::exit(1);
    });
    let store = DirStore::open(&cli.data_dir).unwrap_or_else(|e| {
        eprintln!("Error opening data directory: {e}");
        process::exit(1);
    });
    let mut session = Engine::new().open(catalog, store).unwrap_or_else(|e| {
        eprintln!("Error loading stored data from {}", cli.data_dir.display());
        eprintln!("  {e}");
        process::exit(1);
    });

    if let Some(source) = &cli.baseline_source {
        let source = source.clone();
        session.begin_baseline_fetch(move || fetch_baseline(&source));
    }
    session.on_world_ready().unwrap_or_else(|e| {
        eprintln!("Error applying stack sizes: {e}");
        process::exit(1);
    });
    if cli.baseline_source.is_some() {
        let status = session
            .wait_baseline_fetch(Duration::from_millis(cli.fetch_timeout_ms))
            .unwrap_or_else(|e| {
                eprintln!("Error applying fetched baseline: {e}");
                process::exit(1);
            });
        debug!("baseline status after fetch: {status:?}");
    }

    let reply = cli
        .command
        .to_command()
        .and_then(|command| session.execute(command))
        .unwrap_or_else(|e| exit_with_error(&session, &e, audience));

    if cli.json {
        let value = render_reply_json(&reply, JsonStyle::CanonicalV1);
        let rendered = serde_json::to_string_pretty(&value).unwrap_or_else(|e| {
            eprintln!("Error rendering JSON output: {e}");
            process::exit(1);
        });
        println!("{rendered}");
    } else {
        let reply = match reply {
            CommandReply::Done { message, report } => CommandReply::Done {
                message: session.decorate(&message, audience),
                report,
            },
            other => other,
        };
        print!("{}", render_reply_text(&reply));
        if !matches!(reply, CommandReply::Items(_) | CommandReply::Categories(_)) {
            println!();
        }
    }

    if cli.save_catalog {
        save_catalog(session.catalog(), &cli.catalog);
    }

    match session.on_shutdown() {
        Ok(Some(report)) => debug!("reverted {} stack sizes on shutdown", report.updated),
        Ok(None) => {}
        Err(e) => {
            eprintln!("Error saving stored data: {e}");
            process::exit(1);
        }
    }
}

fn fetch_baseline(source: &Path) -> Result<BaselineTable, CoreError> {
    let json = fs::read_to_string(source).map_err(|e| {
        CoreError::new(
            CoreErrorCode::BaselineUnavailable,
            format!("failed to read {}: {e}", source.display()),
        )
    })?;
    BaselineTable::from_json_str(&json)
}

fn save_catalog(catalog: &MemoryCatalog, path: &Path) {
    let json = catalog.to_json_string().unwrap_or_else(|e| {
        eprintln!("Error serializing catalog: {e}");
        process::exit(1);
    });
    fs::write(path, json).unwrap_or_else(|e| {
        eprintln!("Error writing {}: {e}", path.display());
        process::exit(1);
    });
    info!("wrote adjusted catalog to {}", path.display());
}

fn exit_with_error(
    session: &Session<MemoryCatalog, DirStore>,
    error: &CoreError,
    audience: Audience,
) -> ! {
    if error.code == CoreErrorCode::InvalidCommandArgument {
        eprintln!("{}", session.decorate(&error.message, audience));
        process::exit(2);
    }
    eprintln!("Error: {error}");
    process::exit(1);
}
