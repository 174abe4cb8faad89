use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use sportsbook::data::{default_db_path, seed_demo, DataStore, SqliteStore};
use sportsbook::report::SearchReport;
use sportsbook::{catalogue, ActivityManager, Attributes};

#[derive(Parser)]
#[command(name = "sb", about = "Sportsbook catalogue: sports, events and selections")]
struct Cli {
    /// Path to the catalogue database (default: $SPORTSBOOK_DB or ~/.local/share/sportsbook/catalogue.db)
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the schema
    Init {
        /// Drop all existing tables first
        #[arg(long)]
        reset: bool,

        /// Insert the demo catalogue
        #[arg(long)]
        seed: bool,
    },

    /// List sports, or one sport and optionally its events
    Sports {
        #[arg(long)]
        name: Option<String>,

        /// List the events of --name instead of the sport itself
        #[arg(long, requires = "name")]
        events: bool,
    },

    /// List events, or one event and optionally its selections
    Events {
        #[arg(long)]
        name: Option<String>,

        /// List the selections of --name instead of the event itself
        #[arg(long, requires = "name")]
        selections: bool,
    },

    /// List selections, or one selection
    Selections {
        #[arg(long)]
        name: Option<String>,
    },

    /// Create a sport, event or selection from a JSON attribute object
    Create {
        /// e.g. '{"name": "Final", "sport": "Football"}'
        attrs: String,
    },

    /// Mark an event as started
    Start { name: String },

    /// Deactivate an activity, cascading to parents and children
    Disable {
        /// e.g. '{"name": "Norway Win", "outcome": 3}'
        attrs: String,
    },

    /// Delete an activity and everything below it
    Delete {
        /// e.g. '{"name": "Football"}'
        attrs: String,
    },

    /// Search across sports, events and selections
    Search {
        /// Extra SQL predicate over aliases t (sports), t1 (events), t2 (selections)
        #[arg(long, default_value = "")]
        expression: String,

        /// Filter id: 0 = name matches regex, 1 = started in last 24h, 2 = won
        #[arg(long = "filter")]
        filters: Vec<i64>,

        /// Regex used by filter 0
        #[arg(long, default_value = "^N")]
        regex: String,

        /// Export results to CSV
        #[arg(long)]
        csv: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let store = open_store(cli.db.as_deref())?;

    match cli.command {
        Commands::Init { reset, seed } => cmd_init(&store, reset, seed),
        Commands::Sports { name, events } => cmd_sports(&store, name, events),
        Commands::Events { name, selections } => cmd_events(&store, name, selections),
        Commands::Selections { name } => cmd_selections(&store, name),
        Commands::Create { attrs } => {
            let attrs = parse_attrs(&attrs)?;
            let created = ActivityManager::new(&store)
                .create_activity(&attrs)
                .context("create failed")?;
            println!("Created {}.", created);
            Ok(())
        }
        Commands::Start { name } => {
            let started = ActivityManager::new(&store)
                .start_event(&name)
                .context("start failed")?;
            println!("Started {}.", started);
            Ok(())
        }
        Commands::Disable { attrs } => {
            let attrs = parse_attrs(&attrs)?;
            let report = ActivityManager::new(&store)
                .disable_activity(&attrs)
                .context("disable failed")?;
            println!("Disabled {}.", report.target);
            for parent in &report.cascaded_up {
                println!("  also closed {}", parent);
            }
            Ok(())
        }
        Commands::Delete { attrs } => {
            let attrs = parse_attrs(&attrs)?;
            let report = ActivityManager::new(&store)
                .delete_activity(&attrs)
                .context("delete failed")?;
            println!(
                "Deleted, along with {} events and {} selections.",
                report.events, report.selections
            );
            Ok(())
        }
        Commands::Search {
            expression,
            filters,
            regex,
            csv,
        } => cmd_search(&store, &expression, &filters, &regex, csv),
    }
}

fn open_store(db: Option<&str>) -> Result<SqliteStore> {
    let path = match db {
        Some(p) => PathBuf::from(p),
        None => default_db_path().context("HOME not set and no --db given")?,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let store = SqliteStore::open(&path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;
    store.init().context("failed to initialize schema")?;
    Ok(store)
}

fn parse_attrs(raw: &str) -> Result<Attributes> {
    let value: serde_json::Value =
        serde_json::from_str(raw).with_context(|| format!("invalid JSON: {}", raw))?;
    match value {
        serde_json::Value::Object(map) => Ok(map),
        _ => bail!("attributes must be a JSON object"),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_init(store: &SqliteStore, reset: bool, seed: bool) -> Result<()> {
    if reset {
        store.reset().context("failed to reset database")?;
    }
    if seed {
        seed_demo(store).context("failed to seed demo data")?;
    }
    println!("Database ready.");
    Ok(())
}

fn cmd_sports(store: &SqliteStore, name: Option<String>, events: bool) -> Result<()> {
    match name {
        Some(name) if events => print_json(&catalogue::events_for_sport(store, &name)?),
        Some(name) => print_json(&catalogue::find_sport(store, &name)?),
        None => print_json(&catalogue::list_sports(store)?),
    }
}

fn cmd_events(store: &SqliteStore, name: Option<String>, selections: bool) -> Result<()> {
    match name {
        Some(name) if selections => print_json(&catalogue::selections_for_event(store, &name)?),
        Some(name) => print_json(&catalogue::find_event(store, &name)?),
        None => print_json(&catalogue::list_events(store)?),
    }
}

fn cmd_selections(store: &SqliteStore, name: Option<String>) -> Result<()> {
    match name {
        Some(name) => print_json(&catalogue::find_selection(store, &name)?),
        None => print_json(&catalogue::list_selections(store)?),
    }
}

fn cmd_search(
    store: &SqliteStore,
    expression: &str,
    filters: &[i64],
    regex: &str,
    csv_path: Option<String>,
) -> Result<()> {
    let rows = ActivityManager::new(store)
        .search_activities(expression, filters, regex)
        .context("search failed")?;

    let report = SearchReport::from_rows(rows);
    report.print();

    if let Some(ref path) = csv_path {
        let csv_path = PathBuf::from(path);
        report
            .export_csv(&csv_path)
            .with_context(|| format!("failed to export CSV to {}", path))?;
        println!("Results exported to {}", path);
    }

    Ok(())
}
