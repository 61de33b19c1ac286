//! CLI definition and argument parsing for ABOP
//!
//! This module defines the command-line interface structure using clap's
//! derive API: one variant per engine verb (§6.2), each carrying its own
//! `--database` override so every command is independently scriptable.

use crate::commands;
use crate::commands::book::FieldEdit;
use crate::error::CliResult;
use crate::output::CliOutput;
use crate::utils::parse_field_assignment;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command line arguments for ABOP CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug output (even more verbose)
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Commands to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Queue a filesystem scan over one or more root directories
    Scan {
        roots: Vec<PathBuf>,
        #[arg(short = 'f', long)]
        database: Option<PathBuf>,
    },
    /// Queue the organizer for one book
    Organize {
        book_id: String,
        #[arg(short = 'f', long)]
        database: Option<PathBuf>,
    },
    /// Queue a bulk metadata fetch over one or more books
    FetchMetadata {
        book_ids: Vec<String>,
        /// Refetch even fields that already have a fetched value
        #[arg(long)]
        refresh_all: bool,
        #[arg(short = 'f', long)]
        database: Option<PathBuf>,
    },
    /// Synchronously import a single file
    Import {
        path: PathBuf,
        /// Run the organizer on the resulting book immediately
        #[arg(long)]
        organize: bool,
        #[arg(short = 'f', long)]
        database: Option<PathBuf>,
    },
    /// Inspect and edit books
    Book {
        #[command(subcommand)]
        command: BookCommands,
    },
    /// Mark a book, author, or series as wanted
    Wanted {
        #[command(subcommand)]
        command: WantedCommands,
    },
    /// Inspect and control queued operations
    Operation {
        #[command(subcommand)]
        command: OperationCommands,
    },
    /// Manage the blocked-hash denylist
    BlockedHash {
        #[command(subcommand)]
        command: BlockedHashCommands,
    },
    /// Read-only directory listing for UI navigation
    Browse {
        path: PathBuf,
        #[arg(short = 'f', long)]
        database: Option<PathBuf>,
    },
    /// Wipe the library database (files on disk are untouched)
    FactoryReset {
        /// Required to actually perform the reset
        #[arg(long)]
        yes: bool,
        #[arg(short = 'f', long)]
        database: Option<PathBuf>,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Watch directories in the foreground, queuing a debounced scan on change
    Watch {
        paths: Vec<PathBuf>,
        #[arg(short = 'f', long)]
        database: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum BookCommands {
    /// List books, optionally filtered
    List {
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        author_id: Option<String>,
        #[arg(long)]
        series_id: Option<String>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(short = 'f', long)]
        database: Option<PathBuf>,
    },
    /// Fetch one book by id
    Get {
        id: String,
        #[arg(short = 'f', long)]
        database: Option<PathBuf>,
    },
    /// Edit one or more fields and/or tags on a book
    Update {
        id: String,
        /// Set a stored value, e.g. `--set title=Dune`
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
        /// Clear a stored value, e.g. `--clear-stored narrator`
        #[arg(long = "clear-stored", value_name = "FIELD")]
        clear_stored: Vec<String>,
        /// Pin an override value, e.g. `--override title=Dune`
        #[arg(long = "override", value_name = "FIELD=VALUE")]
        set_override: Vec<String>,
        /// Remove a pinned override, e.g. `--clear-override title`
        #[arg(long = "clear-override", value_name = "FIELD")]
        clear_override: Vec<String>,
        /// Replace the book's tag set entirely; omit to leave tags alone
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,
        #[arg(short = 'f', long)]
        database: Option<PathBuf>,
    },
    /// Soft-delete a book
    Delete {
        id: String,
        /// Block the book's content hashes from re-entering the library
        #[arg(long)]
        prevent_reimport: bool,
        #[arg(long)]
        reason: Option<String>,
        #[arg(short = 'f', long)]
        database: Option<PathBuf>,
    },
    /// Restore a soft-deleted book
    Restore {
        id: String,
        #[arg(short = 'f', long)]
        database: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum WantedCommands {
    /// Mark a single book as wanted
    Book {
        title: String,
        #[arg(long)]
        author: Option<String>,
        #[arg(short = 'f', long)]
        database: Option<PathBuf>,
    },
    /// Mark every book by an author as wanted
    Author {
        name: String,
        #[arg(short = 'f', long)]
        database: Option<PathBuf>,
    },
    /// Mark every book in a series as wanted
    Series {
        title: String,
        #[arg(long)]
        author: Option<String>,
        #[arg(short = 'f', long)]
        database: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum OperationCommands {
    /// Fetch one operation's current status
    Get {
        id: String,
        #[arg(short = 'f', long)]
        database: Option<PathBuf>,
    },
    /// Request cancellation of a running operation
    Cancel {
        id: String,
        #[arg(short = 'f', long)]
        database: Option<PathBuf>,
    },
    /// Tail an operation's log until it reaches a terminal status
    Logs {
        id: String,
        #[arg(short = 'f', long)]
        database: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum BlockedHashCommands {
    /// List blocked content hashes
    List {
        #[arg(long, default_value_t = 50)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(short = 'f', long)]
        database: Option<PathBuf>,
    },
    /// Block a content hash from ever re-entering the library
    Add {
        hash: String,
        reason: String,
        #[arg(short = 'f', long)]
        database: Option<PathBuf>,
    },
    /// Unblock a content hash
    Remove {
        hash: String,
        #[arg(short = 'f', long)]
        database: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
}

/// Initialize logging based on CLI arguments.
///
/// The engine emits its own instrumentation through `tracing` (§12), so the
/// CLI installs a `tracing-subscriber` rather than the `log` facade; `-v`/
/// `-d` raise the default filter the same way they would a `log` level.
pub fn init_logging(args: &Args) {
    let default_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .init();
}

fn parse_field_edits(
    set: Vec<String>,
    clear_stored: Vec<String>,
    set_override: Vec<String>,
    clear_override: Vec<String>,
) -> CliResult<Vec<FieldEdit>> {
    let mut edits = Vec::new();
    for assignment in set {
        let (field, value) = parse_field_assignment(&assignment)?;
        edits.push(FieldEdit::Set(field, value));
    }
    for name in clear_stored {
        edits.push(FieldEdit::ClearStored(crate::utils::parse_field_name(&name)?));
    }
    for assignment in set_override {
        let (field, value) = parse_field_assignment(&assignment)?;
        edits.push(FieldEdit::Override(field, value));
    }
    for name in clear_override {
        edits.push(FieldEdit::ClearOverride(crate::utils::parse_field_name(&name)?));
    }
    Ok(edits)
}

/// Main CLI dispatch function. Returns the structured result for the
/// caller to print, so `main` has one place that formats output and sets
/// the process exit code.
///
/// # Errors
///
/// Returns whatever error the dispatched command produced.
pub async fn run() -> CliResult<CliOutput> {
    let args = Args::parse();
    init_logging(&args);
    tracing::debug!("dispatching command: {args:?}");

    match args.command {
        Commands::Scan { roots, database } => commands::scan::run(roots, database),
        Commands::Organize { book_id, database } => commands::organize::run(book_id, database),
        Commands::FetchMetadata { book_ids, refresh_all, database } => {
            commands::fetch_metadata::run(book_ids, refresh_all, database)
        }
        Commands::Import { path, organize, database } => {
            commands::import::run(path, organize, database).await
        }
        Commands::Book { command } => match command {
            BookCommands::List { state, author_id, series_id, search, limit, offset, database } => {
                commands::book::list(state, author_id, series_id, search, limit, offset, database)
            }
            BookCommands::Get { id, database } => commands::book::get(id, database),
            BookCommands::Update { id, set, clear_stored, set_override, clear_override, tags, database } => {
                let edits = parse_field_edits(set, clear_stored, set_override, clear_override)?;
                let tags = if tags.is_empty() { None } else { Some(tags) };
                commands::book::update(id, edits, tags, database).await
            }
            BookCommands::Delete { id, prevent_reimport, reason, database } => {
                commands::book::delete(id, prevent_reimport, reason, database).await
            }
            BookCommands::Restore { id, database } => commands::book::restore(id, database).await,
        },
        Commands::Wanted { command } => match command {
            WantedCommands::Book { title, author, database } => commands::wanted::book(title, author, database),
            WantedCommands::Author { name, database } => commands::wanted::author(name, database),
            WantedCommands::Series { title, author, database } => {
                commands::wanted::series(title, author, database)
            }
        },
        Commands::Operation { command } => match command {
            OperationCommands::Get { id, database } => commands::operation::get(id, database),
            OperationCommands::Cancel { id, database } => commands::operation::cancel(id, database),
            OperationCommands::Logs { id, database } => commands::operation::logs(id, database).await,
        },
        Commands::BlockedHash { command } => match command {
            BlockedHashCommands::List { limit, offset, database } => {
                commands::blocked_hash::list(limit, offset, database)
            }
            BlockedHashCommands::Add { hash, reason, database } => {
                commands::blocked_hash::add(hash, reason, database)
            }
            BlockedHashCommands::Remove { hash, database } => commands::blocked_hash::remove(hash, database),
        },
        Commands::Browse { path, database } => commands::browse::run(path, database).await,
        Commands::FactoryReset { yes, database } => commands::factory_reset::run(yes, database),
        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                let json = commands::config::show()?;
                println!("{json}");
                Ok(CliOutput::ok())
            }
        },
        Commands::Watch { paths, database } => commands::watch::run(paths, database).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_factory_builds_a_valid_cli() {
        let cmd = Args::command();
        assert!(!cmd.get_name().is_empty());
        assert!(cmd.get_version().is_some());
    }

    #[test]
    fn parses_scan_with_multiple_roots() {
        let args = Args::try_parse_from(["abop-cli", "scan", "/a", "/b", "--database", "/db.sqlite"]).unwrap();
        match args.command {
            Commands::Scan { roots, database } => {
                assert_eq!(roots, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
                assert_eq!(database, Some(PathBuf::from("/db.sqlite")));
            }
            _ => panic!("expected scan command"),
        }
    }

    #[test]
    fn parses_book_update_with_repeated_set_flags() {
        let args = Args::try_parse_from([
            "abop-cli",
            "book",
            "update",
            "book-1",
            "--set",
            "title=Dune",
            "--set",
            "author=Frank Herbert",
            "--clear-override",
            "narrator",
        ])
        .unwrap();
        match args.command {
            Commands::Book { command: BookCommands::Update { id, set, clear_override, .. } } => {
                assert_eq!(id, "book-1");
                assert_eq!(set, vec!["title=Dune", "author=Frank Herbert"]);
                assert_eq!(clear_override, vec!["narrator"]);
            }
            _ => panic!("expected book update command"),
        }
    }

    #[test]
    fn factory_reset_requires_explicit_yes_flag_in_parsed_args() {
        let args = Args::try_parse_from(["abop-cli", "factory-reset"]).unwrap();
        match args.command {
            Commands::FactoryReset { yes, .. } => assert!(!yes),
            _ => panic!("expected factory-reset command"),
        }
    }
}
