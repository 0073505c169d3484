//! Command-line interface for libris.
//!
//! Provides commands for browsing the category tree, managing categories
//! and items, and exporting or restoring backups.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::core::{FileStorage, Session, SessionEvent, SessionOptions};
use crate::domain::{CategoryId, ItemId, Notice};
use crate::library::Library;

pub mod category;
pub mod item;

/// libris - Personal document library organised as a category tree
#[derive(Parser, Debug)]
#[command(name = "libris")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the category tree with item counts
    Tree,

    /// Manage categories
    Category {
        #[command(subcommand)]
        command: category::CategoryCommands,
    },

    /// Manage items
    Item {
        #[command(subcommand)]
        command: item::ItemCommands,
    },

    /// Write a backup file
    Export {
        /// Directory to write into (defaults to the configured backups dir)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace the library with the contents of a backup file
    Import {
        /// Backup file to restore
        file: PathBuf,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Tree => show_tree().await,
            Commands::Category { command } => category::execute(command).await,
            Commands::Item { command } => item::execute(command).await,
            Commands::Export { output } => export_library(output).await,
            Commands::Import { file } => import_library(&file).await,
            Commands::Config => show_config().await,
        }
    }
}

/// A file-backed session plus a receiver for its alerts
pub(crate) struct Workspace {
    pub session: Session<FileStorage>,
    events: broadcast::Receiver<SessionEvent>,
}

impl Workspace {
    /// Open the library at the configured home
    pub async fn open() -> Result<Self> {
        let cfg = crate::config::config()?;
        let storage = FileStorage::from_config()?;
        let options = SessionOptions {
            default_category_name: cfg.default_category_name.clone(),
        };

        let session = Session::open(storage, options)
            .await
            .with_context(|| format!("Failed to open library at {}", cfg.home.display()))?;
        let events = session.subscribe();

        Ok(Self { session, events })
    }

    pub fn library(&self) -> &Library {
        self.session.library()
    }

    /// Drain pending alerts
    pub fn take_alerts(&mut self) -> Vec<Notice> {
        let mut alerts = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(SessionEvent::Alert(notice)) => alerts.push(notice),
                Ok(SessionEvent::Changed) | Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        alerts
    }

    /// Print pending alerts to stderr; returns how many there were
    pub fn report_alerts(&mut self) -> usize {
        let alerts = self.take_alerts();
        for notice in &alerts {
            eprintln!("[{}] {}", notice.title, notice.message);
        }
        alerts.len()
    }

    pub fn category_id(&self, query: &str) -> Result<CategoryId> {
        resolve_category(self.library(), query)
    }

    pub fn item_id(&self, query: &str) -> Result<ItemId> {
        resolve_item(self.library(), query)
    }
}

/// Resolve a category by exact id or unique id prefix
pub fn resolve_category(library: &Library, query: &str) -> Result<CategoryId> {
    let ids: Vec<&str> = library.categories.iter().map(|c| c.id.as_str()).collect();
    resolve_id(&ids, query, "category").map(CategoryId::from)
}

/// Resolve an item by exact id or unique id prefix
pub fn resolve_item(library: &Library, query: &str) -> Result<ItemId> {
    let ids: Vec<&str> = library.items.iter().map(|i| i.id.as_str()).collect();
    resolve_id(&ids, query, "item").map(ItemId::from)
}

fn resolve_id(ids: &[&str], query: &str, kind: &str) -> Result<String> {
    if let Some(exact) = ids.iter().find(|id| **id == query) {
        return Ok(exact.to_string());
    }

    let matches: Vec<&&str> = ids.iter().filter(|id| id.starts_with(query)).collect();
    match matches.as_slice() {
        [only] => Ok(only.to_string()),
        [] => anyhow::bail!("No {} found with id: {}", kind, query),
        _ => anyhow::bail!(
            "Ambiguous {} id '{}' matches {} entries",
            kind,
            query,
            matches.len()
        ),
    }
}

/// Print every category, fully expanded
async fn show_tree() -> Result<()> {
    let workspace = Workspace::open().await?;
    let library = workspace.library();

    if library.categories.is_empty() {
        println!("Library is empty");
        return Ok(());
    }

    for row in library.rows(|_| true) {
        let indent = "  ".repeat(row.depth);
        println!(
            "{}{} ({})  [{}]",
            indent, row.category.name, row.item_count, row.category.id
        );
    }

    println!();
    println!(
        "{} categories, {} items",
        library.categories.len(),
        library.items.len()
    );

    Ok(())
}

/// Export the whole library to a dated backup file
async fn export_library(output: Option<PathBuf>) -> Result<()> {
    let dir = match output {
        Some(dir) => dir,
        None => crate::config::backups_dir()?,
    };

    let workspace = Workspace::open().await?;
    let path = workspace.session.export_backup(&dir).await?;

    println!("Exported to {}", path.display());
    Ok(())
}

/// Restore a backup file, replacing all categories and items
async fn import_library(file: &Path) -> Result<()> {
    let text = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read backup file: {}", file.display()))?;

    let mut workspace = Workspace::open().await?;
    let result = workspace.session.import_backup(&text).await;
    workspace.report_alerts();

    result.with_context(|| format!("Rejected backup file: {}", file.display()))?;

    let library = workspace.library();
    println!(
        "Restored {} categories and {} items",
        library.categories.len(),
        library.items.len()
    );
    Ok(())
}

/// Show resolved configuration
async fn show_config() -> Result<()> {
    use crate::config::{self, paths};

    let cfg = config::config()?;

    println!("libris configuration");
    println!("{}", "=".repeat(40));
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:        {}", cfg.home.display());
    println!("  Categories:  {}", paths::categories_file()?.display());
    println!("  Items:       {}", paths::items_file()?.display());
    println!("  Backups:     {}", cfg.backups.display());
    println!();
    println!("Storage:");
    println!(
        "  Quota:       {} bytes ({:.2} MB)",
        cfg.quota_bytes,
        cfg.quota_bytes as f64 / (1024.0 * 1024.0)
    );
    println!();
    println!("Library:");
    println!("  Default category: {}", cfg.default_category_name);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_id_exact_and_prefix() {
        let ids = ["cat-abc123", "cat-abd456", "cat-abc"];

        assert_eq!(resolve_id(&ids, "cat-abc", "category").unwrap(), "cat-abc");
        assert_eq!(resolve_id(&ids, "cat-abd", "category").unwrap(), "cat-abd456");
    }

    #[test]
    fn test_resolve_id_ambiguous_or_missing() {
        let ids = ["cat-abc123", "cat-abc456"];

        let err = resolve_id(&ids, "cat-ab", "category").unwrap_err();
        assert!(err.to_string().contains("Ambiguous"));

        let err = resolve_id(&ids, "item-", "item").unwrap_err();
        assert!(err.to_string().contains("No item found"));
    }

    #[test]
    fn test_cli_parses_nested_commands() {
        let cli = Cli::try_parse_from(["libris", "category", "add", "Papers", "--parent", "cat-1"])
            .unwrap();
        match cli.command {
            Commands::Category {
                command: category::CategoryCommands::Add { name, parent },
            } => {
                assert_eq!(name, "Papers");
                assert_eq!(parent.as_deref(), Some("cat-1"));
            }
            other => panic!("Unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_rejects_content_and_file_together() {
        let result = Cli::try_parse_from([
            "libris", "item", "add", "--category", "c", "--content", "x", "--file", "a.txt",
        ]);
        assert!(result.is_err());
    }
}
