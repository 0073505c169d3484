//! Item CLI subcommands.
//!
//! Provides commands to:
//! - `add`: Create an item from text or an uploaded file
//! - `list` / `show`: Inspect items
//! - `edit` / `move` / `delete`: Change items
//! - `extract`: Write a stored binary payload back to disk

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;

use super::Workspace;
use crate::domain::LibraryItem;
use crate::library::{ingest, NewItem};

/// Item-related subcommands
#[derive(Subcommand, Debug)]
pub enum ItemCommands {
    /// Add an item to a category
    Add {
        /// Target category id (or unique prefix)
        #[arg(short, long)]
        category: String,

        /// Item title (defaults to the file name when --file is given)
        #[arg(short, long)]
        title: Option<String>,

        /// Text content
        #[arg(long, conflicts_with = "file")]
        content: Option<String>,

        /// Upload a file instead of typing content
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// List items directly inside a category
    List {
        /// Category id (or unique prefix)
        #[arg(short, long)]
        category: String,
    },

    /// Show an item
    Show {
        /// Item id (or unique prefix)
        id: String,
    },

    /// Change an item's title or content
    Edit {
        /// Item id (or unique prefix)
        id: String,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(long)]
        content: Option<String>,
    },

    /// Move an item to another category
    Move {
        /// Item id (or unique prefix)
        id: String,

        /// Target category id (or unique prefix)
        #[arg(long)]
        to: String,
    },

    /// Delete an item
    Delete {
        /// Item id (or unique prefix)
        id: String,
    },

    /// Write an item's stored file to disk
    Extract {
        /// Item id (or unique prefix)
        id: String,

        /// Output path
        #[arg(short, long)]
        output: PathBuf,
    },
}

pub async fn execute(command: ItemCommands) -> Result<()> {
    let mut workspace = Workspace::open().await?;

    let result = match command {
        ItemCommands::Add {
            category,
            title,
            content,
            file,
        } => add_item(&mut workspace, &category, title, content, file).await,
        ItemCommands::List { category } => list_items(&workspace, &category),
        ItemCommands::Show { id } => show_item(&workspace, &id),
        ItemCommands::Edit { id, title, content } => {
            edit_item(&mut workspace, &id, title, content).await
        }
        ItemCommands::Move { id, to } => {
            let id = workspace.item_id(&id)?;
            let target = workspace.category_id(&to)?;
            if workspace.session.move_item(&id, &target).await {
                println!("Moved {} to {}", id, target);
            }
            Ok(())
        }
        ItemCommands::Delete { id } => {
            let id = workspace.item_id(&id)?;
            if workspace.session.delete_item(&id).await {
                println!("Deleted {}", id);
            }
            Ok(())
        }
        ItemCommands::Extract { id, output } => extract_item(&workspace, &id, &output).await,
    };

    workspace.report_alerts();
    result
}

async fn add_item(
    workspace: &mut Workspace,
    category: &str,
    title: Option<String>,
    content: Option<String>,
    file: Option<PathBuf>,
) -> Result<()> {
    let category = workspace.category_id(category)?;

    let new_item = match file {
        Some(path) => {
            let mut upload = ingest::ingest_path(&path).await?;
            if let Some(title) = title {
                upload = upload.with_title(title);
            }
            upload.into_new_item()
        }
        None => NewItem::new(title.unwrap_or_default(), content.unwrap_or_default()),
    };

    match workspace.session.create_item(Some(&category), new_item).await {
        Some(id) => {
            println!("Added item [{}]", id);
            Ok(())
        }
        None => anyhow::bail!("Item was not created"),
    }
}

fn list_items(workspace: &Workspace, category: &str) -> Result<()> {
    let category = workspace.category_id(category)?;
    let items = workspace.library().items_in(&category);

    if items.is_empty() {
        println!("No items in this category");
        return Ok(());
    }

    println!("{:<38} {:<12} {:<40}", "ID", "CREATED", "TITLE");
    println!("{}", "-".repeat(90));

    for item in items {
        let title = if item.title.chars().count() > 38 {
            format!("{}...", item.title.chars().take(35).collect::<String>())
        } else {
            item.title.clone()
        };
        println!(
            "{:<38} {:<12} {:<40}",
            item.id,
            item.created_at.format("%Y-%m-%d"),
            title
        );
    }

    Ok(())
}

fn show_item(workspace: &Workspace, id: &str) -> Result<()> {
    let id = workspace.item_id(id)?;
    let library = workspace.library();
    let item = library
        .item(&id)
        .with_context(|| format!("Item not found: {}", id))?;

    println!("ID:       {}", item.id);
    println!("Title:    {}", item.title);
    println!("Category: {}", library.path(&item.category_id).join(" / "));
    println!("Created:  {}", item.created_at.format("%Y-%m-%d %H:%M:%S"));
    print_attachment(item);
    println!();
    println!("{}", item.content);

    Ok(())
}

fn print_attachment(item: &LibraryItem) {
    if let Some(file_name) = &item.file_name {
        println!(
            "File:     {} ({})",
            file_name,
            item.mime_type.as_deref().unwrap_or("unknown type")
        );
        if item.has_file_data() {
            println!("          binary payload stored, use `libris item extract`");
        }
    }
}

async fn edit_item(
    workspace: &mut Workspace,
    id: &str,
    title: Option<String>,
    content: Option<String>,
) -> Result<()> {
    let id = workspace.item_id(id)?;

    if !workspace.session.begin_edit(&id) {
        anyhow::bail!("Item not found: {}", id);
    }
    if let Some(buffer) = workspace.session.edit_buffer_mut() {
        if let Some(title) = title {
            buffer.title = title;
        }
        if let Some(content) = content {
            buffer.content = content;
        }
    }

    if workspace.session.commit_edit().await {
        println!("Updated {}", id);
    }
    Ok(())
}

async fn extract_item(workspace: &Workspace, id: &str, output: &Path) -> Result<()> {
    let id = workspace.item_id(id)?;
    let item = workspace
        .library()
        .item(&id)
        .with_context(|| format!("Item not found: {}", id))?;

    let bytes = item
        .decode_file_data()
        .with_context(|| format!("Item {} has no stored file", id))?;

    tokio::fs::write(output, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("Wrote {} bytes to {}", bytes.len(), output.display());
    Ok(())
}
