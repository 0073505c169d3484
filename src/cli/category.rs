//! Category CLI subcommands.

use anyhow::Result;
use clap::Subcommand;

use super::Workspace;
use crate::library::Direction;

/// Category-related subcommands
#[derive(Subcommand, Debug)]
pub enum CategoryCommands {
    /// Add a category (top level unless --parent is given)
    Add {
        /// Category name
        name: String,

        /// Parent category id (or unique prefix)
        #[arg(short, long)]
        parent: Option<String>,
    },

    /// Rename a category
    Rename {
        /// Category id (or unique prefix)
        id: String,

        /// New name
        name: String,
    },

    /// Delete a category with all of its subcategories and items
    Delete {
        /// Category id (or unique prefix)
        id: String,
    },

    /// Move a category one place up among its siblings
    Up {
        /// Category id (or unique prefix)
        id: String,
    },

    /// Move a category one place down among its siblings
    Down {
        /// Category id (or unique prefix)
        id: String,
    },
}

pub async fn execute(command: CategoryCommands) -> Result<()> {
    let mut workspace = Workspace::open().await?;

    match command {
        CategoryCommands::Add { name, parent } => {
            let parent = parent.map(|p| workspace.category_id(&p)).transpose()?;

            let Some(id) = workspace.session.add_category(parent.as_ref(), &name).await else {
                if name.trim().is_empty() {
                    anyhow::bail!("Category name cannot be empty");
                }
                anyhow::bail!("No room for another category at this level");
            };
            println!("Added category {} [{}]", name.trim(), id);
        }
        CategoryCommands::Rename { id, name } => {
            let id = workspace.category_id(&id)?;
            if !workspace.session.rename_category(&id, &name).await {
                anyhow::bail!("Category name cannot be empty");
            }
            println!("Renamed {} to {}", id, name.trim());
        }
        CategoryCommands::Delete { id } => {
            let id = workspace.category_id(&id)?;
            let removal = workspace.session.delete_category(&id).await;
            println!(
                "Deleted {} categories and {} items",
                removal.categories.len(),
                removal.items.len()
            );
        }
        CategoryCommands::Up { id } => reorder(&mut workspace, &id, Direction::Up).await?,
        CategoryCommands::Down { id } => reorder(&mut workspace, &id, Direction::Down).await?,
    }

    workspace.report_alerts();
    Ok(())
}

async fn reorder(workspace: &mut Workspace, id: &str, direction: Direction) -> Result<()> {
    let id = workspace.category_id(id)?;

    if workspace.session.reorder_category(&id, direction).await {
        println!("Moved {} {}", id, direction);
    } else {
        println!("{} is already at the edge", id);
    }
    Ok(())
}
