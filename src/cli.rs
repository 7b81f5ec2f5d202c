use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use stagewise::config::LayoutConfig;
use stagewise::context::filesystem::survey;
use stagewise::logging;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "stagewise", about = "Inspect and manage filesystem pipeline folders")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the stage folders under a document root
    Inspect {
        /// Document root of a filesystem-coupled pipeline
        root: PathBuf,

        /// Path to a JSON layout configuration file
        #[arg(long)]
        layout: Option<PathBuf>,
    },
    /// Remove the stage folders under a document root
    Clear {
        /// Document root of a filesystem-coupled pipeline
        root: PathBuf,

        /// Keep the first stage's input folder
        #[arg(long)]
        keep_inputs: bool,

        /// Path to a JSON layout configuration file
        #[arg(long)]
        layout: Option<PathBuf>,
    },
    /// Write the default layout configuration to a file
    Layout {
        /// Destination of the layout file
        path: PathBuf,
    },
    /// Print the paths of today's log files
    Logs,
}

/// Dispatch a parsed subcommand.
pub fn run_command(command: Commands) -> Result<()> {
    match command {
        Commands::Inspect { root, layout } => handle_inspect(&root, &load_layout(layout.as_deref())?),
        Commands::Clear {
            root,
            keep_inputs,
            layout,
        } => handle_clear(&root, keep_inputs, &load_layout(layout.as_deref())?),
        Commands::Layout { path } => {
            LayoutConfig::default().save(&path)?;
            println!("Wrote default layout to {}", path.display());
            Ok(())
        }
        Commands::Logs => {
            println!("{}", logging::current_log_path()?.display());
            println!("{}", logging::current_error_log_path()?.display());
            Ok(())
        }
    }
}

fn load_layout(path: Option<&Path>) -> Result<LayoutConfig> {
    match path {
        Some(path) => LayoutConfig::load(path),
        None => Ok(LayoutConfig::default()),
    }
}

fn handle_inspect(root: &Path, layout: &LayoutConfig) -> Result<()> {
    let folders = survey(root, layout)?;
    if folders.is_empty() {
        println!("No stage folders under {}", root.display());
        return Ok(());
    }

    println!("{:<8} {:>10}  PATH", "STAGE", "DOCUMENTS");
    for folder in &folders {
        println!("{:<8} {:>10}  {}", folder.index, folder.documents, folder.path.display());
    }
    Ok(())
}

fn handle_clear(root: &Path, keep_inputs: bool, layout: &LayoutConfig) -> Result<()> {
    let mut removed = 0;
    for folder in survey(root, layout)? {
        if keep_inputs && folder.index == 0 {
            continue;
        }
        std::fs::remove_dir_all(&folder.path)
            .with_context(|| format!("Failed to remove {}", folder.path.display()))?;
        tracing::info!("Removed {}", folder.path.display());
        removed += 1;
    }

    println!("Removed {removed} stage folder(s) under {}", root.display());
    Ok(())
}
