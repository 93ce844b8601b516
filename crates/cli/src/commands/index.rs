//! Index command handler.
//!
//! Offline build of the vector index and inspection of an existing one.

use crate::commands::print_json;
use charter_core::{config::AppConfig, AppResult};
use charter_knowledge::{ProgressEvent, ProgressReporter};
use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

/// Vector index management
#[derive(Args, Debug)]
pub struct IndexCommand {
    #[command(subcommand)]
    pub action: IndexAction,
}

#[derive(Subcommand, Debug)]
pub enum IndexAction {
    /// Segment the source document and (re)build the index
    Build(IndexBuildCommand),
    /// Show index statistics
    Stats(IndexStatsCommand),
}

/// Build the index
#[derive(Args, Debug)]
pub struct IndexBuildCommand {
    /// Source document (defaults to rag.sourcePath)
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexBuildCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing index build for '{}'", config.rag.index_name);

        let progress = if self.json {
            ProgressReporter::noop()
        } else {
            ProgressReporter::new(Arc::new(|event: ProgressEvent| {
                eprintln!("{}", event);
            }))
        };

        let stats = charter_knowledge::build(config, self.source.as_deref(), progress).await?;

        if self.json {
            let output = serde_json::json!({
                "index": stats.index_name,
                "unitsIndexed": stats.units_indexed,
                "segmentationGaps": stats.segmentation_gaps,
                "embeddingModel": stats.embedding_model,
                "durationSecs": stats.duration_secs,
            });
            print_json(&output)?;
        } else {
            println!(
                "Indexed {} units into '{}' with {} in {:.2}s",
                stats.units_indexed, stats.index_name, stats.embedding_model, stats.duration_secs
            );
            if stats.segmentation_gaps > 0 {
                println!(
                    "Skipped {} chapter(s) without article markers",
                    stats.segmentation_gaps
                );
            }
        }

        Ok(())
    }
}

/// Show index stats
#[derive(Args, Debug)]
pub struct IndexStatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexStatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing index stats for '{}'", config.rag.index_name);

        let stats = charter_knowledge::stats(config)?;

        if self.json {
            print_json(&stats)?;
        } else {
            println!("Index: {}", stats.index_name);
            println!("  Units: {}", stats.entry_count);
            println!("  DB size: {} bytes", stats.db_size_bytes);
            match stats.manifest {
                Some(manifest) => {
                    println!("  Embedding: {}", manifest.embedding.identifier());
                    println!("  Source SHA-256: {}", manifest.document_sha256);
                    println!("  Built at: {}", manifest.built_at);
                }
                None => println!("  Not built yet"),
            }
        }

        Ok(())
    }
}

impl IndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            IndexAction::Build(cmd) => cmd.execute(config).await,
            IndexAction::Stats(cmd) => cmd.execute(config).await,
        }
    }
}
