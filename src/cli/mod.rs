//! CLI module for Mosaic.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Mosaic - multi-modal ingestion and retrieval
///
/// Ingests documents, images, audio and video into a searchable knowledge base
/// and answers questions grounded in what was ingested.
#[derive(Parser, Debug)]
#[command(name = "mosaic")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check system requirements and configuration
    Doctor,

    /// Ingest a single file from the configured source
    Ingest {
        /// File ID (relative path for the local source, file ID for Drive)
        file_id: String,

        /// Re-ingest even if already indexed
        #[arg(short, long)]
        force: bool,
    },

    /// Ingest every matching file from the source (PDFs are skipped)
    Populate {
        /// Only files whose name contains this text
        #[arg(short, long)]
        name: Option<String>,

        /// Folder to list (defaults to source.default_folder)
        #[arg(long)]
        folder: Option<String>,

        /// Re-ingest files that are already indexed
        #[arg(short, long)]
        force: bool,
    },

    /// Ask a question and get an answer grounded in the indexed content
    Ask {
        /// The question to ask
        question: String,

        /// Number of hits to retrieve (defaults to rag.top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Search the index without generating an answer
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short = 'k', long, default_value = "5")]
        limit: usize,

        /// Minimum similarity score (defaults to rag.score_threshold)
        #[arg(short, long)]
        min_score: Option<f32>,
    },

    /// List indexed source files
    List,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_populate_flags() {
        let cli = Cli::try_parse_from([
            "mosaic", "-vv", "populate", "--name", "talk", "--folder", "f1", "--force",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Populate { name, folder, force } => {
                assert_eq!(name.as_deref(), Some("talk"));
                assert_eq!(folder.as_deref(), Some("f1"));
                assert!(force);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_ask_top_k() {
        let cli = Cli::try_parse_from(["mosaic", "ask", "what changed?", "-k", "8"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Ask { top_k: Some(8), .. }
        ));
    }

    #[test]
    fn test_clap_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
