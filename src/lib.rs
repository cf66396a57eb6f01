//! Mosaic - multi-modal ingestion and retrieval
//!
//! Ingests documents, images, audio and video from a file source into a
//! vector-indexed store, and answers questions grounded in what was stored.
//!
//! # Overview
//!
//! Every source file is routed by extension:
//! - documents (`.txt`, `.docx`, `.pdf`) are extracted and chunked
//! - images become a single data-URI encoded unit
//! - audio is normalized to mono 16 kHz PCM, optionally denoised, transcribed and chunked
//! - video is split into its audio track and frames sampled every few seconds
//!
//! At query time the question is embedded, similar units are retrieved, text and
//! image hits are separated, and a multimodal prompt is sent to the generator.
//!
//! # Architecture
//!
//! - `config` - Configuration management and prompt templates
//! - `file_source` - Where source files come from (local, Drive, memory)
//! - `ingest` - Extension routing and per-file reports
//! - `extract` - Text extraction from documents
//! - `content` - Content units and image encoding
//! - `media` - ffmpeg based audio normalization and video decomposition
//! - `transcription` - Speech-to-text
//! - `chunking` - Overlapping text windows
//! - `embedding` - Embedding generation
//! - `vector_store` - Vector database abstraction
//! - `generation` - Multimodal answer generation
//! - `rag` - Retrieval and answer assembly
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use mosaic::config::Settings;
//! use mosaic::orchestrator::Orchestrator;
//! use mosaic::rag::Query;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let report = orchestrator.ingest_file("notes/meeting.txt", false).await?;
//!     println!("{}: {}", report.name, report.status());
//!
//!     let answer = orchestrator
//!         .rag_engine()
//!         .generate_answer(&Query::new("When is the launch?", 5)?)
//!         .await?;
//!     println!("{}", answer);
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod content;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod file_source;
pub mod generation;
pub mod ingest;
pub mod media;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod transcription;
pub mod vector_store;

pub use error::{MosaicError, Result};
