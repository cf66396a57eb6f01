//! Pipeline orchestrator for Mosaic.
//!
//! Coordinates every file from download through routing, transformation,
//! embedding and indexing, and builds the query-side engine over the same services.

use crate::chunking::{chunk_text, ChunkingConfig};
use crate::config::{Prompts, Settings};
use crate::content::{image_unit, ContentKind, ContentUnit};
use crate::embedding::{create_embedder, Embedder};
use crate::error::{within, MosaicError, Result};
use crate::extract::{extract_text, DocumentFormat};
use crate::file_source::{create_file_source, FileSource, SourceFile};
use crate::generation::{Generator, OpenAIGenerator};
use crate::ingest::{
    dispatch, BatchReport, FileReport, IngestIssue, IngestMode, IssueKind, Route, SkipReason,
    VideoPart,
};
use crate::media::{AudioNormalizer, VideoDecomposer, VideoParts};
use crate::rag::{RagEngine, Retriever};
use crate::transcription::{SpeechRecognizer, Transcriber, TranscriptionOutcome, WhisperRecognizer};
use crate::vector_store::{create_vector_store, Document, VectorStore};
use backon::{ExponentialBuilder, Retryable};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

const FETCH_RETRY_MIN_DELAY: Duration = Duration::from_millis(200);

/// Extension frames are encoded under.
const FRAME_EXTENSION: &str = ".jpg";

/// External capabilities shared by ingestion and retrieval.
#[derive(Clone)]
pub struct Services {
    pub file_source: Arc<dyn FileSource>,
    pub recognizer: Arc<dyn SpeechRecognizer>,
    pub embedder: Arc<dyn Embedder>,
    pub vector_store: Arc<dyn VectorStore>,
    pub generator: Arc<dyn Generator>,
}

impl Services {
    /// Build the configured adapters.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            file_source: create_file_source(&settings.source)?,
            recognizer: Arc::new(WhisperRecognizer::with_config(&settings.transcription)?),
            embedder: create_embedder(&settings.embedding)?,
            vector_store: create_vector_store(settings)?,
            generator: Arc::new(OpenAIGenerator::new(&settings.rag)?),
        })
    }
}

/// Callback invoked as each file of a batch finishes.
pub type FileDoneCallback = Arc<dyn Fn(&FileReport) + Send + Sync>;

/// Knobs for a batch run.
#[derive(Clone, Default)]
pub struct BatchOptions {
    /// Re-ingest files that already have stored units.
    pub force: bool,
    /// Checked before each file starts; started files run to completion.
    pub cancel: CancellationToken,
    pub on_file_done: Option<FileDoneCallback>,
}

/// The main orchestrator for the Mosaic pipeline.
pub struct Orchestrator {
    settings: Settings,
    prompts: Prompts,
    services: Services,
    chunking: ChunkingConfig,
    normalizer: AudioNormalizer,
    decomposer: VideoDecomposer,
    transcriber: Transcriber,
    temp_dir: PathBuf,
}

impl Orchestrator {
    /// Create a new orchestrator with the configured adapters.
    pub fn new(settings: Settings) -> Result<Self> {
        let services = Services::from_settings(&settings)?;
        Self::with_services(settings, services)
    }

    /// Create an orchestrator over custom services.
    pub fn with_services(settings: Settings, services: Services) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let chunking = ChunkingConfig::from(&settings.chunking);
        chunking.validate()?;

        let normalizer = AudioNormalizer::new(&settings.ingestion);
        let decomposer = VideoDecomposer::new(&settings.ingestion);
        let transcriber = Transcriber::new(
            services.recognizer.clone(),
            &settings.transcription,
            settings.ingestion.timeouts.transcription(),
        );

        let temp_dir = settings.temp_dir();
        std::fs::create_dir_all(&temp_dir)?;

        Ok(Self {
            settings,
            prompts,
            services,
            chunking,
            normalizer,
            decomposer,
            transcriber,
            temp_dir,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn vector_store(&self) -> Arc<dyn VectorStore> {
        self.services.vector_store.clone()
    }

    /// Query engine over the same store, embedder and generator.
    pub fn rag_engine(&self) -> RagEngine {
        let retriever = Retriever::new(
            self.services.vector_store.clone(),
            self.services.embedder.clone(),
        );
        RagEngine::from_settings(retriever, self.services.generator.clone(), &self.settings.rag)
            .with_prompts(self.prompts.clone())
    }

    /// Ingest one explicitly requested file.
    #[instrument(skip(self))]
    pub async fn ingest_file(&self, file_id: &str, force: bool) -> Result<FileReport> {
        let file: SourceFile = self.services.file_source.describe(file_id).await?.into();
        Ok(self.process_file(&file, IngestMode::Single, force).await)
    }

    /// List the source and ingest every match in populate mode.
    #[instrument(skip(self, options))]
    pub async fn populate(
        &self,
        name_filter: Option<&str>,
        folder_id: Option<&str>,
        options: &BatchOptions,
    ) -> Result<BatchReport> {
        let files: Vec<SourceFile> = self
            .services
            .file_source
            .list(name_filter, folder_id)
            .await?
            .into_iter()
            .map(SourceFile::from)
            .collect();

        info!("Populating from {} listed files", files.len());
        Ok(self.ingest_batch(files, IngestMode::Populate, options).await)
    }

    /// Ingest several files, up to `max_concurrent_files` at a time.
    ///
    /// Per-file failures end up in the report; the batch itself never fails.
    pub async fn ingest_batch(
        &self,
        files: Vec<SourceFile>,
        mode: IngestMode,
        options: &BatchOptions,
    ) -> BatchReport {
        let concurrency = self.settings.ingestion.max_concurrent_files.max(1);

        let outcomes: Vec<std::result::Result<FileReport, String>> = stream::iter(files)
            .map(|file| async move {
                if options.cancel.is_cancelled() {
                    return Err(file.id);
                }
                let report = self.process_file(&file, mode, options.force).await;
                if let Some(callback) = &options.on_file_done {
                    callback(&report);
                }
                Ok(report)
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut batch = BatchReport::default();
        for outcome in outcomes {
            match outcome {
                Ok(report) => batch.files.push(report),
                Err(file_id) => batch.not_started.push(file_id),
            }
        }
        batch.cancelled = !batch.not_started.is_empty();
        if batch.cancelled {
            warn!("Batch cancelled, {} files not started", batch.not_started.len());
        }
        batch
    }

    /// Run one file through its route. Never fails; problems become issues.
    #[instrument(skip(self, file), fields(file = %file.name))]
    pub async fn process_file(&self, file: &SourceFile, mode: IngestMode, force: bool) -> FileReport {
        let started = Instant::now();
        let route = dispatch(&file.extension, mode.populate_db());

        if route == Route::Unsupported {
            info!("No route for {}, skipping", file.name);
            return FileReport::skipped(&file.id, &file.name, route, SkipReason::UnsupportedFormat);
        }

        if !force {
            match self.services.vector_store.is_source_indexed(&file.id).await {
                Ok(true) => {
                    info!("{} is already indexed, skipping", file.name);
                    return FileReport::skipped(
                        &file.id,
                        &file.name,
                        route,
                        SkipReason::AlreadyIndexed,
                    );
                }
                Ok(false) => {}
                Err(e) => warn!("Could not check index state for {}: {}", file.id, e),
            }
        }

        let mut report = FileReport::new(&file.id, &file.name, route);

        let bytes = match self.fetch(&file.id).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Fetch failed for {}: {}", file.id, e);
                report.push_issue(IngestIssue::from_error(&e));
                report.elapsed = started.elapsed();
                return report;
            }
        };
        debug!(bytes = bytes.len(), %route, "Fetched");

        let units = match route {
            Route::Document(format) => self.document_units(file, &bytes, format).await,
            Route::Image => image_unit(&file.id, 0, &bytes, &file.extension).map(|unit| vec![unit]),
            Route::Audio => self.audio_units(file, &bytes).await,
            Route::Video => self.video_units(file, &bytes, &mut report).await,
            Route::Unsupported => Ok(Vec::new()),
        };
        drop(bytes);

        match units {
            Ok(units) => self.write_units(file, units, &mut report).await,
            Err(e) => {
                warn!("Processing {} failed: {}", file.name, e);
                report.push_issue(IngestIssue::from_error(&e));
            }
        }

        report.elapsed = started.elapsed();
        info!(
            status = %report.status(),
            text = report.text_units,
            images = report.image_units,
            "Finished {}",
            file.name
        );
        report
    }

    async fn fetch(&self, file_id: &str) -> Result<Vec<u8>> {
        let source = &self.services.file_source;
        let limit = self.settings.ingestion.timeouts.download();

        (|| within("download", limit, source.download(file_id)))
            .retry(
                ExponentialBuilder::default()
                    .with_max_times(self.settings.source.fetch_retries as usize)
                    .with_min_delay(FETCH_RETRY_MIN_DELAY),
            )
            .when(|e| {
                matches!(
                    e,
                    MosaicError::FetchFailure(_)
                        | MosaicError::Http(_)
                        | MosaicError::Timeout { .. }
                )
            })
            .notify(|err, dur| warn!("Download of {} failed, retrying in {:?}: {}", file_id, dur, err))
            .await
    }

    fn scratch_dir(&self) -> Result<tempfile::TempDir> {
        Ok(tempfile::Builder::new()
            .prefix("mosaic-")
            .tempdir_in(&self.temp_dir)?)
    }

    async fn document_units(
        &self,
        file: &SourceFile,
        bytes: &[u8],
        format: DocumentFormat,
    ) -> Result<Vec<ContentUnit>> {
        let limit = self.settings.ingestion.timeouts.extraction();
        let text = within("extraction", limit, extract_text(bytes, format)).await?;
        let chunks = chunk_text(&text, &self.chunking)?;
        debug!("Extracted {} chars into {} chunks", text.len(), chunks.len());
        Ok(ContentUnit::from_chunks(&file.id, chunks))
    }

    async fn audio_units(&self, file: &SourceFile, bytes: &[u8]) -> Result<Vec<ContentUnit>> {
        let scratch = self.scratch_dir()?;
        self.transcript_units(&file.id, bytes, &file.extension, scratch.path())
            .await
    }

    /// Normalize, transcribe and chunk one audio payload.
    async fn transcript_units(
        &self,
        file_id: &str,
        bytes: &[u8],
        extension: &str,
        scratch: &Path,
    ) -> Result<Vec<ContentUnit>> {
        let audio = self.normalizer.normalize(bytes, extension, scratch).await?;

        let text = match self.transcriber.transcribe(&audio).await {
            TranscriptionOutcome::Text(text) => text,
            TranscriptionOutcome::Unintelligible => {
                return Err(MosaicError::TranscriptionUnintelligible)
            }
            TranscriptionOutcome::ServiceFailure(msg) => {
                return Err(MosaicError::TranscriptionService(msg))
            }
        };

        let chunks = chunk_text(&text, &self.chunking)?;
        Ok(ContentUnit::from_chunks(file_id, chunks))
    }

    async fn video_units(
        &self,
        file: &SourceFile,
        bytes: &[u8],
        report: &mut FileReport,
    ) -> Result<Vec<ContentUnit>> {
        let scratch = self.scratch_dir()?;
        let parts = self
            .decomposer
            .decompose(bytes, &file.extension, scratch.path())
            .await;
        Ok(self.video_parts_units(file, parts, scratch.path(), report).await)
    }

    /// Both video halves; a failed half becomes an issue and the other is kept.
    /// Frame units carry their offset ordinal, so a gap stays a gap.
    async fn video_parts_units(
        &self,
        file: &SourceFile,
        parts: VideoParts,
        scratch: &Path,
        report: &mut FileReport,
    ) -> Vec<ContentUnit> {
        debug!(duration = parts.duration_seconds, "Assembling video units");
        let mut units = Vec::new();

        let audio = match parts.audio {
            Ok(Some(wav)) => self.transcript_units(&file.id, &wav, ".wav", scratch).await,
            Ok(None) => {
                debug!("{} has no audio track", file.name);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        };
        match audio {
            Ok(text_units) => units.extend(text_units),
            Err(e) => report.push_issue(video_issue(VideoPart::Audio, &e)),
        }

        let mut missing = parts.missing_frames;
        match parts.frames {
            Ok(frames) => {
                for frame in frames {
                    match image_unit(&file.id, frame.index, &frame.jpeg, FRAME_EXTENSION) {
                        Ok(unit) => units.push(unit),
                        Err(_) => missing.push(frame.index),
                    }
                }
            }
            Err(e) => report.push_issue(video_issue(VideoPart::Frames, &e)),
        }

        if !missing.is_empty() {
            missing.sort_unstable();
            let ordinals: Vec<String> = missing.iter().map(u32::to_string).collect();
            let err = MosaicError::DecodeFailure(format!(
                "no frame extracted at ordinal(s) {}",
                ordinals.join(", ")
            ));
            warn!("{}: {}", file.name, err);
            report.push_issue(video_issue(VideoPart::Frames, &err));
        }

        units
    }

    /// Embed a file's units and store them in one batch.
    ///
    /// Text and images are embedded separately; a kind the embedder refuses is
    /// reported and the other kind is still written.
    async fn write_units(&self, file: &SourceFile, units: Vec<ContentUnit>, report: &mut FileReport) {
        let (texts, images): (Vec<ContentUnit>, Vec<ContentUnit>) = units
            .into_iter()
            .partition(|u| u.kind == ContentKind::Text);

        let mut docs = Vec::new();
        for group in [texts, images] {
            if group.is_empty() {
                continue;
            }
            match self.embed_units(&group).await {
                Ok(embeddings) => docs.extend(
                    group
                        .into_iter()
                        .zip(embeddings)
                        .map(|(unit, embedding)| Document::from_unit(unit, &file.name, embedding)),
                ),
                Err(e) => {
                    warn!("Embedding {} units of {} failed: {}", group[0].kind, file.name, e);
                    report.push_issue(IngestIssue::new(IssueKind::StoreWriteFailure, e.to_string()));
                }
            }
        }
        if docs.is_empty() {
            return;
        }

        let text_units = docs.iter().filter(|d| d.kind == ContentKind::Text).count();
        let image_units = docs.len() - text_units;

        match within(
            "store",
            self.settings.ingestion.timeouts.store(),
            self.services.vector_store.upsert_batch(&docs),
        )
        .await
        {
            Ok(_) => {
                report.text_units += text_units;
                report.image_units += image_units;
            }
            Err(e) => {
                warn!("Store write failed for {}: {}", file.name, e);
                report.push_issue(IngestIssue::new(IssueKind::StoreWriteFailure, e.to_string()));
            }
        }
    }

    async fn embed_units(&self, units: &[ContentUnit]) -> Result<Vec<Vec<f32>>> {
        let payloads: Vec<String> = units.iter().map(|u| u.payload.clone()).collect();
        let embeddings = within(
            "embedding",
            self.settings.ingestion.timeouts.embedding(),
            self.services.embedder.embed_batch(&payloads),
        )
        .await?;

        if embeddings.len() != units.len() {
            return Err(MosaicError::Embedding(format!(
                "expected {} embeddings, got {}",
                units.len(),
                embeddings.len()
            )));
        }
        Ok(embeddings)
    }
}

fn video_issue(part: VideoPart, err: &MosaicError) -> IngestIssue {
    IngestIssue::new(
        IssueKind::PartialVideoFailure(part),
        MosaicError::PartialVideoFailure {
            part: part.to_string(),
            message: err.to_string(),
        }
        .to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::is_encoded_image;
    use crate::embedding::tests::StubEmbedder;
    use crate::file_source::MemoryFileSource;
    use crate::generation::tests::ScriptedGenerator;
    use crate::ingest::FileStatus;
    use crate::media::audio::encode_wav;
    use crate::media::VideoFrame;
    use crate::transcription::tests::ScriptedRecognizer;
    use crate::vector_store::MemoryVectorStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixture {
        orchestrator: Orchestrator,
        store: Arc<MemoryVectorStore>,
        _temp: tempfile::TempDir,
    }

    fn fixture(source: MemoryFileSource, recognizer: ScriptedRecognizer) -> Fixture {
        fixture_with(source, recognizer, StubEmbedder::new(4))
    }

    fn fixture_with(
        source: MemoryFileSource,
        recognizer: ScriptedRecognizer,
        embedder: StubEmbedder,
    ) -> Fixture {
        let temp = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.general.temp_dir = temp.path().join("scratch").display().to_string();
        settings.ingestion.denoise = false;
        settings.ingestion.timeouts.decode_seconds = 30;

        let store = Arc::new(MemoryVectorStore::new());
        let services = Services {
            file_source: Arc::new(source),
            recognizer: Arc::new(recognizer),
            embedder: Arc::new(embedder),
            vector_store: store.clone(),
            generator: Arc::new(ScriptedGenerator::new("answer")),
        };

        Fixture {
            orchestrator: Orchestrator::with_services(settings, services).unwrap(),
            store,
            _temp: temp,
        }
    }

    fn file(name: &str) -> SourceFile {
        crate::file_source::RemoteFile::new(name, name).into()
    }

    fn frame(index: u32) -> VideoFrame {
        VideoFrame {
            index,
            jpeg: vec![0xff, 0xd8, 0xff, 0xe0, index as u8],
        }
    }

    fn one_second_wav() -> Vec<u8> {
        encode_wav(&vec![0i16; 16_000], 16_000, 1)
    }

    /// Run already-decomposed halves through assembly and the store write.
    async fn ingest_parts(fx: &Fixture, parts: VideoParts) -> FileReport {
        let clip = file("clip.mp4");
        let scratch = tempfile::tempdir().unwrap();
        let mut report = FileReport::new(&clip.id, &clip.name, Route::Video);
        let units = fx
            .orchestrator
            .video_parts_units(&clip, parts, scratch.path(), &mut report)
            .await;
        fx.orchestrator.write_units(&clip, units, &mut report).await;
        report
    }

    async fn stored_frame_ordinals(fx: &Fixture) -> Vec<u32> {
        fx.store
            .get_by_source_id("clip.mp4")
            .await
            .unwrap()
            .iter()
            .filter(|d| d.kind == ContentKind::Image)
            .map(|d| d.sequence_index)
            .collect()
    }

    fn notes_text() -> String {
        (0..2500)
            .map(|i| char::from(b'a' + (i % 26) as u8))
            .collect()
    }

    #[tokio::test]
    async fn test_text_document_chunked_at_stride() {
        let text = notes_text();
        let fx = fixture(
            MemoryFileSource::new().with_file("notes.txt", text.clone()),
            ScriptedRecognizer::new(vec![]),
        );

        let report = fx.orchestrator.ingest_file("notes.txt", false).await.unwrap();

        assert_eq!(report.status(), FileStatus::Indexed);
        assert_eq!((report.text_units, report.image_units), (4, 0));

        let docs = fx.store.get_by_source_id("notes.txt").await.unwrap();
        let contents: Vec<&str> = docs.iter().map(|d| d.content.as_str()).collect();
        assert_eq!(
            contents,
            vec![&text[0..1000], &text[800..1800], &text[1600..2500], &text[2400..2500]]
        );
        assert!(docs.iter().all(|d| d.source_name == "notes.txt"));
    }

    #[tokio::test]
    async fn test_image_becomes_single_unit() {
        let fx = fixture(
            MemoryFileSource::new().with_file("photo.svg", "<svg xmlns='http://www.w3.org/2000/svg'/>"),
            ScriptedRecognizer::new(vec![]),
        );

        let report = fx.orchestrator.ingest_file("photo.svg", false).await.unwrap();

        assert_eq!((report.text_units, report.image_units), (0, 1));
        let docs = fx.store.get_by_source_id("photo.svg").await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].kind, ContentKind::Image);
        assert!(docs[0].content.starts_with("data:image/svg+xml;base64,"));
        assert!(is_encoded_image(&docs[0].content));
    }

    #[tokio::test]
    async fn test_unsupported_file_reported_and_batch_continues() {
        let fx = fixture(
            MemoryFileSource::new()
                .with_file("archive.zip", vec![0x50u8, 0x4b, 0x03, 0x04])
                .with_file("notes.txt", "short note"),
            ScriptedRecognizer::new(vec![]),
        );

        let batch = fx
            .orchestrator
            .ingest_batch(
                vec![file("archive.zip"), file("notes.txt")],
                IngestMode::Single,
                &BatchOptions::default(),
            )
            .await;

        let zip = batch.files.iter().find(|f| f.file_id == "archive.zip").unwrap();
        assert_eq!(zip.units_written(), 0);
        assert_eq!(zip.issues.len(), 1);
        assert_eq!(zip.issues[0].kind, IssueKind::UnsupportedFormat);

        let notes = batch.files.iter().find(|f| f.file_id == "notes.txt").unwrap();
        assert_eq!(notes.status(), FileStatus::Indexed);
        assert_eq!(fx.store.document_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_pdf_skipped_only_when_populating() {
        let fx = fixture(
            MemoryFileSource::new().with_file("report.pdf", "not really a pdf"),
            ScriptedRecognizer::new(vec![]),
        );

        let populate = fx
            .orchestrator
            .populate(None, None, &BatchOptions::default())
            .await
            .unwrap();
        assert_eq!(
            populate.files[0].status(),
            FileStatus::Skipped(SkipReason::UnsupportedFormat)
        );

        let single = fx.orchestrator.ingest_file("report.pdf", false).await.unwrap();
        assert_eq!(single.route, Route::Document(DocumentFormat::Pdf));
        assert_eq!(single.status(), FileStatus::Failed);
        assert_eq!(single.issues[0].kind, IssueKind::ExtractionFailure);
    }

    #[tokio::test]
    async fn test_normalized_wav_transcribed_and_chunked() {
        let wav = encode_wav(&vec![0i16; 16_000], 16_000, 1);
        let fx = fixture(
            MemoryFileSource::new().with_file("memo.wav", wav),
            ScriptedRecognizer::new(vec![Ok("remember the milk".to_string())]),
        );

        let report = fx.orchestrator.ingest_file("memo.wav", false).await.unwrap();

        assert_eq!(report.status(), FileStatus::Indexed);
        let docs = fx.store.get_by_source_id("memo.wav").await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "remember the milk");
    }

    #[tokio::test]
    async fn test_unintelligible_audio_is_an_issue() {
        let wav = encode_wav(&vec![0i16; 16_000], 16_000, 1);
        let fx = fixture(
            MemoryFileSource::new().with_file("hum.wav", wav),
            ScriptedRecognizer::new(vec![]),
        );

        let report = fx.orchestrator.ingest_file("hum.wav", false).await.unwrap();

        assert_eq!(report.status(), FileStatus::Failed);
        assert_eq!(report.issues[0].kind, IssueKind::TranscriptionUnintelligible);
    }

    #[tokio::test]
    async fn test_malformed_media_contained_per_file() {
        let fx = fixture(
            MemoryFileSource::new()
                .with_file("broken.mp3", "definitely not audio")
                .with_file("broken.mp4", "definitely not video")
                .with_file("ok.txt", "fine"),
            ScriptedRecognizer::new(vec![]),
        );

        let batch = fx
            .orchestrator
            .populate(None, None, &BatchOptions::default())
            .await
            .unwrap();

        let by_id = |id: &str| batch.files.iter().find(|f| f.file_id == id).unwrap();

        let mp3 = by_id("broken.mp3");
        assert_eq!(mp3.status(), FileStatus::Failed);
        assert_eq!(mp3.issues[0].kind, IssueKind::DecodeFailure);

        let mp4 = by_id("broken.mp4");
        let kinds: Vec<IssueKind> = mp4.issues.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![
                IssueKind::PartialVideoFailure(VideoPart::Audio),
                IssueKind::PartialVideoFailure(VideoPart::Frames)
            ]
        );
        assert_eq!(mp4.units_written(), 0);

        assert_eq!(by_id("ok.txt").status(), FileStatus::Indexed);
    }

    #[tokio::test]
    async fn test_transient_fetch_failures_retried() {
        let source = MemoryFileSource::new()
            .with_file("flaky.txt", "eventually")
            .with_file("gone.txt", "never");
        source.fail_downloads("flaky.txt", 2);
        source.fail_downloads("gone.txt", 10);
        let fx = fixture(source, ScriptedRecognizer::new(vec![]));

        let flaky = fx.orchestrator.ingest_file("flaky.txt", false).await.unwrap();
        assert_eq!(flaky.status(), FileStatus::Indexed);

        let gone = fx.orchestrator.ingest_file("gone.txt", false).await.unwrap();
        assert_eq!(gone.status(), FileStatus::Failed);
        assert_eq!(gone.issues[0].kind, IssueKind::FetchFailure);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error_for_single_ingest() {
        let fx = fixture(MemoryFileSource::new(), ScriptedRecognizer::new(vec![]));
        assert!(matches!(
            fx.orchestrator.ingest_file("nope.txt", false).await,
            Err(MosaicError::FileNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_already_indexed_skipped_unless_forced() {
        let fx = fixture(
            MemoryFileSource::new().with_file("notes.txt", "hello"),
            ScriptedRecognizer::new(vec![]),
        );

        fx.orchestrator.ingest_file("notes.txt", false).await.unwrap();
        let again = fx.orchestrator.ingest_file("notes.txt", false).await.unwrap();
        assert_eq!(again.status(), FileStatus::Skipped(SkipReason::AlreadyIndexed));
        assert_eq!(fx.store.document_count().await.unwrap(), 1);

        let forced = fx.orchestrator.ingest_file("notes.txt", true).await.unwrap();
        assert_eq!(forced.status(), FileStatus::Indexed);
        assert_eq!(fx.store.document_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_batch_starts_nothing() {
        let fx = fixture(
            MemoryFileSource::new()
                .with_file("a.txt", "a")
                .with_file("b.txt", "b"),
            ScriptedRecognizer::new(vec![]),
        );
        let options = BatchOptions::default();
        options.cancel.cancel();

        let batch = fx.orchestrator.populate(None, None, &options).await.unwrap();

        assert!(batch.cancelled);
        assert!(batch.files.is_empty());
        assert_eq!(batch.not_started.len(), 2);
        assert_eq!(fx.store.document_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_progress_callback_sees_every_file() {
        let fx = fixture(
            MemoryFileSource::new()
                .with_file("a.txt", "a")
                .with_file("b.png", vec![0x89, b'P', b'N', b'G'])
                .with_file("c.zip", "z"),
            ScriptedRecognizer::new(vec![]),
        );
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let options = BatchOptions {
            on_file_done: Some(Arc::new(move |_: &crate::ingest::FileReport| {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
            ..Default::default()
        };

        let batch = fx.orchestrator.populate(None, None, &options).await.unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 3);
        assert_eq!(batch.total_units(), 2);
    }

    #[tokio::test]
    async fn test_ingested_content_answers_questions() {
        let fx = fixture(
            MemoryFileSource::new().with_file("notes.txt", "the launch is on friday"),
            ScriptedRecognizer::new(vec![]),
        );
        fx.orchestrator.ingest_file("notes.txt", false).await.unwrap();

        let engine = fx.orchestrator.rag_engine();
        let retrieval = engine
            .retriever()
            .retrieve_relevant(&crate::rag::Query::new("the launch is on friday", 3).unwrap())
            .await
            .unwrap();

        assert_eq!(retrieval.text_documents, vec!["the launch is on friday"]);
    }

    #[tokio::test]
    async fn test_blank_image_is_a_decode_failure() {
        let fx = fixture(
            MemoryFileSource::new().with_file("blank.png", Vec::<u8>::new()),
            ScriptedRecognizer::new(vec![]),
        );

        let report = fx.orchestrator.ingest_file("blank.png", false).await.unwrap();

        assert_eq!(report.status(), FileStatus::Failed);
        assert_eq!(report.issues[0].kind, IssueKind::DecodeFailure);
        assert_eq!(fx.store.document_count().await.unwrap(), 0);

        let retrieval = fx
            .orchestrator
            .rag_engine()
            .retriever()
            .retrieve_relevant(&crate::rag::Query::new("q", 5).unwrap())
            .await
            .unwrap();
        assert!(retrieval.text_documents.is_empty());
        assert!(retrieval.images.is_empty());
    }

    #[tokio::test]
    async fn test_video_frames_kept_when_audio_fails() {
        let fx = fixture(MemoryFileSource::new(), ScriptedRecognizer::new(vec![]));
        let parts = VideoParts {
            duration_seconds: 12.0,
            audio: Err(MosaicError::DecodeFailure("corrupt audio stream".into())),
            frames: Ok(vec![frame(0), frame(1), frame(2)]),
            missing_frames: Vec::new(),
        };

        let report = ingest_parts(&fx, parts).await;

        assert_eq!(report.status(), FileStatus::Partial);
        assert_eq!((report.text_units, report.image_units), (0, 3));
        let kinds: Vec<IssueKind> = report.issues.iter().map(|i| i.kind).collect();
        assert_eq!(kinds, vec![IssueKind::PartialVideoFailure(VideoPart::Audio)]);
        assert_eq!(stored_frame_ordinals(&fx).await, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_video_transcript_kept_when_frames_fail() {
        let fx = fixture(
            MemoryFileSource::new(),
            ScriptedRecognizer::new(vec![Ok("the narrator walks in".to_string())]),
        );
        let parts = VideoParts {
            duration_seconds: 1.0,
            audio: Ok(Some(one_second_wav())),
            frames: Err(MosaicError::DecodeFailure("no video stream".into())),
            missing_frames: Vec::new(),
        };

        let report = ingest_parts(&fx, parts).await;

        assert_eq!(report.status(), FileStatus::Partial);
        assert_eq!((report.text_units, report.image_units), (1, 0));
        let kinds: Vec<IssueKind> = report.issues.iter().map(|i| i.kind).collect();
        assert_eq!(kinds, vec![IssueKind::PartialVideoFailure(VideoPart::Frames)]);

        let docs = fx.store.get_by_source_id("clip.mp4").await.unwrap();
        assert_eq!(docs[0].content, "the narrator walks in");
    }

    #[tokio::test]
    async fn test_silent_video_with_frame_gap_keeps_ordinals() {
        let fx = fixture(MemoryFileSource::new(), ScriptedRecognizer::new(vec![]));
        let parts = VideoParts {
            duration_seconds: 15.0,
            audio: Ok(None),
            frames: Ok(vec![frame(0), frame(2)]),
            missing_frames: vec![1],
        };

        let report = ingest_parts(&fx, parts).await;

        assert_eq!(report.status(), FileStatus::Partial);
        assert_eq!((report.text_units, report.image_units), (0, 2));
        assert_eq!(report.issues.len(), 1);
        assert_eq!(
            report.issues[0].kind,
            IssueKind::PartialVideoFailure(VideoPart::Frames)
        );
        assert!(report.issues[0].message.contains("ordinal(s) 1"));
        assert_eq!(stored_frame_ordinals(&fx).await, vec![0, 2]);
    }

    #[tokio::test]
    async fn test_silent_video_with_all_frames_is_indexed() {
        let fx = fixture(MemoryFileSource::new(), ScriptedRecognizer::new(vec![]));
        let parts = VideoParts {
            duration_seconds: 4.0,
            audio: Ok(None),
            frames: Ok(vec![frame(0)]),
            missing_frames: Vec::new(),
        };

        let report = ingest_parts(&fx, parts).await;

        assert_eq!(report.status(), FileStatus::Indexed);
        assert!(report.issues.is_empty());
        assert_eq!(stored_frame_ordinals(&fx).await, vec![0]);
    }

    #[tokio::test]
    async fn test_refused_frames_do_not_sink_transcript() {
        let fx = fixture_with(
            MemoryFileSource::new(),
            ScriptedRecognizer::new(vec![Ok("opening remarks".to_string())]),
            StubEmbedder::new(4).text_only(),
        );
        let parts = VideoParts {
            duration_seconds: 1.0,
            audio: Ok(Some(one_second_wav())),
            frames: Ok(vec![frame(0)]),
            missing_frames: Vec::new(),
        };

        let report = ingest_parts(&fx, parts).await;

        assert_eq!(report.status(), FileStatus::Partial);
        assert_eq!((report.text_units, report.image_units), (1, 0));
        assert_eq!(report.issues[0].kind, IssueKind::StoreWriteFailure);
        assert_eq!(fx.store.document_count().await.unwrap(), 1);
    }
}
