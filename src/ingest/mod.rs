//! Ingestion routing and per-file outcome reporting.

mod dispatch;

pub use dispatch::{dispatch, Route};

use crate::error::MosaicError;
use serde::Serialize;
use std::time::Duration;

/// How a file reached the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestMode {
    /// One explicitly requested file.
    #[default]
    Single,
    /// Bulk population from a listing.
    Populate,
}

impl IngestMode {
    pub fn populate_db(&self) -> bool {
        matches!(self, IngestMode::Populate)
    }
}

/// Half of a video that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoPart {
    Audio,
    Frames,
}

impl std::fmt::Display for VideoPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VideoPart::Audio => write!(f, "audio"),
            VideoPart::Frames => write!(f, "frames"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IssueKind {
    UnsupportedFormat,
    FetchFailure,
    ExtractionFailure,
    DecodeFailure,
    TranscriptionUnintelligible,
    TranscriptionServiceError,
    PartialVideoFailure(VideoPart),
    StoreWriteFailure,
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueKind::UnsupportedFormat => write!(f, "unsupported format"),
            IssueKind::FetchFailure => write!(f, "fetch failure"),
            IssueKind::ExtractionFailure => write!(f, "extraction failure"),
            IssueKind::DecodeFailure => write!(f, "decode failure"),
            IssueKind::TranscriptionUnintelligible => write!(f, "unintelligible audio"),
            IssueKind::TranscriptionServiceError => write!(f, "transcription service error"),
            IssueKind::PartialVideoFailure(part) => write!(f, "video {} failure", part),
            IssueKind::StoreWriteFailure => write!(f, "store write failure"),
        }
    }
}

/// A contained per-file failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestIssue {
    pub kind: IssueKind,
    pub message: String,
}

impl IngestIssue {
    pub fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classify a library error raised while fetching or processing a file.
    pub fn from_error(err: &MosaicError) -> Self {
        let kind = match err {
            MosaicError::UnsupportedFormat(_) => IssueKind::UnsupportedFormat,
            MosaicError::FetchFailure(_) | MosaicError::FileNotFound(_) | MosaicError::Http(_) => {
                IssueKind::FetchFailure
            }
            MosaicError::Extraction(_) => IssueKind::ExtractionFailure,
            MosaicError::TranscriptionUnintelligible => IssueKind::TranscriptionUnintelligible,
            MosaicError::TranscriptionService(_) => IssueKind::TranscriptionServiceError,
            MosaicError::PartialVideoFailure { part, .. } if part == "audio" => {
                IssueKind::PartialVideoFailure(VideoPart::Audio)
            }
            MosaicError::PartialVideoFailure { .. } => {
                IssueKind::PartialVideoFailure(VideoPart::Frames)
            }
            MosaicError::StoreWrite(_)
            | MosaicError::VectorStore(_)
            | MosaicError::Database(_)
            | MosaicError::Embedding(_) => IssueKind::StoreWriteFailure,
            MosaicError::Timeout { stage, .. } => match *stage {
                "download" => IssueKind::FetchFailure,
                "extraction" => IssueKind::ExtractionFailure,
                "transcription" => IssueKind::TranscriptionServiceError,
                "embedding" | "store" => IssueKind::StoreWriteFailure,
                _ => IssueKind::DecodeFailure,
            },
            _ => IssueKind::DecodeFailure,
        };
        Self::new(kind, err.to_string())
    }
}

/// Why a file was skipped without processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    UnsupportedFormat,
    AlreadyIndexed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Units written, no issues.
    Indexed,
    /// Units written alongside issues.
    Partial,
    /// Issues and nothing written.
    Failed,
    /// Nothing to write and nothing went wrong.
    Empty,
    Skipped(SkipReason),
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileStatus::Indexed => write!(f, "indexed"),
            FileStatus::Partial => write!(f, "partial"),
            FileStatus::Failed => write!(f, "failed"),
            FileStatus::Empty => write!(f, "empty"),
            FileStatus::Skipped(SkipReason::UnsupportedFormat) => write!(f, "skipped (unsupported)"),
            FileStatus::Skipped(SkipReason::AlreadyIndexed) => {
                write!(f, "skipped (already indexed)")
            }
        }
    }
}

/// Outcome of one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file_id: String,
    pub name: String,
    pub route: Route,
    pub text_units: usize,
    pub image_units: usize,
    pub issues: Vec<IngestIssue>,
    skip: Option<SkipReason>,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl FileReport {
    pub fn new(file_id: &str, name: &str, route: Route) -> Self {
        Self {
            file_id: file_id.to_string(),
            name: name.to_string(),
            route,
            text_units: 0,
            image_units: 0,
            issues: Vec::new(),
            skip: None,
            elapsed: Duration::ZERO,
        }
    }

    /// A file turned away before any work.
    pub fn skipped(file_id: &str, name: &str, route: Route, reason: SkipReason) -> Self {
        let mut report = Self::new(file_id, name, route);
        report.skip = Some(reason);
        if reason == SkipReason::UnsupportedFormat {
            report.issues.push(IngestIssue::new(
                IssueKind::UnsupportedFormat,
                format!("no ingestion route for {}", name),
            ));
        }
        report
    }

    pub fn push_issue(&mut self, issue: IngestIssue) {
        self.issues.push(issue);
    }

    pub fn units_written(&self) -> usize {
        self.text_units + self.image_units
    }

    pub fn status(&self) -> FileStatus {
        if let Some(reason) = self.skip {
            return FileStatus::Skipped(reason);
        }
        match (self.units_written() > 0, self.issues.is_empty()) {
            (true, true) => FileStatus::Indexed,
            (true, false) => FileStatus::Partial,
            (false, false) => FileStatus::Failed,
            (false, true) => FileStatus::Empty,
        }
    }
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
    /// The run was cancelled before every file started.
    pub cancelled: bool,
    /// Files never started because of cancellation.
    pub not_started: Vec<String>,
}

impl BatchReport {
    pub fn count(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|f| f.status() == status).count()
    }

    pub fn total_units(&self) -> usize {
        self.files.iter().map(FileReport::units_written).sum()
    }

    pub fn issues(&self) -> impl Iterator<Item = (&FileReport, &IngestIssue)> {
        self.files
            .iter()
            .flat_map(|f| f.issues.iter().map(move |i| (f, i)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_units_and_issues() {
        let mut report = FileReport::new("a", "a.mp4", Route::Video);
        assert_eq!(report.status(), FileStatus::Empty);

        report.image_units = 3;
        assert_eq!(report.status(), FileStatus::Indexed);

        report.push_issue(IngestIssue::new(
            IssueKind::PartialVideoFailure(VideoPart::Audio),
            "no decoder",
        ));
        assert_eq!(report.status(), FileStatus::Partial);

        report.image_units = 0;
        assert_eq!(report.status(), FileStatus::Failed);
    }

    #[test]
    fn test_unsupported_skip_carries_issue() {
        let report = FileReport::skipped(
            "archive.zip",
            "archive.zip",
            Route::Unsupported,
            SkipReason::UnsupportedFormat,
        );
        assert_eq!(
            report.status(),
            FileStatus::Skipped(SkipReason::UnsupportedFormat)
        );
        assert_eq!(report.issues[0].kind, IssueKind::UnsupportedFormat);

        let indexed = FileReport::skipped("n", "n.txt", Route::Unsupported, SkipReason::AlreadyIndexed);
        assert!(indexed.issues.is_empty());
    }

    #[test]
    fn test_issue_classification() {
        let issue = IngestIssue::from_error(&MosaicError::PartialVideoFailure {
            part: "frames".into(),
            message: "boom".into(),
        });
        assert_eq!(issue.kind, IssueKind::PartialVideoFailure(VideoPart::Frames));

        let timeout = IngestIssue::from_error(&MosaicError::Timeout {
            stage: "download",
            seconds: 3,
        });
        assert_eq!(timeout.kind, IssueKind::FetchFailure);
        assert!(timeout.message.contains("download"));

        assert_eq!(
            IngestIssue::from_error(&MosaicError::Extraction("bad zip".into())).kind,
            IssueKind::ExtractionFailure
        );
    }

    #[test]
    fn test_batch_counts() {
        let mut ok = FileReport::new("a", "a.txt", Route::Document(crate::extract::DocumentFormat::PlainText));
        ok.text_units = 4;
        let skipped = FileReport::skipped("z", "z.zip", Route::Unsupported, SkipReason::UnsupportedFormat);
        let batch = BatchReport {
            files: vec![ok, skipped],
            ..Default::default()
        };

        assert_eq!(batch.count(FileStatus::Indexed), 1);
        assert_eq!(batch.total_units(), 4);
        assert_eq!(batch.issues().count(), 1);
    }
}
