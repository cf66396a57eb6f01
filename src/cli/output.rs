//! CLI output formatting utilities.

use crate::content::{image_mime_type, is_encoded_image};
use crate::ingest::{FileReport, FileStatus};
use crate::vector_store::IndexedSource;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print an indexed source line.
    pub fn source_info(source: &IndexedSource) {
        println!(
            "  {} {} ({}, {} text, {} images, {})",
            style("*").cyan(),
            style(&source.source_name).bold(),
            style(&source.source_file_id).dim(),
            source.text_units,
            source.image_units,
            source.indexed_at.format("%Y-%m-%d %H:%M")
        );
    }

    /// Print one file's ingestion outcome.
    pub fn file_report(report: &FileReport) {
        let marker = match report.status() {
            FileStatus::Indexed => style("ok").green(),
            FileStatus::Partial => style("partial").yellow(),
            FileStatus::Failed => style("failed").red(),
            FileStatus::Empty | FileStatus::Skipped(_) => style("skip").dim(),
        };
        println!(
            "  [{}] {} ({}, {} text, {} images, {})",
            marker,
            style(&report.name).bold(),
            report.route,
            report.text_units,
            report.image_units,
            format_duration(report.elapsed.as_secs_f64())
        );
        for issue in &report.issues {
            println!("      {} {}: {}", style("!").yellow(), issue.kind, issue.message);
        }
    }

    /// Print search result.
    pub fn search_result(source_name: &str, sequence_index: u32, score: f32, content: &str) {
        println!(
            "\n{} {} #{} (score: {:.2})",
            style(">>").green(),
            style(source_name).bold(),
            style(sequence_index).cyan(),
            score
        );
        println!("   {}", content_preview(content, 200));
    }

    /// Create a progress bar.
    pub fn progress_bar(len: u64, msg: &str) -> ProgressBar {
        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_message(msg.to_string());
        pb
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Format duration in seconds to a human-readable string.
fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds as u32;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else if total_seconds > 0 {
        format!("{}s", secs)
    } else {
        format!("{}ms", (seconds * 1000.0) as u32)
    }
}

/// Single-line preview; encoded images are summarized instead of printed.
fn content_preview(content: &str, max_chars: usize) -> String {
    if is_encoded_image(content) {
        return format!("[{} image, {} bytes encoded]", image_mime_type(content), content.len());
    }

    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let cut: String = content.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
