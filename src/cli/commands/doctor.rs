//! Doctor command - verify system requirements and configuration.

use crate::cli::Output;
use crate::config::{EmbeddingProvider, Settings, SourceProvider};
use crate::embedding::JINA_API_KEY_ENV;
use console::style;
use std::path::Path;
use std::process::Command;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    Output::header("Mosaic Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let mut checks = Vec::new();

    section(
        "Media Tools",
        vec![
            check_tool("ffmpeg", install_hint_ffmpeg()),
            check_tool("ffprobe", install_hint_ffmpeg()),
        ],
        &mut checks,
    );

    section("API Configuration", check_api_keys(settings), &mut checks);
    section("File Source", check_source(settings), &mut checks);
    section("Directories", check_directories(settings), &mut checks);
    section("Configuration", vec![check_config(config_path)], &mut checks);

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Mosaic.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Mosaic is ready to use.");
    }

    Ok(())
}

fn section(title: &str, results: Vec<CheckResult>, all: &mut Vec<CheckResult>) {
    println!("{}", style(title).bold());
    for check in &results {
        check.print();
    }
    println!();
    all.extend(results);
}

/// Check if an ffmpeg-family tool is available.
fn check_tool(name: &str, hint: &str) -> CheckResult {
    match Command::new(name).arg("-version").output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .chars()
                .take(50)
                .collect::<String>();
            CheckResult::ok(name, &version)
        }
        Ok(_) => CheckResult::error(name, "installed but not working", hint),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            CheckResult::error(name, "not found", hint)
        }
        Err(e) => CheckResult::error(name, &format!("error: {}", e), hint),
    }
}

/// Check one secret held in an environment variable, masking its value.
fn check_key(name: &str, needed_for: &str) -> CheckResult {
    match std::env::var(name) {
        Ok(key) if key.chars().count() > 12 => {
            let head: String = key.chars().take(4).collect();
            let tail: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
            CheckResult::ok(name, &format!("configured ({}...{})", head, tail))
        }
        Ok(key) if key.is_empty() => CheckResult::error(
            name,
            "empty",
            &format!("Needed for {}. Set with: export {}='...'", needed_for, name),
        ),
        Ok(_) => CheckResult::warning(name, "set but suspiciously short", "Double-check the value"),
        Err(_) => CheckResult::error(
            name,
            "not set",
            &format!("Needed for {}. Set with: export {}='...'", needed_for, name),
        ),
    }
}

fn check_api_keys(settings: &Settings) -> Vec<CheckResult> {
    let mut results = vec![check_key("OPENAI_API_KEY", "transcription and answers")];
    match settings.embedding.provider {
        EmbeddingProvider::Jina => results.push(check_key(JINA_API_KEY_ENV, "embeddings")),
        EmbeddingProvider::OpenAI => {}
    }
    results
}

fn check_source(settings: &Settings) -> Vec<CheckResult> {
    match settings.source.provider {
        SourceProvider::Local => {
            let root = settings.local_root();
            if root.is_dir() {
                vec![CheckResult::ok("Local root", &root.display().to_string())]
            } else {
                vec![CheckResult::error(
                    "Local root",
                    &format!("{} is not a directory", root.display()),
                    "Set source.local_root in the config file",
                )]
            }
        }
        SourceProvider::Drive => vec![
            CheckResult::ok("Drive API", &settings.source.drive_api_base),
            check_key(&settings.source.drive_token_env, "Drive access"),
        ],
    }
}

/// Check data directories.
fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let data_dir = settings.data_dir();
    if data_dir.exists() {
        results.push(CheckResult::ok("Data directory", &data_dir.display().to_string()));
    } else {
        results.push(CheckResult::warning(
            "Data directory",
            &format!("{} (will be created)", data_dir.display()),
            "Directory will be created on first use",
        ));
    }

    if settings.vector_store.provider.eq_ignore_ascii_case("memory") {
        results.push(CheckResult::warning(
            "Vector store",
            "in-memory",
            "Nothing is persisted between runs",
        ));
        return results;
    }

    let db_path = settings.sqlite_path();
    if db_path.exists() {
        let size = std::fs::metadata(&db_path)
            .map(|m| format_size(m.len()))
            .unwrap_or_else(|_| "unknown size".to_string());
        results.push(CheckResult::ok(
            "Database",
            &format!("{} ({})", db_path.display(), size),
        ));
    } else {
        results.push(CheckResult::warning(
            "Database",
            &format!("{} (not created yet)", db_path.display()),
            "Database will be created on first ingestion",
        ));
    }

    results
}

/// Check that the config file exists and parses.
fn check_config(config_path: &Path) -> CheckResult {
    if !config_path.exists() {
        return CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: mosaic config edit",
        );
    }
    match Settings::load_from(Some(&config_path.to_path_buf())) {
        Ok(_) => CheckResult::ok("Config file", &config_path.display().to_string()),
        Err(e) => CheckResult::error("Config file", &e.to_string(), "Fix with: mosaic config edit"),
    }
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Platform-specific install hint for ffmpeg.
fn install_hint_ffmpeg() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install ffmpeg"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install ffmpeg (or your package manager)"
    } else {
        "Install from: https://ffmpeg.org/download.html"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_ok() {
        let result = CheckResult::ok("test", "passed");
        assert_eq!(result.status, CheckStatus::Ok);
        assert!(result.hint.is_none());
    }

    #[test]
    fn test_check_result_error() {
        let result = CheckResult::error("test", "failed", "fix it");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.hint, Some("fix it".to_string()));
    }

    #[test]
    fn test_missing_local_root_is_an_error() {
        let mut settings = Settings::default();
        settings.source.local_root = "/definitely/not/here".to_string();
        let results = check_source(&settings);
        assert_eq!(results[0].status, CheckStatus::Error);
    }

    #[test]
    fn test_broken_config_file_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[rag\ntop_k = ").unwrap();
        assert_eq!(check_config(&path).status, CheckStatus::Error);
        assert_eq!(
            check_config(&dir.path().join("absent.toml")).status,
            CheckStatus::Warning
        );
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
        assert_eq!(format_size(1024 * 1024 * 1024), "1.0 GB");
    }
}
