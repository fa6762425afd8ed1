//! Upload command - Upload files and folders to the server
//!
//! Provides the `hauler upload` CLI command which:
//! 1. Loads configuration and resolves engine settings
//! 2. Fetches server-advertised transfer settings
//! 3. Enqueues the given files (folders are walked recursively)
//! 4. Polls progress until every upload reaches a terminal state

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::{info, trace};

use hauler_core::config::{Config, EngineConfig};
use hauler_core::domain::newtypes::TargetPath;
use hauler_core::domain::progress::ProgressEntry;
use hauler_core::domain::record::UploadStatus;
use hauler_core::ports::IFileSource;
use hauler_engine::{LocalFileSource, UploadEngine};
use hauler_tus::TusClient;

use crate::output::{format_bytes, get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct UploadCommand {
    /// Files or folders to upload
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Destination directory on the server
    #[arg(short, long, default_value = "/")]
    pub target: String,

    /// Server base URL (overrides the configured endpoint)
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Maximum concurrent transfers (overrides the configured limit)
    #[arg(short, long)]
    pub concurrency: Option<usize>,
}

impl UploadCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let json = matches!(format, OutputFormat::Json);
        let formatter = get_formatter(json);

        // Step 1: Load config and resolve settings
        let config_path = Config::default_path();
        let config = Config::load_or_default(&config_path);
        info!(config_path = %config_path.display(), "Loaded configuration");

        let endpoint = self
            .endpoint
            .clone()
            .or_else(|| config.transfer.endpoint.clone())
            .context("No server endpoint configured; pass --endpoint or set transfer.endpoint")?;
        let target = TargetPath::new(self.target.clone())?;

        // Step 2: Connect, applying server-advertised settings
        let mut engine_config = EngineConfig::from_config(&config);
        if let Some(limit) = self.concurrency {
            engine_config.max_concurrent_uploads = limit.max(1);
        }
        let client = TusClient::new(endpoint);
        let engine = UploadEngine::connect(Arc::new(client), engine_config).await;

        // Step 3: Collect sources (folders are walked recursively)
        let mut sources: Vec<Arc<dyn IFileSource>> = Vec::new();
        for path in &self.paths {
            let metadata = tokio::fs::metadata(path)
                .await
                .with_context(|| format!("Cannot read {}", path.display()))?;
            if metadata.is_dir() {
                for relative in collect_relative(path)? {
                    sources.push(Arc::new(LocalFileSource::open_relative(path, &relative).await?));
                }
            } else {
                sources.push(Arc::new(LocalFileSource::open(path.clone()).await?));
            }
        }
        if sources.is_empty() {
            bail!("Nothing to upload");
        }

        let total_bytes: u64 = sources.iter().map(|s| s.len()).sum();
        formatter.info(&format!(
            "Uploading {} file(s), {} total",
            sources.len(),
            format_bytes(total_bytes)
        ));

        engine.subscribe_all(Arc::new(|entry: &ProgressEntry| {
            trace!(
                file = %entry.file_name,
                status = %entry.status,
                uploaded = entry.uploaded_bytes,
                "Progress"
            );
        }));
        let ids = engine.enqueue(sources, &target);

        // Step 4: Poll until every upload is terminal
        let mut reported = std::collections::HashSet::new();
        let mut tick: u32 = 0;
        let (completed, failed) = loop {
            let snapshots = engine.snapshot_all();

            for entry in &snapshots {
                if entry.status.is_terminal() && reported.insert(entry.file_id.clone()) {
                    match entry.status {
                        UploadStatus::Completed => formatter.success(&format!(
                            "{} ({})",
                            entry.file_name,
                            format_bytes(entry.total_bytes)
                        )),
                        UploadStatus::Error => formatter.error(&format!(
                            "{}: {}",
                            entry.file_name,
                            entry.error.as_deref().unwrap_or("unknown error")
                        )),
                        _ => {}
                    }
                }
            }

            // In-flight status line every couple of seconds
            if !json && tick % 4 == 3 {
                for entry in &snapshots {
                    if entry.status == UploadStatus::Uploading {
                        formatter.info(&progress_line(entry));
                    }
                }
            }

            if snapshots.iter().all(|e| e.status.is_terminal()) {
                let completed = snapshots
                    .iter()
                    .filter(|e| e.status == UploadStatus::Completed)
                    .count();
                break (completed, snapshots.len() - completed);
            }
            tick += 1;
            tokio::time::sleep(Duration::from_millis(500)).await;
        };

        if json {
            let snapshots: Vec<_> = ids.iter().filter_map(|id| engine.snapshot(id)).collect();
            formatter.print_json(&serde_json::to_value(&snapshots)?);
        } else {
            formatter.info(&format!("{completed} completed, {failed} failed"));
        }

        if failed > 0 {
            bail!("{failed} upload(s) failed");
        }
        Ok(())
    }
}

fn progress_line(entry: &ProgressEntry) -> String {
    let mut line = format!(
        "{} {:5.1}% ({} / {})",
        entry.file_name,
        entry.progress_percent,
        format_bytes(entry.uploaded_bytes),
        format_bytes(entry.total_bytes),
    );
    if let Some(speed) = entry.speed_bytes_per_sec {
        line.push_str(&format!(", {}/s", format_bytes(speed as u64)));
    }
    if let Some(eta) = entry.eta_seconds {
        line.push_str(&format!(", ETA {}s", eta.round() as u64));
    }
    line
}

/// Walks a folder and returns the relative paths of all regular files,
/// sorted for a stable upload order
fn collect_relative(root: &Path) -> Result<Vec<String>> {
    fn walk(dir: &Path, root: &Path, out: &mut Vec<String>) -> Result<()> {
        for dent in std::fs::read_dir(dir)
            .with_context(|| format!("Cannot read directory {}", dir.display()))?
        {
            let path = dent?.path();
            let file_type = std::fs::symlink_metadata(&path)?.file_type();
            if file_type.is_dir() {
                walk(&path, root, out)?;
            } else if file_type.is_file() {
                let relative = path
                    .strip_prefix(root)
                    .expect("walked path is below root")
                    .to_string_lossy()
                    .replace('\\', "/");
                out.push(relative);
            }
            // Symlinks are skipped
        }
        Ok(())
    }

    let mut out = Vec::new();
    walk(root, root, &mut out)?;
    out.sort();
    Ok(out)
}
