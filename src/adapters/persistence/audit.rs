//! Audit Log - Append-only JSONL Trade Records
//!
//! Persists auction audit entries to daily JSONL files in the format
//! `audit/YYYY-MM-DD.jsonl`. Each line is a self-contained JSON
//! record for easy parsing, streaming, and crash recovery. Periodic
//! cumulative summaries land in `audit/summary.jsonl`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument, warn};

use crate::ports::audit::{AuditSink, TradeLedgerEntry, TradeSummary};

/// Append-only JSONL audit sink with daily file rotation.
///
/// Entry files are named `audit/YYYY-MM-DD.jsonl` and each line is a
/// complete JSON object. This format is optimized for:
/// - Append-only writes (no read-modify-write)
/// - Line-by-line streaming for analysis
/// - Natural daily partitioning
pub struct JsonlAuditSink {
    /// Directory for daily entry files.
    audit_dir: PathBuf,
    /// Path of the rolling summary file.
    summary_path: PathBuf,
}

impl JsonlAuditSink {
    /// Create a new audit sink in the given data directory.
    pub async fn new(data_dir: &str) -> Result<Self> {
        let audit_dir = Path::new(data_dir).join("audit");

        fs::create_dir_all(&audit_dir)
            .await
            .context("Failed to create audit directory")?;

        let summary_path = audit_dir.join("summary.jsonl");

        Ok(Self {
            audit_dir,
            summary_path,
        })
    }

    async fn append_line(path: &Path, mut json: String) -> Result<()> {
        json.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .context("Failed to open audit file")?;

        file.write_all(json.as_bytes())
            .await
            .context("Failed to write audit record")?;

        file.flush().await.context("Failed to flush audit file")?;

        Ok(())
    }

    /// Load all audit entries from all daily files, oldest first.
    #[instrument(skip(self))]
    pub async fn load_all_entries(&self) -> Result<Vec<TradeLedgerEntry>> {
        let mut entries_out = Vec::new();
        let mut entries = fs::read_dir(&self.audit_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path == self.summary_path {
                continue;
            }
            if path.extension().is_some_and(|ext| ext == "jsonl") {
                let content = fs::read_to_string(&path).await?;
                for line in content.lines() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<TradeLedgerEntry>(line) {
                        Ok(record) => entries_out.push(record),
                        Err(e) => {
                            warn!(
                                file = %path.display(),
                                error = %e,
                                "Skipping malformed audit record"
                            );
                        }
                    }
                }
            }
        }

        entries_out.sort_by_key(|e| e.timestamp_ms);
        info!(count = entries_out.len(), "Loaded audit records");
        Ok(entries_out)
    }

    /// Load all cumulative trade summaries, oldest first.
    pub async fn load_summaries(&self) -> Result<Vec<TradeSummary>> {
        if !self.summary_path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.summary_path).await?;
        let mut records = Vec::new();

        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(summary) = serde_json::from_str::<TradeSummary>(line) {
                records.push(summary);
            }
        }

        Ok(records)
    }
}

#[async_trait]
impl AuditSink for JsonlAuditSink {
    /// Append an audit entry to today's JSONL file.
    #[instrument(skip(self, entry), fields(entry_id = %entry.id))]
    async fn append_entry(&self, entry: &TradeLedgerEntry) -> Result<()> {
        let date = Utc::now().format("%Y-%m-%d").to_string();
        let path = self.audit_dir.join(format!("{date}.jsonl"));

        let json = serde_json::to_string(entry)
            .context("Failed to serialize audit entry")?;
        Self::append_line(&path, json).await
    }

    /// Append a cumulative trade summary to the rolling summary file.
    async fn append_summary(&self, summary: &TradeSummary) -> Result<()> {
        let json = serde_json::to_string(summary)
            .context("Failed to serialize trade summary")?;
        Self::append_line(&self.summary_path, json).await
    }

    /// Check if the audit directory is writable.
    async fn is_healthy(&self) -> bool {
        let test_path = self.audit_dir.join(".health_check");
        let result = fs::write(&test_path, b"ok").await;
        let _ = fs::remove_file(&test_path).await;
        result.is_ok()
    }
}
