//! Statistics about a completed sync run.

use chrono::{DateTime, Local};
use serde::Serialize;

/// Timestamps recorded at each phase boundary of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Checkpoints {
    /// Before listing input paths.
    pub start: DateTime<Local>,
    /// After enumeration, before computing identities.
    pub enumerated: DateTime<Local>,
    /// After identities, before querying the remote store.
    pub identified: DateTime<Local>,
    /// After the remote listing, before planning.
    pub queried: DateTime<Local>,
    /// After planning, before uploading.
    pub planned: DateTime<Local>,
    /// After every upload has finished.
    pub uploaded: DateTime<Local>,
    /// When the statistics were assembled.
    pub end: DateTime<Local>,
}

/// Result of a sync run.
#[derive(Debug, Clone, Serialize)]
pub struct RunStatistics {
    checkpoints: Checkpoints,
    total_files: usize,
    files_to_upload: usize,
    total_size_bytes: u64,
    uploaded_size_bytes: u64,
    errors: Vec<String>,
    identity_errors: Vec<String>,
}

impl RunStatistics {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        checkpoints: Checkpoints,
        total_files: usize,
        files_to_upload: usize,
        total_size_bytes: u64,
        uploaded_size_bytes: u64,
        errors: Vec<String>,
        identity_errors: Vec<String>,
    ) -> Self {
        Self {
            checkpoints,
            total_files,
            files_to_upload,
            total_size_bytes,
            uploaded_size_bytes,
            errors,
            identity_errors,
        }
    }

    pub fn checkpoints(&self) -> &Checkpoints {
        &self.checkpoints
    }

    /// Files discovered from the input paths.
    pub fn total_files(&self) -> usize {
        self.total_files
    }

    /// Files the plan selected for upload.
    pub fn files_to_upload(&self) -> usize {
        self.files_to_upload
    }

    /// Combined size of every file whose identity was computed.
    pub fn total_size_bytes(&self) -> u64 {
        self.total_size_bytes
    }

    /// Combined size of the files that uploaded successfully.
    pub fn uploaded_size_bytes(&self) -> u64 {
        self.uploaded_size_bytes
    }

    /// Local paths whose upload failed, in sorted order.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Local paths skipped because their identity could not be computed.
    pub fn identity_errors(&self) -> &[String] {
        &self.identity_errors
    }

    /// Whether every discovered file was handled without error.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && self.identity_errors.is_empty()
    }

    /// Wall-clock duration of the whole run.
    pub fn duration(&self) -> chrono::Duration {
        self.checkpoints.end - self.checkpoints.start
    }

    /// Human-readable report of the run.
    pub fn summary(&self) -> String {
        let c = &self.checkpoints;
        let mut output = String::new();

        output.push_str(&format!(
            "Run started {}, finished {} ({})\n",
            c.start.format("%Y-%m-%d %H:%M:%S"),
            c.end.format("%Y-%m-%d %H:%M:%S"),
            format_duration(c.end - c.start),
        ));
        output.push_str(&format!("  Enumerate files:  {}\n", format_duration(c.enumerated - c.start)));
        output.push_str(&format!("  Compute identity: {}\n", format_duration(c.identified - c.enumerated)));
        output.push_str(&format!("  Query remote:     {}\n", format_duration(c.queried - c.identified)));
        output.push_str(&format!("  Plan uploads:     {}\n", format_duration(c.planned - c.queried)));
        output.push_str(&format!("  Upload files:     {}\n", format_duration(c.uploaded - c.planned)));

        output.push_str(&format!(
            "Files: {} discovered, {} selected for upload, {} failed\n",
            self.total_files,
            self.files_to_upload,
            self.errors.len(),
        ));
        output.push_str(&format!(
            "Size:  {} total, {} uploaded\n",
            humansize::format_size(self.total_size_bytes, humansize::BINARY),
            humansize::format_size(self.uploaded_size_bytes, humansize::BINARY),
        ));

        if !self.errors.is_empty() {
            output.push_str("Failed uploads:\n");
            for path in &self.errors {
                output.push_str(&format!("  {}\n", path));
            }
        }

        if !self.identity_errors.is_empty() {
            output.push_str("Unreadable files (skipped):\n");
            for path in &self.identity_errors {
                output.push_str(&format!("  {}\n", path));
            }
        }

        output
    }

    /// Format the statistics as a JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn format_duration(duration: chrono::Duration) -> String {
    format!("{:.3}s", duration.num_milliseconds() as f64 / 1000.0)
}
