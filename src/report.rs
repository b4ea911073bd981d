//! Per-task outcomes and the run-level summary derived from them.

use crate::output::{OutputFormatter, TableBuilder, text, to_json};
use crate::task::{PageType, ScreenshotTask, Target};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Terminal result of one task after all retries.
///
/// `file_path` is set exactly when the task succeeded and `error_message`
/// exactly when it failed; the constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptOutcome {
    success: bool,
    attempts_used: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
}

impl AttemptOutcome {
    pub fn success(attempts_used: u32, file_path: impl Into<PathBuf>) -> Self {
        Self {
            success: true,
            attempts_used: attempts_used.max(1),
            file_path: Some(file_path.into()),
            error_message: None,
        }
    }

    pub fn failure(attempts_used: u32, error_message: impl Into<String>) -> Self {
        Self {
            success: false,
            attempts_used: attempts_used.max(1),
            file_path: None,
            error_message: Some(error_message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn attempts_used(&self) -> u32 {
        self.attempts_used
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub site_name: String,
    pub language: String,
    pub device: String,
    pub page_type: PageType,
    pub target: Target,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
    pub finished_at: DateTime<Utc>,
}

impl TaskRecord {
    pub fn new(task: &ScreenshotTask, url: Option<String>, outcome: AttemptOutcome) -> Self {
        Self {
            site_name: task.site_name.clone(),
            language: task.language.clone(),
            device: task.device.clone(),
            page_type: task.page_type,
            target: task.target.clone(),
            url,
            outcome,
            finished_at: Utc::now(),
        }
    }

    pub fn label(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.site_name, self.language, self.device, self.page_type
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteStats {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Percentage with one decimal, `0.0` for an empty run.
    pub success_rate: f64,
    pub by_site: BTreeMap<String, SiteStats>,
}

/// Append-only list of task records, in execution order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultLog {
    records: Vec<TaskRecord>,
}

impl ResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: TaskRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[TaskRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn successes(&self) -> impl Iterator<Item = &TaskRecord> {
        self.records.iter().filter(|r| r.outcome.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &TaskRecord> {
        self.records.iter().filter(|r| !r.outcome.is_success())
    }

    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            total: self.records.len(),
            ..Default::default()
        };

        for record in &self.records {
            let site = summary.by_site.entry(record.site_name.clone()).or_default();
            site.total += 1;
            if record.outcome.is_success() {
                summary.successful += 1;
                site.successful += 1;
            } else {
                summary.failed += 1;
                site.failed += 1;
            }
        }

        if summary.total > 0 {
            let rate = summary.successful as f64 / summary.total as f64 * 100.0;
            summary.success_rate = (rate * 10.0).round() / 10.0;
        }

        summary
    }

    pub fn into_records(self) -> Vec<TaskRecord> {
        self.records
    }
}

/// Everything written to the results file for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub browser_launches: usize,
    pub browser_relaunches: usize,
    pub summary: RunSummary,
    pub results: Vec<TaskRecord>,
}

impl RunReport {
    pub fn new(
        started_at: DateTime<Utc>,
        log: ResultLog,
        browser_launches: usize,
        browser_relaunches: usize,
    ) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at,
            finished_at: Utc::now(),
            browser_launches,
            browser_relaunches,
            summary: log.summary(),
            results: log.into_records(),
        }
    }

    pub fn duration_ms(&self) -> u64 {
        (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64
    }

    pub fn write_json(&self, path: &Path, pretty: bool) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, to_json(self, pretty)?)?;
        tracing::debug!("Results written to {}", path.display());
        Ok(())
    }
}

impl OutputFormatter for RunSummary {
    fn format_text(&self) -> String {
        let mut output = text::section("Summary");
        output.push('\n');
        output.push_str(&text::key_value("Total", &self.total.to_string()));
        output.push('\n');
        output.push_str(&text::key_value("Successful", &self.successful.to_string()));
        output.push('\n');
        output.push_str(&text::key_value("Failed", &self.failed.to_string()));
        output.push('\n');
        output.push_str(&text::key_value(
            "Success rate",
            &format!("{:.1}%", self.success_rate),
        ));

        if !self.by_site.is_empty() {
            output.push_str(&text::subsection("By site"));
            output.push('\n');
            let mut table = TableBuilder::new().headers(vec![
                "Site".into(),
                "Total".into(),
                "Successful".into(),
                "Failed".into(),
            ]);
            for (site, stats) in &self.by_site {
                table = table.row(vec![
                    text::truncate(site, 20),
                    stats.total.to_string(),
                    stats.successful.to_string(),
                    stats.failed.to_string(),
                ]);
            }
            output.push_str(&table.build());
        }

        output
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        to_json(self, pretty)
    }
}

impl OutputFormatter for RunReport {
    fn format_text(&self) -> String {
        let mut output = String::new();

        let failures: Vec<&TaskRecord> = self
            .results
            .iter()
            .filter(|r| !r.outcome.is_success())
            .collect();

        if !failures.is_empty() {
            output.push_str(&text::section("Failed tasks"));
            output.push('\n');
            for record in failures {
                output.push_str(&text::error(&format!(
                    "{} ({} attempt(s)): {}",
                    record.label(),
                    record.outcome.attempts_used(),
                    record.outcome.error_message().unwrap_or("unknown error")
                )));
                output.push('\n');
            }
        }

        output.push_str(&self.summary.format_text());
        output.push('\n');
        output.push_str(&text::key_value(
            "Duration",
            &text::format_duration_ms(self.duration_ms()),
        ));
        output.push('\n');
        output.push_str(&text::key_value(
            "Browser launches",
            &format!("{} ({} on device switch)", self.browser_launches, self.browser_relaunches),
        ));

        let line = format!(
            "{}/{} screenshots captured",
            self.summary.successful, self.summary.total
        );
        output.push('\n');
        output.push_str(&if self.summary.failed == 0 {
            text::success(&line)
        } else {
            text::warning(&line)
        });

        output
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        to_json(self, pretty)
    }
}
