use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Machine-readable result of one pipeline run. `ok` is derived: a run with
/// any recorded error is not ok, warnings alone do not fail it.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub ok: bool,
    pub run_id: Uuid,
    pub task: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub tools_scanned: u64,
    pub videos_scanned: u64,
    pub videos_upserted: u64,
    pub mentions_upserted: u64,
    pub deals_upserted: u64,
    pub snippets_upserted: u64,
    pub duplicates_skipped: u64,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl RunSummary {
    pub fn new(task: &str) -> Self {
        let now = Utc::now();
        Self {
            ok: true,
            run_id: Uuid::new_v4(),
            task: task.to_string(),
            started_at: now,
            finished_at: now,
            duration_ms: 0,
            tools_scanned: 0,
            videos_scanned: 0,
            videos_upserted: 0,
            mentions_upserted: 0,
            deals_upserted: 0,
            snippets_upserted: 0,
            duplicates_skipped: 0,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn finalize(mut self) -> Self {
        self.finished_at = Utc::now();
        self.duration_ms = (self.finished_at - self.started_at).num_milliseconds();
        self.ok = self.errors.is_empty();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalize_fails_run_on_errors_only() {
        let mut summary = RunSummary::new("extract-reviews");
        summary.warnings.push("soft problem".to_string());
        let summary = summary.finalize();
        assert!(summary.ok);

        let mut summary = RunSummary::new("extract-reviews");
        summary.errors.push("hard problem".to_string());
        let summary = summary.finalize();
        assert!(!summary.ok);
        assert!(summary.duration_ms >= 0);
    }
}
