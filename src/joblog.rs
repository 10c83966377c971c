//! Per-job structured log buffers for live status polling.
//!
//! One bounded ring buffer per job, shared behind a mutex. Readers get
//! cloned snapshots; writers never block on readers. Buffers are
//! removed five minutes after the job reaches a terminal state.

use chrono::Utc;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// Maximum entries retained per job; oldest are evicted first.
pub const LOG_CAPACITY: usize = 500;

/// How long a finished job's log stays pollable.
pub const LOG_TTL: Duration = Duration::from_secs(5 * 60);

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warn,
    Error,
}

/// One entry in a job's log buffer.
#[derive(Debug, Clone, Serialize)]
pub struct JobLogEntry {
    /// ISO-8601 timestamp.
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
    /// Pipeline stage that emitted the entry.
    pub stage: String,
    /// Process memory snapshot at append time.
    pub memory: String,
}

/// Shared map of job id to log buffer.
#[derive(Clone, Default)]
pub struct JobLogStore {
    inner: Arc<Mutex<HashMap<String, VecDeque<JobLogEntry>>>>,
}

impl JobLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, evicting the oldest when the buffer is full.
    pub fn append(&self, job_id: &str, level: LogLevel, stage: &str, message: &str) {
        let entry = JobLogEntry {
            timestamp: Utc::now().to_rfc3339(),
            level,
            message: message.to_string(),
            stage: stage.to_string(),
            memory: memory_snapshot(),
        };

        let mut map = self.inner.lock().expect("job log mutex poisoned");
        let buffer = map.entry(job_id.to_string()).or_default();
        if buffer.len() >= LOG_CAPACITY {
            buffer.pop_front();
        }
        buffer.push_back(entry);
    }

    /// Consistent snapshot of a job's log. Empty for unknown jobs.
    pub fn snapshot(&self, job_id: &str) -> Vec<JobLogEntry> {
        let map = self.inner.lock().expect("job log mutex poisoned");
        map.get(job_id)
            .map(|buffer| buffer.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Schedule removal of a finished job's buffer after [`LOG_TTL`].
    pub fn schedule_removal(&self, job_id: &str) {
        let store = self.clone();
        let job_id = job_id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(LOG_TTL).await;
            store.remove(&job_id);
        });
    }

    fn remove(&self, job_id: &str) {
        let mut map = self.inner.lock().expect("job log mutex poisoned");
        if map.remove(job_id).is_some() {
            debug!(job_id, "Removed expired job log");
        }
    }
}

/// Handle binding a store to one job id.
#[derive(Clone)]
pub struct JobLogger {
    store: JobLogStore,
    job_id: String,
}

impl JobLogger {
    pub fn new(store: JobLogStore, job_id: String) -> Self {
        Self { store, job_id }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn info(&self, stage: &str, message: &str) {
        self.store.append(&self.job_id, LogLevel::Info, stage, message);
    }

    pub fn success(&self, stage: &str, message: &str) {
        self.store
            .append(&self.job_id, LogLevel::Success, stage, message);
    }

    pub fn warn(&self, stage: &str, message: &str) {
        self.store.append(&self.job_id, LogLevel::Warn, stage, message);
    }

    pub fn error(&self, stage: &str, message: &str) {
        self.store
            .append(&self.job_id, LogLevel::Error, stage, message);
    }
}

/// Resident-set snapshot of the current process. Best-effort; empty on
/// platforms without procfs.
pub fn memory_snapshot() -> String {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            for line in status.lines() {
                if let Some(rest) = line.strip_prefix("VmRSS:") {
                    let kb: u64 = rest
                        .trim()
                        .trim_end_matches("kB")
                        .trim()
                        .parse()
                        .unwrap_or(0);
                    return format!("rss={:.1}MB", kb as f64 / 1024.0);
                }
            }
        }
        String::new()
    }
    #[cfg(not(target_os = "linux"))]
    {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_snapshot() {
        let store = JobLogStore::new();
        store.append("job-1", LogLevel::Info, "fetch", "starting");
        store.append("job-1", LogLevel::Success, "fetch", "done");
        store.append("job-2", LogLevel::Error, "prepare", "boom");

        let log = store.snapshot("job-1");
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].message, "starting");
        assert_eq!(log[1].level, LogLevel::Success);
        assert_eq!(log[0].stage, "fetch");

        assert_eq!(store.snapshot("job-2").len(), 1);
        assert!(store.snapshot("missing").is_empty());
    }

    #[test]
    fn test_ring_buffer_eviction() {
        let store = JobLogStore::new();
        for i in 0..(LOG_CAPACITY + 100) {
            store.append("job", LogLevel::Info, "transcribe", &format!("entry {}", i));
        }

        let log = store.snapshot("job");
        assert_eq!(log.len(), LOG_CAPACITY);
        // The first 100 entries were evicted.
        assert_eq!(log[0].message, "entry 100");
        assert_eq!(log.last().unwrap().message, format!("entry {}", LOG_CAPACITY + 99));
    }

    #[test]
    fn test_timestamps_are_iso8601() {
        let store = JobLogStore::new();
        store.append("job", LogLevel::Info, "fetch", "hi");
        let entry = &store.snapshot("job")[0];
        assert!(chrono::DateTime::parse_from_rfc3339(&entry.timestamp).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_removal_after_ttl() {
        let store = JobLogStore::new();
        store.append("job", LogLevel::Info, "render", "done");
        store.schedule_removal("job");

        tokio::time::sleep(LOG_TTL - Duration::from_secs(1)).await;
        assert_eq!(store.snapshot("job").len(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        // Let the removal task run.
        tokio::task::yield_now().await;
        assert!(store.snapshot("job").is_empty());
    }
}
