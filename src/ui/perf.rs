//! Latency sampling for the performance panel.
//!
//! A sample fans `repetitions` copies of the current query out over the rayon
//! pool, discards every result, and reports the mean wall-clock latency plus
//! the process RSS at the end of the batch.

use std::time::Instant;

use chrono::Utc;
use rayon::prelude::*;
use tracing::debug;

use crate::model::types::{PerformanceSample, QuerySpec};
use crate::search::SearchEngine;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Process memory reader.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResourceMonitor;

impl ResourceMonitor {
    pub fn new() -> Self {
        Self
    }

    /// Resident set size in bytes. Returns 0 on error or non-Linux.
    pub fn memory_usage(&self) -> u64 {
        #[cfg(target_os = "linux")]
        {
            Self::linux_memory_usage()
        }
        #[cfg(not(target_os = "linux"))]
        {
            0
        }
    }

    pub fn memory_mb(&self) -> u64 {
        self.memory_usage() / BYTES_PER_MB
    }

    #[cfg(target_os = "linux")]
    fn linux_memory_usage() -> u64 {
        // statm: size resident share text lib data dt, in pages
        match std::fs::read_to_string("/proc/self/statm") {
            Ok(content) => parse_statm_rss(&content).unwrap_or(0),
            Err(e) => {
                debug!(error = %e, "Failed to read /proc/self/statm");
                0
            }
        }
    }
}

fn parse_statm_rss(content: &str) -> Option<u64> {
    const PAGE_SIZE: u64 = 4096;
    let pages = content.split_whitespace().nth(1)?.parse::<u64>().ok()?;
    Some(pages * PAGE_SIZE)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PerformanceSampler {
    monitor: ResourceMonitor,
}

impl PerformanceSampler {
    pub fn new() -> Self {
        Self {
            monitor: ResourceMonitor::new(),
        }
    }

    /// Run `repetitions` searches of `snapshot` in parallel. Results are dropped.
    pub fn sample<E>(&self, engine: &E, snapshot: &QuerySpec, repetitions: usize) -> PerformanceSample
    where
        E: SearchEngine + ?Sized,
    {
        let repetitions = repetitions.max(1);
        let query = snapshot.clone();
        let started = Instant::now();
        let failures = (0..repetitions)
            .into_par_iter()
            .filter(|_| engine.search(&query).is_err())
            .count();
        let elapsed = started.elapsed();

        let sample = PerformanceSample {
            avg_latency_ms: elapsed.as_secs_f64() * 1000.0 / repetitions as f64,
            memory_mb: self.monitor.memory_mb(),
            repetitions,
            failures,
            taken_at: Utc::now(),
        };
        debug!(
            repetitions,
            failures,
            avg_latency_ms = sample.avg_latency_ms,
            memory_mb = sample.memory_mb,
            "perf_sample"
        );
        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::{DocKey, EngineState, EngineStatus, SearchOutcome};
    use crate::search::EngineError;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEngine {
        calls: AtomicUsize,
        seen: Mutex<Vec<String>>,
        fail_every: usize,
    }

    impl SearchEngine for CountingEngine {
        fn search(&self, query: &QuerySpec) -> Result<SearchOutcome, EngineError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(query.text.clone());
            if self.fail_every > 0 && n % self.fail_every == 0 {
                return Err(EngineError::NotReady);
            }
            Ok(SearchOutcome::default())
        }

        fn document(&self, key: DocKey) -> Result<String, EngineError> {
            Err(EngineError::MissingDocument(key))
        }

        fn facetable_fields(&self) -> Vec<String> {
            Vec::new()
        }

        fn status(&self) -> EngineStatus {
            EngineStatus {
                document_count: 0,
                state: EngineState::Ready,
                version: "test".into(),
                license: None,
            }
        }
    }

    #[test]
    fn runs_every_repetition_against_the_snapshot() {
        let engine = CountingEngine {
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            fail_every: 0,
        };
        let query = QuerySpec::new("pika", 5);
        let sample = PerformanceSampler::new().sample(&engine, &query, 100);
        assert_eq!(engine.calls.load(Ordering::SeqCst), 100);
        assert!(engine.seen.lock().unwrap().iter().all(|t| t == "pika"));
        assert_eq!(sample.repetitions, 100);
        assert_eq!(sample.failures, 0);
        assert!(sample.avg_latency_ms >= 0.0);
    }

    #[test]
    fn failures_are_counted_not_raised() {
        let engine = CountingEngine {
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            fail_every: 2,
        };
        let sample = PerformanceSampler::new().sample(&engine, &QuerySpec::default(), 10);
        assert_eq!(sample.failures, 5);
    }

    #[test]
    fn zero_repetitions_runs_once() {
        let engine = CountingEngine {
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            fail_every: 0,
        };
        let sample = PerformanceSampler::new().sample(&engine, &QuerySpec::default(), 0);
        assert_eq!(sample.repetitions, 1);
        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn statm_rss_is_second_field_in_pages() {
        assert_eq!(parse_statm_rss("1000 256 10 1 0 50 0\n"), Some(256 * 4096));
        assert_eq!(parse_statm_rss("garbage"), None);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn memory_usage_reports_nonzero_on_linux() {
        assert!(ResourceMonitor::new().memory_usage() > 0);
    }
}
