//! Query, session and engine-boundary types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Default number of records requested per search.
pub const DEFAULT_RESULT_CAP: usize = 5;

/// Opaque filter handle issued by a search engine and handed back in a [`QuerySpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterHandle(pub(crate) usize);

/// Mutable description of the query the session sends to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    pub text: String,
    result_cap: usize,
    pub sort_field: Option<String>,
    pub filter: Option<FilterHandle>,
    pub boost_enabled: bool,
    pub facets_enabled: bool,
    /// Cut the record list at the truncation index.
    pub truncate: bool,
}

impl Default for QuerySpec {
    fn default() -> Self {
        Self::new("", DEFAULT_RESULT_CAP)
    }
}

impl QuerySpec {
    pub fn new(text: impl Into<String>, result_cap: usize) -> Self {
        Self {
            text: text.into(),
            result_cap: result_cap.max(1),
            sort_field: None,
            filter: None,
            boost_enabled: false,
            facets_enabled: false,
            truncate: false,
        }
    }

    pub fn result_cap(&self) -> usize {
        self.result_cap
    }

    pub fn set_result_cap(&mut self, cap: usize) {
        self.result_cap = cap.max(1);
    }

    pub fn increment_cap(&mut self) {
        self.set_result_cap(self.result_cap.saturating_add(1));
    }

    pub fn decrement_cap(&mut self) {
        self.set_result_cap(self.result_cap.saturating_sub(1));
    }

    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }
}

/// Boolean toggles driven by idle-mode keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFlags {
    pub filters_enabled: bool,
    pub boost_enabled: bool,
    pub allow_empty_search: bool,
    pub print_facets: bool,
    pub truncate_list: bool,
    pub sort_enabled: bool,
    pub measure_performance: bool,
    /// Set once a sample exists for the current measuring run.
    pub performance_measured: bool,
}

impl Default for SessionFlags {
    fn default() -> Self {
        Self {
            filters_enabled: false,
            boost_enabled: false,
            allow_empty_search: false,
            print_facets: false,
            truncate_list: true,
            sort_enabled: false,
            measure_performance: false,
            performance_measured: false,
        }
    }
}

pub type DocKey = u64;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchRecord {
    pub key: DocKey,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetBucket {
    pub label: String,
    pub count: u64,
}

/// Histogram for one facetable field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetGroup {
    pub field: String,
    pub buckets: Vec<FacetBucket>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub records: Vec<SearchRecord>,
    /// Count of exact (all-terms) matches, independent of the result cap.
    pub truncation_index: usize,
    pub facets: Option<Vec<FacetGroup>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineState {
    Building { percent: u8 },
    Ready,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LicenseInfo {
    pub valid: bool,
    pub expires: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineStatus {
    pub document_count: u64,
    pub state: EngineState,
    pub version: String,
    pub license: Option<LicenseInfo>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoostStrength {
    Low,
    #[default]
    Med,
    High,
}

impl BoostStrength {
    /// Constant score added to boosted documents.
    pub fn score(self) -> f32 {
        match self {
            BoostStrength::Low => 1.0,
            BoostStrength::Med => 3.0,
            BoostStrength::High => 6.0,
        }
    }
}

/// Outcome of one timed batch of repeated searches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSample {
    pub avg_latency_ms: f64,
    pub memory_mb: u64,
    pub repetitions: usize,
    pub failures: usize,
    pub taken_at: DateTime<Utc>,
}
