//! Session tuning (environment) and per-dataset configuration (TOML).
//!
//! A dataset file declares which JSON fields are searchable, facetable,
//! filterable and sortable, the filter and boost to prepare, and how result
//! rows are laid out:
//!
//! ```toml
//! name = "pokedex"
//! data = "pokedex.sample.json"
//! sort = "attack"
//!
//! [[fields]]
//! path = "name"
//! indexable = true
//! weight = "high"
//!
//! [[filters]]
//! field = "pokedex_number"
//! min = 1
//! max = 151
//!
//! [boost]
//! field = "is_legendary"
//! value = true
//! strength = "med"
//!
//! [[columns]]
//! header = "Name"
//! fields = ["name"]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::dataset::{DetectedField, FieldKind};
use crate::model::types::BoostStrength;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid dataset config: {0}")]
    Invalid(String),
}

/// How often the performance panel re-runs its timed batch while enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerfPolicy {
    /// One batch per activation of the measure toggle.
    OnToggle,
    /// A fresh batch on every tick.
    Continuous,
    /// A fresh batch whenever the previous one is older than the interval.
    Every(Duration),
}

impl PerfPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "on-toggle" | "ontoggle" | "once" => Some(PerfPolicy::OnToggle),
            "continuous" | "always" => Some(PerfPolicy::Continuous),
            other => other
                .trim_end_matches("ms")
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .map(|ms| PerfPolicy::Every(Duration::from_millis(ms))),
        }
    }
}

/// Runtime knobs for the interactive session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub tick: Duration,
    pub perf_repetitions: usize,
    pub perf_policy: PerfPolicy,
    /// Wait for Space before entering the live view.
    pub start_gate: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(50),
            perf_repetitions: 100,
            perf_policy: PerfPolicy::OnToggle,
            start_gate: true,
        }
    }
}

impl SessionConfig {
    /// Load config from environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(val) = dotenvy::var("LSEARCH_TICK_MS")
            && let Ok(ms) = val.parse::<u64>()
        {
            cfg.tick = Duration::from_millis(ms.max(1));
        }

        if let Ok(val) = dotenvy::var("LSEARCH_PERF_REPS")
            && let Ok(reps) = val.parse::<usize>()
        {
            cfg.perf_repetitions = reps.max(1);
        }

        if let Ok(val) = dotenvy::var("LSEARCH_PERF_POLICY") {
            match PerfPolicy::parse(&val) {
                Some(policy) => cfg.perf_policy = policy,
                None => tracing::warn!(value = %val, "ignoring unknown LSEARCH_PERF_POLICY"),
            }
        }

        if let Ok(val) = dotenvy::var("LSEARCH_NO_GATE") {
            cfg.start_gate = !(val.eq_ignore_ascii_case("true") || val == "1");
        }

        cfg
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weight {
    Low,
    #[default]
    Med,
    High,
}

impl Weight {
    pub fn boost(self) -> f32 {
        match self {
            Weight::Low => 1.0,
            Weight::Med => 2.0,
            Weight::High => 4.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    pub path: String,
    pub indexable: bool,
    pub weight: Weight,
    pub facetable: bool,
    pub filterable: bool,
    pub sortable: bool,
}

impl FieldConfig {
    pub fn numeric(&self) -> bool {
        self.filterable || self.sortable
    }
}

/// Range (`min`/`max`) or equality (`value`) restriction on a numeric field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FilterConfig {
    pub field: String,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BoostConfig {
    pub field: String,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub strength: BoostStrength,
}

impl BoostConfig {
    pub fn as_filter(&self) -> FilterConfig {
        FilterConfig {
            field: self.field.clone(),
            min: self.min,
            max: self.max,
            value: self.value.clone(),
        }
    }
}

/// Badge appended to a cell when `field` formats to `equals`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Marker {
    pub field: String,
    pub equals: String,
    pub symbol: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColumnConfig {
    pub header: String,
    pub fields: Vec<String>,
    #[serde(default = "default_join")]
    pub join: String,
    #[serde(default)]
    pub marker: Option<Marker>,
}

fn default_join() -> String {
    " ".to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatasetConfig {
    pub name: String,
    pub data: PathBuf,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
    #[serde(default)]
    pub filters: Vec<FilterConfig>,
    #[serde(default)]
    pub boost: Option<BoostConfig>,
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
}

impl DatasetConfig {
    /// Load and validate a dataset file; `data` is resolved relative to it.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let body = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut cfg = Self::from_toml(&body).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        if cfg.data.is_relative()
            && let Some(parent) = path.parent()
        {
            cfg.data = parent.join(&cfg.data);
        }
        Ok(cfg)
    }

    pub fn from_toml(body: &str) -> Result<Self, ConfigError> {
        let mut cfg: DatasetConfig = toml::from_str(body).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        cfg.validate()?;
        if cfg.columns.is_empty() {
            cfg.columns = default_columns(&cfg.fields);
        }
        Ok(cfg)
    }

    /// Dataset-agnostic config: every string field is searchable, low-cardinality
    /// kinds are facetable, numbers are sortable and the first fields become columns.
    pub fn infer(data: &Path, detected: &[DetectedField]) -> Self {
        let name = data
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "dataset".to_string());
        let fields: Vec<FieldConfig> = detected
            .iter()
            .filter(|f| f.kind != FieldKind::Object)
            .map(|f| FieldConfig {
                path: f.name.clone(),
                indexable: f.kind == FieldKind::String,
                weight: Weight::Med,
                facetable: f.kind == FieldKind::Bool || (f.kind == FieldKind::String && f.is_array),
                filterable: false,
                sortable: f.kind == FieldKind::Number && !f.is_array,
            })
            .collect();
        let columns = default_columns(&fields);
        Self {
            name,
            data: data.to_path_buf(),
            sort: None,
            fields,
            filters: Vec::new(),
            boost: None,
            columns,
        }
    }

    pub fn field(&self, path: &str) -> Option<&FieldConfig> {
        self.fields.iter().find(|f| f.path == path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.fields.iter().any(|f| f.indexable) {
            return Err(ConfigError::Invalid("no fields marked as indexable".into()));
        }
        for filter in &self.filters {
            self.require(&filter.field, FieldConfig::numeric, "filterable")?;
            check_bounds(&filter.field, filter.min, filter.max, filter.value.as_ref())?;
        }
        if let Some(boost) = &self.boost {
            self.require(&boost.field, FieldConfig::numeric, "filterable")?;
            check_bounds(&boost.field, boost.min, boost.max, boost.value.as_ref())?;
        }
        if let Some(sort) = &self.sort {
            self.require(sort, |f| f.sortable, "sortable")?;
        }
        Ok(())
    }

    fn require(
        &self,
        path: &str,
        capability: impl Fn(&FieldConfig) -> bool,
        label: &str,
    ) -> Result<(), ConfigError> {
        match self.field(path) {
            Some(f) if capability(f) => Ok(()),
            Some(_) => Err(ConfigError::Invalid(format!(
                "field `{path}` must be marked {label}"
            ))),
            None => Err(ConfigError::Invalid(format!("field `{path}` is not declared"))),
        }
    }
}

/// One column per field, first five fields only.
fn default_columns(fields: &[FieldConfig]) -> Vec<ColumnConfig> {
    fields
        .iter()
        .take(5)
        .map(|f| ColumnConfig {
            header: f.path.clone(),
            fields: vec![f.path.clone()],
            join: default_join(),
            marker: None,
        })
        .collect()
}

fn check_bounds(
    field: &str,
    min: Option<i64>,
    max: Option<i64>,
    value: Option<&serde_json::Value>,
) -> Result<(), ConfigError> {
    if value.is_none() && min.is_none() && max.is_none() {
        return Err(ConfigError::Invalid(format!(
            "restriction on `{field}` needs `value` or `min`/`max`"
        )));
    }
    if let (Some(lo), Some(hi)) = (min, max)
        && lo > hi
    {
        return Err(ConfigError::Invalid(format!(
            "restriction on `{field}` has min {lo} > max {hi}"
        )));
    }
    Ok(())
}
