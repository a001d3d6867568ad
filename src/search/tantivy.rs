use std::collections::BTreeMap;
use std::time::Instant;

use tantivy::collector::{Count, FacetCollector, TopDocs};
use tantivy::query::{BooleanQuery, ConstScoreQuery, Occur, Query, QueryClone};
use tantivy::schema::*;
use tantivy::{Index, IndexReader, IndexWriter, TantivyDocument};

use crate::config::{DatasetConfig, FilterConfig};
use crate::dataset::Document;
use crate::model::resolve::{Scalar, resolve_path};
use crate::model::types::{
    BoostStrength, DocKey, EngineState, EngineStatus, FacetBucket, FacetGroup, FilterHandle,
    QuerySpec, SearchOutcome, SearchRecord,
};
use crate::search::query::{QueryCompiler, TextField, range_query, value_query};
use crate::search::{EngineError, SearchEngine};

const KEY_FIELD: &str = "_key";
const FACET_FIELD: &str = "_facets";
const WRITER_HEAP_BYTES: usize = 50_000_000;

#[derive(Clone)]
pub struct Fields {
    pub key: Field,
    pub facets: Field,
    pub text: Vec<TextField>,
    /// i64 fields for filterable/sortable paths, keyed by dotted path.
    pub numeric: BTreeMap<String, Field>,
}

fn text_field_name(path: &str) -> String {
    format!("t_{}", path.replace('.', "__"))
}

fn numeric_field_name(path: &str) -> String {
    format!("n_{}", path.replace('.', "__"))
}

pub fn build_schema(config: &DatasetConfig) -> Schema {
    let mut schema_builder = Schema::builder();
    schema_builder.add_u64_field(KEY_FIELD, STORED);
    schema_builder.add_facet_field(FACET_FIELD, FacetOptions::default());
    for field in &config.fields {
        if field.indexable {
            schema_builder.add_text_field(&text_field_name(&field.path), TEXT);
        }
        if field.numeric() {
            schema_builder.add_i64_field(&numeric_field_name(&field.path), INDEXED | STORED | FAST);
        }
    }
    schema_builder.build()
}

pub fn fields_from_schema(schema: &Schema, config: &DatasetConfig) -> Result<Fields, EngineError> {
    let mut text = Vec::new();
    let mut numeric = BTreeMap::new();
    for field in &config.fields {
        if field.indexable {
            text.push(TextField {
                path: field.path.clone(),
                field: schema.get_field(&text_field_name(&field.path))?,
                boost: field.weight.boost(),
            });
        }
        if field.numeric() {
            numeric.insert(
                field.path.clone(),
                schema.get_field(&numeric_field_name(&field.path))?,
            );
        }
    }
    Ok(Fields {
        key: schema.get_field(KEY_FIELD)?,
        facets: schema.get_field(FACET_FIELD)?,
        text,
        numeric,
    })
}

/// Integer view of a scalar for filter/sort fields: bools are 0/1, floats truncate.
pub fn numeric_value(scalar: &Scalar) -> Option<i64> {
    match scalar {
        Scalar::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Scalar::Bool(b) => Some(i64::from(*b)),
        Scalar::String(s) => s.trim().parse().ok(),
    }
}

fn json_numeric(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Bool(b) => Some(i64::from(*b)),
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// In-memory Tantivy index over a JSON dataset.
pub struct TantivyEngine {
    index: Index,
    reader: IndexReader,
    fields: Fields,
    facetable: Vec<String>,
    sources: Vec<String>,
    filters: Vec<Box<dyn Query>>,
    boost: Option<(FilterHandle, BoostStrength)>,
}

impl TantivyEngine {
    /// Index `docs` according to `config`. `progress` sees (done, total).
    pub fn build(
        config: &DatasetConfig,
        docs: &[Document],
        mut progress: impl FnMut(usize, usize),
    ) -> Result<Self, EngineError> {
        let started = Instant::now();
        let schema = build_schema(config);
        let fields = fields_from_schema(&schema, config)?;
        let facetable: Vec<String> = config
            .fields
            .iter()
            .filter(|f| f.facetable)
            .map(|f| f.path.clone())
            .collect();

        let index = Index::create_in_ram(schema);
        let mut writer: IndexWriter = index.writer_with_num_threads(1, WRITER_HEAP_BYTES)?;
        let total = docs.len();
        for (key, doc) in docs.iter().enumerate() {
            writer.add_document(to_tantivy_doc(&fields, &facetable, key as DocKey, doc))?;
            progress(key + 1, total);
        }
        writer.commit()?;

        let reader = index.reader()?;
        reader.reload()?;
        tracing::info!(
            dataset = %config.name,
            documents = total,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "index_built"
        );

        Ok(Self {
            index,
            reader,
            fields,
            facetable,
            sources: docs.iter().map(|d| d.raw.clone()).collect(),
            filters: Vec::new(),
            boost: None,
        })
    }

    fn numeric_field(&self, path: &str) -> Result<Field, EngineError> {
        self.fields
            .numeric
            .get(path)
            .copied()
            .ok_or_else(|| EngineError::UnknownField(path.to_string()))
    }

    fn register(&mut self, query: Box<dyn Query>) -> FilterHandle {
        self.filters.push(query);
        FilterHandle(self.filters.len() - 1)
    }

    pub fn create_range_filter(
        &mut self,
        path: &str,
        min: Option<i64>,
        max: Option<i64>,
    ) -> Result<FilterHandle, EngineError> {
        let field = self.numeric_field(path)?;
        let query = range_query(field, min, max)?;
        Ok(self.register(query))
    }

    pub fn create_value_filter(
        &mut self,
        path: &str,
        value: &serde_json::Value,
    ) -> Result<FilterHandle, EngineError> {
        let field = self.numeric_field(path)?;
        let v = json_numeric(value)
            .ok_or_else(|| EngineError::Index(format!("`{path}` cannot match {value}")))?;
        Ok(self.register(value_query(field, v)))
    }

    pub fn create_filter(&mut self, cfg: &FilterConfig) -> Result<FilterHandle, EngineError> {
        match &cfg.value {
            Some(value) => self.create_value_filter(&cfg.field, value),
            None => self.create_range_filter(&cfg.field, cfg.min, cfg.max),
        }
    }

    /// A filter matching documents accepted by every handle.
    pub fn combine_filters(&mut self, handles: &[FilterHandle]) -> Result<FilterHandle, EngineError> {
        if let [single] = handles {
            return Ok(*single);
        }
        let clauses = handles
            .iter()
            .map(|h| {
                self.filters
                    .get(h.0)
                    .map(|q| (Occur::Must, q.box_clone()))
                    .ok_or(EngineError::UnknownFilter)
            })
            .collect::<Result<Vec<_>, _>>()?;
        if clauses.is_empty() {
            return Err(EngineError::UnknownFilter);
        }
        Ok(self.register(Box::new(BooleanQuery::new(clauses))))
    }

    /// Boost documents matching `filter`; returns how many documents it covers.
    pub fn define_boost(
        &mut self,
        filter: FilterHandle,
        strength: BoostStrength,
    ) -> Result<usize, EngineError> {
        let query = self.filters.get(filter.0).ok_or(EngineError::UnknownFilter)?;
        let boosted = self.reader.searcher().search(query.as_ref(), &Count)?;
        self.boost = (boosted > 0).then_some((filter, strength));
        Ok(boosted)
    }

    fn facet_groups(
        &self,
        searcher: &tantivy::Searcher,
        query: &dyn Query,
    ) -> Result<Vec<FacetGroup>, EngineError> {
        let mut collector = FacetCollector::for_field(FACET_FIELD);
        for path in &self.facetable {
            collector.add_facet(Facet::from_path(vec![path.as_str()]));
        }
        let counts = searcher.search(query, &collector)?;
        Ok(self
            .facetable
            .iter()
            .map(|path| {
                let mut buckets: Vec<FacetBucket> = counts
                    .get(Facet::from_path(vec![path.as_str()]))
                    .map(|(facet, count)| FacetBucket {
                        label: facet.to_path().last().map(|s| s.to_string()).unwrap_or_default(),
                        count,
                    })
                    .collect();
                buckets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
                FacetGroup {
                    field: path.clone(),
                    buckets,
                }
            })
            .collect())
    }
}

fn to_tantivy_doc(
    fields: &Fields,
    facetable: &[String],
    key: DocKey,
    doc: &Document,
) -> TantivyDocument {
    let mut d = TantivyDocument::default();
    d.add_u64(fields.key, key);
    for tf in &fields.text {
        for scalar in resolve_path(&doc.value, &tf.path).scalars() {
            d.add_text(tf.field, scalar.to_string());
        }
    }
    for (path, field) in &fields.numeric {
        for scalar in resolve_path(&doc.value, path).scalars() {
            if let Some(n) = numeric_value(scalar) {
                d.add_i64(*field, n);
            }
        }
    }
    for path in facetable {
        for scalar in resolve_path(&doc.value, path).scalars() {
            let label = scalar.to_string();
            if !label.is_empty() {
                d.add_facet(fields.facets, Facet::from_path(vec![path.clone(), label]));
            }
        }
    }
    d
}

impl SearchEngine for TantivyEngine {
    fn search(&self, spec: &QuerySpec) -> Result<SearchOutcome, EngineError> {
        let searcher = self.reader.searcher();
        let boost = match self.boost {
            Some((handle, strength)) => self
                .filters
                .get(handle.0)
                .map(|q| (&**q, strength.score())),
            None => None,
        };
        let compiled = QueryCompiler {
            index: &self.index,
            text_fields: &self.fields.text,
            filters: &self.filters,
            boost,
        }
        .compile(spec)?;

        tracing::debug!(
            backend = "tantivy",
            query = %spec.text,
            limit = spec.result_cap(),
            sort = ?spec.sort_field,
            facets = spec.facets_enabled,
            "search_start"
        );

        let exact_hits = searcher.search(compiled.exact.as_ref(), &Count)?;

        let sort_field = match &spec.sort_field {
            Some(path) => Some(self.numeric_field(path)?),
            None => None,
        };
        let limit = match sort_field {
            Some(_) => (searcher.num_docs() as usize).max(1),
            None => spec.result_cap(),
        };
        // Truncated lists only hold exact hits, whatever order they are sorted in.
        let candidates: Box<dyn Query> = if spec.truncate && exact_hits > 0 {
            Box::new(BooleanQuery::new(vec![
                (Occur::Must, compiled.ranked.box_clone()),
                (
                    Occur::Must,
                    Box::new(ConstScoreQuery::new(compiled.exact.box_clone(), 0.0)),
                ),
            ]))
        } else {
            compiled.ranked.box_clone()
        };
        let top_docs = searcher.search(candidates.as_ref(), &TopDocs::with_limit(limit).order_by_score())?;

        let mut ranked = Vec::with_capacity(top_docs.len());
        for (score, addr) in top_docs {
            let doc: TantivyDocument = searcher.doc(addr)?;
            let Some(key) = doc.get_first(self.fields.key).and_then(|v| v.as_u64()) else {
                continue;
            };
            let sort_value = sort_field
                .and_then(|f| doc.get_first(f))
                .and_then(|v| v.as_i64());
            ranked.push((SearchRecord { key, score }, sort_value));
        }
        if sort_field.is_some() {
            // Stable: equal values keep relevance order; missing values sink.
            ranked.sort_by(|a, b| b.1.cmp(&a.1));
        }

        let mut cap = spec.result_cap();
        if spec.truncate && exact_hits > 0 {
            cap = cap.min(exact_hits);
        }
        let records: Vec<SearchRecord> = ranked.into_iter().take(cap).map(|(r, _)| r).collect();

        let facets = if spec.facets_enabled {
            Some(self.facet_groups(&searcher, compiled.ranked.as_ref())?)
        } else {
            None
        };

        Ok(SearchOutcome {
            records,
            truncation_index: exact_hits,
            facets,
        })
    }

    fn document(&self, key: DocKey) -> Result<String, EngineError> {
        usize::try_from(key)
            .ok()
            .and_then(|idx| self.sources.get(idx))
            .cloned()
            .ok_or(EngineError::MissingDocument(key))
    }

    fn facetable_fields(&self) -> Vec<String> {
        self.facetable.clone()
    }

    fn status(&self) -> EngineStatus {
        EngineStatus {
            document_count: self.reader.searcher().num_docs(),
            state: EngineState::Ready,
            version: tantivy::version_string().to_string(),
            license: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CONFIG: &str = r#"
name = "mini"
data = "mini.json"
sort = "attack"

[[fields]]
path = "name"
indexable = true
weight = "high"

[[fields]]
path = "type1"
indexable = true
weight = "low"
facetable = true

[[fields]]
path = "abilities"
facetable = true

[[fields]]
path = "attack"
sortable = true

[[fields]]
path = "number"
filterable = true

[[fields]]
path = "is_legendary"
facetable = true
filterable = true
"#;

    fn docs() -> Vec<Document> {
        vec![
            json!({"number": 25, "name": "Pikachu", "type1": "electric", "attack": 55, "abilities": ["Static", "Lightning Rod"], "is_legendary": false}),
            json!({"number": 26, "name": "Raichu", "type1": "electric", "attack": 85, "abilities": ["Static"], "is_legendary": false}),
            json!({"number": 145, "name": "Zapdos", "type1": "electric", "attack": 90, "abilities": ["Pressure"], "is_legendary": true}),
            json!({"number": 172, "name": "Pichu", "type1": "electric", "attack": 40, "abilities": ["Static"], "is_legendary": false}),
            json!({"number": 4, "name": "Charmander", "type1": "fire", "attack": 52, "abilities": ["Blaze"], "is_legendary": false}),
        ]
        .into_iter()
        .map(Document::new)
        .collect()
    }

    fn engine() -> TantivyEngine {
        let cfg = DatasetConfig::from_toml(CONFIG).unwrap();
        TantivyEngine::build(&cfg, &docs(), |_, _| {}).unwrap()
    }

    fn names(engine: &TantivyEngine, outcome: &SearchOutcome) -> Vec<String> {
        outcome
            .records
            .iter()
            .map(|r| crate::model::resolve::field_value(&engine.document(r.key).unwrap(), "name"))
            .collect()
    }

    #[test]
    fn prefix_search_finds_partial_name() {
        let engine = engine();
        let out = engine.search(&QuerySpec::new("pika", 5)).unwrap();
        assert_eq!(names(&engine, &out), vec!["Pikachu"]);
        assert_eq!(out.truncation_index, 1);
        assert!(out.facets.is_none());
    }

    #[test]
    fn blank_text_matches_everything_up_to_cap() {
        let engine = engine();
        let out = engine.search(&QuerySpec::new("", 3)).unwrap();
        assert_eq!(out.records.len(), 3);
        assert_eq!(out.truncation_index, 5);
    }

    #[test]
    fn range_filter_restricts_records() {
        let mut engine = engine();
        let handle = engine.create_range_filter("number", Some(1), Some(151)).unwrap();
        let mut spec = QuerySpec::new("electric", 10);
        spec.filter = Some(handle);
        let out = engine.search(&spec).unwrap();
        let mut got = names(&engine, &out);
        got.sort();
        assert_eq!(got, vec!["Pikachu", "Raichu", "Zapdos"]);
        assert_eq!(out.truncation_index, 3);
    }

    #[test]
    fn boost_lifts_matching_documents() {
        let mut engine = engine();
        let legendary = engine
            .create_value_filter("is_legendary", &json!(true))
            .unwrap();
        assert_eq!(engine.define_boost(legendary, BoostStrength::High).unwrap(), 1);

        let mut spec = QuerySpec::new("electric", 1);
        spec.boost_enabled = true;
        let out = engine.search(&spec).unwrap();
        assert_eq!(names(&engine, &out), vec!["Zapdos"]);
    }

    #[test]
    fn boost_covering_nothing_is_not_defined() {
        let mut engine = engine();
        let none = engine.create_range_filter("number", Some(900), None).unwrap();
        assert_eq!(engine.define_boost(none, BoostStrength::Med).unwrap(), 0);
        assert!(engine.boost.is_none());
    }

    #[test]
    fn sort_orders_by_field_descending() {
        let engine = engine();
        let mut spec = QuerySpec::new("electric", 3);
        spec.sort_field = Some("attack".into());
        let out = engine.search(&spec).unwrap();
        assert_eq!(names(&engine, &out), vec!["Zapdos", "Raichu", "Pikachu"]);
    }

    #[test]
    fn facets_count_each_array_element() {
        let engine = engine();
        let mut spec = QuerySpec::new("electric", 5);
        spec.facets_enabled = true;
        let out = engine.search(&spec).unwrap();
        let facets = out.facets.unwrap();
        assert_eq!(
            facets.iter().map(|g| g.field.as_str()).collect::<Vec<_>>(),
            vec!["type1", "abilities", "is_legendary"]
        );
        let abilities = &facets[1].buckets;
        assert_eq!(abilities[0], FacetBucket { label: "Static".into(), count: 3 });
        assert!(abilities.iter().any(|b| b.label == "Lightning Rod" && b.count == 1));
        assert!(!abilities.iter().any(|b| b.label == "Blaze"));
    }

    #[test]
    fn truncate_cuts_at_exact_hits() {
        let engine = engine();
        let mut spec = QuerySpec::new("pichu", 5);
        let loose = engine.search(&spec).unwrap();
        spec.truncate = true;
        let cut = engine.search(&spec).unwrap();
        assert_eq!(cut.truncation_index, 1);
        assert_eq!(cut.records.len(), 1);
        assert!(loose.records.len() >= cut.records.len());
        assert_eq!(names(&engine, &cut), vec!["Pichu"]);
    }

    #[test]
    fn sorted_truncation_keeps_exact_hits_only() {
        let cfg = DatasetConfig::from_toml(CONFIG).unwrap();
        let docs: Vec<Document> = vec![
            json!({"number": 172, "name": "Pichu", "type1": "electric", "attack": 40}),
            json!({"number": 900, "name": "Picha", "type1": "electric", "attack": 99}),
        ]
        .into_iter()
        .map(Document::new)
        .collect();
        let engine = TantivyEngine::build(&cfg, &docs, |_, _| {}).unwrap();

        let mut spec = QuerySpec::new("pichu", 5);
        spec.sort_field = Some("attack".into());
        let loose = engine.search(&spec).unwrap();
        assert_eq!(names(&engine, &loose), vec!["Picha", "Pichu"]);

        spec.truncate = true;
        let cut = engine.search(&spec).unwrap();
        assert_eq!(cut.truncation_index, 1);
        assert_eq!(names(&engine, &cut), vec!["Pichu"]);
    }

    #[test]
    fn combined_filters_intersect() {
        let mut engine = engine();
        let low = engine.create_range_filter("number", None, Some(100)).unwrap();
        let not_legendary = engine
            .create_value_filter("is_legendary", &json!(false))
            .unwrap();
        let both = engine.combine_filters(&[low, not_legendary]).unwrap();
        let mut spec = QuerySpec::new("", 10);
        spec.filter = Some(both);
        let out = engine.search(&spec).unwrap();
        assert_eq!(out.records.len(), 3);
    }

    #[test]
    fn unknown_fields_and_documents_are_errors() {
        let mut engine = engine();
        assert!(matches!(
            engine.create_range_filter("speed", Some(1), None),
            Err(EngineError::UnknownField(_))
        ));
        assert!(matches!(
            engine.document(99),
            Err(EngineError::MissingDocument(99))
        ));
        let status = engine.status();
        assert_eq!(status.document_count, 5);
        assert_eq!(status.state, EngineState::Ready);
    }
}
