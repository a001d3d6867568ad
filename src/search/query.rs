//! Compile a [`QuerySpec`] into Tantivy queries.
//!
//! Free text is analyzed with the index's default tokenizer. Every token
//! produces one clause per searchable field; the last token is matched as a
//! prefix so results follow the user while they type. Two queries come out:
//!
//! - `ranked`: any token may match (fuzzy for longer tokens), with the
//!   all-tokens match boosted so exact hits rank first. Used for records.
//! - `exact`: every token must match. Its hit count is the truncation index.

use std::ops::Bound;

use tantivy::Index;
use tantivy::query::{
    AllQuery, BooleanQuery, BoostQuery, ConstScoreQuery, FuzzyTermQuery, Occur, Query,
    QueryClone, RangeQuery, TermQuery,
};
use tantivy::schema::{Field, IndexRecordOption, Term};
use tantivy::tokenizer::TokenStream;

use crate::model::types::QuerySpec;
use crate::search::EngineError;

/// Extra weight given to documents matching every token.
const EXACT_BOOST: f32 = 2.0;

/// Tokens at least this long tolerate one edit.
const FUZZY_MIN_LEN: usize = 5;

#[derive(Debug, Clone)]
pub struct TextField {
    pub path: String,
    pub field: Field,
    pub boost: f32,
}

pub struct CompiledQuery {
    pub ranked: Box<dyn Query>,
    pub exact: Box<dyn Query>,
}

pub struct QueryCompiler<'a> {
    pub index: &'a Index,
    pub text_fields: &'a [TextField],
    pub filters: &'a [Box<dyn Query>],
    /// Registered boost filter and the constant score it adds.
    pub boost: Option<(&'a dyn Query, f32)>,
}

impl QueryCompiler<'_> {
    pub fn compile(&self, spec: &QuerySpec) -> Result<CompiledQuery, EngineError> {
        let tokens = self.tokenize(&spec.text)?;

        let (ranked, exact): (Box<dyn Query>, Box<dyn Query>) =
            if tokens.is_empty() || self.text_fields.is_empty() {
                (Box::new(AllQuery), Box::new(AllQuery))
            } else {
                let exact = self.all_tokens(&tokens);
                let any = self.any_token(&tokens);
                let ranked = BooleanQuery::new(vec![
                    (
                        Occur::Should,
                        Box::new(BoostQuery::new(exact.box_clone(), EXACT_BOOST)) as Box<dyn Query>,
                    ),
                    (Occur::Should, any),
                ]);
                (Box::new(ranked), exact)
            };

        let filter: Option<&dyn Query> = match spec.filter {
            Some(handle) => Some(
                self.filters
                    .get(handle.0)
                    .map(|q| &**q)
                    .ok_or(EngineError::UnknownFilter)?,
            ),
            None => None,
        };
        let boost = if spec.boost_enabled { self.boost } else { None };

        Ok(CompiledQuery {
            ranked: restrict(ranked, filter, boost),
            exact: restrict(exact, filter, None),
        })
    }

    fn tokenize(&self, text: &str) -> Result<Vec<String>, EngineError> {
        let mut analyzer = self
            .index
            .tokenizers()
            .get("default")
            .ok_or_else(|| EngineError::Index("default tokenizer missing".into()))?;
        let mut stream = analyzer.token_stream(text);
        let mut tokens = Vec::new();
        while stream.advance() {
            tokens.push(stream.token().text.clone());
        }
        Ok(tokens)
    }

    fn all_tokens(&self, tokens: &[String]) -> Box<dyn Query> {
        let last = tokens.len() - 1;
        let clauses = tokens
            .iter()
            .enumerate()
            .map(|(i, t)| (Occur::Must, self.token_clause(t, i == last, true)))
            .collect();
        Box::new(BooleanQuery::new(clauses))
    }

    fn any_token(&self, tokens: &[String]) -> Box<dyn Query> {
        let last = tokens.len() - 1;
        let clauses = tokens
            .iter()
            .enumerate()
            .map(|(i, t)| (Occur::Should, self.token_clause(t, i == last, false)))
            .collect();
        Box::new(BooleanQuery::new(clauses))
    }

    fn token_clause(&self, token: &str, prefix: bool, exact: bool) -> Box<dyn Query> {
        let distance: u8 = if exact || token.chars().count() < FUZZY_MIN_LEN {
            0
        } else {
            1
        };
        let per_field = self
            .text_fields
            .iter()
            .map(|tf| {
                let term = Term::from_field_text(tf.field, token);
                let q: Box<dyn Query> = if prefix {
                    Box::new(FuzzyTermQuery::new_prefix(term, distance, true))
                } else if distance == 0 {
                    Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs))
                } else {
                    Box::new(FuzzyTermQuery::new(term, distance, true))
                };
                (
                    Occur::Should,
                    Box::new(BoostQuery::new(q, tf.boost)) as Box<dyn Query>,
                )
            })
            .collect();
        Box::new(BooleanQuery::new(per_field))
    }
}

/// AND a filter onto `query` (without touching scores) and optionally add a boost clause.
fn restrict(
    query: Box<dyn Query>,
    filter: Option<&dyn Query>,
    boost: Option<(&dyn Query, f32)>,
) -> Box<dyn Query> {
    if filter.is_none() && boost.is_none() {
        return query;
    }
    let mut clauses: Vec<(Occur, Box<dyn Query>)> = vec![(Occur::Must, query)];
    if let Some(f) = filter {
        clauses.push((
            Occur::Must,
            Box::new(ConstScoreQuery::new(f.box_clone(), 0.0)),
        ));
    }
    if let Some((b, score)) = boost {
        clauses.push((
            Occur::Should,
            Box::new(ConstScoreQuery::new(b.box_clone(), score)),
        ));
    }
    Box::new(BooleanQuery::new(clauses))
}

/// Inclusive range over an i64 field; at least one bound is required.
pub fn range_query(
    field: Field,
    min: Option<i64>,
    max: Option<i64>,
) -> Result<Box<dyn Query>, EngineError> {
    if min.is_none() && max.is_none() {
        return Err(EngineError::Index("range filter needs a bound".into()));
    }
    let lower = min
        .map(|v| Bound::Included(Term::from_field_i64(field, v)))
        .unwrap_or(Bound::Unbounded);
    let upper = max
        .map(|v| Bound::Included(Term::from_field_i64(field, v)))
        .unwrap_or(Bound::Unbounded);
    Ok(Box::new(RangeQuery::new(lower, upper)))
}

pub fn value_query(field: Field, value: i64) -> Box<dyn Query> {
    Box::new(TermQuery::new(
        Term::from_field_i64(field, value),
        IndexRecordOption::Basic,
    ))
}
