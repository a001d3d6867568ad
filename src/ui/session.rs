//! Tick-driven session controller.
//!
//! One [`SessionController::tick`] drains input, rebuilds the query, runs the
//! primary search and, while idle, the facet search and performance sampler.
//! It never sleeps; [`Ticker`] paces the loop in `ui::tui`.

use std::time::{Duration, Instant};

use crossterm::event::KeyEvent;
use tracing::{debug, warn};

use crate::config::{ColumnConfig, PerfPolicy, SessionConfig};
use crate::model::types::{
    FacetGroup, FilterHandle, PerformanceSample, QuerySpec, SessionFlags,
};
use crate::search::{EngineError, SearchEngine};
use crate::ui::data::{InfoView, RenderModel, RowView, SecondaryPanel, row_from_document};
use crate::ui::facets::{groups_per_page_for, paginate};
use crate::ui::input::{DrainOutcome, Guards, IdleClock, InputDispatcher};
use crate::ui::perf::PerformanceSampler;
use crate::ui::shortcuts::legend;

/// Mutable session aggregate. Only the controller's dispatcher writes to it.
#[derive(Clone, Debug)]
pub struct SessionState {
    pub query: QuerySpec,
    pub flags: SessionFlags,
    pub clock: IdleClock,
    /// Requested facet page; clamped and written back after each pagination.
    pub facet_page: i64,
}

impl SessionState {
    pub fn new(now: Instant, result_cap: usize) -> Self {
        Self {
            query: QuerySpec::new("", result_cap),
            flags: SessionFlags::default(),
            clock: IdleClock::new(now),
            facet_page: 0,
        }
    }
}

/// Engine-side objects prepared before the session starts.
#[derive(Clone, Debug, Default)]
pub struct SessionResources {
    pub filter: Option<FilterHandle>,
    pub docs_boosted: usize,
    pub sort_field: Option<String>,
}

impl SessionResources {
    pub fn guards(&self) -> Guards {
        Guards {
            has_filter: self.filter.is_some(),
            has_boost: self.docs_boosted > 0,
            has_sort: self.sort_field.is_some(),
        }
    }
}

#[derive(Debug)]
pub enum TickOutcome {
    Quit,
    Render(Box<RenderModel>),
}

#[derive(Clone, Debug, Default)]
struct PrimaryFrame {
    rows: Vec<RowView>,
    exact_hits: usize,
    response_ms: f64,
}

pub struct SessionController<E: SearchEngine> {
    engine: E,
    resources: SessionResources,
    columns: Vec<ColumnConfig>,
    config: SessionConfig,
    dispatcher: InputDispatcher,
    sampler: PerformanceSampler,
    state: SessionState,
    last_good: PrimaryFrame,
    last_facets: Option<Vec<FacetGroup>>,
    last_sample: Option<(Instant, PerformanceSample)>,
}

impl<E: SearchEngine> SessionController<E> {
    pub fn new(
        engine: E,
        resources: SessionResources,
        columns: Vec<ColumnConfig>,
        config: SessionConfig,
        now: Instant,
    ) -> Self {
        let dispatcher = InputDispatcher::new(resources.guards());
        Self {
            engine,
            resources,
            columns,
            config,
            dispatcher,
            sampler: PerformanceSampler::new(),
            state: SessionState::new(now, crate::model::types::DEFAULT_RESULT_CAP),
            last_good: PrimaryFrame::default(),
            last_facets: None,
            last_sample: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Count `now` as a keystroke, e.g. the key that dismissed the start gate.
    pub fn touch(&mut self, now: Instant) {
        self.state.clock.record_input(now);
    }

    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.header.clone()).collect()
    }

    pub fn tick(&mut self, now: Instant, keys: &[KeyEvent]) -> TickOutcome {
        if self.dispatcher.drain(&mut self.state, keys, now) == DrainOutcome::Quit {
            debug!("session_quit");
            return TickOutcome::Quit;
        }
        self.rebuild_query();

        let idle = self.state.clock.is_idle(now);
        let eligible = self.state.query.has_text() || self.state.flags.allow_empty_search;
        let mut stale = None;

        let primary = if eligible {
            match self.primary_frame() {
                Ok(frame) => {
                    self.last_good = frame.clone();
                    frame
                }
                Err(err) => {
                    warn!(error = %err, query = %self.state.query.text, "primary search failed");
                    stale = Some(format!("search failed: {err}"));
                    self.last_good.clone()
                }
            }
        } else {
            self.last_good = PrimaryFrame::default();
            PrimaryFrame::default()
        };

        let secondary = (idle && eligible).then(|| self.secondary_panel(now, &primary, &mut stale));

        TickOutcome::Render(Box::new(RenderModel {
            text: self.state.query.text.clone(),
            mode: self.state.clock.mode(now),
            result_cap: self.state.query.result_cap(),
            headers: self.headers(),
            rows: primary.rows,
            exact_hits: primary.exact_hits,
            flags: self.state.flags.clone(),
            secondary,
            stale,
        }))
    }

    fn rebuild_query(&mut self) {
        let flags = &self.state.flags;
        let query = &mut self.state.query;
        query.filter = if flags.filters_enabled {
            self.resources.filter
        } else {
            None
        };
        query.boost_enabled = flags.boost_enabled && self.resources.docs_boosted > 0;
        query.sort_field = if flags.sort_enabled {
            self.resources.sort_field.clone()
        } else {
            None
        };
        query.truncate = flags.truncate_list;
        query.facets_enabled = false;
    }

    fn primary_frame(&self) -> Result<PrimaryFrame, EngineError> {
        let started = Instant::now();
        let outcome = self.engine.search(&self.state.query)?;
        let response_ms = started.elapsed().as_secs_f64() * 1000.0;
        let rows = outcome
            .records
            .iter()
            .map(|rec| {
                let raw = self.engine.document(rec.key)?;
                Ok(row_from_document(rec, &raw, &self.columns))
            })
            .collect::<Result<Vec<_>, EngineError>>()?;
        Ok(PrimaryFrame {
            rows,
            exact_hits: outcome.truncation_index,
            response_ms,
        })
    }

    fn secondary_panel(
        &mut self,
        now: Instant,
        primary: &PrimaryFrame,
        stale: &mut Option<String>,
    ) -> SecondaryPanel {
        let mut facet_query = self.state.query.clone();
        facet_query.facets_enabled = true;
        match self.engine.search(&facet_query) {
            Ok(outcome) => self.last_facets = outcome.facets,
            Err(err) => {
                warn!(error = %err, "facet search failed");
                stale.get_or_insert_with(|| format!("facet search failed: {err}"));
            }
        }

        let facets = if self.state.flags.print_facets {
            let groups = self.last_facets.clone().unwrap_or_default();
            let page = paginate(
                &groups,
                self.state.facet_page,
                groups_per_page_for(primary.exact_hits),
            );
            self.state.facet_page = page.page_index as i64;
            Some(page)
        } else {
            None
        };

        let performance = if self.state.flags.measure_performance {
            self.measure(now);
            self.last_sample.as_ref().map(|(_, s)| s.clone())
        } else {
            None
        };

        SecondaryPanel {
            facets,
            performance,
            info: InfoView {
                response_ms: primary.response_ms,
                filters: self.state.query.filter.is_some(),
                facets: self.state.flags.print_facets,
                docs_boosted: self.resources.docs_boosted,
                status: self.engine.status(),
            },
            legend: legend(&self.state.flags, self.dispatcher.guards()),
        }
    }

    fn measure(&mut self, now: Instant) {
        let due = match self.config.perf_policy {
            PerfPolicy::OnToggle => !self.state.flags.performance_measured,
            PerfPolicy::Continuous => true,
            PerfPolicy::Every(interval) => {
                !self.state.flags.performance_measured
                    || self
                        .last_sample
                        .as_ref()
                        .is_none_or(|(at, _)| now.saturating_duration_since(*at) >= interval)
            }
        };
        if !due {
            return;
        }
        let mut snapshot = self.state.query.clone();
        snapshot.facets_enabled = self.state.flags.print_facets;
        let sample = self
            .sampler
            .sample(&self.engine, &snapshot, self.config.perf_repetitions);
        self.last_sample = Some((now, sample));
        self.state.flags.performance_measured = true;
    }
}

/// Fixed-period pacing for the render loop.
#[derive(Debug, Clone)]
pub struct Ticker {
    period: Duration,
    next: Instant,
}

impl Ticker {
    pub fn new(period: Duration, now: Instant) -> Self {
        Self {
            period,
            next: now + period,
        }
    }

    /// Time left until the next tick is due.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.next.saturating_duration_since(now)
    }

    /// Sleep until the next tick; a late tick starts a fresh period from now.
    pub fn wait(&mut self) {
        let now = Instant::now();
        let remaining = self.remaining(now);
        if !remaining.is_zero() {
            std::thread::sleep(remaining);
        }
        self.next = self.next.max(now) + self.period;
    }
}
