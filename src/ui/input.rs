//! Idle tracking and keystroke dispatch.
//!
//! Keys are classified against the idle clock *before* the clock is reset
//! for that key, so the first key after a pause can toggle a flag while the
//! keys that follow it in the same burst edit the query again.

use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::ui::session::SessionState;

/// Quiet period after which secondary keys and panels activate.
pub const IDLE_THRESHOLD: Duration = Duration::from_secs(2);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputMode {
    Typing,
    Idle,
}

#[derive(Clone, Copy, Debug)]
pub struct IdleClock {
    last_input: Instant,
}

impl IdleClock {
    pub fn new(now: Instant) -> Self {
        Self { last_input: now }
    }

    pub fn record_input(&mut self, now: Instant) {
        self.last_input = now;
    }

    pub fn last_input(&self) -> Instant {
        self.last_input
    }

    pub fn is_idle(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_input) >= IDLE_THRESHOLD
    }

    pub fn mode(&self, now: Instant) -> InputMode {
        if self.is_idle(now) {
            InputMode::Idle
        } else {
            InputMode::Typing
        }
    }
}

/// Which guarded toggles have their prerequisite in place.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Guards {
    pub has_filter: bool,
    pub has_boost: bool,
    pub has_sort: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrainOutcome {
    Continue,
    Quit,
}

#[derive(Clone, Copy, Debug)]
pub struct InputDispatcher {
    guards: Guards,
}

impl InputDispatcher {
    pub fn new(guards: Guards) -> Self {
        Self { guards }
    }

    pub fn guards(&self) -> Guards {
        self.guards
    }

    /// Apply every buffered key in order. Esc stops immediately and the rest are dropped.
    pub fn drain(&self, state: &mut SessionState, keys: &[KeyEvent], now: Instant) -> DrainOutcome {
        for key in keys {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if key.code == KeyCode::Esc {
                return DrainOutcome::Quit;
            }
            let handled = state.clock.mode(now) == InputMode::Idle && self.apply_idle(state, key);
            if !handled {
                apply_edit(state, key);
            }
            state.clock.record_input(now);
        }
        DrainOutcome::Continue
    }

    /// Idle-only commands. Returns false when the key should fall through to editing.
    fn apply_idle(&self, state: &mut SessionState, key: &KeyEvent) -> bool {
        let flags = &mut state.flags;
        match key.code {
            KeyCode::Char('c' | 'C') if !has_command_modifier(key) => {
                state.query.text.clear();
                state.facet_page = 0;
            }
            KeyCode::Left if flags.print_facets => {
                state.facet_page = (state.facet_page - 1).max(0);
            }
            KeyCode::Right if flags.print_facets => state.facet_page += 1,
            _ if shifted(key, 'T') => flags.truncate_list = !flags.truncate_list,
            _ if shifted(key, 'F') => {
                if self.guards.has_filter {
                    flags.filters_enabled = !flags.filters_enabled;
                }
            }
            _ if shifted(key, 'P') => {
                flags.print_facets = !flags.print_facets;
                if !flags.print_facets {
                    state.facet_page = 0;
                }
            }
            _ if shifted(key, 'B') => {
                if self.guards.has_boost {
                    flags.boost_enabled = !flags.boost_enabled;
                }
            }
            _ if shifted(key, 'E') => flags.allow_empty_search = !flags.allow_empty_search,
            _ if shifted(key, 'M') => {
                flags.measure_performance = !flags.measure_performance;
                flags.performance_measured = false;
            }
            _ if shifted(key, 'S') => {
                if self.guards.has_sort {
                    flags.sort_enabled = !flags.sort_enabled;
                }
            }
            _ => return false,
        }
        true
    }
}

fn apply_edit(state: &mut SessionState, key: &KeyEvent) {
    match key.code {
        KeyCode::Backspace => {
            if state.query.text.pop().is_some() {
                state.facet_page = 0;
            }
        }
        KeyCode::Up => state.query.increment_cap(),
        KeyCode::Down => state.query.decrement_cap(),
        KeyCode::Char(ch) if !ch.is_control() && !has_command_modifier(key) => {
            state.query.text.push(ch);
            state.facet_page = 0;
        }
        _ => {}
    }
}

fn has_command_modifier(key: &KeyEvent) -> bool {
    key.modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
}

/// Shift+letter, reported either as the uppercase char or lowercase with SHIFT.
fn shifted(key: &KeyEvent, upper: char) -> bool {
    if has_command_modifier(key) {
        return false;
    }
    match key.code {
        KeyCode::Char(ch) if ch == upper => true,
        KeyCode::Char(ch) => {
            key.modifiers.contains(KeyModifiers::SHIFT) && ch.to_ascii_uppercase() == upper
        }
        _ => false,
    }
}
