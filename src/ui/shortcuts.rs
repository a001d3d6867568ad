//! Keyboard shortcut constants for consistent documentation.

use crate::model::types::SessionFlags;
use crate::ui::data::LegendEntry;
use crate::ui::input::Guards;

pub const QUIT: &str = "Esc";
pub const CLEAR: &str = "C";
pub const RESULTS_MORE: &str = "Up";
pub const RESULTS_LESS: &str = "Down";

// Idle toggles
pub const TRUNCATE: &str = "Shift+T";
pub const FILTERS: &str = "Shift+F";
pub const PRINT_FACETS: &str = "Shift+P";
pub const BOOST: &str = "Shift+B";
pub const EMPTY_SEARCH: &str = "Shift+E";
pub const MEASURE: &str = "Shift+M";
pub const SORT: &str = "Shift+S";
pub const FACET_PAGE: &str = "Left/Right";

/// Idle command table with each toggle's current state.
pub fn legend(flags: &SessionFlags, guards: Guards) -> Vec<LegendEntry> {
    let toggle = |key: &'static str, label: &'static str, active: bool, available: bool| LegendEntry {
        key,
        label,
        active: Some(active),
        available,
    };
    let action = |key: &'static str, label: &'static str, available: bool| LegendEntry {
        key,
        label,
        active: None,
        available,
    };
    vec![
        action(CLEAR, "clear text", true),
        action(RESULTS_MORE, "more results", true),
        action(RESULTS_LESS, "fewer results", true),
        toggle(TRUNCATE, "truncate to exact hits", flags.truncate_list, true),
        toggle(FILTERS, "filters", flags.filters_enabled, guards.has_filter),
        toggle(PRINT_FACETS, "show facets", flags.print_facets, true),
        action(FACET_PAGE, "facet page", flags.print_facets),
        toggle(BOOST, "boost", flags.boost_enabled, guards.has_boost),
        toggle(EMPTY_SEARCH, "allow empty search", flags.allow_empty_search, true),
        toggle(MEASURE, "measure performance", flags.measure_performance, true),
        toggle(SORT, "sort", flags.sort_enabled, guards.has_sort),
        action(QUIT, "quit", true),
    ]
}

pub fn footer_legend(idle: bool) -> &'static str {
    if idle {
        "Idle: Shift+T/F/P/B/E/M/S toggles | C clear | Left/Right facet page | Esc quit"
    } else {
        "Type to search | Up/Down results | pause 2s for commands | Esc quit"
    }
}
