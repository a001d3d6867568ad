use live_search::model::types::SessionFlags;
use live_search::ui::input::Guards;
use live_search::ui::shortcuts::{BOOST, FILTERS, SORT, footer_legend, legend};

#[test]
fn footer_legend_follows_input_mode() {
    let typing = footer_legend(false);
    assert!(typing.contains("Type to search"), "typing footer: {typing}");
    assert!(typing.contains("Esc quit"));

    let idle = footer_legend(true);
    assert!(idle.contains("Shift+T/F/P/B/E/M/S"), "idle footer: {idle}");
    assert!(idle.contains("Left/Right facet page"));
    assert!(idle.contains("Esc quit"));
}

#[test]
fn legend_marks_unavailable_toggles() {
    let guards = Guards {
        has_filter: false,
        has_boost: true,
        has_sort: false,
    };
    let entries = legend(&SessionFlags::default(), guards);
    let available = |key: &str| entries.iter().find(|e| e.key == key).map(|e| e.available);
    assert_eq!(available(FILTERS), Some(false));
    assert_eq!(available(BOOST), Some(true));
    assert_eq!(available(SORT), Some(false));
}
