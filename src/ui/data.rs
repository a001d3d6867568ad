use serde::Serialize;

use crate::config::ColumnConfig;
use crate::model::resolve::field_value;
use crate::model::types::{EngineStatus, PerformanceSample, SearchRecord, SessionFlags};
use crate::ui::components::theme::ThemePalette;
use crate::ui::facets::FacetPage;
use crate::ui::input::InputMode;

/// One result row, one formatted cell per configured column.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RowView {
    pub key: u64,
    pub score: f32,
    pub cells: Vec<String>,
}

/// A command shown in the idle legend. `active` is `None` for plain actions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegendEntry {
    pub key: &'static str,
    pub label: &'static str,
    pub active: Option<bool>,
    /// False when the command's prerequisite is missing.
    pub available: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InfoView {
    pub response_ms: f64,
    pub filters: bool,
    pub facets: bool,
    pub docs_boosted: usize,
    pub status: EngineStatus,
}

/// Panel visible only while idle with a searchable query.
#[derive(Clone, Debug, PartialEq)]
pub struct SecondaryPanel {
    pub facets: Option<FacetPage>,
    pub performance: Option<PerformanceSample>,
    pub info: InfoView,
    pub legend: Vec<LegendEntry>,
}

/// Everything the view needs for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderModel {
    pub text: String,
    pub mode: InputMode,
    pub result_cap: usize,
    pub headers: Vec<String>,
    pub rows: Vec<RowView>,
    pub exact_hits: usize,
    pub flags: SessionFlags,
    pub secondary: Option<SecondaryPanel>,
    /// Set when this tick's engine call failed and older rows are shown.
    pub stale: Option<String>,
}

impl RenderModel {
    pub fn is_typing(&self) -> bool {
        self.mode == InputMode::Typing
    }
}

/// Format one document into a row according to the column layout.
pub fn row_from_document(record: &SearchRecord, raw: &str, columns: &[ColumnConfig]) -> RowView {
    RowView {
        key: record.key,
        score: record.score,
        cells: columns.iter().map(|col| cell(raw, col)).collect(),
    }
}

fn cell(raw: &str, col: &ColumnConfig) -> String {
    let mut out = col
        .fields
        .iter()
        .map(|path| field_value(raw, path))
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(&col.join);
    if let Some(marker) = &col.marker
        && field_value(raw, &marker.field) == marker.equals
    {
        out.push(' ');
        out.push_str(&marker.symbol);
    }
    out
}

pub fn legend_style(entry: &LegendEntry, palette: ThemePalette) -> ratatui::style::Style {
    use ratatui::style::{Modifier, Style};
    match (entry.available, entry.active) {
        (false, _) => Style::default().fg(palette.disabled),
        (true, Some(true)) => Style::default()
            .fg(palette.accent)
            .add_modifier(Modifier::BOLD),
        (true, _) => Style::default().fg(palette.fg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Marker;

    fn rec(key: u64) -> SearchRecord {
        SearchRecord { key, score: 1.0 }
    }

    fn column(fields: &[&str], join: &str) -> ColumnConfig {
        ColumnConfig {
            header: "h".into(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            join: join.into(),
            marker: None,
        }
    }

    #[test]
    fn joins_present_fields_and_skips_missing() {
        let raw = r#"{"type1": "grass", "type2": "poison"}"#;
        let row = row_from_document(&rec(0), raw, &[column(&["type1", "type2"], "/")]);
        assert_eq!(row.cells, vec!["grass/poison"]);

        let raw = r#"{"type1": "fire", "type2": null}"#;
        let row = row_from_document(&rec(1), raw, &[column(&["type1", "type2"], "/")]);
        assert_eq!(row.cells, vec!["fire"]);
    }

    #[test]
    fn marker_appends_symbol_when_value_matches() {
        let mut col = column(&["name"], " ");
        col.marker = Some(Marker {
            field: "is_legendary".into(),
            equals: "true".into(),
            symbol: "🌟".into(),
        });
        let row = row_from_document(&rec(0), r#"{"name": "Mew", "is_legendary": true}"#, &[col.clone()]);
        assert_eq!(row.cells, vec!["Mew 🌟"]);
        let row = row_from_document(&rec(0), r#"{"name": "Eevee", "is_legendary": false}"#, &[col]);
        assert_eq!(row.cells, vec!["Eevee"]);
    }
}
