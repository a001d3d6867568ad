//! Ratatui-based live view driven by [`SessionController`].

use std::io;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap};

use crate::search::SearchEngine;
use crate::ui::components::theme::ThemePalette;
use crate::ui::data::{RenderModel, SecondaryPanel, legend_style};
use crate::ui::session::{SessionController, TickOutcome, Ticker};
use crate::ui::shortcuts::footer_legend;

const SECONDARY_HEIGHT: u16 = 14;
const CURSOR: &str = "█";

/// Run the interactive session until Esc.
pub fn run_tui<E: SearchEngine>(mut controller: SessionController<E>, title: &str) -> Result<()> {
    let palette = ThemePalette::from_env();
    enable_raw_mode()?;
    let result = io::stdout()
        .execute(EnterAlternateScreen)
        .map_err(anyhow::Error::from)
        .and_then(|_| {
            let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
            session_loop(&mut terminal, &mut controller, title, palette)
        });
    teardown_terminal()?;
    result
}

fn session_loop<E: SearchEngine>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    controller: &mut SessionController<E>,
    title: &str,
    palette: ThemePalette,
) -> Result<()> {
    if controller.config().start_gate && !wait_for_start(terminal, title, palette)? {
        return Ok(());
    }
    controller.touch(Instant::now());

    let mut ticker = Ticker::new(controller.config().tick, Instant::now());
    loop {
        let keys = drain_keys()?;
        match controller.tick(Instant::now(), &keys) {
            TickOutcome::Quit => return Ok(()),
            TickOutcome::Render(model) => {
                terminal.draw(|f| draw(f, &model, title, palette))?;
            }
        }
        ticker.wait();
    }
}

/// Block until Space (start) or Esc (quit without starting).
fn wait_for_start(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    title: &str,
    palette: ThemePalette,
) -> Result<bool> {
    terminal.draw(|f| draw_gate(f, title, palette))?;
    loop {
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                KeyCode::Char(' ') => return Ok(true),
                KeyCode::Esc => return Ok(false),
                _ => {}
            },
            Event::Resize(..) => {
                terminal.draw(|f| draw_gate(f, title, palette))?;
            }
            _ => {}
        }
    }
}

/// Non-blocking read of every pending key event.
fn drain_keys() -> Result<Vec<KeyEvent>> {
    let mut keys = Vec::new();
    while event::poll(Duration::ZERO)? {
        if let Event::Key(key) = event::read()? {
            keys.push(key);
        }
    }
    Ok(keys)
}

fn teardown_terminal() -> Result<()> {
    let mut stdout = io::stdout();
    disable_raw_mode()?;
    execute!(stdout, LeaveAlternateScreen)?;
    Ok(())
}

/// Headless single frame: feed `text` as typed keys, tick once, format as text.
pub fn render_once<E: SearchEngine>(
    mut controller: SessionController<E>,
    text: &str,
) -> Option<String> {
    let keys: Vec<KeyEvent> = text
        .chars()
        .map(|c| KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
        .collect();
    match controller.tick(Instant::now(), &keys) {
        TickOutcome::Quit => None,
        TickOutcome::Render(model) => Some(frame_text(&model)),
    }
}

/// Plain-text rendering of a frame, used by `--once`.
pub fn frame_text(model: &RenderModel) -> String {
    let mut out = format!(
        "query: {:?} | results: {} | exact hits: {}\n",
        model.text, model.result_cap, model.exact_hits
    );
    out.push_str(&model.headers.join(" | "));
    out.push('\n');
    for row in &model.rows {
        out.push_str(&row.cells.join(" | "));
        out.push_str(&format!(" | {:.2}\n", row.score));
    }
    if let Some(stale) = &model.stale {
        out.push_str(&format!("! {stale}\n"));
    }
    out
}

fn draw_gate(frame: &mut Frame, title: &str, palette: ThemePalette) {
    let lines = vec![
        Line::from(Span::styled(title.to_string(), palette.title())),
        Line::from(""),
        Line::from(Span::raw("Press Space to start, Esc to quit.")),
        Line::from(Span::styled(
            "Type to search. Pause for 2 seconds to reach facets, filters, boost and timing.",
            palette.hint_style(),
        )),
    ];
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(palette.border_style());
    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        frame.area(),
    );
}

/// Draw one frame of the live view.
pub fn draw(frame: &mut Frame, model: &RenderModel, title: &str, palette: ThemePalette) {
    let secondary_height = if model.secondary.is_some() {
        SECONDARY_HEIGHT
    } else {
        0
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // search bar
            Constraint::Min(3),    // results
            Constraint::Length(secondary_height),
            Constraint::Length(1), // footer
        ])
        .split(frame.area());

    frame.render_widget(search_bar(model, title, palette), chunks[0]);
    frame.render_widget(results_table(model, palette), chunks[1]);
    if let Some(panel) = &model.secondary {
        render_secondary(frame, panel, palette, chunks[2]);
    }

    let footer = match &model.stale {
        Some(msg) => Line::from(vec![
            Span::styled(format!("stale: {msg}"), palette.warning_style()),
            Span::raw(" | "),
            Span::styled(footer_legend(!model.is_typing()), palette.hint_style()),
        ]),
        None => Line::from(Span::styled(
            footer_legend(!model.is_typing()),
            palette.hint_style(),
        )),
    };
    frame.render_widget(Paragraph::new(footer), chunks[3]);
}

fn search_bar<'a>(model: &'a RenderModel, title: &'a str, palette: ThemePalette) -> Paragraph<'a> {
    let mut spans = vec![Span::styled(model.text.as_str(), Style::default().fg(palette.fg))];
    if model.is_typing() {
        spans.push(Span::styled(CURSOR, Style::default().fg(palette.accent)));
    }
    let block = Block::default()
        .title(Span::styled(
            format!(" {title} · top {} ", model.result_cap),
            palette.title(),
        ))
        .borders(Borders::ALL)
        .border_style(if model.is_typing() {
            palette.border_focus_style()
        } else {
            palette.border_style()
        });
    Paragraph::new(Line::from(spans)).block(block)
}

fn results_table(model: &RenderModel, palette: ThemePalette) -> Table<'_> {
    let header = Row::new(
        model
            .headers
            .iter()
            .map(String::as_str)
            .chain(std::iter::once("Score"))
            .map(|h| Cell::from(h).style(palette.title_subtle())),
    );
    let rows = model.rows.iter().enumerate().map(|(idx, row)| {
        let score = Cell::from(format!("{:.2}", row.score)).style(palette.hint_style());
        Row::new(
            row.cells
                .iter()
                .map(|c| Cell::from(c.as_str()))
                .chain(std::iter::once(score)),
        )
        .style(palette.stripe(idx))
    });
    let mut widths = vec![Constraint::Fill(1); model.headers.len()];
    widths.push(Constraint::Length(8));
    let title = if model.stale.is_some() {
        Span::styled(
            format!(" Results (stale) · exact hits: {} ", model.exact_hits),
            palette.warning_style(),
        )
    } else {
        Span::styled(
            format!(" Results · exact hits: {} ", model.exact_hits),
            palette.title(),
        )
    };
    Table::new(rows, widths).header(header).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(palette.border_style()),
    )
}

fn render_secondary(frame: &mut Frame, panel: &SecondaryPanel, palette: ThemePalette, area: Rect) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(30),
            Constraint::Percentage(30),
        ])
        .split(area);

    frame.render_widget(facet_panel(panel, palette), cols[0]);
    frame.render_widget(info_panel(panel, palette), cols[1]);
    frame.render_widget(command_panel(panel, palette), cols[2]);
}

fn panel_block(title: String, palette: ThemePalette) -> Block<'static> {
    Block::default()
        .title(Span::styled(title, palette.title()))
        .borders(Borders::ALL)
        .border_style(palette.border_style())
}

fn facet_panel(panel: &SecondaryPanel, palette: ThemePalette) -> Paragraph<'static> {
    let Some(page) = &panel.facets else {
        return Paragraph::new(Line::from(Span::styled(
            "Shift+P to show facets",
            palette.hint_style(),
        )))
        .block(panel_block(" Facets ".into(), palette));
    };
    // One wrapped line per group.
    let lines: Vec<Line> = page
        .groups
        .iter()
        .map(|group| {
            let mut spans = vec![Span::styled(
                format!("{}: ", group.field),
                palette.title_subtle(),
            )];
            if group.buckets.is_empty() {
                spans.push(Span::styled("(none)", palette.hint_style()));
            }
            for (idx, bucket) in group.buckets.iter().enumerate() {
                if idx > 0 {
                    spans.push(Span::raw(", "));
                }
                spans.push(Span::raw(bucket.label.clone()));
                spans.push(Span::styled(format!(" ({})", bucket.count), palette.hint_style()));
            }
            Line::from(spans)
        })
        .collect();
    Paragraph::new(lines)
        .block(panel_block(
            format!(" Facets {}/{} ", page.page_index + 1, page.total_pages),
            palette,
        ))
        .wrap(Wrap { trim: true })
}

fn info_panel(panel: &SecondaryPanel, palette: ThemePalette) -> Paragraph<'static> {
    let info = &panel.info;
    let on_off = |b: bool| if b { "on" } else { "off" };
    let license = match &info.status.license {
        None => "n/a".to_string(),
        Some(l) => match (l.valid, l.expires) {
            (true, Some(date)) => format!("valid until {date}"),
            (true, None) => "valid".to_string(),
            (false, _) => "invalid".to_string(),
        },
    };
    let mut lines = vec![
        Line::from(format!("Response: {:.2} ms", info.response_ms)),
        Line::from(format!("Filters: {}", on_off(info.filters))),
        Line::from(format!("Facets: {}", on_off(info.facets))),
        Line::from(format!("Documents: {}", info.status.document_count)),
        Line::from(format!("Docs boosted: {}", info.docs_boosted)),
        Line::from(Span::styled(
            format!("Engine {} · license {license}", info.status.version),
            palette.hint_style(),
        )),
    ];
    if let Some(sample) = &panel.performance {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(
                "Avg latency: {:.3} ms ({} runs)",
                sample.avg_latency_ms, sample.repetitions
            ),
            Style::default().fg(palette.success),
        )));
        lines.push(Line::from(format!("Memory: {} MB", sample.memory_mb)));
        if sample.failures > 0 {
            lines.push(Line::from(Span::styled(
                format!("{} failed runs", sample.failures),
                palette.warning_style(),
            )));
        }
    }
    Paragraph::new(lines).block(panel_block(" Info ".into(), palette))
}

fn command_panel(panel: &SecondaryPanel, palette: ThemePalette) -> Paragraph<'static> {
    let lines: Vec<Line> = panel
        .legend
        .iter()
        .map(|entry| {
            let state = match entry.active {
                Some(true) => " [on]",
                Some(false) => " [off]",
                None => "",
            };
            Line::from(vec![
                Span::styled(format!("{:<11}", entry.key), palette.hint_style()),
                Span::styled(format!("{}{state}", entry.label), legend_style(entry, palette)),
            ])
        })
        .collect();
    Paragraph::new(lines).block(panel_block(" Commands ".into(), palette))
}
