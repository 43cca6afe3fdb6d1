use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};
use std::time::Instant;

use super::card::{truncate_to_width, wrap_to_width, CardState};
use super::quick_view::weekly_columns;
use super::{App, LoadPhase, QueryField, QueryForm};
use crate::format::{
    days_of, format_comment, format_first_name, format_location, format_time_range, ClockTime,
    TimeRange,
};
use crate::models::{ClassDay, Section};

const ACCENT: Color = Color::Cyan;
const HEADER_BG: Color = Color::DarkGray;
const SELECTED_BG: Color = Color::Rgb(40, 40, 60);
const ADDED: Color = Color::Rgb(52, 211, 153);
const REMOVE: Color = Color::Rgb(244, 63, 94);
const TRIGGER_BG: Color = Color::Rgb(99, 102, 241);
const TRIGGER_PULSE_BG: Color = Color::Rgb(165, 180, 252);
const DIM: Color = Color::DarkGray;
const WARN: Color = Color::Yellow;

const SPINNER: [&str; 8] = ["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];
/// Columns of indentation for card bodies.
const BODY_INDENT: u16 = 4;

// ─── Main render ────────────────────────────────────────────────────────────

pub fn render(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.area());

    render_header(f, app, chunks[0]);
    render_body(f, app, chunks[1]);
    render_status_bar(f, app, chunks[2]);

    let now = Instant::now();
    if app.quick_view.is_visible(now) {
        render_quick_view(f, app, chunks[1], app.quick_view.scale(now));
    }
    if let Some(form) = &app.query_form {
        let area = f.area();
        render_query_form(f, form, area);
    }
}

fn spinner(frame: u64) -> &'static str {
    SPINNER[(frame as usize / 2) % SPINNER.len()]
}

fn day_colors(day: ClassDay) -> (Color, Color) {
    match day {
        ClassDay::Sun => (Color::Black, Color::Rgb(253, 164, 175)),
        ClassDay::Mon => (Color::Black, Color::Rgb(253, 230, 138)),
        ClassDay::Tue => (Color::Black, Color::Rgb(190, 242, 100)),
        ClassDay::Wed => (Color::Black, Color::Rgb(103, 232, 249)),
        ClassDay::Thu => (Color::Black, Color::Rgb(147, 197, 253)),
        ClassDay::Fri => (Color::Black, Color::Rgb(216, 180, 254)),
        ClassDay::Sat => (Color::Black, Color::Rgb(249, 168, 212)),
    }
}

// ─── Header ─────────────────────────────────────────────────────────────────

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let phase = match app.phase() {
        LoadPhase::Idle => Span::styled("idle", Style::default().fg(DIM)),
        LoadPhase::Paused => Span::styled("paused", Style::default().fg(WARN)),
        LoadPhase::InitialLoading | LoadPhase::Refreshing => Span::styled(
            format!("{} syncing", spinner(app.frame_count)),
            Style::default().fg(WARN),
        ),
        LoadPhase::Ready => Span::styled("ready", Style::default().fg(ADDED)),
    };

    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", app.query),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::styled(" │ ", Style::default().fg(DIM)),
        phase,
        Span::styled(
            if app.online { "" } else { "  (offline)" },
            Style::default().fg(WARN),
        ),
    ]);

    let header = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::BOTTOM)
            .title(" Section Picker ")
            .title_style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)),
    );
    f.render_widget(header, area);
}

// ─── Status Bar ─────────────────────────────────────────────────────────────

fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(16)])
        .split(area);

    let status = Paragraph::new(Line::from(vec![
        Span::raw(" "),
        Span::styled(
            &app.status_message,
            Style::default().fg(if app.phase() == LoadPhase::Ready {
                Color::White
            } else {
                WARN
            }),
        ),
        Span::styled(
            "  q:quit  j/k:nav  space:add  x:hide  e:more  o:profile  /:query  r:refresh  p:pause  ",
            Style::default().fg(DIM),
        ),
    ]))
    .style(Style::default().bg(HEADER_BG));
    f.render_widget(status, chunks[0]);

    render_trigger(f, app, chunks[1]);
}

/// The quick view trigger: pulses while the selection has unacknowledged changes.
fn render_trigger(f: &mut Frame, app: &App, area: Rect) {
    let pulsing = app.trigger.is_pulsing();
    let bright = pulsing && (app.frame_count / 4) % 2 == 0;
    let bg = if bright { TRIGGER_PULSE_BG } else { TRIGGER_BG };

    let dot = if pulsing { "● " } else { "  " };
    let label = if app.quick_view.is_open() {
        "✕ close (v)"
    } else {
        "▦ week (v)"
    };
    let badge = Paragraph::new(Line::from(vec![
        Span::styled(dot, Style::default().fg(Color::White)),
        Span::styled(label, Style::default().fg(Color::White).add_modifier(Modifier::BOLD)),
    ]))
    .style(Style::default().bg(bg));
    f.render_widget(badge, area);
}

// ─── Body ───────────────────────────────────────────────────────────────────

fn placeholder(f: &mut Frame, area: Rect, text: String, color: Color) {
    let p = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            text,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
    ])
    .block(Block::default().borders(Borders::ALL).title(" Sections "));
    f.render_widget(p, area);
}

fn render_body(f: &mut Frame, app: &mut App, area: Rect) {
    match app.phase() {
        LoadPhase::Idle => placeholder(
            f,
            area,
            "  Press / to pick a semester, department and course.".into(),
            DIM,
        ),
        LoadPhase::Paused if app.groups.is_empty() => placeholder(
            f,
            area,
            "  PAUSED — network suspended, press p to resume.".into(),
            WARN,
        ),
        LoadPhase::InitialLoading => placeholder(
            f,
            area,
            format!("  {} Fetching sections…", spinner(app.frame_count)),
            WARN,
        ),
        LoadPhase::Refreshing | LoadPhase::Paused => {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(1), Constraint::Min(0)])
                .split(area);
            let banner = if app.phase() == LoadPhase::Paused {
                "  PAUSED — showing cached sections".to_string()
            } else {
                format!("  {} LOADING", spinner(app.frame_count))
            };
            let pulse = if (app.frame_count / 5) % 2 == 0 {
                Modifier::BOLD
            } else {
                Modifier::DIM
            };
            f.render_widget(
                Paragraph::new(Span::styled(
                    banner,
                    Style::default().fg(WARN).add_modifier(pulse),
                )),
                chunks[0],
            );
            render_cards(f, app, chunks[1]);
        }
        LoadPhase::Ready => render_cards(f, app, area),
    }
}

fn render_cards(f: &mut Frame, app: &mut App, area: Rect) {
    let inner_width = area.width.saturating_sub(2);
    let body_width = inner_width.saturating_sub(BODY_INDENT);
    let show_group_headers = app.groups.len() > 1;

    let mut items: Vec<ListItem> = Vec::new();
    let mut flat_idx = 0usize;
    let mut selected_item_idx = 0usize;

    for (i, group) in app.groups.iter().enumerate() {
        if show_group_headers {
            items.push(ListItem::new(Line::from(Span::styled(
                format!("── GROUP {} ──", i + 1),
                Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
            ))));
        }

        for section in &group.sections {
            let focused = flat_idx == app.card_list_state.selected;
            if focused {
                selected_item_idx = items.len();
            }
            let card = app.cards.entry(section.uid.clone()).or_default();
            items.push(card_item(section, card, focused, body_width));
            flat_idx += 1;
        }
    }

    if items.is_empty() {
        items.push(ListItem::new("  No sections found."));
    }

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Sections ({}) ", flat_idx))
            .title_style(Style::default().fg(ACCENT)),
    );

    app.card_list_state.inner.select(Some(selected_item_idx));
    f.render_stateful_widget(list, area, &mut app.card_list_state.inner);
}

fn card_item(
    section: &Section,
    card: &mut CardState,
    focused: bool,
    body_width: u16,
) -> ListItem<'static> {
    let bg = if focused { SELECTED_BG } else { Color::Reset };
    let title_style = if card.hidden {
        Style::default().fg(DIM).bg(bg)
    } else {
        Style::default()
            .fg(Color::White)
            .bg(bg)
            .add_modifier(Modifier::BOLD)
    };
    let (marker, marker_color) = match (focused, card.selected) {
        (true, _) => ("> ", ACCENT),
        (false, true) => ("┃ ", ADDED),
        (false, false) => ("  ", ACCENT),
    };

    let mut header = vec![
        Span::styled(marker, Style::default().fg(marker_color)),
        Span::styled(
            format!("{} {}", section.section_number, section.class_number),
            title_style,
        ),
    ];
    if card.selected {
        header.push(Span::styled("  (added)", Style::default().fg(ADDED).bg(bg)));
    }
    if card.hidden {
        header.push(Span::styled("  (hidden)", Style::default().fg(DIM).bg(bg)));
    }
    header.push(Span::styled(
        if card.hidden { "   ◌" } else { "   ◉" },
        Style::default().fg(DIM).bg(bg),
    ));
    header.push(if card.selected {
        Span::styled(" ⊖", Style::default().fg(REMOVE).bg(bg))
    } else {
        Span::styled(" ⊕", Style::default().fg(ADDED).bg(bg))
    });

    let mut lines = vec![Line::from(header)];

    // Hidden cards collapse to their header row.
    if !card.hidden {
        let indent = " ".repeat(BODY_INDENT as usize);
        lines.push(Line::from(vec![
            Span::raw(indent.clone()),
            Span::styled(
                format!(
                    " {} {} ",
                    section.section_type.glyph(),
                    section.section_type.label()
                ),
                Style::default().fg(Color::Gray).bg(Color::Rgb(51, 65, 85)),
            ),
            Span::styled("  with ", Style::default().fg(DIM)),
            Span::styled(
                format!(
                    "{} {} ↗",
                    format_first_name(&section.instructor_fn),
                    section.instructor_ln
                ),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
        ]));

        let mut when = vec![
            Span::raw(indent.clone()),
            Span::styled(
                format!("{:<14}", format_location(&section.location)),
                Style::default().fg(Color::Gray),
            ),
            Span::raw("  "),
        ];
        when.extend(time_spans(section.time_start, section.time_end));
        lines.push(Line::from(when));

        let mut days = vec![Span::raw(indent.clone())];
        for token in days_of(&section.days) {
            let (fg, day_bg) = day_colors(token.palette_day());
            days.push(Span::styled(
                format!(" {} ", token.label()),
                Style::default().fg(fg).bg(day_bg),
            ));
            days.push(Span::raw(" "));
        }
        lines.push(Line::from(days));

        let comment = format_comment(&section.comment);
        if !comment.trim().is_empty() {
            card.comment.measure(&comment, body_width);
            let comment_style = Style::default().fg(Color::Gray);
            if card.comment.is_clamped() {
                let room = usize::from(body_width).saturating_sub(8);
                lines.push(Line::from(vec![
                    Span::raw(indent.clone()),
                    Span::styled(truncate_to_width(comment.trim_end(), room), comment_style),
                    Span::styled(" + more", Style::default().fg(DIM)),
                ]));
            } else {
                for text in wrap_to_width(&comment, usize::from(body_width)) {
                    lines.push(Line::from(vec![
                        Span::raw(indent.clone()),
                        Span::styled(text, comment_style),
                    ]));
                }
                if card.comment.overflows() {
                    lines.push(Line::from(vec![
                        Span::raw(indent.clone()),
                        Span::styled("- less", Style::default().fg(DIM)),
                    ]));
                }
            }
        }
    }
    lines.push(Line::from(""));

    ListItem::new(lines)
}

/// Bold numeric part, dimmed am/pm suffix.
fn time_spans(start: u16, end: u16) -> Vec<Span<'static>> {
    let clock = |c: ClockTime| {
        [
            Span::styled(
                c.numeric,
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(c.suffix, Style::default().fg(DIM)),
        ]
    };
    match format_time_range(start, end) {
        TimeRange::Tba => vec![Span::styled(
            TimeRange::Tba.to_string(),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )],
        TimeRange::Span { start, end } => {
            let mut spans: Vec<Span<'static>> = clock(start).into();
            spans.push(Span::styled(" - ", Style::default().fg(DIM)));
            spans.extend(clock(end));
            spans
        }
    }
}

// ─── Quick view ─────────────────────────────────────────────────────────────

fn scaled_rect(area: Rect, scale: f32) -> Rect {
    let width = ((area.width as f32) * 0.95 * scale).round() as u16;
    let height = ((area.height as f32) * 0.9 * scale).round() as u16;
    Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

fn render_quick_view(f: &mut Frame, app: &App, area: Rect, scale: f32) {
    let rect = scaled_rect(area, scale);
    f.render_widget(Clear, rect);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(
            " Weekly preview ({} selected) ",
            app.selection.len()
        ))
        .title_style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD));
    let inner = block.inner(rect);
    f.render_widget(block, rect);

    let columns = weekly_columns(app.selection.sections());
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(2)])
        .split(inner);
    let day_areas = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 7); 7])
        .split(rows[0]);

    for day in ClassDay::ALL {
        let (fg, bg) = day_colors(day);
        let mut lines = vec![
            Line::from(Span::styled(
                format!(" {} ", day.full_name()),
                Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
        ];
        for section in &columns.days[day.index()] {
            lines.push(Line::from(time_spans(section.time_start, section.time_end)));
            lines.push(Line::from(Span::styled(
                section.course_label(),
                Style::default().fg(Color::Gray),
            )));
            lines.push(Line::from(""));
        }
        f.render_widget(
            Paragraph::new(lines).wrap(Wrap { trim: true }),
            day_areas[day.index()],
        );
    }

    let unscheduled = if columns.unscheduled.is_empty() {
        "—".to_string()
    } else {
        columns
            .unscheduled
            .iter()
            .map(|s| s.course_label())
            .collect::<Vec<_>>()
            .join(", ")
    };
    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("Async / TBA: ", Style::default().fg(DIM)),
            Span::styled(unscheduled, Style::default().fg(Color::Gray)),
        ]))
        .block(Block::default().borders(Borders::TOP)),
        rows[1],
    );
}

// ─── Query form ─────────────────────────────────────────────────────────────

fn render_query_form(f: &mut Frame, form: &QueryForm, area: Rect) {
    let width = 46.min(area.width);
    let height = 9.min(area.height);
    let rect = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };
    f.render_widget(Clear, rect);

    let mut lines = Vec::new();
    for field in QueryField::ALL {
        let value = match field {
            QueryField::Semester => format!("◂ {} ▸", form.semester.label()),
            QueryField::Year => form.year.clone(),
            QueryField::Dept => form.dept.clone(),
            QueryField::Course => form.course_number.clone(),
        };
        let active = field == form.field;
        let cursor = if active && field != QueryField::Semester { "▏" } else { "" };
        let style = if active {
            Style::default().fg(Color::White).bg(SELECTED_BG)
        } else {
            Style::default().fg(Color::Gray)
        };
        lines.push(Line::from(vec![
            Span::styled(format!(" {:<11}", field.label()), Style::default().fg(DIM)),
            Span::styled(format!("{value}{cursor}"), style),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " Tab:next field  ←/→:semester  Enter:apply  Esc:cancel",
        Style::default().fg(DIM),
    )));

    let popup = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Choose course ")
            .title_style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)),
    );
    f.render_widget(popup, rect);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{section, MemoryStore};
    use crate::api::FetchOutcome;
    use crate::cache::CacheEntry;
    use crate::models::{SectionQuery, Semester};
    use crate::tui::AppSettings;
    use chrono::Utc;
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;

    fn screen(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content
            .chunks(width)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn renders_groups_and_cards_from_cache() {
        let query = SectionQuery::new(Semester::Fall, 2024, "CSC", "101");
        let mut tba = section("2", "G2");
        tba.time_end = tba.time_start;
        tba.days = String::new();

        let mut app = App::new(
            Arc::new(MemoryStore::default()),
            SectionQuery::default(),
            AppSettings {
                stale_after: chrono::Duration::minutes(60),
                ratings_school_id: String::new(),
            },
        );
        app.cache.insert(
            query.clone(),
            CacheEntry::from(FetchOutcome {
                sections: vec![section("1", "G1"), tba],
                error: None,
                fetched_at: Utc::now(),
            }),
        );
        app.set_query(query);

        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();
        terminal.draw(|f| render(f, &mut app)).unwrap();
        let text = screen(&terminal);

        assert!(text.contains("GROUP 1"));
        assert!(text.contains("GROUP 2"));
        assert!(text.contains("TBA"));
        assert!(text.contains("Async"));
        assert!(text.contains("9:30"));
        assert!(text.contains("SCI 101"));
    }

    #[test]
    fn idle_placeholder() {
        let mut app = App::new(
            Arc::new(MemoryStore::default()),
            SectionQuery::default(),
            AppSettings {
                stale_after: chrono::Duration::minutes(60),
                ratings_school_id: String::new(),
            },
        );
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|f| render(f, &mut app)).unwrap();
        assert!(screen(&terminal).contains("Press / to pick"));
    }

    fn phase_app() -> App {
        App::new(
            Arc::new(MemoryStore::with_rows(vec![section("1", "G1")])),
            SectionQuery::default(),
            AppSettings {
                stale_after: chrono::Duration::minutes(60),
                ratings_school_id: String::new(),
            },
        )
    }

    fn csc101() -> SectionQuery {
        SectionQuery::new(Semester::Fall, 2024, "CSC", "101")
    }

    fn cache_rows(app: &mut App, age: chrono::Duration) {
        app.cache.insert(
            csc101(),
            CacheEntry::from(FetchOutcome {
                sections: vec![section("1", "G1")],
                error: None,
                fetched_at: Utc::now() - age,
            }),
        );
    }

    fn draw(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|f| render(f, app)).unwrap();
        screen(&terminal)
    }

    #[test]
    fn paused_placeholder_without_rows() {
        let mut app = phase_app();
        app.toggle_network();
        app.set_query(csc101());
        assert_eq!(app.phase(), LoadPhase::Paused);

        let text = draw(&mut app);
        assert!(text.contains("PAUSED — network suspended"));
        assert!(!text.contains("Fetching sections"));
    }

    #[test]
    fn paused_banner_over_stale_rows() {
        let mut app = phase_app();
        cache_rows(&mut app, chrono::Duration::hours(2));
        app.toggle_network();
        app.set_query(csc101());
        assert_eq!(app.phase(), LoadPhase::Paused);

        let text = draw(&mut app);
        assert!(text.contains("PAUSED — showing cached sections"));
        assert!(text.contains("SCI 101"));
    }

    #[tokio::test]
    async fn initial_loading_placeholder() {
        let mut app = phase_app();
        app.set_query(csc101());
        assert_eq!(app.phase(), LoadPhase::InitialLoading);

        let text = draw(&mut app);
        assert!(text.contains("Fetching sections…"));
        assert!(!text.contains("LOADING"));
    }

    #[tokio::test]
    async fn refreshing_banner_above_cached_cards() {
        let mut app = phase_app();
        cache_rows(&mut app, chrono::Duration::zero());
        app.set_query(csc101());
        app.refresh();
        assert_eq!(app.phase(), LoadPhase::Refreshing);

        let text = draw(&mut app);
        let banner = text.find("LOADING").unwrap();
        let card = text.find("SCI 101").unwrap();
        assert!(banner < card);
        assert!(!text.contains("Fetching sections"));
    }
}
