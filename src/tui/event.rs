use crossterm::event::{self, Event, KeyCode, KeyModifiers};
use std::time::{Duration, Instant};

use super::App;

pub fn poll_event(timeout: Duration) -> anyhow::Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

pub fn handle_key(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    if let (KeyCode::Char('c'), KeyModifiers::CONTROL) = (code, modifiers) {
        app.running = false;
        return;
    }

    // ── Query popup intercepts all keys while open ────────────────────
    if app.query_form.is_some() {
        handle_form_key(app, code, modifiers);
        return;
    }

    // ── Quick view takes input only while open, not while fading out ──
    if app.quick_view.is_open() {
        if matches!(code, KeyCode::Esc | KeyCode::Char('v') | KeyCode::Char('q')) {
            app.toggle_quick_view(Instant::now());
        }
        return;
    }

    match code {
        KeyCode::Char('q') => app.running = false,
        KeyCode::Down | KeyCode::Char('j') => app.card_list_state.select_next(),
        KeyCode::Up | KeyCode::Char('k') => app.card_list_state.select_prev(),
        KeyCode::Home | KeyCode::Char('g') => app.card_list_state.selected = 0,
        KeyCode::End | KeyCode::Char('G') => {
            let ls = &mut app.card_list_state;
            if ls.len > 0 {
                ls.selected = ls.len - 1;
            }
        }
        KeyCode::Char('x') => app.toggle_focused_hidden(),
        KeyCode::Char(' ') | KeyCode::Enter => app.toggle_focused_selected(),
        KeyCode::Char('e') => app.toggle_focused_comment(),
        KeyCode::Char('o') => app.open_focused_profile(),
        KeyCode::Char('v') => app.toggle_quick_view(Instant::now()),
        KeyCode::Char('/') => app.open_query_form(),
        KeyCode::Char('r') => app.refresh(),
        KeyCode::Char('p') => app.toggle_network(),
        _ => {}
    }
}

fn handle_form_key(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    let Some(form) = app.query_form.as_mut() else {
        return;
    };
    match code {
        KeyCode::Esc => app.query_form = None,
        KeyCode::Enter => app.submit_query_form(),
        KeyCode::Tab | KeyCode::Down => form.field = form.field.next(),
        KeyCode::BackTab | KeyCode::Up => form.field = form.field.prev(),
        KeyCode::Left if form.field == super::QueryField::Semester => {
            form.semester = form.semester.prev()
        }
        KeyCode::Right if form.field == super::QueryField::Semester => {
            form.semester = form.semester.next()
        }
        KeyCode::Backspace => form.backspace(),
        KeyCode::Char(ch) if !modifiers.contains(KeyModifiers::CONTROL) => form.push_char(ch),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::MemoryStore;
    use crate::models::SectionQuery;
    use crate::tui::{AppSettings, QueryField};
    use std::sync::Arc;

    fn app() -> App {
        App::new(
            Arc::new(MemoryStore::default()),
            SectionQuery::default(),
            AppSettings {
                stale_after: chrono::Duration::minutes(60),
                ratings_school_id: String::new(),
            },
        )
    }

    #[test]
    fn form_swallows_quit_key() {
        let mut app = app();
        handle_key(&mut app, KeyCode::Char('/'), KeyModifiers::NONE);
        assert!(app.query_form.is_some());
        handle_key(&mut app, KeyCode::Char('q'), KeyModifiers::NONE);
        assert!(app.running);
        let form = app.query_form.as_ref().unwrap();
        assert_eq!(form.field, QueryField::Dept);
        assert_eq!(form.dept, "Q");

        handle_key(&mut app, KeyCode::Esc, KeyModifiers::NONE);
        assert!(app.query_form.is_none());
        handle_key(&mut app, KeyCode::Char('q'), KeyModifiers::NONE);
        assert!(!app.running);
    }

    #[test]
    fn quick_view_closes_on_escape() {
        let mut app = app();
        handle_key(&mut app, KeyCode::Char('v'), KeyModifiers::NONE);
        assert!(app.quick_view.is_open());
        // Navigation keys do not leak through to the list.
        handle_key(&mut app, KeyCode::Char('x'), KeyModifiers::NONE);
        handle_key(&mut app, KeyCode::Esc, KeyModifiers::NONE);
        assert!(!app.quick_view.is_open());
    }
}
