pub mod card;
pub mod event;
pub mod quick_view;
pub mod ui;

use chrono::{DateTime, Duration, Utc};
use ratatui::widgets::ListState as RListState;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;

use crate::api::{fetch_sections, FetchOutcome, SectionStore};
use crate::cache::{CacheEntry, QueryCache};
use crate::format::rating_url;
use crate::grouping::{split_into_groups, SectionGroup};
use crate::models::{Section, SectionQuery, Semester};
use crate::selection::SelectionTracker;
use card::CardState;
use quick_view::{QuickView, QuickViewTrigger};

// ─── Load phase ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    /// Department or course number missing; nothing to fetch.
    Idle,
    /// A fetch is wanted but the network is suspended.
    Paused,
    /// First fetch for this query, nothing cached yet.
    InitialLoading,
    /// Background refetch of cached rows.
    Refreshing,
    Ready,
}

// ─── Query form ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryField {
    Semester,
    Year,
    Dept,
    Course,
}

impl QueryField {
    pub const ALL: [QueryField; 4] = [
        QueryField::Semester,
        QueryField::Year,
        QueryField::Dept,
        QueryField::Course,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Semester => "Semester",
            Self::Year => "Year",
            Self::Dept => "Department",
            Self::Course => "Course #",
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        if idx == 0 {
            Self::ALL[Self::ALL.len() - 1]
        } else {
            Self::ALL[idx - 1]
        }
    }
}

/// Popup editor for the four query parameters.
#[derive(Debug, Clone)]
pub struct QueryForm {
    pub field: QueryField,
    pub semester: Semester,
    pub year: String,
    pub dept: String,
    pub course_number: String,
}

impl QueryForm {
    pub fn from_query(query: &SectionQuery) -> Self {
        Self {
            field: QueryField::Dept,
            semester: query.semester,
            year: query.year.to_string(),
            dept: query.dept.clone(),
            course_number: query.course_number.clone(),
        }
    }

    pub fn push_char(&mut self, ch: char) {
        match self.field {
            QueryField::Semester => {}
            QueryField::Year if ch.is_ascii_digit() && self.year.len() < 4 => self.year.push(ch),
            QueryField::Year => {}
            QueryField::Dept if ch.is_ascii_alphanumeric() => {
                self.dept.push(ch.to_ascii_uppercase())
            }
            QueryField::Dept => {}
            QueryField::Course if !ch.is_whitespace() => self.course_number.push(ch),
            QueryField::Course => {}
        }
    }

    pub fn backspace(&mut self) {
        match self.field {
            QueryField::Semester => {}
            QueryField::Year => {
                self.year.pop();
            }
            QueryField::Dept => {
                self.dept.pop();
            }
            QueryField::Course => {
                self.course_number.pop();
            }
        }
    }

    /// `None` while the year does not parse.
    pub fn to_query(&self) -> Option<SectionQuery> {
        let year = self.year.parse().ok()?;
        Some(SectionQuery::new(
            self.semester,
            year,
            self.dept.trim(),
            self.course_number.trim(),
        ))
    }
}

// ─── Background fetch ────────────────────────────────────────────────────────

struct PendingFetch {
    query: SectionQuery,
    rx: oneshot::Receiver<FetchOutcome>,
}

pub struct AppSettings {
    pub stale_after: Duration,
    pub ratings_school_id: String,
}

// ─── App State ──────────────────────────────────────────────────────────────

pub struct App {
    pub store: Arc<dyn SectionStore>,
    pub settings: AppSettings,
    pub running: bool,

    // Query and data
    pub query: SectionQuery,
    pub cache: QueryCache,
    pending: Vec<PendingFetch>,
    pub online: bool,
    fetch_paused: bool,
    pub groups: Vec<SectionGroup>,

    // Cards
    pub cards: HashMap<String, CardState>,
    pub card_list_state: ListState,

    // Selection and quick view
    pub selection: SelectionTracker,
    pub trigger: QuickViewTrigger,
    pub quick_view: QuickView,

    pub query_form: Option<QueryForm>,

    // Status
    pub status_message: String,
    /// Incremented each frame; drives the spinner and the trigger pulse.
    pub frame_count: u64,
}

/// Tracks logical selection plus a persistent ratatui scroll offset.
///
/// `selected` is the index among cards (group header rows excluded).
/// Render functions sync `inner.selected` to the absolute row index before
/// calling `render_stateful_widget`, so ratatui adjusts the offset only when
/// the cursor reaches a viewport edge.
pub struct ListState {
    pub inner: RListState,
    pub selected: usize,
    pub len: usize,
}

impl ListState {
    pub fn new() -> Self {
        let mut inner = RListState::default();
        inner.select(Some(0));
        Self { inner, selected: 0, len: 0 }
    }

    /// Move down — clamped at the last item (no wrap-around).
    pub fn select_next(&mut self) {
        if self.len > 0 && self.selected + 1 < self.len {
            self.selected += 1;
        }
    }

    /// Move up — clamped at the first item (no wrap-around).
    pub fn select_prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        }
    }

    pub fn set_len(&mut self, len: usize) {
        self.len = len;
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }
}

impl App {
    pub fn new(store: Arc<dyn SectionStore>, query: SectionQuery, settings: AppSettings) -> Self {
        let mut selection = SelectionTracker::new();
        let trigger = QuickViewTrigger::attach(&mut selection);
        Self {
            store,
            cache: QueryCache::new(settings.stale_after),
            settings,
            running: true,
            query,
            pending: Vec::new(),
            online: true,
            fetch_paused: false,
            groups: Vec::new(),
            cards: HashMap::new(),
            card_list_state: ListState::new(),
            selection,
            trigger,
            quick_view: QuickView::default(),
            query_form: None,
            status_message: "Press / to choose a course.".into(),
            frame_count: 0,
        }
    }

    // ── Query lifecycle ─────────────────────────────────────────────────

    /// Switch to `query`. A different query unmounts every card.
    pub fn set_query(&mut self, query: SectionQuery) {
        if query != self.query {
            tracing::debug!(from = %self.query, to = %query, "query changed");
            self.query = query;
            self.cards.clear();
            self.groups.clear();
            self.card_list_state.selected = 0;
            self.card_list_state.set_len(0);
            self.fetch_paused = false;
        }
        self.mount_cached();
        self.ensure_fresh();
    }

    /// Start a fetch for the current query if it is enabled and its cache
    /// entry is missing or stale.
    pub fn ensure_fresh(&mut self) {
        self.ensure_fresh_at(Utc::now());
    }

    fn ensure_fresh_at(&mut self, now: DateTime<Utc>) {
        if !self.query.is_enabled() {
            self.status_message = "Press / to choose a course.".into();
            return;
        }
        if !self.cache.is_stale(&self.query, now) {
            tracing::debug!(query = %self.query, "cache hit");
            return;
        }
        if self.is_pending(&self.query) {
            return;
        }
        if !self.online {
            self.fetch_paused = true;
            self.status_message = "Network paused — press p to resume.".into();
            return;
        }
        self.start_fetch(self.query.clone());
    }

    /// Run once per frame. A cached entry that ages past the window while its
    /// query stays on screen is refetched in the background.
    pub fn refresh_if_stale(&mut self, now: DateTime<Utc>) {
        if !self.query.is_enabled() || self.fetch_paused || self.is_pending(&self.query) {
            return;
        }
        if self.cache.get(&self.query).is_some() && self.cache.is_stale(&self.query, now) {
            tracing::debug!(query = %self.query, "cached entry went stale");
            self.ensure_fresh_at(now);
        }
    }

    /// Spawn a task fetching `query`; the result arrives via
    /// `poll_fetch_results`.
    fn start_fetch(&mut self, query: SectionQuery) {
        let store = Arc::clone(&self.store);
        let (tx, rx) = oneshot::channel();
        self.fetch_paused = false;
        self.status_message = format!("Loading {query}…");
        self.pending.push(PendingFetch {
            query: query.clone(),
            rx,
        });
        tokio::spawn(async move {
            let outcome = fetch_sections(store.as_ref(), &query).await;
            let _ = tx.send(outcome);
        });
    }

    fn is_pending(&self, query: &SectionQuery) -> bool {
        self.pending.iter().any(|p| &p.query == query)
    }

    /// Collect finished fetches without blocking. Every result goes into the
    /// cache; only the current query's result reaches the view. Returns `true`
    /// when the view changed.
    pub fn poll_fetch_results(&mut self) -> bool {
        let mut finished = Vec::new();
        self.pending.retain_mut(|p| match p.rx.try_recv() {
            Ok(outcome) => {
                finished.push((p.query.clone(), outcome));
                false
            }
            Err(oneshot::error::TryRecvError::Empty) => true,
            Err(oneshot::error::TryRecvError::Closed) => false,
        });

        let mut view_changed = false;
        for (query, outcome) in finished {
            let is_current = query == self.query;
            self.cache.insert(query, CacheEntry::from(outcome));
            if is_current {
                self.mount_cached();
                view_changed = true;
            }
        }
        if view_changed {
            tracing::debug!(cached_queries = self.cache.len(), "applied fetch result");
        }
        view_changed
    }

    pub fn phase(&self) -> LoadPhase {
        if !self.query.is_enabled() {
            LoadPhase::Idle
        } else if self.is_pending(&self.query) {
            if self.cache.get(&self.query).is_some() {
                LoadPhase::Refreshing
            } else {
                LoadPhase::InitialLoading
            }
        } else if self.fetch_paused {
            LoadPhase::Paused
        } else {
            LoadPhase::Ready
        }
    }

    /// Rebuild groups from the cache entry for the current query. Cards whose
    /// section is still present keep their state.
    fn mount_cached(&mut self) {
        let Some(entry) = self.cache.get(&self.query) else {
            return;
        };

        self.groups = split_into_groups(&entry.sections);
        let present: std::collections::HashSet<&str> =
            entry.sections.iter().map(|s| s.uid.as_str()).collect();
        self.cards.retain(|uid, _| present.contains(uid.as_str()));
        for section in &entry.sections {
            if !self.cards.contains_key(&section.uid) {
                let selected = self.selection.contains(&self.query, &section.uid);
                self.cards.insert(section.uid.clone(), CardState::new(selected));
            }
        }
        self.card_list_state.set_len(entry.sections.len());

        self.status_message = match &entry.error {
            Some(err) => format!("Sync error: {err}"),
            None => {
                let synced = entry
                    .fetched_at
                    .with_timezone(&chrono::Local)
                    .format("%b %d %H:%M");
                format!(
                    "{} sections in {} group(s). Synced {synced}.",
                    entry.sections.len(),
                    self.groups.len()
                )
            }
        };
    }

    /// Mark the current query stale and refetch it.
    pub fn refresh(&mut self) {
        self.cache.invalidate(&self.query);
        self.ensure_fresh();
    }

    pub fn toggle_network(&mut self) {
        self.online = !self.online;
        tracing::info!(online = self.online, "network toggled");
        if self.online {
            if self.fetch_paused {
                self.fetch_paused = false;
                self.ensure_fresh();
            } else {
                self.status_message = "Network resumed.".into();
            }
        } else {
            self.status_message = "Network paused — press p to resume.".into();
        }
    }

    // ── Cards ───────────────────────────────────────────────────────────

    /// Sections in display order, across groups.
    pub fn flat_sections(&self) -> impl Iterator<Item = &Section> {
        self.groups.iter().flat_map(|g| g.sections.iter())
    }

    pub fn focused_section(&self) -> Option<&Section> {
        self.flat_sections().nth(self.card_list_state.selected)
    }

    pub fn toggle_focused_hidden(&mut self) {
        let Some(uid) = self.focused_section().map(|s| s.uid.clone()) else {
            return;
        };
        if let Some(card) = self.cards.get_mut(&uid) {
            card.toggle_hidden();
        }
    }

    pub fn toggle_focused_selected(&mut self) {
        let Some(section) = self.focused_section().cloned() else {
            return;
        };
        let Some(card) = self.cards.get_mut(&section.uid) else {
            return;
        };
        let selected = card.toggle_selected();
        self.selection.set_selected(&self.query, &section, selected);
        self.status_message = if selected {
            format!("Added {}.", section.course_label())
        } else {
            format!("Removed {}.", section.course_label())
        };
    }

    pub fn toggle_focused_comment(&mut self) {
        let Some(uid) = self.focused_section().map(|s| s.uid.clone()) else {
            return;
        };
        if let Some(card) = self.cards.get_mut(&uid) {
            card.comment.toggle_expanded();
        }
    }

    /// Terminal size changed: every comment measures again on the next draw.
    pub fn handle_resize(&mut self) {
        for card in self.cards.values_mut() {
            card.comment.invalidate();
        }
    }

    pub fn focused_rating_url(&self) -> Option<String> {
        self.focused_section().map(|s| {
            rating_url(
                &s.instructor_fn,
                &s.instructor_ln,
                &self.settings.ratings_school_id,
            )
        })
    }

    /// Open the instructor's ratings page in a separate process.
    pub fn open_focused_profile(&mut self) {
        let Some(url) = self.focused_rating_url() else {
            return;
        };
        match open_in_browser(&url) {
            Ok(()) => self.status_message = format!("Opened {url}"),
            Err(e) => {
                tracing::warn!(error = %e, %url, "could not launch browser");
                self.status_message = format!("Could not open browser — {url}");
            }
        }
    }

    // ── Quick view ──────────────────────────────────────────────────────

    /// Opening the quick view acknowledges the current selection.
    pub fn toggle_quick_view(&mut self, now: Instant) {
        self.quick_view.toggle(now);
        if self.quick_view.is_open() {
            self.selection.acknowledge();
        }
    }

    // ── Query form ──────────────────────────────────────────────────────

    pub fn open_query_form(&mut self) {
        self.query_form = Some(QueryForm::from_query(&self.query));
    }

    pub fn submit_query_form(&mut self) {
        let Some(form) = self.query_form.take() else {
            return;
        };
        match form.to_query() {
            Some(query) => self.set_query(query),
            None => {
                self.status_message = format!("Invalid year: {:?}", form.year);
                self.query_form = Some(form);
            }
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.trigger.detach(&mut self.selection);
    }
}

fn open_in_browser(url: &str) -> std::io::Result<()> {
    use std::process::{Command, Stdio};

    let mut cmd = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    } else {
        Command::new("xdg-open")
    };
    cmd.arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
}
