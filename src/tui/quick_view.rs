//! Weekly quick view overlay: open/close transition and the per-day layout of
//! the selected sections.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::format::{days_of, DayToken};
use crate::models::Section;
use crate::selection::{SelectionTracker, SubscriptionId};

pub const TRANSITION: Duration = Duration::from_millis(200);
const MIN_SCALE: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Enter,
    Leave,
}

#[derive(Debug, Clone, Copy)]
struct Transition {
    direction: Direction,
    started: Instant,
}

/// Open/closed state with a linear scale transition in both directions.
#[derive(Debug, Default)]
pub struct QuickView {
    open: bool,
    transition: Option<Transition>,
}

impl QuickView {
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn toggle(&mut self, now: Instant) {
        if self.open {
            self.close(now);
        } else {
            self.open(now);
        }
    }

    pub fn open(&mut self, now: Instant) {
        if self.open {
            return;
        }
        self.open = true;
        self.transition = Some(Transition {
            direction: Direction::Enter,
            started: self.reversed_start(Direction::Enter, now),
        });
    }

    pub fn close(&mut self, now: Instant) {
        if !self.open {
            return;
        }
        self.open = false;
        self.transition = Some(Transition {
            direction: Direction::Leave,
            started: self.reversed_start(Direction::Leave, now),
        });
    }

    /// Reversing mid-flight starts from the current scale rather than jumping.
    fn reversed_start(&self, direction: Direction, now: Instant) -> Instant {
        match self.transition {
            Some(t) if t.direction != direction => {
                let elapsed = now.saturating_duration_since(t.started).min(TRANSITION);
                now.checked_sub(TRANSITION - elapsed).unwrap_or(now)
            }
            _ => now,
        }
    }

    /// Drop finished transitions.
    pub fn tick(&mut self, now: Instant) {
        if let Some(t) = self.transition {
            if now.saturating_duration_since(t.started) >= TRANSITION {
                self.transition = None;
            }
        }
    }

    pub fn is_animating(&self) -> bool {
        self.transition.is_some()
    }

    /// Drawn while open and until the leave transition has run out.
    pub fn is_visible(&self, now: Instant) -> bool {
        match self.transition {
            Some(t) if t.direction == Direction::Leave => {
                now.saturating_duration_since(t.started) < TRANSITION
            }
            _ => self.open,
        }
    }

    /// Current scale in `[0.5, 1.0]`.
    pub fn scale(&self, now: Instant) -> f32 {
        let Some(t) = self.transition else {
            return if self.open { 1.0 } else { MIN_SCALE };
        };
        let progress = (now.saturating_duration_since(t.started).as_secs_f32()
            / TRANSITION.as_secs_f32())
        .clamp(0.0, 1.0);
        let p = match t.direction {
            Direction::Enter => progress,
            Direction::Leave => 1.0 - progress,
        };
        MIN_SCALE + (1.0 - MIN_SCALE) * p
    }
}

/// The floating trigger's view of the changes-pending flag, kept current by a
/// subscription on the selection tracker.
pub struct QuickViewTrigger {
    pending: Rc<Cell<bool>>,
    subscription: SubscriptionId,
}

impl QuickViewTrigger {
    pub fn attach(selection: &mut SelectionTracker) -> Self {
        let pending = Rc::new(Cell::new(selection.has_changes()));
        let sink = Rc::clone(&pending);
        let subscription = selection.subscribe(move |v| sink.set(v));
        Self {
            pending,
            subscription,
        }
    }

    pub fn detach(&self, selection: &mut SelectionTracker) {
        selection.unsubscribe(self.subscription);
    }

    pub fn is_pulsing(&self) -> bool {
        self.pending.get()
    }
}

// ─── Weekly layout ──────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct WeeklyColumns<'a> {
    /// Sunday first; each column sorted by start time.
    pub days: [Vec<&'a Section>; 7],
    /// Asynchronous or TBA sections.
    pub unscheduled: Vec<&'a Section>,
}

pub fn weekly_columns<'a>(sections: impl IntoIterator<Item = &'a Section>) -> WeeklyColumns<'a> {
    let mut columns = WeeklyColumns::default();
    for section in sections {
        if section.is_tba() {
            columns.unscheduled.push(section);
            continue;
        }
        let mut placed = false;
        for token in days_of(&section.days) {
            if let DayToken::Day(day) = token {
                let column = &mut columns.days[day.index()];
                if !column.iter().any(|s| std::ptr::eq(*s, section)) {
                    column.push(section);
                }
                placed = true;
            }
        }
        if !placed {
            columns.unscheduled.push(section);
        }
    }
    for column in &mut columns.days {
        column.sort_by_key(|s| s.time_start);
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::section;
    use crate::models::{ClassDay, SectionQuery};

    #[test]
    fn enter_scales_up_then_settles() {
        let t0 = Instant::now();
        let mut qv = QuickView::default();
        qv.open(t0);
        assert!(qv.is_visible(t0));
        assert!((qv.scale(t0) - 0.5).abs() < 1e-3);
        assert!((qv.scale(t0 + TRANSITION / 2) - 0.75).abs() < 1e-3);
        qv.tick(t0 + TRANSITION);
        assert!(!qv.is_animating());
        assert_eq!(qv.scale(t0 + TRANSITION), 1.0);
    }

    #[test]
    fn stays_drawn_until_leave_finishes() {
        let t0 = Instant::now();
        let mut qv = QuickView::default();
        qv.open(t0);
        qv.tick(t0 + TRANSITION);

        let t1 = t0 + TRANSITION * 2;
        qv.close(t1);
        assert!(!qv.is_open());
        assert!(qv.is_visible(t1 + TRANSITION / 2));
        assert!(!qv.is_visible(t1 + TRANSITION));
        qv.tick(t1 + TRANSITION);
        assert!(!qv.is_visible(t1 + TRANSITION));
    }

    #[test]
    fn reversing_mid_flight_keeps_scale() {
        let t0 = Instant::now() + TRANSITION;
        let mut qv = QuickView::default();
        qv.open(t0);
        let mid = t0 + TRANSITION / 4;
        let before = qv.scale(mid);
        qv.close(mid);
        assert!((qv.scale(mid) - before).abs() < 1e-3);
    }

    #[test]
    fn trigger_tracks_selection() {
        let mut selection = SelectionTracker::new();
        let trigger = QuickViewTrigger::attach(&mut selection);
        selection.toggle(&SectionQuery::default(), &section("1", "G1"));
        assert!(trigger.is_pulsing());
        selection.acknowledge();
        assert!(!trigger.is_pulsing());

        trigger.detach(&mut selection);
        selection.toggle(&SectionQuery::default(), &section("2", "G1"));
        assert!(!trigger.is_pulsing());
    }

    #[test]
    fn weekly_columns_by_day_and_time() {
        let mut early = section("1", "G1");
        early.days = "tu,th".into();
        early.time_start = 800;
        early.time_end = 915;
        let mut late = section("2", "G2");
        late.days = "tu".into();
        late.time_start = 1400;
        late.time_end = 1515;
        let mut online = section("3", "G3");
        online.days = String::new();
        let mut tba = section("4", "G4");
        tba.time_end = tba.time_start;

        let sections = vec![late, early, online, tba];
        let cols = weekly_columns(&sections);
        let tue: Vec<_> = cols.days[ClassDay::Tue.index()].iter().map(|s| s.uid.as_str()).collect();
        assert_eq!(tue, ["1", "2"]);
        assert_eq!(cols.days[ClassDay::Thu.index()].len(), 1);
        let unscheduled: Vec<_> = cols.unscheduled.iter().map(|s| s.uid.as_str()).collect();
        assert_eq!(unscheduled, ["3", "4"]);
    }
}
