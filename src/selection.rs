//! The user's chosen sections and the "changes pending" signal derived from them.

use std::collections::HashSet;

use crate::models::{Section, SectionQuery};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

/// A `uid` is only unique inside one result set, so picks are keyed by the
/// query they came from as well.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectionKey {
    pub query: SectionQuery,
    pub uid: String,
}

impl SelectionKey {
    pub fn new(query: &SectionQuery, uid: &str) -> Self {
        Self {
            query: query.clone(),
            uid: uid.to_string(),
        }
    }
}

type Listener = Box<dyn FnMut(bool)>;

/// Owns the canonical selection and a baseline snapshot of it. Listeners hear
/// about the pending flag only when it flips.
pub struct SelectionTracker {
    selected: Vec<(SelectionKey, Section)>,
    baseline: HashSet<SelectionKey>,
    has_changes: bool,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

impl Default for SelectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self {
            selected: Vec::new(),
            baseline: HashSet::new(),
            has_changes: false,
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    /// Selected sections, in the order they were added.
    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.selected.iter().map(|(_, s)| s)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn contains(&self, query: &SectionQuery, uid: &str) -> bool {
        self.selected
            .iter()
            .any(|(k, _)| k.uid == uid && &k.query == query)
    }

    pub fn has_changes(&self) -> bool {
        self.has_changes
    }

    /// `query` is the query whose result set `section` came from.
    pub fn set_selected(&mut self, query: &SectionQuery, section: &Section, selected: bool) {
        let key = SelectionKey::new(query, &section.uid);
        let present = self.selected.iter().any(|(k, _)| *k == key);
        match (present, selected) {
            (false, true) => self.selected.push((key, section.clone())),
            (true, false) => self.selected.retain(|(k, _)| *k != key),
            _ => return,
        }
        self.recompute();
    }

    /// Flip membership; returns whether the section is now selected.
    pub fn toggle(&mut self, query: &SectionQuery, section: &Section) -> bool {
        let now = !self.contains(query, &section.uid);
        self.set_selected(query, section, now);
        now
    }

    /// Take the current selection as the new baseline.
    pub fn acknowledge(&mut self) {
        self.baseline = self.current_ids();
        self.recompute();
    }

    pub fn subscribe(&mut self, listener: impl FnMut(bool) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _)| *l != id);
        self.listeners.len() != before
    }

    fn current_ids(&self) -> HashSet<SelectionKey> {
        self.selected.iter().map(|(k, _)| k.clone()).collect()
    }

    fn recompute(&mut self) {
        let changed = self.current_ids() != self.baseline;
        if changed == self.has_changes {
            return;
        }
        self.has_changes = changed;
        tracing::debug!(changes_pending = changed, "selection signal flipped");
        for (_, listener) in &mut self.listeners {
            listener(changed);
        }
    }
}
