use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Per-card display state. Lives until the result set is replaced.
#[derive(Debug, Clone, Default)]
pub struct CardState {
    pub hidden: bool,
    pub selected: bool,
    pub comment: CommentClamp,
}

impl CardState {
    pub fn new(selected: bool) -> Self {
        Self {
            selected,
            ..Self::default()
        }
    }

    pub fn toggle_hidden(&mut self) -> bool {
        self.hidden = !self.hidden;
        self.hidden
    }

    pub fn toggle_selected(&mut self) -> bool {
        self.selected = !self.selected;
        self.selected
    }
}

/// Tracks whether a comment overflows one line at the width it was last drawn.
#[derive(Debug, Clone, Default)]
pub struct CommentClamp {
    pub expanded: bool,
    overflows: bool,
    measured_width: Option<u16>,
}

impl CommentClamp {
    /// Re-measure only when the available width changed since last time.
    pub fn measure(&mut self, text: &str, width: u16) {
        if self.measured_width == Some(width) {
            return;
        }
        self.overflows = text.trim_end().width() > usize::from(width);
        self.measured_width = Some(width);
    }

    /// Forget the last measurement; the next draw measures again.
    pub fn invalidate(&mut self) {
        self.measured_width = None;
    }

    pub fn overflows(&self) -> bool {
        self.overflows
    }

    /// Drawn as a single truncated line.
    pub fn is_clamped(&self) -> bool {
        self.overflows && !self.expanded
    }

    /// No-op unless the comment overflows, since there is nothing to expand.
    pub fn toggle_expanded(&mut self) -> bool {
        if !self.overflows {
            return false;
        }
        self.expanded = !self.expanded;
        true
    }
}

/// Cut `text` to at most `width` columns, ending in `…` when cut.
pub fn truncate_to_width(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

/// Greedy word wrap by display width. Words longer than a line are split.
pub fn wrap_to_width(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut used = 0;

    for word in text.split_whitespace() {
        let w = word.width();
        if used > 0 && used + 1 + w > width {
            lines.push(std::mem::take(&mut line));
            used = 0;
        }
        if w > width {
            for ch in word.chars() {
                let cw = ch.width().unwrap_or(0);
                if used + cw > width {
                    lines.push(std::mem::take(&mut line));
                    used = 0;
                }
                line.push(ch);
                used += cw;
            }
            continue;
        }
        if used > 0 {
            line.push(' ');
            used += 1;
        }
        line.push_str(word);
        used += w;
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_toggle_is_an_involution() {
        let mut card = CardState::default();
        card.toggle_hidden();
        assert!(card.hidden);
        card.toggle_hidden();
        assert!(!card.hidden);
        assert!(!card.selected);
    }

    #[test]
    fn hide_and_select_are_independent() {
        let mut card = CardState::default();
        card.toggle_hidden();
        card.toggle_selected();
        assert!(card.hidden && card.selected);
        card.toggle_hidden();
        assert!(!card.hidden && card.selected);
    }

    #[test]
    fn clamp_follows_width() {
        let mut clamp = CommentClamp::default();
        let text = "Bring a laptop. ";
        clamp.measure(text, 40);
        assert!(!clamp.overflows());
        assert!(!clamp.toggle_expanded());

        // Same width is cached until invalidated.
        clamp.measure(text, 40);
        clamp.invalidate();
        clamp.measure(text, 8);
        assert!(clamp.is_clamped());
        assert!(clamp.toggle_expanded());
        assert!(!clamp.is_clamped());
    }

    #[test]
    fn truncation_respects_width() {
        assert_eq!(truncate_to_width("short", 10), "short");
        let cut = truncate_to_width("a fairly long comment", 10);
        assert_eq!(cut.width(), 10);
        assert!(cut.ends_with('…'));
    }

    #[test]
    fn wrapping_fits_every_line() {
        let lines = wrap_to_width("Meets in the lab on the first week only. ", 12);
        assert!(lines.iter().all(|l| l.width() <= 12));
        assert_eq!(lines.join(" "), "Meets in the lab on the first week only.");
        assert_eq!(wrap_to_width("abcdefghij", 4), ["abcd", "efgh", "ij"]);
    }
}
