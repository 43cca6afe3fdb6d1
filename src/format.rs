//! Display helpers for section cards: clock times, day tags and free text.

use std::fmt;
use url::Url;

use crate::models::ClassDay;

pub const TBA: &str = "TBA";

const RATINGS_SEARCH_URL: &str = "https://www.ratemyprofessors.com/search/teachers";

// ─── Times ──────────────────────────────────────────────────────────────────

/// A 12-hour clock value split into the bold part and the dimmed suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockTime {
    pub numeric: String,
    pub suffix: &'static str,
}

impl ClockTime {
    /// `hhmm` is a 24-hour value such as `930` or `1345`.
    pub fn from_hhmm(hhmm: u16) -> Self {
        let hour = hhmm / 100;
        let minute = hhmm % 100;
        let suffix = if hour < 12 { "am" } else { "pm" };
        let h12 = match hour % 12 {
            0 => 12,
            h => h,
        };
        Self {
            numeric: format!("{h12}:{minute:02}"),
            suffix,
        }
    }

    /// Inverse of [`ClockTime::from_hhmm`].
    pub fn to_hhmm(&self) -> Option<u16> {
        let (h, m) = self.numeric.split_once(':')?;
        let h12: u16 = h.parse().ok()?;
        let minute: u16 = m.parse().ok()?;
        if !(1..=12).contains(&h12) || minute > 59 {
            return None;
        }
        let hour = match (self.suffix, h12) {
            ("am", 12) => 0,
            ("am", h) => h,
            ("pm", 12) => 12,
            ("pm", h) => h + 12,
            _ => return None,
        };
        Some(hour * 100 + minute)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.numeric, self.suffix)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeRange {
    Tba,
    Span { start: ClockTime, end: ClockTime },
}

pub fn format_time_range(start: u16, end: u16) -> TimeRange {
    if start == end {
        return TimeRange::Tba;
    }
    TimeRange::Span {
        start: ClockTime::from_hhmm(start),
        end: ClockTime::from_hhmm(end),
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tba => f.write_str(TBA),
            Self::Span { start, end } => write!(f, "{start} - {end}"),
        }
    }
}

// ─── Days ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayToken {
    /// No meeting days; drawn with Sunday's colours.
    Async,
    Day(ClassDay),
}

impl DayToken {
    pub fn label(self) -> &'static str {
        match self {
            Self::Async => "Async",
            Self::Day(d) => d.full_name(),
        }
    }

    pub fn palette_day(self) -> ClassDay {
        match self {
            Self::Async => ClassDay::Sun,
            Self::Day(d) => d,
        }
    }
}

/// Split a comma-delimited day string. Empty tokens are asynchronous meetings.
pub fn days_of(codes: &str) -> Vec<DayToken> {
    codes
        .split(',')
        .map(str::trim)
        .filter_map(|code| {
            if code.is_empty() {
                return Some(DayToken::Async);
            }
            match ClassDay::from_code(code) {
                Some(day) => Some(DayToken::Day(day)),
                None => {
                    tracing::warn!(code, "unknown day code");
                    None
                }
            }
        })
        .collect()
}

// ─── Text ───────────────────────────────────────────────────────────────────

/// Every `.` is followed by exactly one space, whatever spacing it had before.
pub fn format_comment(comment: &str) -> String {
    let mut out = String::with_capacity(comment.len() + 8);
    let mut after_period = false;
    for ch in comment.chars() {
        if after_period && ch == ' ' {
            continue;
        }
        after_period = ch == '.';
        out.push(ch);
        if after_period {
            out.push(' ');
        }
    }
    out
}

pub fn format_location(location: &str) -> String {
    location.replace('-', " ")
}

/// Instructor first names arrive as initials; "Staff" is left alone.
pub fn format_first_name(name: &str) -> String {
    if name == "Staff" {
        name.to_string()
    } else {
        format!("{name}.")
    }
}

/// Search URL on the instructor ratings site, names URL-encoded.
pub fn rating_url(first: &str, last: &str, school_id: &str) -> String {
    let query = format!("{first} {last}");
    match Url::parse_with_params(
        RATINGS_SEARCH_URL,
        &[("query", query.as_str()), ("sid", school_id)],
    ) {
        Ok(url) => url.into(),
        Err(_) => RATINGS_SEARCH_URL.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_times_are_tba() {
        for t in [0, 930, 1200, 2359] {
            assert_eq!(format_time_range(t, t).to_string(), "TBA");
        }
    }

    #[test]
    fn twelve_hour_rendering() {
        assert_eq!(format_time_range(930, 1045).to_string(), "9:30am - 10:45am");
        assert_eq!(format_time_range(1200, 1315).to_string(), "12:00pm - 1:15pm");
        assert_eq!(format_time_range(0, 5).to_string(), "12:00am - 12:05am");
    }

    #[test]
    fn clock_parts_round_trip() {
        for hour in 0..24u16 {
            for minute in [0u16, 5, 30, 59] {
                let hhmm = hour * 100 + minute;
                let clock = ClockTime::from_hhmm(hhmm);
                assert_eq!(clock.to_hhmm(), Some(hhmm), "{clock}");
            }
        }
    }

    #[test]
    fn days_in_order() {
        let labels: Vec<_> = days_of("m,w,f").into_iter().map(DayToken::label).collect();
        assert_eq!(labels, ["mon", "wed", "fri"]);
    }

    #[test]
    fn empty_days_is_single_async_token() {
        let tokens = days_of("");
        assert_eq!(tokens, vec![DayToken::Async]);
        assert_eq!(tokens[0].label(), "Async");
        assert_eq!(tokens[0].palette_day(), ClassDay::Sun);
    }

    #[test]
    fn two_letter_codes() {
        assert_eq!(
            days_of("tu,th,sa"),
            vec![
                DayToken::Day(ClassDay::Tue),
                DayToken::Day(ClassDay::Thu),
                DayToken::Day(ClassDay::Sat)
            ]
        );
    }

    #[test]
    fn comment_spacing_example() {
        assert_eq!(
            format_comment("Great.Take notes. Good luck."),
            "Great. Take notes. Good luck. "
        );
    }

    #[test]
    fn comment_spacing_is_idempotent() {
        for input in [
            "",
            "No periods here",
            "a.  b.c",
            "Ends with space. ",
            "Great.Take notes. Good luck.",
            "...",
        ] {
            let once = format_comment(input);
            assert_eq!(format_comment(&once), once, "input {input:?}");
        }
    }

    #[test]
    fn names_and_locations() {
        assert_eq!(format_first_name("Staff"), "Staff");
        assert_eq!(format_first_name("J"), "J.");
        assert_eq!(format_location("SCI-B-101"), "SCI B 101");
    }

    #[test]
    fn rating_url_is_encoded() {
        let url = rating_url("J", "O'Neil Smith", "U2Nob29sLTE2Mg==");
        let parsed = Url::parse(&url).unwrap();
        let pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(pairs[0], ("query".into(), "J O'Neil Smith".into()));
        assert_eq!(pairs[1], ("sid".into(), "U2Nob29sLTE2Mg==".into()));
        assert!(!url.contains(' '));
    }
}
