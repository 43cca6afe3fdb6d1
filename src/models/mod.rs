use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// ─── Semester ───────────────────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Semester {
    #[default]
    Fall,
    Spring,
    Summer,
    Winter,
}

impl Semester {
    pub const ALL: [Semester; 4] = [
        Semester::Fall,
        Semester::Winter,
        Semester::Spring,
        Semester::Summer,
    ];

    /// Wire value used in store filters.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fall => "fall",
            Self::Spring => "spring",
            Self::Summer => "summer",
            Self::Winter => "winter",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Fall => "Fall",
            Self::Spring => "Spring",
            Self::Summer => "Summer",
            Self::Winter => "Winter",
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        if idx == 0 {
            Self::ALL[Self::ALL.len() - 1]
        } else {
            Self::ALL[idx - 1]
        }
    }
}

// ─── Query key ──────────────────────────────────────────────────────────────

/// The four parameters that identify one result set. Also the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SectionQuery {
    pub semester: Semester,
    pub year: i32,
    pub dept: String,
    pub course_number: String,
}

impl SectionQuery {
    pub fn new(
        semester: Semester,
        year: i32,
        dept: impl Into<String>,
        course_number: impl Into<String>,
    ) -> Self {
        Self {
            semester,
            year,
            dept: dept.into(),
            course_number: course_number.into(),
        }
    }

    /// A query only runs once both the department and the course number are filled in.
    pub fn is_enabled(&self) -> bool {
        !self.dept.is_empty() && !self.course_number.is_empty()
    }
}

impl fmt::Display for SectionQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} · {} {}",
            self.semester.label(),
            self.year,
            if self.dept.is_empty() { "—" } else { self.dept.as_str() },
            self.course_number
        )
    }
}

// ─── Sections ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionType {
    #[serde(rename = "lec")]
    Lecture,
    #[serde(rename = "lab")]
    Lab,
    #[serde(rename = "sem")]
    Seminar,
    #[serde(rename = "sup")]
    Support,
    #[serde(rename = "act")]
    Activity,
    #[serde(rename = "add")]
    Additional,
}

impl SectionType {
    pub fn label(self) -> &'static str {
        match self {
            Self::Lecture => "Lec",
            Self::Lab => "Lab",
            Self::Seminar => "Sem",
            Self::Support => "Sup",
            Self::Activity => "Act",
            Self::Additional => "Add",
        }
    }

    /// Single-glyph stand-in for the type icon.
    pub fn glyph(self) -> &'static str {
        match self {
            Self::Lecture => "≡",
            Self::Lab => "⚗",
            Self::Seminar => "❐",
            Self::Support => "✎",
            Self::Activity => "☼",
            Self::Additional => "⧉",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(deserialize_with = "string_or_number")]
    pub uid: String,
    #[serde(deserialize_with = "string_or_number")]
    pub group_id: String,
    pub section_number: String,
    pub class_number: u32,
    pub section_type: SectionType,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub instructor_fn: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub instructor_ln: String,
    /// Comma-delimited day codes; empty means asynchronous.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub days: String,
    /// 24-hour `HHMM`; `time_start == time_end` means TBA.
    pub time_start: u16,
    pub time_end: u16,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub location: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub comment: String,
    #[serde(default)]
    pub semester: Semester,
    #[serde(default)]
    pub year: i32,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub dept_abbr: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub course_number: String,
}

impl Section {
    pub fn is_tba(&self) -> bool {
        self.time_start == self.time_end
    }

    /// "CSC 101-002", or just the section number when the row has no course fields.
    pub fn course_label(&self) -> String {
        if self.dept_abbr.is_empty() {
            self.section_number.clone()
        } else {
            format!(
                "{} {}-{}",
                self.dept_abbr, self.course_number, self.section_number
            )
        }
    }
}

/// Row identifiers come back as text or integers depending on the column type.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
    })
}

/// Nullable text columns read as empty strings.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// ─── Day codes ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClassDay {
    Sun,
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
}

impl ClassDay {
    pub const ALL: [ClassDay; 7] = [
        ClassDay::Sun,
        ClassDay::Mon,
        ClassDay::Tue,
        ClassDay::Wed,
        ClassDay::Thu,
        ClassDay::Fri,
        ClassDay::Sat,
    ];

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "s" => Some(Self::Sun),
            "m" => Some(Self::Mon),
            "tu" => Some(Self::Tue),
            "w" => Some(Self::Wed),
            "th" => Some(Self::Thu),
            "f" => Some(Self::Fri),
            "sa" => Some(Self::Sat),
            _ => None,
        }
    }

    pub fn full_name(self) -> &'static str {
        match self {
            Self::Sun => "sun",
            Self::Mon => "mon",
            Self::Tue => "tue",
            Self::Wed => "wed",
            Self::Thu => "thu",
            Self::Fri => "fri",
            Self::Sat => "sat",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_accepts_numeric_ids() {
        let json = r#"{
            "uid": 4412, "group_id": "G1", "section_number": "001",
            "class_number": 10233, "section_type": "lec",
            "instructor_fn": "J", "instructor_ln": "Smith",
            "days": "m,w,f", "time_start": 930, "time_end": 1045,
            "location": "SCI-101", "comment": ""
        }"#;
        let s: Section = serde_json::from_str(json).unwrap();
        assert_eq!(s.uid, "4412");
        assert_eq!(s.group_id, "G1");
        assert_eq!(s.section_type, SectionType::Lecture);
        assert!(s.dept_abbr.is_empty());
        assert_eq!(s.course_label(), "001");
    }

    #[test]
    fn null_text_columns_read_as_empty() {
        let json = r#"{
            "uid": "7", "group_id": 3, "section_number": "002",
            "class_number": 10234, "section_type": "lab",
            "instructor_fn": null, "instructor_ln": null,
            "days": null, "time_start": 0, "time_end": 0,
            "location": null, "comment": null,
            "semester": "spring", "year": 2025,
            "dept_abbr": "CSC", "course_number": "101"
        }"#;
        let s: Section = serde_json::from_str(json).unwrap();
        assert!(s.comment.is_empty());
        assert!(s.days.is_empty());
        assert!(s.location.is_empty());
        assert!(s.instructor_fn.is_empty());
        assert_eq!(s.semester, Semester::Spring);
        assert_eq!(s.year, 2025);
        assert_eq!(s.course_label(), "CSC 101-002");
    }

    #[test]
    fn query_needs_dept_and_course() {
        assert!(!SectionQuery::new(Semester::Fall, 2024, "", "101").is_enabled());
        assert!(!SectionQuery::new(Semester::Fall, 2024, "CSC", "").is_enabled());
        assert!(SectionQuery::new(Semester::Fall, 2024, "CSC", "101").is_enabled());
    }

    #[test]
    fn semester_cycles_both_ways() {
        for s in Semester::ALL {
            assert_eq!(s.next().prev(), s);
        }
    }
}
