use crate::models::SectionQuery;

/// Build the PostgREST query pairs for an equality match on all four parameters.
pub fn eq_filters(query: &SectionQuery) -> Vec<(&'static str, String)> {
    vec![
        ("select", "*".to_string()),
        ("semester", format!("eq.{}", query.semester.as_str())),
        ("year", format!("eq.{}", query.year)),
        ("dept_abbr", format!("eq.{}", query.dept)),
        ("course_number", format!("eq.{}", query.course_number)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Semester;

    #[test]
    fn filters_cover_every_parameter() {
        let q = SectionQuery::new(Semester::Spring, 2025, "MATH", "241");
        let pairs = eq_filters(&q);
        assert!(pairs.contains(&("semester", "eq.spring".into())));
        assert!(pairs.contains(&("year", "eq.2025".into())));
        assert!(pairs.contains(&("dept_abbr", "eq.MATH".into())));
        assert!(pairs.contains(&("course_number", "eq.241".into())));
    }
}
