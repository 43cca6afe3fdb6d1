use std::collections::HashMap;

use crate::models::Section;

/// Sections sharing a `group_id`, in the order they were fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionGroup {
    pub group_id: String,
    pub sections: Vec<Section>,
}

/// Stable partition by `group_id`. Groups come out in order of first appearance;
/// members keep their input order.
pub fn split_into_groups(sections: &[Section]) -> Vec<SectionGroup> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<SectionGroup> = Vec::new();

    for section in sections {
        match index.get(section.group_id.as_str()) {
            Some(&i) => groups[i].sections.push(section.clone()),
            None => {
                index.insert(section.group_id.as_str(), groups.len());
                groups.push(SectionGroup {
                    group_id: section.group_id.clone(),
                    sections: vec![section.clone()],
                });
            }
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::section;

    fn uids(groups: &[SectionGroup]) -> Vec<Vec<&str>> {
        groups
            .iter()
            .map(|g| g.sections.iter().map(|s| s.uid.as_str()).collect())
            .collect()
    }

    #[test]
    fn non_adjacent_members_join_first_group() {
        let input = vec![section("1", "G1"), section("2", "G2"), section("3", "G1")];
        let groups = split_into_groups(&input);
        assert_eq!(uids(&groups), vec![vec!["1", "3"], vec!["2"]]);
        assert_eq!(groups[0].group_id, "G1");
    }

    #[test]
    fn empty_input_yields_no_groups() {
        assert!(split_into_groups(&[]).is_empty());
    }

    #[test]
    fn partition_is_stable() {
        let ids = ["B", "A", "B", "C", "A", "A", "C", "B"];
        let input: Vec<Section> = ids
            .iter()
            .enumerate()
            .map(|(i, g)| section(&i.to_string(), g))
            .collect();
        let groups = split_into_groups(&input);

        // Same multiset of rows.
        let flat: Vec<&Section> = groups.iter().flat_map(|g| g.sections.iter()).collect();
        assert_eq!(flat.len(), input.len());

        // Group order follows first appearance.
        let order: Vec<&str> = groups.iter().map(|g| g.group_id.as_str()).collect();
        assert_eq!(order, ["B", "A", "C"]);

        // Within a group, input order holds and every member shares the id.
        for g in &groups {
            assert!(!g.sections.is_empty());
            let expected: Vec<&Section> =
                input.iter().filter(|s| s.group_id == g.group_id).collect();
            let actual: Vec<&Section> = g.sections.iter().collect();
            assert_eq!(actual, expected);
        }
    }
}
