use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::model::{GoldenJoint, GoldenJointStatus, PageText};
use crate::parser::lines::loose_line_ids;

static GOLDEN_JOINT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)golden\s*joint").unwrap());

/// One record per page mentioning a golden joint, with the line numbers on that page.
pub fn extract(pages: &[PageText]) -> Vec<GoldenJoint> {
    let mut seen_pages = HashSet::new();
    let mut joints = Vec::new();

    for page in pages {
        if !GOLDEN_JOINT_RE.is_match(&page.raw_text) || !seen_pages.insert(page.page_number) {
            continue;
        }

        let mut seen_lines = HashSet::new();
        let related_lines: Vec<String> = loose_line_ids(&page.raw_text)
            .iter()
            .map(|id| id.canonical())
            .filter(|line| seen_lines.insert(line.clone()))
            .collect();

        joints.push(GoldenJoint {
            source_page: page.page_number,
            related_lines,
            status: GoldenJointStatus::Identified,
            package_no: None,
        });
    }

    joints
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn golden_joint_page_collects_nearby_lines() {
        let text = r#"NOTE 3: GOLDEN JOINT between 4"-P-0112 and 4"-P-0113, see 4"-P-0112"#;
        let joints = extract(&[PageText::new(12, text)]);
        assert_eq!(joints.len(), 1);
        let gj = &joints[0];
        assert_eq!(gj.source_page, 12);
        assert_eq!(gj.related_lines, vec![r#"4"-P-0112"#, r#"4"-P-0113"#]);
        assert_eq!(gj.status, GoldenJointStatus::Identified);
    }

    #[test]
    fn keyword_is_case_and_space_insensitive() {
        let pages = vec![
            PageText::new(1, "goldenjoint"),
            PageText::new(2, "Golden   Joint"),
            PageText::new(3, "gold joint"),
        ];
        let pages_hit: Vec<u32> = extract(&pages).iter().map(|g| g.source_page).collect();
        assert_eq!(pages_hit, vec![1, 2]);
    }

    #[test]
    fn one_record_per_page() {
        let pages = vec![
            PageText::new(5, "GOLDEN JOINT GJ-1 ... GOLDEN JOINT GJ-2"),
            PageText::new(5, "GOLDEN JOINT repeated page"),
        ];
        let joints = extract(&pages);
        assert_eq!(joints.len(), 1);
        assert!(joints[0].related_lines.is_empty());
    }
}
