//! Keyword-based assignment type inference

use std::sync::OnceLock;

use regex::Regex;

use crate::types::AssignmentType;

/// Checked in order; the first matching pattern wins.
const TYPE_PATTERNS: &[(AssignmentType, &str)] = &[
    (AssignmentType::Quiz, r"(?i)\bquiz(z?es)?\b"),
    (AssignmentType::Project, r"(?i)\bprojects?\b"),
    (AssignmentType::Lab, r"(?i)\blab(oratory)?s?\b"),
    (AssignmentType::Test, r"(?i)\b(tests?|exams?|midterms?|finals?|assessments?)\b"),
    (AssignmentType::Discussion, r"(?i)\b(discussions?|forums?|posts?)\b"),
    (AssignmentType::Reading, r"(?i)\b(read(ing)?s?|chapters?|ch\.)\b"),
    (
        AssignmentType::Homework,
        r"(?i)\b(homework|hw|worksheets?|problem sets?|practice|exercises?)\b",
    ),
];

fn type_patterns() -> &'static [(AssignmentType, Regex)] {
    static PATTERNS: OnceLock<Vec<(AssignmentType, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        TYPE_PATTERNS
            .iter()
            .filter_map(|(kind, pattern)| Regex::new(pattern).ok().map(|re| (*kind, re)))
            .collect()
    })
}

/// Infer an assignment's type from its title.
///
/// Titles matching no keyword are [`AssignmentType::Other`].
pub fn infer_assignment_type(title: &str) -> AssignmentType {
    type_patterns()
        .iter()
        .find(|(_, re)| re.is_match(title))
        .map_or(AssignmentType::Other, |(kind, _)| *kind)
}
