//! Resource key type used as the identity for all per-resource cache state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a cacheable unit of data: an ordered sequence of segments.
///
/// Two keys are equal iff their segment sequences are equal. The first
/// segment names the resource family and is the grouping unit for
/// access-frequency tracking. Keys are immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QueryKey {
    segments: Vec<String>,
}

impl QueryKey {
    /// Build a key from an ordered sequence of segments.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Resource family, the first segment. Empty keys map to the empty family.
    pub fn family(&self) -> &str {
        self.segments.first().map(String::as_str).unwrap_or("")
    }

    /// Segment at `index`, if present.
    pub fn segment(&self, index: usize) -> Option<&str> {
        self.segments.get(index).map(String::as_str)
    }

    /// All segments in order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Detail record for a single exam.
    pub fn exam_detail(exam_id: &str) -> Self {
        Self::new(["exam", "detail", exam_id])
    }

    /// One page of the exam list under a filter set.
    pub fn exam_list(filters: &serde_json::Value, page: u32) -> Self {
        Self::new(vec![
            "exam".to_string(),
            "list".to_string(),
            filters.to_string(),
            page.to_string(),
        ])
    }

    /// Aggregated statistics for a grade.
    pub fn grade_statistics(grade: &str) -> Self {
        Self::new(["statistics", "grade", grade])
    }

    /// Cross-grade dashboard summary.
    pub fn dashboard_summary() -> Self {
        Self::new(["dashboard", "summary"])
    }

    /// Group key for a grade, used to fan out to its dependent resources.
    pub fn grade(grade: &str) -> Self {
        Self::new(["grade", grade])
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}
