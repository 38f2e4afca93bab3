use crate::models::ResultSet;

/// Count check for a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub expected: usize,
    pub extracted: usize,
    pub organizations: usize,
}

impl RunSummary {
    pub fn new(expected: usize, results: &ResultSet) -> Self {
        Self {
            expected,
            extracted: results.directory_count(),
            organizations: results.organization_count(),
        }
    }

    /// Directory rows only; organization rows are never counted by the site.
    pub fn matched(&self) -> bool {
        self.expected == self.extracted
    }

    pub fn status_message(&self) -> String {
        if self.matched() {
            "Success".to_string()
        } else {
            format!(
                "Complete, but the exact entries created do not match the total entries expected \
                 ({} expected, {} created).",
                self.expected, self.extracted
            )
        }
    }
}
