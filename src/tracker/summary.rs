use crate::utils::time::hours_rounded;

/// One line of the exported summary.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub project_id: String,
    pub project_name: String,
    /// Rounded to 2 decimal places.
    pub total_hours: f64,
}

impl SummaryRow {
    pub fn new(project_id: &str, project_name: &str, elapsed_seconds: u64) -> Self {
        Self {
            project_id: project_id.to_string(),
            project_name: project_name.to_string(),
            total_hours: hours_rounded(elapsed_seconds),
        }
    }
}
