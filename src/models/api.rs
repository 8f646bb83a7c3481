use garde::Validate;
use serde::{Deserialize, Serialize};

use super::task::TaskView;

/// Longest retention an operator may request through `/cleanup` (30 days).
pub const MAX_CLEANUP_AGE_SECS: u64 = 30 * 24 * 3600;

/// Response after accepting a scrape request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ScrapeResponse {
    pub success: bool,
    pub task_id: String,
    pub message: String,
    pub status_url: String,
    pub download_url: String,
}

/// Response for querying task status.
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    pub success: bool,
    #[serde(flatten)]
    pub task: TaskView,
}

/// Optional parameters for `POST /cleanup`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CleanupRequest {
    #[garde(range(max = MAX_CLEANUP_AGE_SECS))]
    pub max_age_secs: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CleanupResponse {
    pub success: bool,
    pub cleaned_tasks: usize,
    pub remaining_tasks: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_request_bounds() {
        assert!(CleanupRequest { max_age_secs: None }.validate().is_ok());
        assert!(CleanupRequest { max_age_secs: Some(0) }.validate().is_ok());
        assert!(CleanupRequest { max_age_secs: Some(3600) }.validate().is_ok());
        assert!(CleanupRequest {
            max_age_secs: Some(MAX_CLEANUP_AGE_SECS + 1)
        }
        .validate()
        .is_err());
    }
}
