//! Backend request and response types.

use crate::auth::CredentialBundle;
use serde::{Deserialize, Serialize};

/// Results shown per page in listings.
pub const JOBS_PER_PAGE: usize = 20;

/// One ranked job posting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPosting {
    /// Keyword match score, higher ranks first.
    pub score: i64,
    /// Comma-separated keywords that matched this posting.
    pub matched_keywords: String,
    pub link: String,
    pub job_title: String,
    pub job_company: String,
    pub job_location: String,
}

/// Response body of the job search endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct JobSearchResponse {
    pub job_postings: Vec<JobPosting>,
}

/// Google credentials plus backend-managed spreadsheet bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtherCreds {
    pub google_creds: CredentialBundle,
    pub spreadsheet_data: serde_json::Value,
}

/// Registration request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub other_creds: OtherCreds,
}

/// Registration response body.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Outcome of a database update trigger.
#[derive(Debug, Clone, Copy)]
pub struct UpdateDatabaseResponse {
    /// False means the run completed with warnings.
    pub success: bool,
}
