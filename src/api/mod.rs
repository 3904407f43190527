//! Dream Job Search backend client.
//!
//! Thin typed wrapper over the backend HTTP endpoints: session
//! login/registration, job search, and the database update trigger. Errors
//! distinguish "not authenticated" from generic server failure so callers
//! can prompt a re-login instead of a blind retry.

mod types;

pub use types::{
    JobPosting, JobSearchResponse, OtherCreds, RegisterRequest, RegisterResponse,
    UpdateDatabaseResponse, JOBS_PER_PAGE,
};

use crate::auth::CredentialBundle;
use crate::config::Settings;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

/// Error type for backend calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 401 from the backend. The caller should prompt a re-login.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// 5xx from the backend.
    #[error("Server error: {0}")]
    Server(String),

    /// Any other non-success status.
    #[error("Request failed: {0}")]
    Request(String),

    /// The backend could not be reached.
    #[error("Unable to connect to the server: {0}")]
    Network(reqwest::Error),

    #[error("Invalid response: {0}")]
    Decode(reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: Option<String>,
}

/// Backend HTTP client.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl ApiClient {
    /// Create a client for the configured backend.
    pub fn new(http: reqwest::Client, settings: &Settings) -> Self {
        Self {
            http,
            base_url: settings.backend_url.trim_end_matches('/').to_string(),
            access_token: None,
        }
    }

    /// Attach a bearer token to subsequent requests.
    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<reqwest::Response, ApiError> {
        let mut request = self.http.post(self.url(path)).json(&body);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(ApiError::Network)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::NotAuthenticated);
        }

        let detail = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.detail)
            .unwrap_or_else(|| format!("HTTP {}", status));

        if status.is_server_error() {
            Err(ApiError::Server(detail))
        } else {
            Err(ApiError::Request(detail))
        }
    }

    /// Log in with the stored backend credentials.
    pub async fn login(&self) -> Result<bool, ApiError> {
        let response = self.post_json("/login", json!({})).await?;
        let body = response.json::<StatusBody>().await.map_err(ApiError::Decode)?;
        Ok(body.status.as_deref() == Some("success"))
    }

    /// Register a new account carrying the Google credential bundle.
    ///
    /// Returns the backend access token for the fresh session.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        google_creds: &CredentialBundle,
    ) -> Result<RegisterResponse, ApiError> {
        let request = RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            other_creds: OtherCreds {
                google_creds: google_creds.clone(),
                // Populated by the backend when the spreadsheet is created
                spreadsheet_data: json!({}),
            },
        };

        info!("registering user");
        let response = self
            .post_json("/register", serde_json::to_value(&request).expect("request serialize"))
            .await?;
        response
            .json::<RegisterResponse>()
            .await
            .map_err(ApiError::Decode)
    }

    /// Search stored job postings, ranked by keyword match score.
    pub async fn search_jobs(
        &self,
        keywords: &[String],
        location: Option<&str>,
    ) -> Result<Vec<JobPosting>, ApiError> {
        let location = location
            .map(str::trim)
            .filter(|loc| !loc.is_empty());

        debug!(keywords = keywords.len(), ?location, "searching jobs");
        let response = self
            .post_json(
                "/job-postings",
                json!({
                    "keywords": keywords,
                    "location": location,
                }),
            )
            .await?;

        let body = response
            .json::<JobSearchResponse>()
            .await
            .map_err(ApiError::Decode)?;
        Ok(body.job_postings)
    }

    /// Trigger a backend scraping run over the given locations and queries.
    pub async fn update_database(
        &self,
        locations: &[String],
        queries: &[String],
    ) -> Result<UpdateDatabaseResponse, ApiError> {
        info!(
            locations = locations.len(),
            queries = queries.len(),
            "triggering database update"
        );
        let response = self
            .post_json(
                "/update-database",
                json!({
                    "locations": locations,
                    "queries": queries,
                }),
            )
            .await?;

        let body = response.json::<StatusBody>().await.map_err(ApiError::Decode)?;
        Ok(UpdateDatabaseResponse {
            success: body.status.as_deref() == Some("success"),
        })
    }
}

/// Slice one page out of a ranked result list.
pub fn page<'a>(postings: &'a [JobPosting], page: usize, per_page: usize) -> &'a [JobPosting] {
    let start = page.saturating_sub(1).saturating_mul(per_page);
    let end = (start + per_page).min(postings.len());
    if start >= postings.len() {
        &[]
    } else {
        &postings[start..end]
    }
}

/// Number of pages needed for a result list.
pub fn total_pages(len: usize, per_page: usize) -> usize {
    len.div_ceil(per_page).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(title: &str) -> JobPosting {
        JobPosting {
            score: 3,
            matched_keywords: "rust".to_string(),
            link: "https://example.com/job".to_string(),
            job_title: title.to_string(),
            job_company: "Acme".to_string(),
            job_location: "Remote".to_string(),
        }
    }

    #[test]
    fn test_pagination() {
        let postings: Vec<_> = (0..45).map(|i| posting(&format!("job {i}"))).collect();

        assert_eq!(total_pages(postings.len(), JOBS_PER_PAGE), 3);
        assert_eq!(page(&postings, 1, JOBS_PER_PAGE).len(), 20);
        assert_eq!(page(&postings, 3, JOBS_PER_PAGE).len(), 5);
        assert_eq!(page(&postings, 4, JOBS_PER_PAGE).len(), 0);
        assert_eq!(page(&postings, 2, JOBS_PER_PAGE)[0].job_title, "job 20");
    }

    #[test]
    fn test_total_pages_never_zero() {
        assert_eq!(total_pages(0, JOBS_PER_PAGE), 1);
    }

    #[test]
    fn test_register_request_shape() {
        let request = RegisterRequest {
            email: "a@b.c".to_string(),
            password: "hunter22".to_string(),
            other_creds: OtherCreds {
                google_creds: CredentialBundle {
                    access_token: "at".to_string(),
                    refresh_token: Some("rt".to_string()),
                    expires_in: Some(3599),
                    scope: None,
                    token_type: Some("Bearer".to_string()),
                },
                spreadsheet_data: serde_json::json!({}),
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["other_creds"]["google_creds"]["access_token"], "at");
        assert!(json["other_creds"]["spreadsheet_data"]
            .as_object()
            .unwrap()
            .is_empty());
    }
}
