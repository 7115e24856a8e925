use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::retry::{is_retryable_status, with_retry, Retryable, RetryConfig};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Row not found: {0}")]
    NotFound(String),

    #[error("Authentication required")]
    AuthRequired,

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    ParseError(#[from] serde_json::Error),
}

impl Retryable for CatalogError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            CatalogError::ServerError(_)
                | CatalogError::RateLimitExceeded
                | CatalogError::NetworkError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Typed client for the hosted catalog (PostgREST conventions).
///
/// Reads never require a session: the anon key is enough for the public
/// targets/solutions tables. Writes (submissions, votes, feedback) go
/// through row-level security and need a bearer session token.
pub struct CatalogClient {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
    session_token: Option<String>,
    retry_config: RetryConfig,
}

impl CatalogClient {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("sovscan/0.1.0"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into(),
            anon_key: anon_key.into(),
            session_token: None,
            retry_config: RetryConfig::default(),
        }
    }

    /// Attach a user session so write endpoints pass row-level security.
    pub fn with_session(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn has_session(&self) -> bool {
        self.session_token.is_some()
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn read_request(&self, table: &str) -> reqwest::RequestBuilder {
        // Anon key doubles as the bearer token for unauthenticated reads
        self.client
            .get(self.rest_url(table))
            .header("apikey", &self.anon_key)
            .bearer_auth(self.session_token.as_deref().unwrap_or(&self.anon_key))
    }

    fn write_request(&self, table: &str) -> Result<reqwest::RequestBuilder> {
        let token = self
            .session_token
            .as_deref()
            .ok_or(CatalogError::AuthRequired)?;
        Ok(self
            .client
            .post(self.rest_url(table))
            .header("apikey", &self.anon_key)
            .bearer_auth(token))
    }

    /// Is this package a known proprietary target?
    pub async fn is_proprietary(&self, package_id: &str) -> Result<bool> {
        let rows = self
            .select_rows::<PackageIdRow>(
                "targets",
                &[
                    ("select", "package_id"),
                    ("package_id", &format!("eq.{}", package_id)),
                    ("limit", "1"),
                ],
            )
            .await?;
        Ok(!rows.is_empty())
    }

    /// Is this package a known FOSS solution?
    pub async fn is_solution(&self, package_id: &str) -> Result<bool> {
        let rows = self
            .select_rows::<PackageIdRow>(
                "solutions",
                &[
                    ("select", "package_id"),
                    ("package_id", &format!("eq.{}", package_id)),
                    ("limit", "1"),
                ],
            )
            .await?;
        Ok(!rows.is_empty())
    }

    /// Number of catalogued alternatives for a target. Zero when the
    /// target is missing, so callers can treat absence and emptiness alike.
    pub async fn alternatives_count(&self, package_id: &str) -> Result<u32> {
        let rows = self
            .select_rows::<TargetAlternativesRow>(
                "targets",
                &[
                    ("select", "alternatives"),
                    ("package_id", &format!("eq.{}", package_id)),
                    ("limit", "1"),
                ],
            )
            .await?;
        Ok(rows
            .first()
            .map(|r| r.alternatives.len() as u32)
            .unwrap_or(0))
    }

    /// Full target table, used by the local cache refresh.
    pub async fn fetch_targets(&self) -> Result<Vec<TargetRow>> {
        self.select_rows("targets", &[("select", "*"), ("order", "package_id.asc")])
            .await
    }

    /// Full solution table, used by the local cache refresh.
    pub async fn fetch_solutions(&self) -> Result<Vec<SolutionRow>> {
        self.select_rows("solutions", &[("select", "*"), ("order", "package_id.asc")])
            .await
    }

    /// Resolve the FOSS alternatives for a proprietary target.
    ///
    /// Two-step: the target row carries the alternative package ids, then
    /// we fetch the matching solution rows. Empty when the target is
    /// unknown or has no alternatives catalogued yet.
    pub async fn get_alternatives(&self, package_id: &str) -> Result<Vec<SolutionRow>> {
        let targets = self
            .select_rows::<TargetAlternativesRow>(
                "targets",
                &[
                    ("select", "alternatives"),
                    ("package_id", &format!("eq.{}", package_id)),
                    ("limit", "1"),
                ],
            )
            .await?;

        let alternatives = match targets.into_iter().next() {
            Some(row) if !row.alternatives.is_empty() => row.alternatives,
            _ => return Ok(Vec::new()),
        };

        let id_list = format!("in.({})", alternatives.join(","));
        self.select_rows("solutions", &[("select", "*"), ("package_id", &id_list)])
            .await
    }

    /// Submit a new FOSS alternative for community review.
    pub async fn submit_alternative(&self, submission: &NewSubmission) -> Result<SubmissionRow> {
        self.insert_row("submissions", submission).await
    }

    /// Cast (or flip) a vote on a solution.
    ///
    /// Upserts on (solution_id, user_id) so re-voting replaces the old
    /// vote instead of stacking duplicates.
    pub async fn cast_vote(&self, vote: &NewVote) -> Result<VoteRow> {
        let request = self
            .write_request("votes")?
            .query(&[("on_conflict", "solution_id,user_id")])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(vote);

        let response = request.send().await?;
        Self::check_write_status(&response)?;
        let mut rows: Vec<VoteRow> = response.json().await?;
        rows.pop()
            .ok_or_else(|| CatalogError::RequestFailed("empty insert response".into()))
    }

    /// Send free-form feedback about a catalog entry or the catalog itself.
    pub async fn submit_feedback(&self, feedback: &NewFeedback) -> Result<FeedbackRow> {
        self.insert_row("feedback", feedback).await
    }

    /// Generic SELECT with retry. Read paths retry transient failures;
    /// 404/401 style outcomes come back as typed errors immediately.
    async fn select_rows<T: serde::de::DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        with_retry(&self.retry_config, || async {
            let response = self.read_request(table).query(query).send().await?;

            if response.status() == 401 {
                return Err(CatalogError::AuthRequired);
            }

            if response.status() == 429 {
                return Err(CatalogError::RateLimitExceeded);
            }

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                let detail = format!("Status {}: {}", status, body);
                // 5xx/timeouts go back through the backoff loop; other
                // 4xx would fail identically on a retry
                return Err(if is_retryable_status(status) {
                    CatalogError::ServerError(detail)
                } else {
                    CatalogError::RequestFailed(detail)
                });
            }

            let rows: Vec<T> = response.json().await?;
            Ok(rows)
        })
        .await
    }

    /// Generic INSERT returning the created row. Writes are not retried:
    /// better to surface the failure than risk a double insert.
    async fn insert_row<B: Serialize, T: serde::de::DeserializeOwned>(
        &self,
        table: &str,
        body: &B,
    ) -> Result<T> {
        let request = self
            .write_request(table)?
            .header("Prefer", "return=representation")
            .json(body);

        let response = request.send().await?;
        Self::check_write_status(&response)?;
        let mut rows: Vec<T> = response.json().await?;
        rows.pop()
            .ok_or_else(|| CatalogError::RequestFailed("empty insert response".into()))
    }

    fn check_write_status(response: &reqwest::Response) -> Result<()> {
        let status = response.status();
        if status == 401 || status == 403 {
            return Err(CatalogError::AuthRequired);
        }
        if status == 429 {
            return Err(CatalogError::RateLimitExceeded);
        }
        if !status.is_success() {
            return Err(CatalogError::RequestFailed(format!("Status {}", status)));
        }
        Ok(())
    }
}

/// Minimal projection used for existence checks.
#[derive(Debug, Deserialize)]
struct PackageIdRow {
    #[allow(dead_code)]
    package_id: String,
}

/// Projection carrying only the alternatives array.
#[derive(Debug, Deserialize)]
struct TargetAlternativesRow {
    #[serde(default)]
    alternatives: Vec<String>,
}

/// A proprietary app the catalog tracks alternatives for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetRow {
    pub package_id: String,
    pub display_name: String,
    #[serde(default)]
    pub alternatives: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TargetRow {
    pub fn alternatives_count(&self) -> u32 {
        self.alternatives.len() as u32
    }
}

/// A FOSS app catalogued as an alternative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionRow {
    pub package_id: String,
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub repo_url: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub vote_score: i64,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Community submission proposing a new alternative.
#[derive(Debug, Clone, Serialize)]
pub struct NewSubmission {
    pub target_package_id: String,
    pub solution_package_id: String,
    pub solution_name: String,
    pub description: String,
    pub repo_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionRow {
    pub id: Uuid,
    pub target_package_id: String,
    pub solution_package_id: String,
    pub solution_name: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// An up/down vote on a solution. `value` is +1 or -1.
#[derive(Debug, Clone, Serialize)]
pub struct NewVote {
    pub solution_id: Uuid,
    pub user_id: Uuid,
    pub value: i8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoteRow {
    pub id: Uuid,
    pub solution_id: Uuid,
    pub user_id: Uuid,
    pub value: i8,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewFeedback {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackRow {
    pub id: Uuid,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> CatalogClient {
        CatalogClient::new("https://catalog.example.org", "anon-key")
    }

    #[test]
    fn rest_url_points_at_postgrest() {
        let c = client();
        assert_eq!(
            c.rest_url("targets"),
            "https://catalog.example.org/rest/v1/targets"
        );
    }

    #[test]
    fn writes_require_a_session() {
        let c = client();
        assert!(!c.has_session());
        let err = c.write_request("votes").unwrap_err();
        assert!(matches!(err, CatalogError::AuthRequired));
    }

    #[test]
    fn session_unlocks_write_requests() {
        let c = client().with_session("jwt-token");
        assert!(c.has_session());
        assert!(c.write_request("votes").is_ok());
    }

    #[test]
    fn target_row_counts_its_alternatives() {
        let row = TargetRow {
            package_id: "com.whatsapp".into(),
            display_name: "WhatsApp".into(),
            alternatives: vec![
                "org.thoughtcrime.securesms".into(),
                "im.vector.app".into(),
                "org.briarproject.briar.android".into(),
            ],
            category: Some("messaging".into()),
            updated_at: None,
        };
        assert_eq!(row.alternatives_count(), 3);
    }

    #[test]
    fn error_retryability_matches_transport_semantics() {
        assert!(CatalogError::ServerError("Status 503".into()).is_retryable());
        assert!(CatalogError::RateLimitExceeded.is_retryable());

        assert!(!CatalogError::AuthRequired.is_retryable());
        assert!(!CatalogError::RequestFailed("Status 400".into()).is_retryable());
        assert!(!CatalogError::NotFound("com.whatsapp".into()).is_retryable());
    }

    #[tokio::test]
    async fn auth_failure_is_not_retried() {
        use std::sync::atomic::{AtomicU32, Ordering};

        // A bad key fails the same way on every attempt; the retry
        // budget must stay untouched
        let calls = AtomicU32::new(0);
        let result = with_retry(&RetryConfig::default(), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<Vec<TargetRow>, _>(CatalogError::AuthRequired)
        })
        .await;

        assert!(matches!(result, Err(CatalogError::AuthRequired)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn target_row_tolerates_missing_alternatives() {
        let row: TargetRow = serde_json::from_str(
            r#"{"package_id":"com.whatsapp","display_name":"WhatsApp","updated_at":null}"#,
        )
        .unwrap();
        assert_eq!(row.alternatives_count(), 0);
    }
}
