// Community write paths: propose alternatives, vote, send feedback.
// All of it validates locally first and requires a signed-in session.
use sovscan_api::{CatalogClient, FeedbackRow, NewFeedback, NewSubmission, NewVote, SubmissionRow, VoteRow};
use uuid::Uuid;

use crate::{Error, Result};

const MAX_DESCRIPTION_LEN: usize = 2000;
const MAX_FEEDBACK_LEN: usize = 4000;

/// A proposed FOSS alternative, validated before it goes anywhere near
/// the network. Field-level errors come back as
/// [`Error::Validation`] so the form can highlight the right input.
#[derive(Debug, Clone)]
pub struct AlternativeDraft {
    pub target_package_id: String,
    pub solution_package_id: String,
    pub solution_name: String,
    pub description: String,
    pub repo_url: String,
}

impl AlternativeDraft {
    pub fn validate(&self) -> Result<()> {
        if !is_plausible_package_id(&self.target_package_id) {
            return Err(Error::validation(
                "target_package_id",
                "expected a reverse-DNS package id like com.example.app",
            ));
        }
        if !is_plausible_package_id(&self.solution_package_id) {
            return Err(Error::validation(
                "solution_package_id",
                "expected a reverse-DNS package id like org.example.app",
            ));
        }
        if self.solution_package_id == self.target_package_id {
            return Err(Error::validation(
                "solution_package_id",
                "an app cannot be its own alternative",
            ));
        }
        if self.solution_name.trim().is_empty() {
            return Err(Error::validation("solution_name", "must not be empty"));
        }
        if self.description.len() > MAX_DESCRIPTION_LEN {
            return Err(Error::validation(
                "description",
                format!("must be at most {} characters", MAX_DESCRIPTION_LEN),
            ));
        }
        if !self.repo_url.starts_with("https://") {
            return Err(Error::validation("repo_url", "must be an https:// URL"));
        }
        Ok(())
    }

    /// Validate locally, then submit. Needs a session on the client;
    /// transport failures are surfaced, never swallowed - the caller
    /// shows a retry affordance.
    pub async fn submit(&self, client: &CatalogClient) -> Result<SubmissionRow> {
        self.validate()?;
        if !client.has_session() {
            return Err(Error::AuthRequired);
        }

        let submission = NewSubmission {
            target_package_id: self.target_package_id.clone(),
            solution_package_id: self.solution_package_id.clone(),
            solution_name: self.solution_name.trim().to_string(),
            description: self.description.clone(),
            repo_url: self.repo_url.clone(),
        };
        Ok(client.submit_alternative(&submission).await?)
    }
}

/// Free-form feedback, optionally tied to a package.
#[derive(Debug, Clone)]
pub struct FeedbackDraft {
    pub message: String,
    pub package_id: Option<String>,
}

impl FeedbackDraft {
    pub fn validate(&self) -> Result<()> {
        if self.message.trim().is_empty() {
            return Err(Error::validation("message", "must not be empty"));
        }
        if self.message.len() > MAX_FEEDBACK_LEN {
            return Err(Error::validation(
                "message",
                format!("must be at most {} characters", MAX_FEEDBACK_LEN),
            ));
        }
        if let Some(pkg) = &self.package_id {
            if !is_plausible_package_id(pkg) {
                return Err(Error::validation(
                    "package_id",
                    "expected a reverse-DNS package id",
                ));
            }
        }
        Ok(())
    }

    pub async fn submit(&self, client: &CatalogClient) -> Result<FeedbackRow> {
        self.validate()?;
        if !client.has_session() {
            return Err(Error::AuthRequired);
        }

        let feedback = NewFeedback {
            message: self.message.trim().to_string(),
            package_id: self.package_id.clone(),
        };
        Ok(client.submit_feedback(&feedback).await?)
    }
}

/// Cast an up or down vote on a solution. Re-voting flips the previous
/// vote (the backend upserts on solution + user).
pub async fn cast_vote(
    client: &CatalogClient,
    solution_id: Uuid,
    user_id: Uuid,
    upvote: bool,
) -> Result<VoteRow> {
    if !client.has_session() {
        return Err(Error::AuthRequired);
    }

    let vote = NewVote {
        solution_id,
        user_id,
        value: if upvote { 1 } else { -1 },
    };
    Ok(client.cast_vote(&vote).await?)
}

/// Loose reverse-DNS shape check: at least two dot-separated segments,
/// each starting with a letter. Enough to catch typos and pasted URLs;
/// the backend has the authoritative constraint.
fn is_plausible_package_id(s: &str) -> bool {
    let segments: Vec<&str> = s.split('.').collect();
    if segments.len() < 2 {
        return false;
    }
    segments.iter().all(|seg| {
        !seg.is_empty()
            && seg.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
            && seg
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> AlternativeDraft {
        AlternativeDraft {
            target_package_id: "com.whatsapp".into(),
            solution_package_id: "org.thoughtcrime.securesms".into(),
            solution_name: "Signal".into(),
            description: "Private messenger with end-to-end encryption".into(),
            repo_url: "https://github.com/signalapp/Signal-Android".into(),
        }
    }

    #[test]
    fn valid_draft_passes() {
        assert!(draft().validate().is_ok());
    }

    #[test]
    fn package_id_shape_is_checked() {
        assert!(is_plausible_package_id("com.whatsapp"));
        assert!(is_plausible_package_id("org.fdroid.fdroid"));
        assert!(is_plausible_package_id("im.vector.app"));

        assert!(!is_plausible_package_id("whatsapp"));
        assert!(!is_plausible_package_id("com..whatsapp"));
        assert!(!is_plausible_package_id("https://example.com"));
        assert!(!is_plausible_package_id("1com.app"));
        assert!(!is_plausible_package_id(""));
    }

    #[test]
    fn bad_target_id_is_a_field_error() {
        let mut d = draft();
        d.target_package_id = "not a package".into();

        match d.validate() {
            Err(Error::Validation { field, .. }) => assert_eq!(field, "target_package_id"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn self_alternative_is_rejected() {
        let mut d = draft();
        d.solution_package_id = d.target_package_id.clone();
        assert!(matches!(
            d.validate(),
            Err(Error::Validation { field, .. }) if field == "solution_package_id"
        ));
    }

    #[test]
    fn plain_http_repo_url_is_rejected() {
        let mut d = draft();
        d.repo_url = "http://github.com/signalapp/Signal-Android".into();
        assert!(matches!(
            d.validate(),
            Err(Error::Validation { field, .. }) if field == "repo_url"
        ));
    }

    #[test]
    fn empty_feedback_is_rejected() {
        let f = FeedbackDraft {
            message: "   ".into(),
            package_id: None,
        };
        assert!(matches!(
            f.validate(),
            Err(Error::Validation { field, .. }) if field == "message"
        ));
    }

    #[tokio::test]
    async fn submit_without_session_is_auth_required_before_any_network() {
        // Client with an unroutable URL: if we ever hit the network the
        // test would fail on a network error instead of AuthRequired
        let client = CatalogClient::new("https://invalid.localdomain", "anon");

        let result = draft().submit(&client).await;
        assert!(matches!(result, Err(Error::AuthRequired)));

        let vote = cast_vote(&client, Uuid::new_v4(), Uuid::new_v4(), true).await;
        assert!(matches!(vote, Err(Error::AuthRequired)));
    }

    #[tokio::test]
    async fn validation_runs_before_auth_check() {
        let client = CatalogClient::new("https://invalid.localdomain", "anon");
        let mut d = draft();
        d.solution_name = String::new();

        // Invalid draft + no session: validation message wins
        assert!(matches!(
            d.submit(&client).await,
            Err(Error::Validation { field, .. }) if field == "solution_name"
        ));
    }
}
