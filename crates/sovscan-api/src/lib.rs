// Typed client for the hosted app catalog
pub mod catalog;
pub mod retry;

// Re-export common types
pub use catalog::{
    CatalogClient, CatalogError, FeedbackRow, NewFeedback, NewSubmission, NewVote, SolutionRow,
    SubmissionRow, TargetRow, VoteRow,
};
pub use retry::{Retryable, RetryConfig};
