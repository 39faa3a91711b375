//! Service layer: business logic orchestration.
//!
//! [`LotteryService`] coordinates activity and participation operations
//! and emits events through the [`super::domain::EventBus`];
//! [`VerificationService`] gates the email-identified paths.

pub mod lottery_service;
pub mod verification;

pub use lottery_service::{validate_email, CommentCheck, LotteryService, ParticipationStatus};
pub use verification::{SendOutcome, VerificationService};
