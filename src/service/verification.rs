//! Email verification gate for email-identified participation paths.
//!
//! Codes are held in memory, keyed by lowercased email plus activity
//! name. A code is consumed on successful verification and on expiry;
//! a mismatched code leaves the entry in place for another attempt.
//! Delivering the code to the mailbox is outside the gateway; the code
//! store itself is the contract.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tokio::sync::RwLock;

use crate::config::VerificationSettings;
use crate::error::LotteryError;

/// Outcome of a code send request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Verification is disabled; nothing was issued.
    Disabled,
    /// A code was issued and stored.
    Sent {
        /// The issued code, for the delivery hook. Never exposed in
        /// HTTP responses.
        code: String,
        /// Minutes until the code expires.
        expires_in_minutes: i64,
    },
}

#[derive(Debug, Clone)]
struct CodeEntry {
    code: String,
    expires_at: DateTime<Utc>,
}

/// In-memory verification code issuer and checker.
#[derive(Debug)]
pub struct VerificationService {
    settings: VerificationSettings,
    codes: RwLock<HashMap<String, CodeEntry>>,
    last_sent: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl VerificationService {
    /// Creates a new service with the given settings.
    #[must_use]
    pub fn new(settings: VerificationSettings) -> Self {
        Self {
            settings,
            codes: RwLock::new(HashMap::new()),
            last_sent: RwLock::new(HashMap::new()),
        }
    }

    /// Whether email-identified paths require a verification code.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    /// Issues a six-digit code for `(email, activity)` and stores it.
    ///
    /// # Errors
    ///
    /// Returns [`LotteryError::RateLimited`] when the resend interval for
    /// this pair has not elapsed yet.
    pub async fn send_code(
        &self,
        email: &str,
        activity: &str,
    ) -> Result<SendOutcome, LotteryError> {
        if !self.settings.enabled {
            return Ok(SendOutcome::Disabled);
        }

        let key = code_key(email, activity);
        let now = Utc::now();

        {
            let last_sent = self.last_sent.read().await;
            if let Some(last) = last_sent.get(&key) {
                let elapsed = (now - *last).num_seconds();
                if elapsed < self.settings.resend_interval_secs {
                    let remaining = self.settings.resend_interval_secs.saturating_sub(elapsed);
                    return Err(LotteryError::RateLimited {
                        retry_after_secs: u64::try_from(remaining).unwrap_or(0),
                    });
                }
            }
        }

        let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000));
        let expires_at = now + Duration::minutes(self.settings.code_ttl_minutes);

        self.codes.write().await.insert(
            key.clone(),
            CodeEntry {
                code: code.clone(),
                expires_at,
            },
        );
        self.last_sent.write().await.insert(key, now);

        tracing::debug!(email, activity, "verification code issued");
        Ok(SendOutcome::Sent {
            code,
            expires_in_minutes: self.settings.code_ttl_minutes,
        })
    }

    /// Checks `code` against the stored entry for `(email, activity)`.
    ///
    /// A match consumes the entry. An expired entry is removed and counts
    /// as a failure. A mismatch leaves the entry in place.
    pub async fn verify_code(&self, email: &str, activity: &str, code: &str) -> bool {
        if code.trim().is_empty() {
            return false;
        }

        let key = code_key(email, activity);
        let mut codes = self.codes.write().await;
        let Some(entry) = codes.get(&key) else {
            return false;
        };

        if Utc::now() > entry.expires_at {
            codes.remove(&key);
            return false;
        }
        if entry.code == code {
            codes.remove(&key);
            return true;
        }
        false
    }

    /// Admission gate used by email-identified participation handlers.
    ///
    /// A no-op when verification is disabled.
    ///
    /// # Errors
    ///
    /// Returns [`LotteryError::PrecheckFailed`] when the code is missing,
    /// wrong, or expired.
    pub async fn require_verified(
        &self,
        email: &str,
        activity: &str,
        code: Option<&str>,
    ) -> Result<(), LotteryError> {
        if !self.settings.enabled {
            return Ok(());
        }
        let code = code.map(str::trim).filter(|c| !c.is_empty()).ok_or_else(|| {
            LotteryError::PrecheckFailed("verification code required".to_string())
        })?;
        if !self.verify_code(email, activity, code).await {
            return Err(LotteryError::PrecheckFailed(
                "verification code invalid or expired".to_string(),
            ));
        }
        Ok(())
    }
}

/// Store key: lowercased email scoped to the activity.
fn code_key(email: &str, activity: &str) -> String {
    format!("{}:{activity}", email.to_lowercase())
}
