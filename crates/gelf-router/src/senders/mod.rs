//! Sender interfaces and the registry that pairs them with the rate
//! limiter.
//!
//! `SmsSender`/`EmailSender`/`IssueTrackerSender` are `async_trait` traits.
//! `SenderProvider` owns one concrete implementation of each and the
//! shared `RateLimiter`, breaking the cycle an `Alerter` would otherwise
//! have with its own rate-limited `Sender`: alerters hold only a
//! destination address, and look the sender up through the provider at
//! dispatch time.

mod email;
mod issue_tracker;
mod sms;

pub use email::SmtpEmailSender;
pub use issue_tracker::XmlRpcIssueTrackerSender;
pub use sms::TwilioSmsSender;

use crate::ratelimit::RateLimiter;
use async_trait::async_trait;
use gelf_common::Message;
use std::sync::Arc;
use std::time::Duration;

/// Raised by a concrete sender when a delivery attempt fails.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("smtp error: {0}")]
    Smtp(String),

    #[error("remote responded with a fault: {0}")]
    Fault(String),
}

#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, to: &str, body: &str) -> Result<(), SendError>;
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &[String], subject: &str, body: &str) -> Result<(), SendError>;
}

#[async_trait]
pub trait IssueTrackerSender: Send + Sync {
    /// Returns the id the tracker assigned to the newly filed issue.
    async fn send(&self, destination: &str, subject: &str, body: &str) -> Result<String, SendError>;
}

/// Owns the concrete senders and the single shared rate limiter they are
/// gated by. One `SenderProvider` is constructed at startup from the
/// transports configuration and shared (via `Arc`) with the dispatch loop.
pub struct SenderProvider {
    sms: Option<Arc<dyn SmsSender>>,
    email: Option<Arc<dyn EmailSender>>,
    issue_tracker: Option<Arc<dyn IssueTrackerSender>>,
    rate_limiter: Arc<RateLimiter>,
    sms_rate: Duration,
    email_rate: Duration,
    issue_tracker_rate: Duration,
}

impl SenderProvider {
    pub fn new(
        sms: Option<Arc<dyn SmsSender>>,
        email: Option<Arc<dyn EmailSender>>,
        issue_tracker: Option<Arc<dyn IssueTrackerSender>>,
        rate_limiter: Arc<RateLimiter>,
        sms_rate: Duration,
        email_rate: Duration,
        issue_tracker_rate: Duration,
    ) -> Self {
        Self {
            sms,
            email,
            issue_tracker,
            rate_limiter,
            sms_rate,
            email_rate,
            issue_tracker_rate,
        }
    }

    /// Send an SMS to `to`, gated by the rate limiter keyed on
    /// `"{to}#{message.short_string()}"` — one reservation per recipient
    /// *and* message fingerprint, so a different message to the same
    /// recipient isn't suppressed by an unrelated alert's cooldown.
    /// Returns `Ok(false)` (not an error) when the send was suppressed by
    /// the rate limiter.
    pub async fn send_sms(&self, to: &str, message: &Message) -> Result<bool, SendError> {
        let Some(sender) = &self.sms else {
            return Ok(false);
        };
        let key = format!("{to}#{}", message.short_string());
        if !self.rate_limiter.try_acquire(key.as_bytes(), self.sms_rate) {
            return Ok(false);
        }
        sender.send(to, &message.short_string()).await?;
        Ok(true)
    }

    /// Send one email to every address in `to`, gated by a single
    /// reservation keyed on `"{to.join(";")}#{message.short_string()}"` —
    /// the whole recipient list shares one rate-limit window, not one per
    /// address.
    pub async fn send_email(&self, to: &[String], message: &Message) -> Result<bool, SendError> {
        let Some(sender) = &self.email else {
            return Ok(false);
        };
        let key = format!("{}#{}", to.join(";"), message.short_string());
        if !self.rate_limiter.try_acquire(key.as_bytes(), self.email_rate) {
            return Ok(false);
        }
        sender
            .send(to, &message.short_string(), &message.long_string())
            .await?;
        Ok(true)
    }

    /// File an issue at `destination`, gated by the rate limiter keyed on
    /// `"{destination}#{message.short_string()}"`. Returns the tracker's
    /// issue id on success, `None` when the rate limiter suppressed it.
    pub async fn send_issue(&self, destination: &str, message: &Message) -> Result<Option<String>, SendError> {
        let Some(sender) = &self.issue_tracker else {
            return Ok(None);
        };
        let key = format!("{destination}#{}", message.short_string());
        if !self.rate_limiter.try_acquire(key.as_bytes(), self.issue_tracker_rate) {
            return Ok(None);
        }
        let id = sender
            .send(destination, &message.short_string(), &message.long_string())
            .await?;
        Ok(Some(id))
    }
}
