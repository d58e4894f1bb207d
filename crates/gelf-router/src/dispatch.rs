//! Single-consumer dispatch loop: one task owns the receiving end of the
//! fan-in channel, hands every message to the store queue (if
//! configured), then evaluates every rule against it and fires matching
//! alerters.

use crate::rules::{Alerter, Rule};
use crate::senders::SenderProvider;
use gelf_common::Message;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// Floor for a single alerter call; configurable per spec's back-pressure
/// note but never unbounded.
pub const DEFAULT_ALERT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Dispatcher {
    rules: Vec<Rule>,
    senders: Arc<SenderProvider>,
    store_tx: Option<mpsc::Sender<Message>>,
    alert_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        rules: Vec<Rule>,
        senders: Arc<SenderProvider>,
        store_tx: Option<mpsc::Sender<Message>>,
        alert_timeout: Duration,
    ) -> Self {
        Self { rules, senders, store_tx, alert_timeout }
    }

    /// Run the dispatch loop until `in_rx` closes (cooperative shutdown:
    /// dropping every sender causes `recv()` to return `None`).
    pub async fn run(self, mut in_rx: mpsc::Receiver<Message>) {
        while let Some(message) = in_rx.recv().await {
            if let Some(store_tx) = &self.store_tx {
                if store_tx.send(message.clone()).await.is_err() {
                    warn!("store queue closed, dropping store hand-off");
                }
            }

            if message.level() <= gelf_common::Level::Error {
                warn!(
                    host = %message.host,
                    facility = %message.facility,
                    short = %message.short,
                    "received error-or-worse message"
                );
            }

            for rule in &self.rules {
                if rule.matches(&message) {
                    debug!(rule = %rule.name, "rule matched");
                    self.fire(rule, &message).await;
                }
            }
        }
    }

    async fn fire(&self, rule: &Rule, message: &Message) {
        for alerter in &rule.then_alerters {
            let result = tokio::time::timeout(self.alert_timeout, self.send_one(alerter, message)).await;
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(rule = %rule.name, error = %e, "alerter send failed"),
                Err(_) => error!(rule = %rule.name, timeout_secs = self.alert_timeout.as_secs(), "alerter call timed out"),
            }
        }
    }

    async fn send_one(&self, alerter: &Alerter, message: &Message) -> Result<(), crate::senders::SendError> {
        match alerter {
            Alerter::Email { to } => {
                self.senders.send_email(to, message).await?;
                Ok(())
            }
            Alerter::Sms { to } => {
                for addr in to {
                    self.senders.send_sms(addr, message).await?;
                }
                Ok(())
            }
            Alerter::IssueTracker { destination } => {
                self.senders.send_issue(destination, message).await?;
                Ok(())
            }
        }
    }
}
