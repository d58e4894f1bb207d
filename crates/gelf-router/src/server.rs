//! Explicit server/state struct wiring listeners, the dispatch loop, the
//! rate limiter's sweeper and the store forwarder together — no process
//! globals. `bin/gelf-relay` constructs one `Server` from the loaded
//! configuration and drives its lifetime.

use crate::dispatch::{Dispatcher, DEFAULT_ALERT_TIMEOUT};
use crate::error::RouterError;
use crate::listeners;
use crate::ratelimit::RateLimiter;
use crate::rules::{self, Rule};
use crate::senders::{EmailSender, IssueTrackerSender, SenderProvider, SmsSender, SmtpEmailSender, TwilioSmsSender, XmlRpcIssueTrackerSender};
use crate::store::StoreForwarder;
use gelf_common::Message;
use gelf_config::TransportsConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

const FAN_IN_CAPACITY: usize = 1024;
const STORE_QUEUE_CAPACITY: usize = 1024;
const RATE_LIMITER_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

pub struct Server {
    fan_in_tx: mpsc::Sender<Message>,
    listener_tasks: Vec<JoinHandle<std::io::Result<()>>>,
    dispatch_task: JoinHandle<()>,
    store_task: Option<JoinHandle<()>>,
    sweep_task: JoinHandle<()>,
}

impl Server {
    /// Build every component from the transports config and the compiled
    /// filters/destinations/rules, then spawn each listener, the dispatch
    /// loop, the optional store-forwarder worker and the rate limiter's
    /// hourly sweep as independent tasks.
    pub fn build(transports: &TransportsConfig, filters_doc: &toml::Value) -> Result<Self, RouterError> {
        let rules: Vec<Rule> = rules::build(filters_doc)?;
        info!(rule_count = rules.len(), "compiled filters/destinations/rules");

        let rate_limiter = Arc::new(RateLimiter::new());

        let sms: Option<Arc<dyn SmsSender>> = if !transports.twilio.sid.is_empty() {
            Some(Arc::new(TwilioSmsSender::new(
                transports.twilio.sid.clone(),
                transports.twilio.token.clone(),
                transports.from.clone(),
            )))
        } else {
            None
        };

        let email: Option<Arc<dyn EmailSender>> = Some(Arc::new(
            SmtpEmailSender::new(transports.from.clone(), &transports.smtp.hostport, &transports.smtp.auth)
                .map_err(|e| RouterError::Sender(e.to_string()))?,
        ));

        let issue_tracker: Option<Arc<dyn IssueTrackerSender>> =
            Some(Arc::new(XmlRpcIssueTrackerSender::new(transports.mantis.xmlrpc.clone())));

        let senders = Arc::new(SenderProvider::new(
            sms,
            email,
            issue_tracker,
            Arc::clone(&rate_limiter),
            Duration::from_secs(transports.twilio.rate),
            Duration::from_secs(transports.smtp.rate),
            Duration::from_secs(transports.mantis.rate),
        ));

        let (fan_in_tx, fan_in_rx) = mpsc::channel(FAN_IN_CAPACITY);

        let store_tx = if !transports.elasticsearch.url.is_empty() {
            let forwarder = StoreForwarder::new(&transports.elasticsearch.url, transports.elasticsearch.ttl)
                .map_err(|e| RouterError::Store(e.to_string()))?;
            let (tx, mut rx) = mpsc::channel::<Message>(STORE_QUEUE_CAPACITY);
            let task = tokio::spawn(async move {
                while let Some(message) = rx.recv().await {
                    if let Err(e) = forwarder.store(&message).await {
                        tracing::warn!(error = %e, "failed to store message in indexer");
                    }
                }
            });
            (Some(tx), Some(task))
        } else {
            (None, None)
        };
        let (store_tx, store_task) = store_tx;

        let mut listener_tasks = Vec::new();
        if transports.gelf.udp != 0 {
            let port = transports.gelf.udp;
            let tx = fan_in_tx.clone();
            listener_tasks.push(tokio::spawn(async move { listeners::serve_udp(port, tx).await }));
        }
        if transports.gelf.tcp != 0 {
            let port = transports.gelf.tcp;
            let tx = fan_in_tx.clone();
            listener_tasks.push(tokio::spawn(async move { listeners::serve_tcp(port, tx).await }));
        }
        if transports.gelf.http != 0 {
            let port = transports.gelf.http;
            let tx = fan_in_tx.clone();
            listener_tasks.push(tokio::spawn(async move { listeners::serve_http(port, tx).await }));
        }

        let dispatcher = Dispatcher::new(rules, Arc::clone(&senders), store_tx.clone(), DEFAULT_ALERT_TIMEOUT);
        let dispatch_task = tokio::spawn(dispatcher.run(fan_in_rx));

        let sweep_task = {
            let rate_limiter = Arc::clone(&rate_limiter);
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(RATE_LIMITER_SWEEP_INTERVAL);
                loop {
                    interval.tick().await;
                    let evicted = rate_limiter.sweep();
                    debug!(evicted, "swept expired rate limiter reservations");
                }
            })
        };

        Ok(Self { fan_in_tx, listener_tasks, dispatch_task, store_task, sweep_task })
    }

    /// A clone of the fan-in sender, for tests or alternate ingestion
    /// paths that want to hand messages directly to the dispatch loop.
    pub fn fan_in(&self) -> mpsc::Sender<Message> {
        self.fan_in_tx.clone()
    }

    /// Cooperative shutdown: drop every fan-in sender so the dispatch
    /// loop's `recv()` observes channel closure and drains to exit, abort
    /// the listener/sweeper tasks (they have no natural end-of-input), and
    /// wait for the dispatch (and store) tasks to finish draining.
    pub async fn shutdown(self) {
        drop(self.fan_in_tx);
        for task in self.listener_tasks {
            task.abort();
        }
        self.sweep_task.abort();
        let _ = self.dispatch_task.await;
        if let Some(store_task) = self.store_task {
            let _ = store_task.await;
        }
    }
}
