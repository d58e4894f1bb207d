//! End-to-end dispatch scenarios: compiled rules driving real
//! `SenderProvider` rate limiting through the dispatch loop, using an
//! in-process fake sender instead of a live network client.

use async_trait::async_trait;
use gelf_common::Message;
use gelf_router::dispatch::{Dispatcher, DEFAULT_ALERT_TIMEOUT};
use gelf_router::ratelimit::RateLimiter;
use gelf_router::rules;
use gelf_router::senders::{EmailSender, SendError, SenderProvider, SmsSender};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

struct CountingSmsSender {
    count: Arc<AtomicUsize>,
}

/// Captures every call's `(to, subject)` pair for scenario-1-style
/// assertions on the exact email the rule engine sent.
struct CapturingEmailSender {
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

#[async_trait]
impl EmailSender for CapturingEmailSender {
    async fn send(&self, to: &[String], subject: &str, _body: &str) -> Result<(), SendError> {
        self.calls.lock().unwrap().push((to.join(","), subject.to_string()));
        Ok(())
    }
}

#[async_trait]
impl SmsSender for CountingSmsSender {
    async fn send(&self, _to: &str, _body: &str) -> Result<(), SendError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn host_and_level_doc() -> toml::Value {
    toml::from_str(
        r#"
        [filters.is_db]
        host = "^db-"

        [filters.at_least_error]
        level_lt = 4

        [destinations.oncall_sms]
        sms = ["+15551234567"]

        [rules.db_critical]
        if = ["is_db", "at_least_error"]
        then = ["oncall_sms"]
        "#,
    )
    .unwrap()
}

#[tokio::test]
async fn matching_message_triggers_sms_alerter() {
    let rules = rules::build(&host_and_level_doc()).unwrap();
    let count = Arc::new(AtomicUsize::new(0));
    let sms = Arc::new(CountingSmsSender { count: Arc::clone(&count) });

    let senders = Arc::new(SenderProvider::new(
        Some(sms),
        None,
        None,
        Arc::new(RateLimiter::new()),
        Duration::from_secs(3600),
        Duration::from_secs(3600),
        Duration::from_secs(3600),
    ));

    let (tx, rx) = mpsc::channel(8);
    let dispatcher = Dispatcher::new(rules, senders, None, DEFAULT_ALERT_TIMEOUT);

    tx.send(Message {
        host: "db-primary".to_string(),
        facility: "proba".to_string(),
        level: gelf_common::Level::Error as i64,
        ..Default::default()
    })
    .await
    .unwrap();
    drop(tx);

    dispatcher.run(rx).await;

    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn non_matching_host_does_not_trigger_alert() {
    let rules = rules::build(&host_and_level_doc()).unwrap();
    let count = Arc::new(AtomicUsize::new(0));
    let sms = Arc::new(CountingSmsSender { count: Arc::clone(&count) });

    let senders = Arc::new(SenderProvider::new(
        Some(sms),
        None,
        None,
        Arc::new(RateLimiter::new()),
        Duration::from_secs(3600),
        Duration::from_secs(3600),
        Duration::from_secs(3600),
    ));

    let (tx, rx) = mpsc::channel(8);
    let dispatcher = Dispatcher::new(rules, senders, None, DEFAULT_ALERT_TIMEOUT);

    tx.send(Message {
        host: "web-01".to_string(),
        facility: "proba".to_string(),
        level: gelf_common::Level::Error as i64,
        ..Default::default()
    })
    .await
    .unwrap();
    drop(tx);

    dispatcher.run(rx).await;

    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn rate_limiter_suppresses_repeat_alert_within_window() {
    let rules = rules::build(&host_and_level_doc()).unwrap();
    let count = Arc::new(AtomicUsize::new(0));
    let sms = Arc::new(CountingSmsSender { count: Arc::clone(&count) });

    let senders = Arc::new(SenderProvider::new(
        Some(sms),
        None,
        None,
        Arc::new(RateLimiter::new()),
        Duration::from_secs(3600),
        Duration::from_secs(3600),
        Duration::from_secs(3600),
    ));

    let (tx, rx) = mpsc::channel(8);
    let dispatcher = Dispatcher::new(rules, senders, None, DEFAULT_ALERT_TIMEOUT);

    let message = Message {
        host: "db-primary".to_string(),
        facility: "proba".to_string(),
        level: gelf_common::Level::Error as i64,
        ..Default::default()
    };

    tx.send(message.clone()).await.unwrap();
    tx.send(message).await.unwrap();
    drop(tx);

    dispatcher.run(rx).await;

    assert_eq!(count.load(Ordering::SeqCst), 1);
}

/// A regex-host filter, an email destination, one matching message.
/// Expects exactly one email send with to=["ops@x"],
/// subject="ERROR proba@db-01: oom".
#[tokio::test]
async fn regex_host_filter_triggers_email_with_expected_subject() {
    let doc: toml::Value = toml::from_str(
        r#"
        [filters.is_db]
        host = "^db-.*"

        [destinations.ops]
        email = ["ops@x"]

        [rules.db_alert]
        if = ["is_db"]
        then = ["ops"]
        "#,
    )
    .unwrap();
    let rules = rules::build(&doc).unwrap();

    let calls = Arc::new(Mutex::new(Vec::new()));
    let email = Arc::new(CapturingEmailSender { calls: Arc::clone(&calls) });

    let senders = Arc::new(SenderProvider::new(
        None,
        Some(email),
        None,
        Arc::new(RateLimiter::new()),
        Duration::from_secs(3600),
        Duration::from_secs(3600),
        Duration::from_secs(3600),
    ));

    let (tx, rx) = mpsc::channel(8);
    let dispatcher = Dispatcher::new(rules, senders, None, DEFAULT_ALERT_TIMEOUT);

    tx.send(Message {
        host: "db-01".to_string(),
        facility: "proba".to_string(),
        short: "oom".to_string(),
        level: gelf_common::Level::Error as i64,
        ..Default::default()
    })
    .await
    .unwrap();
    drop(tx);

    dispatcher.run(rx).await;

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0], ("ops@x".to_string(), "ERROR proba@db-01: oom".to_string()));
}
