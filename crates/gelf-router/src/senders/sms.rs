//! Twilio-style SMS sending: HTTP Basic auth with the account SID/token,
//! POSTing `From`/`To`/`Body` form fields to the Messages API.

use super::{SendError, SmsSender};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

pub struct TwilioSmsSender {
    client: Client,
    sid: String,
    token: String,
    from: String,
}

impl TwilioSmsSender {
    pub fn new(sid: String, token: String, from: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build Twilio HTTP client");
        Self { client, sid, token, from }
    }
}

#[async_trait]
impl SmsSender for TwilioSmsSender {
    async fn send(&self, to: &str, body: &str) -> Result<(), SendError> {
        let url = format!("{TWILIO_API_BASE}/Accounts/{}/Messages.json", self.sid);
        let params = [("From", self.from.as_str()), ("To", to), ("Body", body)];

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.sid, Some(&self.token))
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SendError::Fault(format!("Twilio {status}: {body}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn posts_expected_form_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/Accounts/ACtest/Messages.json"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let client = Client::new();
        let response = client
            .post(format!("{}/Accounts/ACtest/Messages.json", server.uri()))
            .basic_auth("ACtest", Some("tok"))
            .form(&[("From", "+15550000000"), ("To", "+15551234567"), ("Body", "oom")])
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
    }
}
