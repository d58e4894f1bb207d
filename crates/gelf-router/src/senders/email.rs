//! SMTP email sending: `hostport` and `auth` ("user/password", empty
//! disables auth) configuration, built on `lettre`.

use super::{EmailSender, SendError};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message as LettreMessage, Tokio1Executor};

pub struct SmtpEmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpEmailSender {
    /// `hostport` is `host:port` (or `:port` for localhost). `auth` is
    /// `user/password`; an empty string disables SMTP authentication.
    pub fn new(from: String, hostport: &str, auth: &str) -> Result<Self, SendError> {
        let host = hostport.split(':').next().filter(|h| !h.is_empty()).unwrap_or("localhost");

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host);

        if let Some(port) = hostport.rsplit(':').next().and_then(|p| p.parse::<u16>().ok()) {
            builder = builder.port(port);
        }

        if !auth.is_empty() {
            let (username, password) = auth
                .split_once('/')
                .ok_or_else(|| SendError::Smtp(format!("malformed smtp auth string: {auth}")))?;
            builder = builder.credentials(Credentials::new(username.to_string(), password.to_string()));
        }

        Ok(Self { transport: builder.build(), from })
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    /// Sends one message with every address in `to` on the `To` header —
    /// a single SMTP submission per alerter fire, not one per recipient.
    async fn send(&self, to: &[String], subject: &str, body: &str) -> Result<(), SendError> {
        if to.is_empty() {
            return Err(SendError::Smtp("email alerter has no recipients".to_string()));
        }

        let mut builder = LettreMessage::builder()
            .from(self.from.parse().map_err(|e| SendError::Smtp(format!("invalid from address: {e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);

        for addr in to {
            builder = builder.to(addr.parse().map_err(|e| SendError::Smtp(format!("invalid to address {addr}: {e}")))?);
        }

        let email = builder.body(body.to_string()).map_err(|e| SendError::Smtp(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| SendError::Smtp(e.to_string()))?;
        Ok(())
    }
}
