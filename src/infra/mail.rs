use anyhow::{anyhow, Result};
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use tracing::warn;

use crate::config::AppConfig;

/// SMTP mailer. Without an SMTP_HOST it runs in no-op mode and only logs,
/// which keeps local development and tests free of mail infrastructure.
#[derive(Clone)]
pub struct Mailer {
    transport: Option<Arc<AsyncSmtpTransport<Tokio1Executor>>>,
    from: Mailbox,
}

impl Mailer {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let from = config
            .smtp_from
            .parse::<Mailbox>()
            .map_err(|err| anyhow!("invalid SMTP_FROM address: {}", err))?;

        let transport = match &config.smtp_host {
            None => {
                warn!("SMTP host not configured; mailer runs in no-op mode");
                None
            }
            Some(host) => {
                let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                    .map_err(|err| anyhow!("failed to configure SMTP transport: {}", err))?
                    .port(config.smtp_port);

                if let (Some(username), Some(password)) =
                    (&config.smtp_username, &config.smtp_password)
                {
                    builder = builder
                        .credentials(Credentials::new(username.clone(), password.clone()));
                }

                Some(Arc::new(builder.build()))
            }
        };

        Ok(Self { transport, from })
    }

    pub async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        let Some(transport) = &self.transport else {
            warn!(recipient, subject, "mailer disabled; dropping message");
            return Ok(());
        };

        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient
                .parse::<Mailbox>()
                .map_err(|err| anyhow!("invalid recipient address: {}", err))?)
            .subject(subject)
            .body(body.to_string())?;

        transport.send(message).await?;
        Ok(())
    }
}
