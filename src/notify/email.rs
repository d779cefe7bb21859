// src/notify/email.rs

//! SMTP email channel.

use async_trait::async_trait;
use lettre::message::{Mailbox, Message, header};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};

use super::{Channel, render_item};
use crate::error::{AppError, Result};
use crate::models::{EmailConfig, SeenItem};

const CHANNEL: &str = "email";
const IMPLICIT_TLS_PORT: u16 = 465;

pub struct EmailChannel {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl EmailChannel {
    /// Build the transport: implicit TLS on 465, STARTTLS on any other port.
    pub fn from_config(config: &EmailConfig) -> Result<Self> {
        let credentials = Credentials::new(config.username.clone(), config.password.clone());
        let builder = if config.smtp_port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_server)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)
        }
        .map_err(|e| AppError::notify(CHANNEL, e))?;
        let mailer = builder
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        let from = config.from.as_deref().unwrap_or(&config.username);
        let from: Mailbox = from
            .parse()
            .map_err(|e| AppError::config(format!("Invalid email sender '{from}': {e}")))?;
        let to = config
            .to
            .iter()
            .map(|addr| {
                addr.parse::<Mailbox>()
                    .map_err(|e| AppError::config(format!("Invalid email recipient '{addr}': {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { mailer, from, to })
    }

    fn compose(&self, items: &[SeenItem]) -> Result<Message> {
        let subject = format!("{} new updates detected", items.len());
        let body = items
            .iter()
            .map(render_item)
            .collect::<Vec<_>>()
            .join("\n");

        let mut builder = Message::builder().from(self.from.clone()).subject(subject);
        for recipient in &self.to {
            builder = builder.to(recipient.clone());
        }
        builder
            .header(header::ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| AppError::notify(CHANNEL, e))
    }
}

#[async_trait]
impl Channel for EmailChannel {
    fn name(&self) -> &str {
        CHANNEL
    }

    async fn send_items(&self, items: &[SeenItem]) -> Result<()> {
        let message = self.compose(items)?;
        self.mailer
            .send(message)
            .await
            .map_err(|e| AppError::notify(CHANNEL, e))?;
        log::info!("Email notification sent for {} items", items.len());
        Ok(())
    }
}
