//! SMTP [`Notifier`] built on lettre.

use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use super::{CollabResult, Notification, Notifier};
use crate::{
    config::SmtpConfig,
    error::{CollaboratorError, ForemanError, PermanentKind, Result},
};

const SERVICE: &str = "email";

pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    recipients: Vec<Mailbox>,
}

impl EmailNotifier {
    /// Builds the notifier when a host, credentials and at least one
    /// recipient are configured; returns `None` otherwise.
    pub fn from_config(config: &SmtpConfig, timeout: Duration) -> Result<Option<Self>> {
        let (Some(host), Some(username), Some(password)) =
            (&config.host, &config.username, &config.password)
        else {
            log::debug!("SMTP settings incomplete, email reports disabled");
            return Ok(None);
        };
        if config.recipients.is_empty() {
            log::debug!("No report recipients configured, email reports disabled");
            return Ok(None);
        }

        let from = parse_mailbox(config.from.as_deref().unwrap_or(username))?;
        let recipients = config
            .recipients
            .iter()
            .map(|r| parse_mailbox(r))
            .collect::<Result<Vec<_>>>()?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| ForemanError::configuration(format!("Invalid SMTP host {host}: {e}")))?
            .port(config.port)
            .credentials(Credentials::new(username.clone(), password.clone()))
            .timeout(Some(timeout))
            .build();

        Ok(Some(Self {
            transport,
            from,
            recipients,
        }))
    }

    fn build_message(&self, notification: &Notification) -> CollabResult<Message> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(notification.subject.as_str())
            .header(ContentType::TEXT_PLAIN);
        for recipient in &self.recipients {
            builder = builder.to(recipient.clone());
        }
        builder.body(notification.body.clone()).map_err(|e| {
            CollaboratorError::permanent(SERVICE, PermanentKind::InvalidRequest, e.to_string())
        })
    }
}

fn parse_mailbox(raw: &str) -> Result<Mailbox> {
    raw.trim()
        .parse()
        .map_err(|e| ForemanError::configuration(format!("Invalid email address {raw}: {e}")))
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn send(&self, notification: &Notification) -> CollabResult<()> {
        let message = self.build_message(notification)?;
        self.transport.send(message).await.map_err(|e| {
            if e.is_permanent() {
                CollaboratorError::permanent(SERVICE, PermanentKind::InvalidRequest, e.to_string())
            } else {
                CollaboratorError::transient(SERVICE, e.to_string())
            }
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smtp() -> SmtpConfig {
        SmtpConfig {
            host: Some("smtp.example.com".to_string()),
            port: 587,
            username: Some("bot@example.com".to_string()),
            password: Some("secret".to_string()),
            from: None,
            recipients: vec!["ops@example.com".to_string()],
        }
    }

    #[test]
    fn test_disabled_without_recipients() {
        let mut config = smtp();
        config.recipients.clear();
        assert!(EmailNotifier::from_config(&config, Duration::from_secs(1))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_invalid_recipient_is_configuration_error() {
        let mut config = smtp();
        config.recipients = vec!["not an address".to_string()];
        assert!(matches!(
            EmailNotifier::from_config(&config, Duration::from_secs(1)),
            Err(ForemanError::Configuration { .. })
        ));
    }

    #[tokio::test]
    async fn test_message_addresses_every_recipient() {
        let mut config = smtp();
        config.recipients.push("dev@example.com".to_string());
        let notifier = EmailNotifier::from_config(&config, Duration::from_secs(1))
            .unwrap()
            .unwrap();
        let message = notifier
            .build_message(&Notification {
                subject: "Foreman Status Report - 2024-06-01".to_string(),
                body: "All good".to_string(),
            })
            .unwrap();
        assert_eq!(message.envelope().to().len(), 2);
    }
}
