use anyhow::{Context, Result};
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::{Mailer, OutgoingMail};

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub sender: String,
}

/// STARTTLS SMTP relay with username/password auth.
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self> {
        let from: Mailbox = settings
            .sender
            .parse()
            .with_context(|| format!("invalid sender address '{}'", settings.sender))?;

        let transport = SmtpTransport::starttls_relay(&settings.host)
            .with_context(|| format!("invalid smtp relay '{}'", settings.host))?
            .port(settings.port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .build();

        Ok(Self { transport, from })
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, mail: &OutgoingMail) -> Result<()> {
        let to: Mailbox = mail
            .to
            .parse()
            .with_context(|| format!("invalid recipient '{}'", mail.to))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(mail.html_body.clone())?;

        self.transport.send(&message)?;
        Ok(())
    }
}
