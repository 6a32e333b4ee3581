//! Outbound mail: delivery backends and the background queue that keeps
//! delivery off the request path.
//!
//! Handlers call [`MailQueue::enqueue`], which never waits. A single worker
//! task drains the queue and hands each message to a [`Mailer`] on the
//! blocking pool. Delivery failures are logged and go nowhere else.

pub mod queue;
pub mod smtp;

use std::sync::Mutex;

use anyhow::Result;
use tracing::info;

pub use queue::MailQueue;
pub use smtp::{SmtpMailer, SmtpSettings};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

impl OutgoingMail {
    /// The signup email carrying the plaintext verification code.
    pub fn verification(to: &str, code: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Verification code for Sign Up".to_string(),
            html_body: format!(
                "<!DOCTYPE html>\
                 <html><body>\
                 <p>Use the code below to finish creating your account.</p>\
                 <h2 style=\"letter-spacing:4px\">{code}</h2>\
                 <p>If you did not sign up, you can ignore this email.</p>\
                 </body></html>"
            ),
        }
    }
}

/// Delivery backend. Called from the blocking pool, so implementations may block.
pub trait Mailer: Send + Sync {
    fn send(&self, mail: &OutgoingMail) -> Result<()>;
}

/// Local dev mailer that logs the message instead of sending it.
#[derive(Clone, Debug, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, mail: &OutgoingMail) -> Result<()> {
        info!(
            to = %mail.to,
            subject = %mail.subject,
            body = %mail.html_body,
            "mail delivery stub"
        );
        Ok(())
    }
}

/// Keeps every delivered message in memory.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<OutgoingMail>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Mailer for MemoryMailer {
    fn send(&self, mail: &OutgoingMail) -> Result<()> {
        self.sent
            .lock()
            .map_err(|e| anyhow::anyhow!("mailbox lock poisoned: {}", e))?
            .push(mail.clone());
        Ok(())
    }
}
