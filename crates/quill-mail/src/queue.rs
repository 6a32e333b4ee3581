use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::{Mailer, OutgoingMail};

/// Handle for submitting mail to the background worker. Cheap to clone.
#[derive(Clone)]
pub struct MailQueue {
    tx: mpsc::Sender<OutgoingMail>,
}

impl MailQueue {
    /// Spawn the worker on the current runtime. The worker exits once every
    /// `MailQueue` handle has been dropped and the backlog is drained.
    pub fn start(mailer: Arc<dyn Mailer>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(run_worker(mailer, rx));
        (Self { tx }, handle)
    }

    /// Submit without waiting. Returns false when the message was dropped
    /// because the queue is full or the worker is gone.
    pub fn enqueue(&self, mail: OutgoingMail) -> bool {
        match self.tx.try_send(mail) {
            Ok(()) => true,
            Err(TrySendError::Full(mail)) => {
                warn!(to = %mail.to, "mail queue full, dropping message");
                false
            }
            Err(TrySendError::Closed(mail)) => {
                error!(to = %mail.to, "mail worker stopped, dropping message");
                false
            }
        }
    }
}

async fn run_worker(mailer: Arc<dyn Mailer>, mut rx: mpsc::Receiver<OutgoingMail>) {
    while let Some(mail) = rx.recv().await {
        let to = mail.to.clone();
        let mailer = mailer.clone();

        match tokio::task::spawn_blocking(move || mailer.send(&mail)).await {
            Ok(Ok(())) => info!(to = %to, "mail delivered"),
            Ok(Err(e)) => error!(to = %to, "unable to send mail: {:#}", e),
            Err(e) => error!(to = %to, "mail delivery task panicked: {}", e),
        }
    }

    info!("Mail queue closed, worker exiting");
}
