use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::notifications::{EmailRenderer, Mailer, Notification};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// Delay after the `attempt`-th failure (1-based); doubles each time.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.initial_backoff.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

/// Handle used by request handlers. Enqueueing never blocks and never fails
/// the caller.
#[derive(Clone)]
pub struct Notifier {
    sender: mpsc::UnboundedSender<Notification>,
}

impl Notifier {
    pub fn notify(&self, notification: Notification) {
        if let Err(mpsc::error::SendError(dropped)) = self.sender.send(notification) {
            warn!(
                "notification worker is not running, dropping {} email",
                dropped.kind()
            );
        }
    }
}

/// Drains the notification queue and delivers each message through the
/// configured mailer, retrying with backoff.
pub struct NotificationWorker {
    receiver: mpsc::UnboundedReceiver<Notification>,
    mailer: Arc<dyn Mailer>,
    renderer: EmailRenderer,
    policy: RetryPolicy,
}

pub fn channel(
    mailer: Arc<dyn Mailer>,
    renderer: EmailRenderer,
    policy: RetryPolicy,
) -> (Notifier, NotificationWorker) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (
        Notifier { sender },
        NotificationWorker {
            receiver,
            mailer,
            renderer,
            policy,
        },
    )
}

impl NotificationWorker {
    /// Runs until every `Notifier` has been dropped.
    pub async fn start(mut self) {
        info!(
            "Starting notification worker (max attempts: {}, backoff: {:?})",
            self.policy.max_attempts, self.policy.initial_backoff
        );

        while let Some(notification) = self.receiver.recv().await {
            self.deliver(notification).await;
        }

        info!("Notification worker stopped");
    }

    async fn deliver(&self, notification: Notification) {
        let kind = notification.kind();
        if notification.recipient().is_empty() {
            debug!("skipping {} email: user has no address", kind);
            return;
        }

        let email = match self.renderer.render(&notification, Utc::now()) {
            Ok(email) => email,
            Err(e) => {
                error!("failed to render {} email: {}", kind, e);
                return;
            }
        };

        let mut attempt = 1;
        loop {
            match self.mailer.send(&email).await {
                Ok(()) => {
                    info!("sent {} email to {}", kind, email.to);
                    return;
                }
                Err(e) if attempt < self.policy.max_attempts => {
                    let delay = self.policy.backoff(attempt);
                    warn!(
                        "{} email to {} failed (attempt {}/{}): {}; retrying in {:?}",
                        kind, email.to, attempt, self.policy.max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        "giving up on {} email to {} after {} attempts: {}",
                        kind, email.to, attempt, e
                    );
                    return;
                }
            }
        }
    }
}
