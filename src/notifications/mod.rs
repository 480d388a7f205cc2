pub mod mailer;
pub mod templates;
pub mod worker;

pub use mailer::{ConsoleMailer, MailError, Mailer, MemoryMailer, OutgoingEmail, SmtpMailer};
pub use templates::EmailRenderer;
pub use worker::{NotificationWorker, Notifier, RetryPolicy, channel};

use crate::models::{Todo, UserProfile};

/// Emails sent as a side effect of a committed write.
#[derive(Debug, Clone)]
pub enum Notification {
    Welcome { user: UserProfile },
    TodoCreated { user: UserProfile, todo: Todo },
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::Welcome { .. } => "welcome",
            Notification::TodoCreated { .. } => "todo created",
        }
    }

    pub fn recipient(&self) -> &str {
        match self {
            Notification::Welcome { user } | Notification::TodoCreated { user, .. } => &user.email,
        }
    }
}
