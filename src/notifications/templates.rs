use chrono::{DateTime, Datelike, Utc};
use tera::{Context, Tera};

use crate::notifications::{Notification, OutgoingEmail};

const WELCOME_TEMPLATE: &str = "welcome_email.html";
const TODO_CREATED_TEMPLATE: &str = "todo_created_email.html";

/// Renders notification emails from the HTML templates compiled into the
/// binary. `.html` templates are autoescaped.
pub struct EmailRenderer {
    tera: Tera,
}

impl EmailRenderer {
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (
                WELCOME_TEMPLATE,
                include_str!("../../templates/email/welcome_email.html"),
            ),
            (
                TODO_CREATED_TEMPLATE,
                include_str!("../../templates/email/todo_created_email.html"),
            ),
        ])?;
        Ok(Self { tera })
    }

    pub fn render(
        &self,
        notification: &Notification,
        now: DateTime<Utc>,
    ) -> Result<OutgoingEmail, tera::Error> {
        let mut context = Context::new();
        context.insert("current_year", &now.year());

        let (template, subject, user) = match notification {
            Notification::Welcome { user } => (WELCOME_TEMPLATE, "Welcome to Our Platform", user),
            Notification::TodoCreated { user, todo } => {
                context.insert("todo", todo);
                (TODO_CREATED_TEMPLATE, "New Todo Created", user)
            }
        };
        context.insert("user", user);

        Ok(OutgoingEmail {
            to: user.email.clone(),
            subject: subject.to_string(),
            html_body: self.tera.render(template, &context)?,
        })
    }
}
