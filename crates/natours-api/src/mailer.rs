use std::sync::Mutex;

use natours_db::models::User;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Email {
    pub fn welcome(user: &User, url: &str) -> Self {
        Self {
            to: user.email.clone(),
            subject: "Welcome to the Natours Family!".to_string(),
            body: format!(
                "Hi {}, welcome to Natours! Upload a profile photo at {url}",
                first_name(&user.name)
            ),
        }
    }

    pub fn password_reset(user: &User, url: &str) -> Self {
        Self {
            to: user.email.clone(),
            subject: "Your password reset token (valid for only 10 minutes)".to_string(),
            body: format!(
                "Hi {}, forgot your password? Submit a PATCH request with your new password \
                 and passwordConfirm to: {url}\nIf you didn't forget your password, please \
                 ignore this email!",
                first_name(&user.name)
            ),
        }
    }
}

fn first_name(name: &str) -> &str {
    name.split_whitespace().next().unwrap_or(name)
}

#[derive(Debug, thiserror::Error)]
#[error("mail delivery failed: {0}")]
pub struct MailError(pub String);

/// Outgoing mail. Called from blocking handler code.
pub trait Mailer: Send + Sync {
    fn send(&self, email: Email) -> Result<(), MailError>;
}

/// Writes mails to the log instead of delivering them.
#[derive(Debug, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, email: Email) -> Result<(), MailError> {
        info!(to = %email.to, subject = %email.subject, body = %email.body, "mail sent");
        Ok(())
    }
}

/// Keeps sent mails in memory.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<Email>>,
    failing: bool,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every delivery fails.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

impl Mailer for MemoryMailer {
    fn send(&self, email: Email) -> Result<(), MailError> {
        if self.failing {
            return Err(MailError(format!("refusing mail to {}", email.to)));
        }
        self.sent
            .lock()
            .map_err(|e| MailError(e.to_string()))?
            .push(email);
        Ok(())
    }
}
