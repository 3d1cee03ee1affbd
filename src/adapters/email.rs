//! Appointment confirmation emails over SMTP.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::{Office, SmtpSettings};
use crate::domain::PatientRecord;

use super::Notifier;

/// Subject and HTML body of a confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub subject: String,
    pub html: String,
}

impl Confirmation {
    /// Build the confirmation for one patient
    pub fn compose(office: &Office, patient: &PatientRecord) -> Self {
        let subject = format!("Appointment Confirmation - {}", office.name);
        let html = format!(
            "<h2>{subject}</h2>\n\
             <p>Dear {name},</p>\n\
             <p>Your appointment at {office} has been confirmed.</p>\n\
             <h3>Patient Details:</h3>\n\
             <ul>\n\
             <li><strong>Name:</strong> {name}</li>\n\
             <li><strong>Date of Birth:</strong> {dob}</li>\n\
             <li><strong>Reason for Visit:</strong> {complaint}</li>\n\
             </ul>\n\
             <p>Please bring your insurance card and any relevant medical records.</p>\n\
             <p>If you need to reschedule, please call us at our office number.</p>\n\
             <p>Best regards,<br>\n{office}</p>\n",
            subject = escape_html(&subject),
            name = escape_html(&patient.name),
            dob = escape_html(&patient.dob),
            complaint = escape_html(&patient.complaint),
            office = escape_html(&office.name),
        );

        Self { subject, html }
    }
}

/// Escape text from the transcript before it goes into the HTML body
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// SMTP notifier using STARTTLS and login credentials
pub struct SmtpNotifier {
    office: Office,
    sender: String,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpNotifier {
    /// Build a notifier from resolved settings
    pub fn new(office: Office, settings: &SmtpSettings) -> Result<Self> {
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.server)
            .with_context(|| format!("Invalid SMTP server: {}", settings.server))?
            .port(settings.port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .build();

        Ok(Self {
            office,
            sender: settings.sender.clone(),
            mailer,
        })
    }
}

/// Build the MIME message for one confirmation
fn build_message(sender: &str, to_address: &str, confirmation: Confirmation) -> Result<Message> {
    let from: Mailbox = sender
        .parse()
        .with_context(|| format!("Invalid sender address: {}", sender))?;
    let to: Mailbox = to_address
        .parse()
        .with_context(|| format!("Invalid recipient address: {}", to_address))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(confirmation.subject)
        .header(ContentType::TEXT_HTML)
        .body(confirmation.html)
        .context("Failed to build confirmation email")
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_confirmation(&self, to_address: &str, patient: &PatientRecord) -> Result<()> {
        let confirmation = Confirmation::compose(&self.office, patient);
        let message = build_message(&self.sender, to_address, confirmation)?;

        self.mailer
            .send(message)
            .await
            .context("Failed to send confirmation email")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_confirmation() {
        let mut patient = PatientRecord::new();
        patient.name = "Jane Doe".to_string();
        patient.dob = "1990-04-01".to_string();
        patient.complaint = "knee pain".to_string();

        let confirmation = Confirmation::compose(&Office::default(), &patient);

        assert_eq!(
            confirmation.subject,
            "Appointment Confirmation - Shahil's Medical Office"
        );
        assert!(confirmation.html.contains("<p>Dear Jane Doe,</p>"));
        assert!(confirmation.html.contains("<strong>Date of Birth:</strong> 1990-04-01"));
        assert!(confirmation.html.contains("<strong>Reason for Visit:</strong> knee pain"));
        assert!(confirmation.html.contains("insurance card"));
    }

    #[test]
    fn test_caller_text_is_escaped() {
        let mut patient = PatientRecord::new();
        patient.name = "<b>Jane</b> & \"Co\"".to_string();
        patient.complaint = "<script>alert(1)</script>".to_string();

        let confirmation = Confirmation::compose(&Office::default(), &patient);

        assert!(confirmation
            .html
            .contains("<p>Dear &lt;b&gt;Jane&lt;/b&gt; &amp; &quot;Co&quot;,</p>"));
        assert!(!confirmation.html.contains("<script>"));
        // Subject is a plain header, not HTML
        assert_eq!(
            confirmation.subject,
            "Appointment Confirmation - Shahil's Medical Office"
        );
    }

    #[test]
    fn test_invalid_recipient_is_an_error() {
        let confirmation = Confirmation::compose(&Office::default(), &PatientRecord::new());

        assert!(build_message("office@example.com", "not an address", confirmation.clone()).is_err());
        assert!(build_message("office@example.com", "jane@example.com", confirmation).is_ok());
    }
}
