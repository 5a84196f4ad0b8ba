//! Outbound email: the sender seam, its implementations and the
//! message templates.

use miala_core::error::{MialaError, MialaResult};
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub recipient: String,
    pub subject: String,
    pub html_body: String,
}

/// Delivers one HTML email. Implementations report failures as
/// [`MialaError::EmailDelivery`].
pub trait EmailSender: Send + Sync + 'static {
    fn send(&self, message: EmailMessage) -> impl Future<Output = MialaResult<()>> + Send;
}

/// Logs messages instead of sending them. Used when no mail API is
/// configured.
#[derive(Debug, Clone, Default)]
pub struct TracingEmailSender;

impl EmailSender for TracingEmailSender {
    async fn send(&self, message: EmailMessage) -> MialaResult<()> {
        info!(
            recipient = %message.recipient,
            subject = %message.subject,
            "Email delivery skipped, no mail API configured"
        );
        Ok(())
    }
}

/// Settings for [`HttpEmailSender`].
#[derive(Debug, Clone)]
pub struct MailApiConfig {
    /// Transactional mail endpoint accepting a JSON POST.
    pub endpoint: String,
    pub api_key: String,
    pub from: String,
}

#[derive(Debug, Serialize)]
struct MailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

/// Sends through a transactional mail HTTP API.
#[derive(Clone)]
pub struct HttpEmailSender {
    client: Client,
    config: MailApiConfig,
}

impl HttpEmailSender {
    pub fn new(config: MailApiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

impl EmailSender for HttpEmailSender {
    async fn send(&self, message: EmailMessage) -> MialaResult<()> {
        let request = MailRequest {
            from: &self.config.from,
            to: [&message.recipient],
            subject: &message.subject,
            html: &message.html_body,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| MialaError::EmailDelivery(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(recipient = %message.recipient, %status, %body, "Mail API rejected message");
            return Err(MialaError::EmailDelivery(format!(
                "mail API returned {status}"
            )));
        }

        info!(recipient = %message.recipient, subject = %message.subject, "Email sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

pub const OTP_SUBJECT: &str = "Miala OTP";
pub const VERIFICATION_SUCCESS_SUBJECT: &str = "Miala OTP Verification Successful";

const ACCENT: &str = "#fa0d0dff";

fn layout(title: &str, content: &str, footer: &str) -> String {
    format!(
        "<html>\n\
         <body style=\"font-family: Arial, sans-serif; background-color: #f4f4f4; padding: 30px;\">\n\
         <div style=\"max-width: 500px; margin: auto; background: #ffffff; border-radius: 8px; \
         padding: 20px; box-shadow: 0 0 10px rgba(0,0,0,0.1);\">\n\
         <p style=\"letter-spacing: 4px; font-weight: bold; color: {ACCENT};\">MIALA</p>\n\
         <h2 style=\"color: {ACCENT};\">{title}</h2>\n\
         <p>Hello,</p>\n\
         {content}\n\
         <hr>\n\
         <small style=\"color: #888;\">{footer}</small>\n\
         <p style=\"color: #888; font-size: 11px;\">NOVA TECH</p>\n\
         </div>\n\
         </body>\n\
         </html>"
    )
}

pub fn otp_message(recipient: &str, code: &str, lifetime_minutes: i64) -> EmailMessage {
    let content = format!(
        "<p>Your one-time password is:</p>\n\
         <h1 style=\"text-align: center; color: {ACCENT};\">{code}</h1>\n\
         <p>This code will expire in <strong>{lifetime_minutes} minutes</strong>. \
         Please do not share it with anyone.</p>"
    );
    EmailMessage {
        recipient: recipient.to_string(),
        subject: OTP_SUBJECT.into(),
        html_body: layout(
            "OTP Verification",
            &content,
            "If you did not request this OTP, please ignore this message.",
        ),
    }
}

pub fn verification_success_message(recipient: &str) -> EmailMessage {
    EmailMessage {
        recipient: recipient.to_string(),
        subject: VERIFICATION_SUCCESS_SUBJECT.into(),
        html_body: layout(
            "Miala Verification Successful",
            "<p>Your OTP has been verified successfully.</p>\n\
             <p>Please wait while the admin reviews your information.</p>",
            "If this was not you, please contact our support team immediately.",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_message_embeds_code_and_lifetime() {
        let message = otp_message("a@b.com", "123456", 20);
        assert_eq!(message.recipient, "a@b.com");
        assert_eq!(message.subject, "Miala OTP");
        assert!(message.html_body.contains(">123456</h1>"));
        assert!(message.html_body.contains("20 minutes"));
        assert!(message.html_body.contains("MIALA"));
    }

    #[test]
    fn success_message_has_its_own_subject() {
        let message = verification_success_message("a@b.com");
        assert_eq!(message.subject, "Miala OTP Verification Successful");
        assert!(message.html_body.contains("verified successfully"));
    }

    #[test]
    fn mail_request_shape() {
        let json = serde_json::to_value(MailRequest {
            from: "noreply@miala.ng",
            to: ["a@b.com"],
            subject: "Miala OTP",
            html: "<p>hi</p>",
        })
        .unwrap();
        assert_eq!(json["to"][0], "a@b.com");
        assert_eq!(json["from"], "noreply@miala.ng");
    }

    #[tokio::test]
    async fn tracing_sender_always_succeeds() {
        TracingEmailSender
            .send(otp_message("a@b.com", "123456", 20))
            .await
            .unwrap();
    }
}
