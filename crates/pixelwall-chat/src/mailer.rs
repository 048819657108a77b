use resend_rs::Resend;
use resend_rs::types::CreateEmailBaseOptions;

const RESET_EMAIL_TEMPLATE: &str = include_str!("../templates/reset_email.html");

#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    #[error("email delivery failed: {0}")]
    Delivery(String),
}

/// Outbound mail port. The engine only ever sends one kind of message, so
/// the trait stays this narrow; tests swap in a recording fake.
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send_password_reset(
        &self,
        to: &str,
        username: &str,
        reset_url: &str,
    ) -> Result<(), MailerError>;
}

pub struct ResendMailer {
    client: Resend,
    from: String,
}

impl ResendMailer {
    pub fn new(api_key: &str, from: impl Into<String>) -> Self {
        Self {
            client: Resend::new(api_key),
            from: from.into(),
        }
    }
}

#[async_trait::async_trait]
impl Mailer for ResendMailer {
    async fn send_password_reset(
        &self,
        to: &str,
        username: &str,
        reset_url: &str,
    ) -> Result<(), MailerError> {
        let subject = "Reset your wall password";
        let html = render_reset_template(username, reset_url);

        let email = CreateEmailBaseOptions::new(&self.from, [to], subject).with_html(&html);
        self.client
            .emails
            .send(email)
            .await
            .map_err(|e| MailerError::Delivery(e.to_string()))?;
        Ok(())
    }
}

pub fn render_reset_template(username: &str, reset_url: &str) -> String {
    RESET_EMAIL_TEMPLATE
        .replace("{{USERNAME}}", &escape_html(username))
        .replace("{{RESET_URL}}", reset_url)
}

/// Display names are free text; escape them before they land in markup.
fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_fills_both_placeholders() {
        let html = render_reset_template("neon-rider", "http://localhost:8000/reset/abc123");
        assert!(html.contains("neon-rider"));
        assert!(html.contains("http://localhost:8000/reset/abc123"));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn template_escapes_markup_in_names() {
        let html = render_reset_template("<script>alert(1)</script>", "http://x/reset/t");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
