use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

/// Outbound transactional email capability: send(to, subject, html).
/// Production uses the HTTP mail API below; tests substitute a mock.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError>;
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Mail API error: {0}")]
    Api(String),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MailAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendMailBody {
    sender: MailAddress,
    to: Vec<MailAddress>,
    subject: String,
    html_content: String,
}

/// Brevo transactional mail client
pub struct BrevoMailer {
    client: Client,
    api_key: String,
    sender_email: String,
    sender_name: String,
    base_url: String,
}

impl BrevoMailer {
    pub fn new(api_key: String, sender_email: String, sender_name: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            sender_email,
            sender_name,
            base_url: "https://api.brevo.com".to_string(),
        }
    }
}

#[async_trait]
impl Mailer for BrevoMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError> {
        let url = format!("{}/v3/smtp/email", self.base_url);

        let body = SendMailBody {
            sender: MailAddress {
                email: self.sender_email.clone(),
                name: Some(self.sender_name.clone()),
            },
            to: vec![MailAddress {
                email: to.to_string(),
                name: None,
            }],
            subject: subject.to_string(),
            html_content: html.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| MailError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            tracing::error!("Mail send failed (status={}): {}", status, detail);
            return Err(MailError::Api(format!("API returned status: {}", status)));
        }

        Ok(())
    }
}

/// Verification email body shared by both flows. The wording differs by
/// context; the link embeds the single-use token.
pub fn verification_email_html(heading: &str, intro: &str, verification_url: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; color: #333;">
  <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
    <h1>Smart Energy System</h1>
    <h2>{heading}</h2>
    <p>{intro}</p>
    <p><a href="{verification_url}" style="display: inline-block; background: #3B82F6; color: white; padding: 15px 40px; text-decoration: none; border-radius: 8px;">Verify Email</a></p>
    <p><strong>This link will expire in 15 minutes.</strong></p>
    <p>If you didn't request this, please ignore this email.</p>
  </div>
</body>
</html>"#
    )
}
