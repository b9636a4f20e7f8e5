use std::time::Duration;

use anyhow::Context;

use reqwest::Client;

use secrecy::{ExposeSecret, Secret};

use serde::Serialize;

use url::Url;

use crate::domain::EmailAddress;

const POSTMARK_TOKEN_HEADER: &str = "X-Postmark-Server-Token";

/// Client for the transactional email REST service, used by the reminder
/// sweep to nudge partial submissions.
#[derive(Debug)]
pub struct EmailClient {
    client: Client,
    sender: EmailAddress,

    api_send_email_url: Url,
    api_auth_token: Secret<String>,
}

impl EmailClient {
    pub fn new(
        sender: EmailAddress,
        api_timeout: Duration,
        api_base_url: Url,
        api_auth_token: Secret<String>,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(api_timeout)
            .build()
            .context("Failed to build http client")?;

        let api_send_email_url = api_base_url
            .join("email")
            .context("Failed to create send email endpoint URL")?;

        Ok(Self {
            client,
            sender,
            api_send_email_url,
            api_auth_token,
        })
    }

    /// Send the nth reminder for a partial submission.
    /// `reminder_number` is 1-based; the copy nudges harder as it grows.
    pub async fn send_reminder(
        &self,
        recipient: &EmailAddress,
        reminder_number: i32,
    ) -> anyhow::Result<()> {
        let subject = match reminder_number {
            1 => "Your growth plan is almost ready",
            2 => "Still with us? Your growth plan is waiting",
            _ => "Last chance to finish your growth plan",
        };

        let text_body = format!(
            "You started telling us about your business but didn't finish. \
             Pick up where you left off and we'll put your growth plan together. \
             (Reminder {} of 3)",
            reminder_number
        );
        let html_body = format!("<p>{}</p>", text_body);

        self.send(recipient, subject, &html_body, &text_body).await
    }

    pub async fn send(
        &self,
        recipient: &EmailAddress,
        subject: &str,
        html_body: &str,
        text_body: &str,
    ) -> anyhow::Result<()> {
        let body = SendEmailRequest {
            to: recipient.as_ref(),
            from: self.sender.as_ref(),
            subject,
            html_body,
            text_body,
        };

        self.client
            .post(self.api_send_email_url.clone())
            .header(POSTMARK_TOKEN_HEADER, self.api_auth_token.expose_secret())
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendEmailRequest<'a> {
    to: &'a str,
    from: &'a str,
    subject: &'a str,
    html_body: &'a str,
    text_body: &'a str,
}
