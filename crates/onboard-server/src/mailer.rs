//! Outbound mail: a [`Notifier`] that either logs messages or posts them to a
//! transactional-mail HTTP API.

use onboard_core::{Error, notify::Notifier};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MailTransport {
  /// Write messages to the log only.
  #[default]
  Log,
  /// POST messages as JSON to `api_url`.
  Http,
}

/// The `[mail]` section of the server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
  #[serde(default)]
  pub transport:    MailTransport,
  pub api_url:      Option<String>,
  pub api_key:      Option<String>,
  pub sender_email: String,
  pub sender_name:  Option<String>,
}

impl Default for MailConfig {
  fn default() -> Self {
    Self {
      transport:    MailTransport::Log,
      api_url:      None,
      api_key:      None,
      sender_email: "onboarding@localhost".into(),
      sender_name:  None,
    }
  }
}

#[derive(Debug, thiserror::Error)]
#[error("mail transport `http` requires `mail.{0}`")]
pub struct MissingSetting(&'static str);

// ─── Mailer ──────────────────────────────────────────────────────────────────

pub enum Mailer {
  Log,
  Http(HttpMailer),
}

impl Mailer {
  pub fn from_config(config: &MailConfig) -> Result<Self, MissingSetting> {
    match config.transport {
      MailTransport::Log => Ok(Self::Log),
      MailTransport::Http => {
        let api_url = config
          .api_url
          .clone()
          .filter(|u| !u.trim().is_empty())
          .ok_or(MissingSetting("api_url"))?;
        Ok(Self::Http(HttpMailer {
          client: reqwest::Client::new(),
          api_url,
          api_key: config.api_key.clone(),
          sender: Address {
            email: config.sender_email.clone(),
            name:  config.sender_name.clone(),
          },
        }))
      }
    }
  }
}

impl Notifier for Mailer {
  async fn send(&self, to: &str, subject: &str, body: &str) -> onboard_core::Result<()> {
    match self {
      Self::Log => {
        tracing::info!(%to, %subject, %body, "mail (log transport)");
        Ok(())
      }
      Self::Http(http) => http.send(to, subject, body).await,
    }
  }
}

// ─── HTTP transport ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct Address {
  email: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  name:  Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailBody<'a> {
  sender:       &'a Address,
  to:           Vec<Address>,
  subject:      &'a str,
  text_content: &'a str,
}

pub struct HttpMailer {
  client:  reqwest::Client,
  api_url: String,
  api_key: Option<String>,
  sender:  Address,
}

impl HttpMailer {
  async fn send(&self, to: &str, subject: &str, body: &str) -> onboard_core::Result<()> {
    let payload = SendEmailBody {
      sender: &self.sender,
      to: vec![Address { email: to.to_owned(), name: None }],
      subject,
      text_content: body,
    };

    let mut req = self
      .client
      .post(&self.api_url)
      .header(reqwest::header::ACCEPT, "application/json")
      .json(&payload);
    if let Some(key) = &self.api_key {
      req = req.header("api-key", key);
    }

    let resp = req
      .send()
      .await
      .map_err(|e| Error::Notification(e.to_string()))?;
    let status = resp.status();
    if status.is_success() {
      return Ok(());
    }

    let detail = resp.text().await.unwrap_or_default();
    Err(Error::Notification(format!("mail API returned {status}: {detail}")))
  }
}
