//! Templated email through the Mailgun HTTP API.
//!
//! A `Mailer` is built once from settings and shared; there is no global
//! sender state.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.eu.mailgun.net";

const HTTP_TIMEOUT_SECS: u64 = 30;

fn default_base_url() -> String { DEFAULT_BASE_URL.to_string() }
fn default_timeout_secs() -> u64 { HTTP_TIMEOUT_SECS }

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmailSettings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub from: String,
    /// Appended to every message body.
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Whole-request timeout for the provider call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            domain: String::new(),
            from: String::new(),
            signature: String::new(),
            enabled: false,
            base_url: default_base_url(),
            timeout_secs: HTTP_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmailTemplate {
    pub subject: String,
    pub message: String,
}

/// A rendered message, in the form fields Mailgun expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Sending is switched off in settings; nothing left the process.
    Disabled,
    Sent { id: Option<String> },
}

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("unknown email template `{0}`")]
    UnknownTemplate(String),
    #[error("failed to call the email provider: {0}")]
    Request(#[from] reqwest::Error),
    #[error("email provider returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Deserialize)]
struct SendResponse {
    id: Option<String>,
}

/// Replace every `{{key}}` with its value.
pub fn substitute(template: &str, vars: &IndexMap<String, String>) -> String {
    vars.iter().fold(template.to_string(), |acc, (key, value)| acc.replace(&format!("{{{{{key}}}}}"), value))
}

pub struct Mailer {
    settings: EmailSettings,
    templates: IndexMap<String, EmailTemplate>,
    client: reqwest::Client,
}

impl Mailer {
    pub fn new(settings: EmailSettings, templates: IndexMap<String, EmailTemplate>) -> Result<Self, EmailError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self { settings, templates, client })
    }

    pub fn is_enabled(&self) -> bool { self.settings.enabled }

    fn messages_url(&self) -> String {
        let base = self.settings.base_url.trim_end_matches('/');
        format!("{base}/v3/{}/messages", self.settings.domain)
    }

    /// Fill `template` for `to`. `{{email}}` always expands to the recipient.
    pub fn render(&self, to: &str, template: &str, vars: &IndexMap<String, String>) -> Result<Message, EmailError> {
        let Some(tpl) = self.templates.get(template) else {
            return Err(EmailError::UnknownTemplate(template.to_string()));
        };
        let mut vars = vars.clone();
        vars.insert("email".to_string(), to.to_string());
        Ok(Message {
            from: self.settings.from.clone(),
            to: to.to_string(),
            subject: substitute(&tpl.subject, &vars),
            html: substitute(&tpl.message, &vars) + &self.settings.signature,
        })
    }

    pub async fn send(&self, to: &str, template: &str, vars: &IndexMap<String, String>) -> Result<Delivery, EmailError> {
        if !self.settings.enabled {
            tracing::debug!(template, "emails disabled, not sending");
            return Ok(Delivery::Disabled);
        }
        tracing::info!(template, "Sending email");
        let message = self.render(to, template, vars)?;
        match self.post(&message).await {
            Ok(delivery) => Ok(delivery),
            Err(err) => {
                tracing::error!(error = %err, to = %message.to, subject = %message.subject, "Problem: email sent failed");
                Err(err)
            }
        }
    }

    async fn post(&self, message: &Message) -> Result<Delivery, EmailError> {
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth("api", Some(&self.settings.api_key))
            .form(message)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::Rejected { status, body });
        }

        let sent: SendResponse = response.json().await?;
        tracing::info!(id = ?sent.id, "email queued");
        Ok(Delivery::Sent { id: sent.id })
    }
}

// ------------------------------- Tests ------------------------------------ //
