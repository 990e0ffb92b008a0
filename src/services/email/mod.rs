//! Outbound email: a one-method delivery abstraction plus the dispatcher that
//! pairs templates with tenant-aware links and records outcomes.

pub mod templates;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;

use crate::services::metrics::MetricsRegistry;
use templates::{EmailContent, LinkBuilder};

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("email API rejected the message: {0}")]
    Api(String),
    #[error("email transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Whether a message actually went out. `Skipped` means the service is not
/// configured; most callers treat that as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Skipped,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, from: &str, to: &str, subject: &str, html: &str)
        -> Result<(), EmailError>;
}

/// Delivers through an HTTP email API with a bearer key.
pub struct HttpEmailSender {
    client: Client,
    api_url: String,
    api_key: String,
}

impl HttpEmailSender {
    pub fn new(client: Client, api_url: String, api_key: String) -> Self {
        Self {
            client,
            api_url,
            api_key,
        }
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(
        &self,
        from: &str,
        to: &str,
        subject: &str,
        html: &str,
    ) -> Result<(), EmailError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": from,
                "to": to,
                "subject": subject,
                "html": html,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::Api(format!("{status}: {body}")));
        }
        Ok(())
    }
}

/// Local-dev sender: logs the message and reports success.
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(
        &self,
        _from: &str,
        to: &str,
        subject: &str,
        _html: &str,
    ) -> Result<(), EmailError> {
        tracing::info!(to, subject, "email send stub");
        Ok(())
    }
}

#[derive(Clone)]
pub struct EmailService {
    sender: Option<Arc<dyn EmailSender>>,
    from: String,
    links: LinkBuilder,
    notify_to: Option<String>,
    metrics: Arc<MetricsRegistry>,
}

impl EmailService {
    pub fn new(
        sender: Option<Arc<dyn EmailSender>>,
        from: String,
        links: LinkBuilder,
        notify_to: Option<String>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        if sender.is_none() {
            tracing::warn!("email service not configured; transactional email is disabled");
        }
        Self {
            sender,
            from,
            links,
            notify_to,
            metrics,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.sender.is_some()
    }

    async fn dispatch(
        &self,
        template: &'static str,
        to: &str,
        content: EmailContent,
    ) -> Result<Delivery, EmailError> {
        let Some(sender) = &self.sender else {
            tracing::warn!(template, to, "email service not configured, skipping send");
            self.metrics
                .emails_total
                .with_label_values(&[template, "skipped"])
                .inc();
            return Ok(Delivery::Skipped);
        };

        match sender
            .send(&self.from, to, &content.subject, &content.html)
            .await
        {
            Ok(()) => {
                self.metrics
                    .emails_total
                    .with_label_values(&[template, "sent"])
                    .inc();
                Ok(Delivery::Sent)
            }
            Err(err) => {
                self.metrics
                    .emails_total
                    .with_label_values(&[template, "failed"])
                    .inc();
                Err(err)
            }
        }
    }

    pub async fn send_verification(
        &self,
        tenant_id: &str,
        to: &str,
        token: &str,
    ) -> Result<Delivery, EmailError> {
        let link = self
            .links
            .tenant_link(tenant_id, &format!("/verify-email?token={token}"));
        self.dispatch("verify-email", to, templates::verify_email(&link))
            .await
    }

    pub async fn send_password_reset(
        &self,
        tenant_id: &str,
        to: &str,
        token: &str,
    ) -> Result<Delivery, EmailError> {
        let link = self
            .links
            .tenant_link(tenant_id, &format!("/reset-password?token={token}"));
        self.dispatch("password-reset", to, templates::password_reset(&link))
            .await
    }

    pub async fn send_pin_reset(
        &self,
        tenant_id: &str,
        to: &str,
        username: &str,
        token: &str,
    ) -> Result<Delivery, EmailError> {
        let link = self
            .links
            .tenant_link(tenant_id, &format!("/reset-pin?token={token}"));
        self.dispatch("pin-reset", to, templates::pin_reset(username, &link))
            .await
    }

    pub async fn send_coach_welcome(
        &self,
        tenant_id: &str,
        to: &str,
        club_name: &str,
        username: &str,
        pin: &str,
    ) -> Result<Delivery, EmailError> {
        let login_link = self.links.tenant_link(tenant_id, "/login");
        self.dispatch(
            "coach-welcome",
            to,
            templates::coach_welcome(club_name, username, pin, &login_link),
        )
        .await
    }

    pub async fn send_two_factor_enabled(&self, to: &str) -> Result<Delivery, EmailError> {
        self.dispatch("2fa-enabled", to, templates::two_factor_enabled())
            .await
    }

    pub async fn send_cold_outreach(
        &self,
        to: &str,
        club_name: &str,
        signup_link: &str,
    ) -> Result<Delivery, EmailError> {
        self.dispatch(
            "cold-outreach",
            to,
            templates::cold_outreach(club_name, signup_link),
        )
        .await
    }

    /// Operator heads-up about a fresh tenant. No-op when no recipient is
    /// configured.
    pub async fn notify_signup(&self, admin_email: &str, tenant_id: &str) {
        let Some(notify_to) = self.notify_to.clone() else {
            return;
        };
        if let Err(err) = self
            .dispatch(
                "signup-notification",
                &notify_to,
                templates::signup_notification(admin_email, tenant_id),
            )
            .await
        {
            tracing::warn!(error = %err, "failed to send signup notification");
        }
    }
}
