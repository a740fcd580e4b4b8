//! Outbound mail for password reset codes.

use async_trait::async_trait;
use evia_core::{AppError, SmtpConfig};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use tracing::info;

const OTP_SUBJECT: &str = "Forget Password OTP";

/// Delivers a one-time password to a user.
#[async_trait]
pub trait OtpMailer: Send + Sync {
    async fn send_otp(&self, email: &str, otp: &str) -> Result<(), AppError>;
}

/// SMTP mailer.
#[derive(Clone)]
pub struct EmailService {
    mailer: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

impl EmailService {
    /// Build the SMTP transport. Returns `None` when the relay or sender address is unusable.
    pub fn from_config(config: &SmtpConfig) -> Option<Self> {
        let host = config.host.as_str();
        let port = config.port.unwrap_or(587);
        let from: Mailbox = match config.from.parse() {
            Ok(from) => from,
            Err(e) => {
                tracing::warn!(error = %e, "Invalid SMTP_FROM, email disabled");
                return None;
            }
        };
        let credentials = match (&config.user, &config.password) {
            (Some(u), Some(p)) => Some(Credentials::new(u.clone(), p.clone())),
            _ => None,
        };

        let mailer = if config.tls {
            let b = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .ok()?
                .port(port);
            let b = match credentials {
                Some(c) => b.credentials(c),
                None => b,
            };
            info!(host = %host, port = port, "Email service initialized (SMTP with STARTTLS)");
            b.build()
        } else {
            let b = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host).port(port);
            let b = match credentials {
                Some(c) => b.credentials(c),
                None => b,
            };
            info!(host = %host, port = port, "Email service initialized (SMTP)");
            b.build()
        };

        Some(Self {
            mailer: Arc::new(mailer),
            from,
        })
    }

    /// Send a plain-text email to one recipient.
    pub async fn send(&self, to: &str, subject: &str, body_plain: &str) -> Result<(), String> {
        let to: Mailbox = to
            .parse()
            .map_err(|e| format!("Invalid recipient address: {}", e))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body_plain.to_string())
            .map_err(|e| e.to_string())?;

        self.mailer.send(email).await.map_err(|e| e.to_string())?;
        Ok(())
    }
}

fn otp_body(otp: &str) -> String {
    format!(
        "Your one-time password is {}.\n\nIt expires in a few minutes. If you did not ask to reset your password, ignore this email.",
        otp
    )
}

#[async_trait]
impl OtpMailer for EmailService {
    async fn send_otp(&self, email: &str, otp: &str) -> Result<(), AppError> {
        self.send(email, OTP_SUBJECT, &otp_body(otp))
            .await
            .map_err(|e| AppError::Internal(format!("Failed to send OTP email: {}", e)))?;
        info!("OTP email sent");
        Ok(())
    }
}

/// Used when SMTP is not configured. The code only reaches the debug log.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl OtpMailer for LogMailer {
    async fn send_otp(&self, email: &str, otp: &str) -> Result<(), AppError> {
        tracing::warn!(email = %email, "SMTP not configured, OTP email not sent");
        tracing::debug!(email = %email, otp = %otp, "Undelivered OTP");
        Ok(())
    }
}
