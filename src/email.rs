//! Verification mail delivery.

use anyhow::{Result, anyhow};
use lettre::message::{Mailbox, Message, SinglePart, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};

use crate::config::SmtpConfig;
use crate::models::User;

/// Sends account verification mail over SMTP.
#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    verify_base_url: String,
}

impl Mailer {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let creds = Credentials::new(config.username.clone(), config.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .credentials(creds)
            .build();
        let from: Mailbox = config
            .from_address
            .parse()
            .map_err(|e| anyhow!("Invalid sender address '{}': {}", config.from_address, e))?;

        Ok(Self {
            transport,
            from,
            verify_base_url: config.verify_base_url.clone(),
        })
    }

    pub async fn send_verification(&self, user: &User, token: &str) -> Result<()> {
        let to: Mailbox = user
            .email
            .parse()
            .map_err(|e| anyhow!("Invalid recipient address '{}': {}", user.email, e))?;
        let link = format!("{}/{}", self.verify_base_url.trim_end_matches('/'), token);

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject("Verify your account")
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_HTML)
                    .body(format!(
                        "<p>Hi {},</p><p>Confirm your address by opening \
                         <a href=\"{link}\">{link}</a>.</p>",
                        user.display_name
                    )),
            )?;

        self.transport
            .send(message)
            .await
            .map_err(|e| anyhow!("Failed to send verification mail: {}", e))?;
        tracing::info!(email = %user.email, "verification mail sent");
        Ok(())
    }
}

/// Deliver the verification token, or log the link when no mailer is
/// configured so local setups stay usable.
pub async fn deliver_verification(mailer: Option<&Mailer>, user: &User, token: &str) {
    match mailer {
        Some(mailer) => {
            if let Err(e) = mailer.send_verification(user, token).await {
                tracing::error!(email = %user.email, error = %e, "verification mail failed");
            }
        }
        None => {
            tracing::info!(email = %user.email, token, "no SMTP configured, verify manually");
        }
    }
}
