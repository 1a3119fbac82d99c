#[cfg(feature = "web")]
use crate::config::MailConfig;
#[cfg(feature = "web")]
use lettre::transport::smtp::authentication::Credentials;
#[cfg(feature = "web")]
use lettre::transport::smtp::client::{Tls, TlsParameters};
#[cfg(feature = "web")]
use lettre::{Message, SmtpTransport, Transport};
#[cfg(feature = "web")]
use rand::Rng;

#[cfg(feature = "web")]
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail delivery is not configured")]
    NotConfigured,

    #[error("invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("mail task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[cfg(feature = "web")]
pub struct Mailer {
    smtp: SmtpTransport,
    from: String,
}

#[cfg(feature = "web")]
impl Mailer {
    /// Builds an SMTP transport from config. `None` means mail is disabled.
    pub fn from_config(config: Option<&MailConfig>) -> Result<Self, MailError> {
        let config = config.ok_or(MailError::NotConfigured)?;

        let creds = Credentials::new(config.username.clone(), config.password.clone());
        let tls_parameters = TlsParameters::new(config.host.clone())?;

        let smtp = SmtpTransport::relay(&config.host)?
            .credentials(creds)
            .port(config.port)
            .tls(Tls::Wrapper(tls_parameters))
            .build();

        Ok(Mailer {
            smtp,
            from: config.from.clone(),
        })
    }

    pub fn send_password_reset(&self, to_email: &str, reset_code: &str) -> Result<(), MailError> {
        self.send(
            to_email,
            "Password Reset Request",
            format!(
                "Your password reset code is: {}\nThis code will expire in 1 hour.",
                reset_code
            ),
        )
    }

    pub fn send_subscription_confirmation(&self, to_email: &str) -> Result<(), MailError> {
        self.send(
            to_email,
            "Subscription confirmed",
            "Thanks for subscribing to calculator updates.".to_string(),
        )
    }

    fn send(&self, to_email: &str, subject: &str, body: String) -> Result<(), MailError> {
        let email = Message::builder()
            .from(self.from.parse()?)
            .to(to_email.parse()?)
            .subject(subject)
            .body(body)?;

        self.smtp.send(&email)?;
        Ok(())
    }
}

/// Sends on the blocking pool so the SMTP round trip stays off the async workers.
#[cfg(feature = "web")]
pub async fn deliver<F>(config: Option<MailConfig>, send: F) -> Result<(), MailError>
where
    F: FnOnce(&Mailer) -> Result<(), MailError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mailer = Mailer::from_config(config.as_ref())?;
        send(&mailer)
    })
    .await?
}

#[cfg(feature = "web")]
pub fn generate_reset_code() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::thread_rng();

    (0..8)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}
