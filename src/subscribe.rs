//! Email subscription capture.

use crate::app::SharedState;
use crate::login::is_valid_email;
use crate::mailer;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

const SUBSCRIBERS_FILE: &str = "subscribers.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscriber {
    pub email: String,
    pub subscribed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Subscribed,
    AlreadySubscribed,
}

#[derive(Debug, thiserror::Error)]
pub enum SubscribeError {
    #[error("Invalid email address")]
    InvalidEmail,

    #[error("subscriber list I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("subscriber list is corrupt: {0}")]
    Json(#[from] serde_json::Error),

    #[error("subscriber list lock poisoned")]
    Poisoned,
}

#[derive(Debug, Deserialize)]
pub struct SubscribeForm {
    pub email: String,
}

/// Subscribers kept in `<database>/subscribers.json`
pub struct SubscriberList {
    path: PathBuf,
    lock: Mutex<()>,
}

impl SubscriberList {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        SubscriberList {
            path: dir.into().join(SUBSCRIBERS_FILE),
            lock: Mutex::new(()),
        }
    }

    pub fn list(&self) -> Result<Vec<Subscriber>, SubscribeError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Adds an address. Addresses compare case-insensitively; a repeat is
    /// reported as [`SubscribeOutcome::AlreadySubscribed`].
    pub fn subscribe(&self, email: &str) -> Result<SubscribeOutcome, SubscribeError> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(SubscribeError::InvalidEmail);
        }

        let _guard = self.lock.lock().map_err(|_| SubscribeError::Poisoned)?;
        let mut subscribers = self.list()?;
        if subscribers
            .iter()
            .any(|s| s.email.eq_ignore_ascii_case(email))
        {
            return Ok(SubscribeOutcome::AlreadySubscribed);
        }

        subscribers.push(Subscriber {
            email: email.to_string(),
            subscribed_at: Utc::now(),
        });
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&subscribers)?)?;

        Ok(SubscribeOutcome::Subscribed)
    }
}

/// Records the address and sends a confirmation in the background.
pub async fn handle_subscribe(
    State(state): State<SharedState>,
    Form(form): Form<SubscribeForm>,
) -> Response {
    match state.subscribers.subscribe(&form.email) {
        Ok(SubscribeOutcome::Subscribed) => {
            info!("new subscriber {}", form.email);
            let mail = state.config.mail.clone();
            let to = form.email.trim().to_string();
            tokio::spawn(async move {
                let address = to.clone();
                if let Err(e) = mailer::deliver(mail, move |mailer| {
                    mailer.send_subscription_confirmation(&address)
                })
                .await
                {
                    warn!("subscription confirmation to {} not sent: {}", to, e);
                }
            });
            Redirect::to("/?success=Thanks+for+subscribing").into_response()
        }
        Ok(SubscribeOutcome::AlreadySubscribed) => {
            Redirect::to("/?success=You+are+already+subscribed").into_response()
        }
        Err(SubscribeError::InvalidEmail) => {
            Redirect::to("/?error=Invalid+email+address").into_response()
        }
        Err(e) => {
            warn!("subscription failed: {}", e);
            Redirect::to("/?error=Subscription+failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_subscribe_once() {
        let tmp = TempDir::new().unwrap();
        let list = SubscriberList::new(tmp.path());

        assert_eq!(
            list.subscribe("reader@example.com").unwrap(),
            SubscribeOutcome::Subscribed
        );
        assert_eq!(
            list.subscribe(" Reader@Example.com ").unwrap(),
            SubscribeOutcome::AlreadySubscribed
        );

        let subscribers = list.list().unwrap();
        assert_eq!(subscribers.len(), 1);
        assert_eq!(subscribers[0].email, "reader@example.com");
    }

    #[test]
    fn test_subscribe_rejects_bad_address() {
        let tmp = TempDir::new().unwrap();
        let list = SubscriberList::new(tmp.path());

        assert!(matches!(
            list.subscribe("nope"),
            Err(SubscribeError::InvalidEmail)
        ));
        assert!(list.list().unwrap().is_empty());
    }
}
