//! Notification delivery through an HTTP mail relay.
//!
//! The relay accepts a JSON [`Notification`] and takes care of rendering the template and sending the mail. Any
//! non-2xx response is reported as [`NotificationError::Rejected`].
use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use tiffin_engine::notifications::{Notification, NotificationError, Notifier};

const RELAY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct HttpRelayNotifier {
    url: String,
    client: Arc<Client>,
}

impl HttpRelayNotifier {
    pub fn new(url: &str) -> Result<Self, NotificationError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(RELAY_TIMEOUT)
            .build()
            .map_err(|e| NotificationError::Unreachable(e.to_string()))?;
        Ok(Self { url: url.to_string(), client: Arc::new(client) })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }
}

impl Notifier for HttpRelayNotifier {
    fn notify(&self, notification: Notification) -> BoxFuture<'static, Result<(), NotificationError>> {
        let client = Arc::clone(&self.client);
        let url = self.url.clone();
        Box::pin(async move {
            trace!("📬️ Relaying '{}' notification to {url}", notification.template);
            let response = client
                .post(url.as_str())
                .json(&notification)
                .send()
                .await
                .map_err(|e| NotificationError::Unreachable(e.to_string()))?;
            if response.status().is_success() {
                trace!("📬️ Relay accepted the notification. {}", response.status());
                Ok(())
            } else {
                let status = response.status().as_u16();
                let message = response.text().await.unwrap_or_default();
                Err(NotificationError::Rejected { status, message })
            }
        })
    }
}
